use crate::atom::{Atom, Body};
use crate::error::Result;
use crate::storage::{Source, Storage};

impl Atom {
    /// Copy this subtree into fully owned storage, detached from any source.
    ///
    /// Every window is read in full and must yield exactly its declared
    /// length, otherwise this fails with a format error. The read position
    /// of every source touched is restored afterwards, success or not, so a
    /// caller copying the surrounding stream sequentially is not disturbed.
    pub fn deep_clone(&self) -> Result<Atom> {
        let mut sources = Vec::new();
        self.collect_sources(&mut sources);
        let saved = sources
            .iter()
            .map(Source::position)
            .collect::<Result<Vec<_>>>()?;

        let cloned = self.clone_detached();

        for (source, pos) in sources.iter().zip(saved) {
            source.set_position(pos)?;
        }
        cloned
    }

    fn clone_detached(&self) -> Result<Atom> {
        let body = match &self.body {
            Body::Data(storage) => Body::Data(Storage::Owned(storage.to_vec()?)),
            Body::Container(kids) => Body::Container(clone_all(kids)?),
            Body::Hybrid { preamble, children } => Body::Hybrid {
                preamble: Storage::Owned(preamble.to_vec()?),
                children: clone_all(children)?,
            },
        };
        log::trace!("cloned '{}' ({} content bytes)", self.typ, self.content_len());
        Ok(Atom::from_parts(self.typ, body, None))
    }

    fn collect_sources(&self, out: &mut Vec<Source>) {
        if let Some(Storage::Borrowed(w)) = self.storage()
            && !out.iter().any(|s| s.same(w.source()))
        {
            out.push(w.source().clone());
        }
        for kid in self.children() {
            kid.collect_sources(out);
        }
    }
}

fn clone_all(kids: &[Atom]) -> Result<Vec<Atom>> {
    kids.iter().map(Atom::clone_detached).collect()
}
