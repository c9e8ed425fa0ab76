//! List-like operations over an atom's children.
//!
//! Only containers and hybrids have children. Indexed access and every
//! mutation on a data atom fail with [`Error::InvalidKind`]. The slice views
//! (`len`, `children`, `iter`) report a data atom as having no children.
//!
//! Arguments are typed as [`Atom`], so nothing else can be inserted:
//!
//! ```compile_fail
//! let mut moov = mp4atom::Atom::new(b"moov");
//! moov.append(None);
//! ```
//!
//! ```compile_fail
//! let mut moov = mp4atom::Atom::new(b"moov");
//! moov.set_range(0..0, vec![None]);
//! ```

use crate::atom::{Atom, Body};
use crate::boxes::FourCC;
use crate::error::{Error, Result};
use std::ops::{Bound, Range, RangeBounds};

impl Atom {
    /// Number of direct children (0 for data atoms).
    pub fn len(&self) -> usize {
        self.children().len()
    }

    /// No children. This is about child count, not content: a data atom
    /// with bytes is still empty here, see [`content_len`](Self::content_len).
    pub fn is_empty(&self) -> bool {
        self.children().is_empty()
    }

    pub fn children(&self) -> &[Atom] {
        match &self.body {
            Body::Container(kids) | Body::Hybrid { children: kids, .. } => kids,
            Body::Data(_) => &[],
        }
    }

    /// Children as a fixed-length slice: elements can be edited in place,
    /// the structure cannot change.
    pub fn children_mut(&mut self) -> &mut [Atom] {
        match &mut self.body {
            Body::Container(kids) | Body::Hybrid { children: kids, .. } => kids,
            Body::Data(_) => &mut [],
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Atom> {
        self.children().iter()
    }

    fn child_vec(&mut self, op: &'static str) -> Result<&mut Vec<Atom>> {
        let err = self.invalid(op);
        match &mut self.body {
            Body::Container(kids) | Body::Hybrid { children: kids, .. } => Ok(kids),
            Body::Data(_) => Err(err),
        }
    }

    pub fn get(&self, index: usize) -> Result<&Atom> {
        if !self.is_container() {
            return Err(self.invalid("get"));
        }
        let kids = self.children();
        kids.get(index).ok_or_else(|| out_of_range(index, kids.len()))
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Atom> {
        let kids = self.child_vec("get_mut")?;
        let len = kids.len();
        kids.get_mut(index).ok_or_else(|| out_of_range(index, len))
    }

    pub fn get_range(&self, range: impl RangeBounds<usize>) -> Result<&[Atom]> {
        if !self.is_container() {
            return Err(self.invalid("get_range"));
        }
        let kids = self.children();
        let r = resolve(range, kids.len())?;
        Ok(&kids[r])
    }

    /// Replace the child at `index`, returning the previous one.
    pub fn set(&mut self, index: usize, atom: Atom) -> Result<Atom> {
        let kids = self.child_vec("set")?;
        let len = kids.len();
        let slot = kids.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
        Ok(std::mem::replace(slot, atom))
    }

    /// Replace a range of children with `atoms`, returning the removed ones.
    pub fn set_range<I>(&mut self, range: impl RangeBounds<usize>, atoms: I) -> Result<Vec<Atom>>
    where
        I: IntoIterator<Item = Atom>,
    {
        let kids = self.child_vec("set_range")?;
        let r = resolve(range, kids.len())?;
        Ok(kids.splice(r, atoms).collect())
    }

    pub fn delete_range(&mut self, range: impl RangeBounds<usize>) -> Result<Vec<Atom>> {
        let kids = self.child_vec("delete_range")?;
        let r = resolve(range, kids.len())?;
        Ok(kids.drain(r).collect())
    }

    pub fn append(&mut self, atom: Atom) -> Result<()> {
        self.child_vec("append")?.push(atom);
        Ok(())
    }

    pub fn insert(&mut self, index: usize, atom: Atom) -> Result<()> {
        let kids = self.child_vec("insert")?;
        if index > kids.len() {
            return Err(out_of_range(index, kids.len()));
        }
        kids.insert(index, atom);
        Ok(())
    }

    /// Position of the first child structurally equal to `atom`.
    pub fn index(&self, atom: &Atom) -> Result<usize> {
        if !self.is_container() {
            return Err(self.invalid("index"));
        }
        for (i, kid) in self.children().iter().enumerate() {
            if kid.structural_eq(atom)? {
                return Ok(i);
            }
        }
        Err(Error::NotFound(atom.typ()))
    }

    /// Remove and return the first child structurally equal to `atom`.
    pub fn remove(&mut self, atom: &Atom) -> Result<Atom> {
        if !self.is_container() {
            return Err(self.invalid("remove"));
        }
        let i = self.index(atom)?;
        Ok(self.child_vec("remove")?.remove(i))
    }

    /// First direct child with the given type.
    pub fn find(&self, typ: impl Into<FourCC>) -> Option<&Atom> {
        let typ = typ.into();
        self.children().iter().find(|a| a.typ == typ)
    }

    pub fn find_mut(&mut self, typ: impl Into<FourCC>) -> Option<&mut Atom> {
        let typ = typ.into();
        self.children_mut().iter_mut().find(|a| a.typ == typ)
    }

    /// Follow first-match children by type, e.g. `[b"mdia", b"minf", b"stbl"]`.
    pub fn find_path(&self, path: &[&[u8; 4]]) -> Option<&Atom> {
        path.iter().try_fold(self, |node, typ| node.find(*typ))
    }

    pub fn find_path_mut(&mut self, path: &[&[u8; 4]]) -> Option<&mut Atom> {
        let mut node = self;
        for typ in path {
            node = node.find_mut(*typ)?;
        }
        Some(node)
    }
}

impl<'a> IntoIterator for &'a Atom {
    type Item = &'a Atom;
    type IntoIter = std::slice::Iter<'a, Atom>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

fn out_of_range(index: usize, len: usize) -> Error {
    Error::Bounds(format!("child index {} out of range for {} children", index, len))
}

fn resolve(range: impl RangeBounds<usize>, len: usize) -> Result<Range<usize>> {
    let start = match range.start_bound() {
        Bound::Included(&s) => s,
        Bound::Excluded(&s) => s + 1,
        Bound::Unbounded => 0,
    };
    let end = match range.end_bound() {
        Bound::Included(&e) => e + 1,
        Bound::Excluded(&e) => e,
        Bound::Unbounded => len,
    };
    if start > end || end > len {
        return Err(Error::Bounds(format!(
            "child range {}..{} out of range for {} children",
            start, end, len
        )));
    }
    Ok(start..end)
}
