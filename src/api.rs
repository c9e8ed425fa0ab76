use crate::{
    atom::Atom,
    known_boxes::{AtomKind, KnownBox},
    parser::top_level,
    storage::Source,
};
use anyhow::Context;
use serde::Serialize;
use std::{fs::File, io::BufReader, path::Path};

/// A JSON-serializable view of one atom and its subtree.
///
/// Sizes are the ones [`Atom::save`] would write now, so a summary taken
/// after edits reflects the edited tree rather than the file on disk.
#[derive(Debug, Serialize)]
pub struct AtomSummary {
    /// Four-character type tag (e.g. "moov")
    pub typ: String,
    /// "data", "container" or "hybrid"
    pub kind: AtomKind,
    /// Human-readable name, "Unknown Box" for unregistered tags
    pub full_name: String,
    /// Absolute offset of the content in its source, for parsed atoms
    pub content_offset: Option<u64>,
    /// Total size including the header
    pub size: u64,
    /// Size after the header
    pub content_size: u64,
    /// Raw preamble bytes of a hybrid, hex encoded
    pub preamble: Option<String>,
    /// Children of containers and hybrids
    pub children: Option<Vec<AtomSummary>>,
}

/// Build the summary tree for `atom`.
///
/// Only hybrid preambles are read; data content is never touched.
pub fn summarize(atom: &Atom) -> crate::Result<AtomSummary> {
    let content_size = atom.content_size();
    let preamble = match atom.kind() {
        AtomKind::Hybrid => Some(hex::encode(atom.content("summarize")?.to_vec()?)),
        _ => None,
    };
    let children = if atom.is_container() {
        Some(atom.iter().map(summarize).collect::<crate::Result<Vec<_>>>()?)
    } else {
        None
    };

    Ok(AtomSummary {
        typ: atom.typ().to_string(),
        kind: atom.kind(),
        full_name: KnownBox::from(atom.typ()).full_name().to_string(),
        content_offset: atom.source_offset(),
        size: atom.total_size(),
        content_size,
        preamble,
        children,
    })
}

/// Open an MP4/QuickTime file and summarize every top-level atom.
///
/// # Example
/// ```no_run
/// let atoms = mp4atom::analyze_file("video.mp4")?;
/// println!("{}", serde_json::to_string_pretty(&atoms)?);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn analyze_file(path: impl AsRef<Path>) -> anyhow::Result<Vec<AtomSummary>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let source = Source::new(BufReader::new(file));

    let mut out = Vec::new();
    for item in top_level(&source)? {
        let item = item.with_context(|| format!("parsing {}", path.display()))?;
        out.push(summarize(&item.atom)?);
    }
    log::debug!("{}: {} top-level atoms", path.display(), out.len());
    Ok(out)
}
