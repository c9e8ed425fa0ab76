//! The atom tree node.
//!
//! An [`Atom`] is a data atom (content bytes), a container (ordered
//! children) or a hybrid (a short raw preamble followed by children). The
//! kind comes from the registry in [`known_boxes`](crate::known_boxes) and
//! never changes afterwards.
//!
//! Operations are spread over several modules: children in
//! [`sequence`](crate::sequence), content cursor in
//! [`stream`](crate::stream), serialization in [`writer`](crate::writer)
//! and detaching from the source in [`detach`](crate::detach).

use crate::boxes::FourCC;
use crate::error::{Error, Result};
use crate::known_boxes::{AtomKind, kind_of};
use crate::storage::{Source, Storage};
use std::fmt;

#[derive(Clone)]
pub(crate) enum Body {
    Data(Storage),
    Container(Vec<Atom>),
    Hybrid {
        preamble: Storage,
        children: Vec<Atom>,
    },
}

/// Where a parsed atom's content starts in its source stream.
#[derive(Clone, Debug)]
pub(crate) struct Origin {
    pub(crate) source: Source,
    pub(crate) offset: u64,
}

/// A node in a box tree.
///
/// `Clone` is a shallow structural copy: owned buffers are duplicated and
/// borrowed windows are shared, since they are read-only. Use
/// [`Atom::deep_clone`] to detach a subtree from its source.
#[derive(Clone)]
pub struct Atom {
    pub(crate) typ: FourCC,
    pub(crate) body: Body,
    pub(crate) cursor: u64,
    pub(crate) origin: Option<Origin>,
}

impl Atom {
    /// An empty atom whose kind is looked up from the type tag.
    ///
    /// ```
    /// use mp4atom::Atom;
    ///
    /// assert!(Atom::new(b"moov").is_container());
    /// assert!(!Atom::new(b"free").is_container());
    /// ```
    pub fn new(typ: impl Into<FourCC>) -> Self {
        let typ = typ.into();
        let body = match kind_of(typ) {
            AtomKind::Data => Body::Data(Storage::default()),
            AtomKind::Container => Body::Container(Vec::new()),
            AtomKind::Hybrid => Body::Hybrid {
                preamble: Storage::default(),
                children: Vec::new(),
            },
        };
        Self::from_parts(typ, body, None)
    }

    pub(crate) fn from_parts(typ: FourCC, body: Body, origin: Option<Origin>) -> Self {
        Self {
            typ,
            body,
            cursor: 0,
            origin,
        }
    }

    pub fn typ(&self) -> FourCC {
        self.typ
    }

    pub fn kind(&self) -> AtomKind {
        match self.body {
            Body::Data(_) => AtomKind::Data,
            Body::Container(_) => AtomKind::Container,
            Body::Hybrid { .. } => AtomKind::Hybrid,
        }
    }

    /// Container or hybrid.
    pub fn is_container(&self) -> bool {
        !matches!(self.body, Body::Data(_))
    }

    /// Container only.
    pub fn is_normal_container(&self) -> bool {
        matches!(self.body, Body::Container(_))
    }

    /// Hybrid only.
    pub fn is_special_container(&self) -> bool {
        matches!(self.body, Body::Hybrid { .. })
    }

    /// Absolute offset of the content (just past the header) in the stream
    /// this atom was parsed from.
    pub fn source_offset(&self) -> Option<u64> {
        self.origin.as_ref().map(|o| o.offset)
    }

    /// Stream handle and content offset for decoding raw records the
    /// generic API does not interpret. The bytes there are only
    /// authoritative while [`is_materialized`](Self::is_materialized) is
    /// false.
    pub fn source(&self) -> Option<(&Source, u64)> {
        self.origin.as_ref().map(|o| (&o.source, o.offset))
    }

    /// Whether content has been copied into an owned buffer. Containers
    /// have no content and report `true`.
    pub fn is_materialized(&self) -> bool {
        self.storage().is_none_or(Storage::is_owned)
    }

    /// Current content length: data bytes, or the preamble of a hybrid.
    pub fn content_len(&self) -> u64 {
        self.storage().map_or(0, Storage::len)
    }

    pub(crate) fn storage(&self) -> Option<&Storage> {
        match &self.body {
            Body::Data(s) | Body::Hybrid { preamble: s, .. } => Some(s),
            Body::Container(_) => None,
        }
    }

    pub(crate) fn content(&self, op: &'static str) -> Result<&Storage> {
        self.storage().ok_or_else(|| self.invalid(op))
    }

    pub(crate) fn content_mut(&mut self, op: &'static str) -> Result<&mut Storage> {
        let err = self.invalid(op);
        match &mut self.body {
            Body::Data(s) | Body::Hybrid { preamble: s, .. } => Ok(s),
            Body::Container(_) => Err(err),
        }
    }

    pub(crate) fn invalid(&self, op: &'static str) -> Error {
        Error::InvalidKind {
            op,
            kind: self.kind(),
            typ: self.typ,
        }
    }

    /// Deep, content-based equality.
    ///
    /// Same type tag and, recursively, equal content bytes (data and hybrid
    /// preambles) and pairwise-equal children. Content held in borrowed
    /// windows is compared in chunks, which is why this can fail.
    pub fn structural_eq(&self, other: &Atom) -> Result<bool> {
        if self.typ != other.typ {
            return Ok(false);
        }
        match (&self.body, &other.body) {
            (Body::Data(a), Body::Data(b)) => a.content_eq(b),
            (Body::Container(a), Body::Container(b)) => children_eq(a, b),
            (
                Body::Hybrid {
                    preamble: pa,
                    children: a,
                },
                Body::Hybrid {
                    preamble: pb,
                    children: b,
                },
            ) => Ok(pa.content_eq(pb)? && children_eq(a, b)?),
            _ => Ok(false),
        }
    }
}

fn children_eq(a: &[Atom], b: &[Atom]) -> Result<bool> {
    if a.len() != b.len() {
        return Ok(false);
    }
    for (x, y) in a.iter().zip(b) {
        if !x.structural_eq(y)? {
            return Ok(false);
        }
    }
    Ok(true)
}

impl PartialEq for Atom {
    fn eq(&self, other: &Self) -> bool {
        match self.structural_eq(other) {
            Ok(eq) => eq,
            Err(e) => {
                log::warn!("comparing '{}' atoms failed: {}", self.typ, e);
                false
            }
        }
    }
}

/// `moov: [mvhd, trak: [tkhd]]` for containers, the bare tag for data.
impl fmt::Display for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.body {
            Body::Data(_) => write!(f, "{}", self.typ),
            Body::Container(kids) | Body::Hybrid { children: kids, .. } => {
                write!(f, "{}: [", self.typ)?;
                for (i, kid) in kids.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", kid)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl fmt::Debug for Atom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Atom");
        s.field("type", &self.typ).field("kind", &self.kind());
        if let Some(storage) = self.storage() {
            s.field("content_len", &storage.len())
                .field("materialized", &storage.is_owned());
        }
        if let Some(offset) = self.source_offset() {
            s.field("source_offset", &offset);
        }
        if self.is_container() {
            s.field("children", &self.children());
        }
        s.finish()
    }
}
