use crate::boxes::FourCC;
use serde::Serialize;
use std::fmt;

/// Structural kind of an atom, fixed when the atom is created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AtomKind {
    /// Opaque content bytes, never descended into.
    Data,
    /// Content is entirely child atoms.
    Container,
    /// A fixed-size raw preamble followed by child atoms.
    Hybrid,
}

impl fmt::Display for AtomKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AtomKind::Data => "data",
            AtomKind::Container => "container",
            AtomKind::Hybrid => "hybrid",
        })
    }
}

/// Typed view over the boxes this crate knows by name.
///
/// Anything not in this list becomes `KnownBox::Unknown(fourcc)` and is
/// treated as a data atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownBox {
    // File-level / top-level
    Ftyp,
    Moov,
    Mdat,
    Free,
    Skip,
    Wide,
    Uuid,
    Moof,
    Mfra,

    // moov / trak
    Mvhd,
    Trak,
    Mvex,
    Udta,
    Tkhd,
    Edts,
    Elst,
    Tref,
    Mdia,
    Mdhd,
    Hdlr,
    Minf,

    // minf
    Vmhd,
    Smhd,
    Gmhd,
    Dinf,
    Dref,
    Stbl,

    // stbl
    Stsd,
    Stts,
    Ctts,
    Stsc,
    Stsz,
    Stco,
    Co64,
    Stss,

    // fragments
    Traf,

    // metadata
    Meta,
    Ilst,

    // protection
    Sinf,
    Schi,

    // Anything else
    Unknown(FourCC),
}

impl From<FourCC> for KnownBox {
    fn from(cc: FourCC) -> Self {
        match &cc.0 {
            b"ftyp" => KnownBox::Ftyp,
            b"moov" => KnownBox::Moov,
            b"mdat" => KnownBox::Mdat,
            b"free" => KnownBox::Free,
            b"skip" => KnownBox::Skip,
            b"wide" => KnownBox::Wide,
            b"uuid" => KnownBox::Uuid,
            b"moof" => KnownBox::Moof,
            b"mfra" => KnownBox::Mfra,

            b"mvhd" => KnownBox::Mvhd,
            b"trak" => KnownBox::Trak,
            b"mvex" => KnownBox::Mvex,
            b"udta" => KnownBox::Udta,
            b"tkhd" => KnownBox::Tkhd,
            b"edts" => KnownBox::Edts,
            b"elst" => KnownBox::Elst,
            b"tref" => KnownBox::Tref,
            b"mdia" => KnownBox::Mdia,
            b"mdhd" => KnownBox::Mdhd,
            b"hdlr" => KnownBox::Hdlr,
            b"minf" => KnownBox::Minf,

            b"vmhd" => KnownBox::Vmhd,
            b"smhd" => KnownBox::Smhd,
            b"gmhd" => KnownBox::Gmhd,
            b"dinf" => KnownBox::Dinf,
            b"dref" => KnownBox::Dref,
            b"stbl" => KnownBox::Stbl,

            b"stsd" => KnownBox::Stsd,
            b"stts" => KnownBox::Stts,
            b"ctts" => KnownBox::Ctts,
            b"stsc" => KnownBox::Stsc,
            b"stsz" => KnownBox::Stsz,
            b"stco" => KnownBox::Stco,
            b"co64" => KnownBox::Co64,
            b"stss" => KnownBox::Stss,

            b"traf" => KnownBox::Traf,

            b"meta" => KnownBox::Meta,
            b"ilst" => KnownBox::Ilst,

            b"sinf" => KnownBox::Sinf,
            b"schi" => KnownBox::Schi,

            _ => KnownBox::Unknown(cc),
        }
    }
}

impl KnownBox {
    /// Structural kind used when building an atom of this type.
    pub fn kind(&self) -> AtomKind {
        match self {
            KnownBox::Moov
            | KnownBox::Trak
            | KnownBox::Mvex
            | KnownBox::Udta
            | KnownBox::Edts
            | KnownBox::Tref
            | KnownBox::Mdia
            | KnownBox::Minf
            | KnownBox::Gmhd
            | KnownBox::Dinf
            | KnownBox::Stbl
            | KnownBox::Moof
            | KnownBox::Traf
            | KnownBox::Mfra
            | KnownBox::Ilst
            | KnownBox::Sinf
            | KnownBox::Schi => AtomKind::Container,
            KnownBox::Stsd | KnownBox::Dref | KnownBox::Meta => AtomKind::Hybrid,
            _ => AtomKind::Data,
        }
    }

    /// Length of the raw preamble ahead of the children of a hybrid box.
    pub fn preamble_len(&self) -> u64 {
        match self {
            // version/flags + entry_count
            KnownBox::Stsd | KnownBox::Dref => 8,
            // version/flags; QuickTime's bare `meta` has none, see the parser
            KnownBox::Meta => 4,
            _ => 0,
        }
    }

    pub fn full_name(&self) -> &'static str {
        match self {
            KnownBox::Ftyp => "File Type Box",
            KnownBox::Moov => "Movie Box",
            KnownBox::Mdat => "Media Data Box",
            KnownBox::Free => "Free Space Box",
            KnownBox::Skip => "Free Space Box",
            KnownBox::Wide => "Wide Placeholder Atom",
            KnownBox::Uuid => "User Extension Box",
            KnownBox::Moof => "Movie Fragment Box",
            KnownBox::Mfra => "Movie Fragment Random Access Box",
            KnownBox::Mvhd => "Movie Header Box",
            KnownBox::Trak => "Track Box",
            KnownBox::Mvex => "Movie Extends Box",
            KnownBox::Udta => "User Data Box",
            KnownBox::Tkhd => "Track Header Box",
            KnownBox::Edts => "Edit Box",
            KnownBox::Elst => "Edit List Box",
            KnownBox::Tref => "Track Reference Box",
            KnownBox::Mdia => "Media Box",
            KnownBox::Mdhd => "Media Header Box",
            KnownBox::Hdlr => "Handler Reference Box",
            KnownBox::Minf => "Media Information Box",
            KnownBox::Vmhd => "Video Media Header Box",
            KnownBox::Smhd => "Sound Media Header Box",
            KnownBox::Gmhd => "Base Media Information Header Atom",
            KnownBox::Dinf => "Data Information Box",
            KnownBox::Dref => "Data Reference Box",
            KnownBox::Stbl => "Sample Table Box",
            KnownBox::Stsd => "Sample Description Box",
            KnownBox::Stts => "Decoding Time to Sample Box",
            KnownBox::Ctts => "Composition Time to Sample Box",
            KnownBox::Stsc => "Sample To Chunk Box",
            KnownBox::Stsz => "Sample Size Box",
            KnownBox::Stco => "Chunk Offset Box",
            KnownBox::Co64 => "64-bit Chunk Offset Box",
            KnownBox::Stss => "Sync Sample Box",
            KnownBox::Traf => "Track Fragment Box",
            KnownBox::Meta => "Meta Box",
            KnownBox::Ilst => "Metadata Item List Atom",
            KnownBox::Sinf => "Protection Scheme Information Box",
            KnownBox::Schi => "Scheme Information Box",
            KnownBox::Unknown(_) => "Unknown Box",
        }
    }
}

/// Registry lookup: kind for a type tag, `Data` when unregistered.
pub fn kind_of(typ: FourCC) -> AtomKind {
    KnownBox::from(typ).kind()
}
