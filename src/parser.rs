use crate::atom::{Atom, Body, Origin};
use crate::boxes::{BoxHeader, FourCC};
use crate::error::{Error, Result};
use crate::known_boxes::{AtomKind, KnownBox};
use crate::storage::{Source, Storage, Window};
use byteorder::{BigEndian, ByteOrder, WriteBytesExt};
use std::io::{Read, Seek, Write};

pub const HEADER_LEN: u64 = 8;
pub const LARGE_HEADER_LEN: u64 = 16;

/// Render the compact 8-byte header: big-endian `8 + content_size`, then
/// the type tag.
///
/// ```
/// let hdr = mp4atom::encode_header(b"free", 0).unwrap();
/// assert_eq!(&hdr, b"\x00\x00\x00\x08free");
/// ```
pub fn encode_header(typ: &[u8], content_size: u64) -> Result<[u8; 8]> {
    let typ = FourCC::try_from(typ)?;
    let total = content_size
        .checked_add(HEADER_LEN)
        .filter(|&t| t <= u64::from(u32::MAX))
        .ok_or_else(|| {
            Error::Format(format!(
                "content of {} bytes does not fit a 32-bit box length",
                content_size
            ))
        })?;
    let mut out = [0u8; 8];
    BigEndian::write_u32(&mut out[..4], total as u32);
    out[4..].copy_from_slice(&typ.0);
    Ok(out)
}

/// Header length the serializer uses for a given content size.
pub fn header_len(content_size: u64) -> u64 {
    if content_size.saturating_add(HEADER_LEN) <= u64::from(u32::MAX) {
        HEADER_LEN
    } else {
        LARGE_HEADER_LEN
    }
}

/// Write a header, switching to the 64-bit large-size form only when the
/// total does not fit in 32 bits. Returns the header length.
pub fn write_header<W: Write + ?Sized>(w: &mut W, typ: FourCC, content_size: u64) -> Result<u64> {
    if header_len(content_size) == HEADER_LEN {
        w.write_all(&encode_header(&typ.0, content_size)?)?;
        return Ok(HEADER_LEN);
    }
    let total = content_size
        .checked_add(LARGE_HEADER_LEN)
        .ok_or_else(|| Error::Format(format!("content of {} bytes is too large", content_size)))?;
    w.write_u32::<BigEndian>(1)?;
    w.write_all(&typ.0)?;
    w.write_u64::<BigEndian>(total)?;
    Ok(LARGE_HEADER_LEN)
}

/// Read a box header at the current position.
///
/// The returned size includes the header. A declared size of 0 is passed
/// through; callers treat it as "extends to the enclosing end".
pub fn decode_header<R: Read + Seek + ?Sized>(r: &mut R) -> Result<BoxHeader> {
    let start = r.stream_position()?;
    let mut raw = [0u8; 8];
    read_header_bytes(r, &mut raw, start)?;
    let size32 = BigEndian::read_u32(&raw[..4]);
    let typ = FourCC([raw[4], raw[5], raw[6], raw[7]]);

    let (size, header_size) = if size32 == 1 {
        let mut large = [0u8; 8];
        read_header_bytes(r, &mut large, start)?;
        (BigEndian::read_u64(&large), LARGE_HEADER_LEN)
    } else {
        (u64::from(size32), HEADER_LEN)
    };

    if size != 0 && size < header_size {
        return Err(Error::Format(format!(
            "box '{}' at offset {} declares size {} below its {}-byte header",
            typ, start, size, header_size
        )));
    }

    Ok(BoxHeader {
        size,
        typ,
        header_size,
        start,
    })
}

fn read_header_bytes<R: Read + ?Sized>(r: &mut R, buf: &mut [u8], start: u64) -> Result<()> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        std::io::ErrorKind::UnexpectedEof => {
            Error::Format(format!("truncated box header at offset {}", start))
        }
        _ => Error::Io(e),
    })
}

impl Atom {
    /// Parse the box starting at `offset`.
    ///
    /// Children of containers and hybrids are parsed eagerly; data content
    /// is not read, only a window onto it is recorded. The source is left
    /// positioned at the end of the box.
    pub fn parse(source: &Source, offset: u64) -> Result<Atom> {
        let limit = source.stream_len()?;
        let (atom, end) = parse_at(source, offset, limit)?;
        source.set_position(end)?;
        Ok(atom)
    }
}

/// Parse one box at `offset` that must end by `limit`. Returns the atom and
/// its end offset.
fn parse_at(source: &Source, offset: u64, limit: u64) -> Result<(Atom, u64)> {
    let remaining = limit.saturating_sub(offset);
    if remaining < HEADER_LEN {
        return Err(Error::Format(format!(
            "{} bytes left at offset {}, need {} for a box header",
            remaining, offset, HEADER_LEN
        )));
    }
    let hdr = source.with_stream(|s| {
        s.seek(std::io::SeekFrom::Start(offset))?;
        decode_header(s)
    })?;

    let end = if hdr.size == 0 {
        limit
    } else {
        hdr.start.checked_add(hdr.size).unwrap_or(u64::MAX)
    };
    if end > limit {
        return Err(Error::Format(format!(
            "box '{}' at offset {} declares {} bytes but only {} remain",
            hdr.typ, hdr.start, hdr.size, remaining
        )));
    }

    let content_start = hdr.start + hdr.header_size;
    if content_start > end {
        return Err(Error::Format(format!(
            "box '{}' at offset {} ends inside its own header",
            hdr.typ, hdr.start
        )));
    }
    let known = KnownBox::from(hdr.typ);
    let body = match known.kind() {
        AtomKind::Data => Body::Data(Storage::Borrowed(Window::new(
            source.clone(),
            content_start,
            end - content_start,
        ))),
        AtomKind::Container => Body::Container(parse_children(source, content_start, end)?),
        AtomKind::Hybrid => {
            let n = preamble_len(source, known, content_start, end)?;
            if end - content_start < n {
                return Err(Error::Format(format!(
                    "box '{}' at offset {} is too short for its {}-byte preamble",
                    hdr.typ, hdr.start, n
                )));
            }
            let preamble = source.read_vec(content_start, n)?;
            Body::Hybrid {
                preamble: Storage::Owned(preamble),
                children: parse_children(source, content_start + n, end)?,
            }
        }
    };

    log::trace!("parsed '{}' at {} ({} bytes)", hdr.typ, hdr.start, end - hdr.start);
    let origin = Origin {
        source: source.clone(),
        offset: content_start,
    };
    Ok((Atom::from_parts(hdr.typ, body, Some(origin)), end))
}

/// Preamble length of a hybrid at `start..end`.
///
/// QuickTime writes `meta` as a plain container, so its content opens with a
/// child header; the ISO form opens with version/flags. A type tag in bytes
/// 4..8 means the former.
fn preamble_len(source: &Source, known: KnownBox, start: u64, end: u64) -> Result<u64> {
    if known == KnownBox::Meta && end - start >= HEADER_LEN {
        let peek = source.read_vec(start + 4, 4)?;
        if peek.iter().all(u8::is_ascii_graphic) {
            return Ok(0);
        }
    }
    Ok(known.preamble_len())
}

fn parse_children(source: &Source, start: u64, end: u64) -> Result<Vec<Atom>> {
    let mut kids = Vec::new();
    let mut pos = start;
    while pos < end {
        let (kid, kid_end) = parse_at(source, pos, end)?;
        kids.push(kid);
        pos = kid_end;
    }
    Ok(kids)
}

/// A top-level atom with the byte range it occupies in the source.
#[derive(Debug)]
pub struct TopLevelAtom {
    pub start: u64,
    pub end: u64,
    pub atom: Atom,
}

/// Sequential iterator over the top-level boxes of a source.
pub struct TopLevel<'a> {
    source: &'a Source,
    pos: u64,
    end: u64,
}

/// Iterate the top-level boxes of `source` from offset 0.
pub fn top_level(source: &Source) -> Result<TopLevel<'_>> {
    Ok(TopLevel {
        source,
        pos: 0,
        end: source.stream_len()?,
    })
}

impl Iterator for TopLevel<'_> {
    type Item = Result<TopLevelAtom>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.end {
            return None;
        }
        let start = self.pos;
        match parse_at(self.source, start, self.end) {
            Ok((atom, end)) => {
                self.pos = end;
                Some(Ok(TopLevelAtom { start, end, atom }))
            }
            Err(e) => {
                self.pos = self.end;
                Some(Err(e))
            }
        }
    }
}

/// Parse every top-level box of `source`.
pub fn parse_file(source: &Source) -> Result<Vec<Atom>> {
    top_level(source)?
        .map(|item| item.map(|t| t.atom))
        .collect()
}
