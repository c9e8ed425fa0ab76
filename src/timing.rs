//! Field-level records for the handful of boxes the timing tools edit.
//!
//! None of this is known to the atom tree itself: these helpers read raw
//! records either straight from the source (for unmodified atoms) or
//! through the content cursor, and write edits back through the cursor so
//! that `save` recomputes every enclosing length.

use crate::atom::Atom;
use crate::error::{Error, Result};
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use serde::{Deserialize, Serialize};
use std::io::{Read, Seek, SeekFrom};

/// Run `decode` over an atom's content from its first byte.
///
/// Unmodified parsed atoms are read directly at their source offset;
/// anything already edited is read through a copy's content cursor.
pub fn decode_content<T>(atom: &Atom, decode: impl FnOnce(&mut dyn Read) -> Result<T>) -> Result<T> {
    match atom.source() {
        Some((source, offset)) if !atom.is_materialized() => source.with_stream(|s| {
            s.seek(SeekFrom::Start(offset))?;
            let mut limited = Read::take(&mut *s, atom.content_len());
            decode(&mut limited)
        }),
        _ => {
            let mut copy = atom.clone();
            copy.seek(SeekFrom::Start(0))?;
            decode(&mut copy)
        }
    }
}

fn read_version_flags<R: Read + ?Sized>(r: &mut R) -> Result<(u8, u32)> {
    let version = r.read_u8()?;
    let flags = r.read_u24::<BigEndian>()?;
    Ok((version, flags))
}

fn write_table_prefix(atom: &mut Atom, version: u8, flags: u32, count: usize) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| Error::Bounds(format!("{} entries do not fit a table count", count)))?;
    atom.seek(SeekFrom::Start(0))?;
    atom.write_u8(version)?;
    atom.write_u24::<BigEndian>(flags)?;
    atom.truncate(None)?;
    atom.write_u32::<BigEndian>(count)?;
    Ok(())
}

/// Timing fields shared by `mvhd` and `mdhd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MediaTiming {
    pub version: u8,
    pub flags: u32,
    pub creation_time: u64,
    pub modification_time: u64,
    pub timescale: u32,
    pub duration: u64,
}

impl MediaTiming {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let (version, flags) = read_version_flags(r)?;
        let (creation_time, modification_time, timescale, duration) = if version == 1 {
            let c = r.read_u64::<BigEndian>()?;
            let m = r.read_u64::<BigEndian>()?;
            let ts = r.read_u32::<BigEndian>()?;
            let d = r.read_u64::<BigEndian>()?;
            (c, m, ts, d)
        } else {
            let c = r.read_u32::<BigEndian>()? as u64;
            let m = r.read_u32::<BigEndian>()? as u64;
            let ts = r.read_u32::<BigEndian>()?;
            let d = r.read_u32::<BigEndian>()? as u64;
            (c, m, ts, d)
        };
        Ok(Self {
            version,
            flags,
            creation_time,
            modification_time,
            timescale,
            duration,
        })
    }

    pub fn decode(atom: &Atom) -> Result<Self> {
        decode_content(atom, |r| Self::read_from(r))
    }

    pub fn seconds(&self) -> Option<f64> {
        (self.timescale != 0).then(|| self.duration as f64 / f64::from(self.timescale))
    }

    /// Overwrite timescale and duration in place. Everything else in the
    /// box, including the rate/language fields that follow, is left alone.
    pub fn patch(atom: &mut Atom, timescale: u32, duration: u64) -> Result<()> {
        atom.seek(SeekFrom::Start(0))?;
        let version = atom.read_u8()?;
        let (times, dur_len) = if version == 1 { (16, 8) } else { (8, 4) };
        let needed = 4 + times + 4 + dur_len;
        if atom.content_len() < needed {
            return Err(Error::Format(format!(
                "'{}' has {} content bytes, timing fields need {}",
                atom.typ(),
                atom.content_len(),
                needed
            )));
        }
        atom.seek(SeekFrom::Start(4 + times))?;
        atom.write_u32::<BigEndian>(timescale)?;
        if version == 1 {
            atom.write_u64::<BigEndian>(duration)?;
        } else {
            let d = u32::try_from(duration).map_err(|_| {
                Error::Bounds(format!("duration {} does not fit a version 0 header", duration))
            })?;
            atom.write_u32::<BigEndian>(d)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SttsEntry {
    pub sample_count: u32,
    pub sample_delta: u32,
}

/// Decoding time-to-sample table (`stts`): run-length `(count, delta)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TimeToSample {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<SttsEntry>,
}

impl TimeToSample {
    pub fn new(entries: Vec<SttsEntry>) -> Self {
        Self {
            version: 0,
            flags: 0,
            entries,
        }
    }

    /// Run-length encode per-sample deltas.
    pub fn from_deltas(deltas: &[u32]) -> Self {
        let mut entries: Vec<SttsEntry> = Vec::new();
        for &delta in deltas {
            match entries.last_mut() {
                Some(last) if last.sample_delta == delta && last.sample_count < u32::MAX => {
                    last.sample_count += 1
                }
                _ => entries.push(SttsEntry {
                    sample_count: 1,
                    sample_delta: delta,
                }),
            }
        }
        Self::new(entries)
    }

    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let (version, flags) = read_version_flags(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let mut entries = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            let sample_count = r.read_u32::<BigEndian>()?;
            let sample_delta = r.read_u32::<BigEndian>()?;
            entries.push(SttsEntry {
                sample_count,
                sample_delta,
            });
        }
        Ok(Self {
            version,
            flags,
            entries,
        })
    }

    pub fn decode(atom: &Atom) -> Result<Self> {
        decode_content(atom, |r| Self::read_from(r))
    }

    /// Replace the atom's table with this one.
    pub fn write_into(&self, atom: &mut Atom) -> Result<()> {
        write_table_prefix(atom, self.version, self.flags, self.entries.len())?;
        for e in &self.entries {
            atom.write_u32::<BigEndian>(e.sample_count)?;
            atom.write_u32::<BigEndian>(e.sample_delta)?;
        }
        log::debug!("wrote stts with {} entries", self.entries.len());
        Ok(())
    }

    pub fn sample_count(&self) -> u64 {
        self.entries.iter().map(|e| u64::from(e.sample_count)).sum()
    }

    /// Sum of all sample durations, in the track timescale.
    pub fn total_duration(&self) -> u64 {
        self.entries
            .iter()
            .map(|e| u64::from(e.sample_count) * u64::from(e.sample_delta))
            .sum()
    }

    /// Per-sample durations in seconds.
    pub fn frame_durations(&self, timescale: u32) -> Result<Vec<f64>> {
        if timescale == 0 {
            return Err(Error::Format("timescale is zero".into()));
        }
        let scale = f64::from(timescale);
        let mut out = Vec::with_capacity(self.sample_count().min(1 << 20) as usize);
        for e in &self.entries {
            let secs = f64::from(e.sample_delta) / scale;
            out.extend(std::iter::repeat_n(secs, e.sample_count as usize));
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EditEntry {
    pub segment_duration: u64,
    pub media_time: i64,
    pub media_rate_integer: i16,
    pub media_rate_fraction: i16,
}

/// Edit list (`elst`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EditList {
    pub version: u8,
    pub flags: u32,
    pub entries: Vec<EditEntry>,
}

impl EditList {
    pub fn read_from<R: Read + ?Sized>(r: &mut R) -> Result<Self> {
        let (version, flags) = read_version_flags(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let mut entries = Vec::with_capacity(count.min(1 << 12) as usize);
        for _ in 0..count {
            let (segment_duration, media_time) = if version == 1 {
                (r.read_u64::<BigEndian>()?, r.read_i64::<BigEndian>()?)
            } else {
                (
                    u64::from(r.read_u32::<BigEndian>()?),
                    i64::from(r.read_i32::<BigEndian>()?),
                )
            };
            entries.push(EditEntry {
                segment_duration,
                media_time,
                media_rate_integer: r.read_i16::<BigEndian>()?,
                media_rate_fraction: r.read_i16::<BigEndian>()?,
            });
        }
        Ok(Self {
            version,
            flags,
            entries,
        })
    }

    pub fn decode(atom: &Atom) -> Result<Self> {
        decode_content(atom, |r| Self::read_from(r))
    }
}

/// Chunk offset table, `stco` (32-bit) or `co64` (64-bit).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkOffsets {
    pub version: u8,
    pub flags: u32,
    pub large: bool,
    pub offsets: Vec<u64>,
}

impl ChunkOffsets {
    pub fn read_from<R: Read + ?Sized>(r: &mut R, large: bool) -> Result<Self> {
        let (version, flags) = read_version_flags(r)?;
        let count = r.read_u32::<BigEndian>()?;
        let mut offsets = Vec::with_capacity(count.min(1 << 16) as usize);
        for _ in 0..count {
            offsets.push(if large {
                r.read_u64::<BigEndian>()?
            } else {
                u64::from(r.read_u32::<BigEndian>()?)
            });
        }
        Ok(Self {
            version,
            flags,
            large,
            offsets,
        })
    }

    pub fn decode(atom: &Atom) -> Result<Self> {
        let large = atom.typ() == *b"co64";
        decode_content(atom, |r| Self::read_from(r, large))
    }

    /// Move every offset at or past `from` by `delta`. Returns how many
    /// offsets changed.
    pub fn shift(&mut self, from: u64, delta: i64) -> Result<usize> {
        let mut moved = 0;
        for off in self.offsets.iter_mut().filter(|o| **o >= from) {
            let shifted = off
                .checked_add_signed(delta)
                .ok_or_else(|| Error::Bounds(format!("chunk offset {} shifted by {}", off, delta)))?;
            if !self.large && shifted > u64::from(u32::MAX) {
                return Err(Error::Bounds(format!(
                    "chunk offset {} no longer fits a 32-bit stco entry",
                    shifted
                )));
            }
            *off = shifted;
            moved += 1;
        }
        Ok(moved)
    }

    pub fn write_into(&self, atom: &mut Atom) -> Result<()> {
        write_table_prefix(atom, self.version, self.flags, self.offsets.len())?;
        for &off in &self.offsets {
            if self.large {
                atom.write_u64::<BigEndian>(off)?;
            } else {
                let off = u32::try_from(off)
                    .map_err(|_| Error::Bounds(format!("chunk offset {} exceeds stco", off)))?;
                atom.write_u32::<BigEndian>(off)?;
            }
        }
        Ok(())
    }
}

fn tkhd_duration_field(tkhd: &mut Atom) -> Result<(u64, usize)> {
    tkhd.seek(SeekFrom::Start(0))?;
    let version = tkhd.read_u8()?;
    // creation, modification, track_ID, reserved
    let (at, len) = if version == 1 { (28, 8) } else { (20, 4) };
    if tkhd.content_len() < at + len as u64 {
        return Err(Error::Format(format!(
            "'tkhd' has {} content bytes, too short for version {}",
            tkhd.content_len(),
            version
        )));
    }
    Ok((at, len))
}

/// Track duration from `tkhd`, in the movie timescale.
pub fn track_duration(tkhd: &Atom) -> Result<u64> {
    let mut copy = tkhd.clone();
    let (at, len) = tkhd_duration_field(&mut copy)?;
    copy.seek(SeekFrom::Start(at))?;
    Ok(if len == 8 {
        copy.read_u64::<BigEndian>()?
    } else {
        u64::from(copy.read_u32::<BigEndian>()?)
    })
}

pub fn patch_track_duration(tkhd: &mut Atom, duration: u64) -> Result<()> {
    let (at, len) = tkhd_duration_field(tkhd)?;
    tkhd.seek(SeekFrom::Start(at))?;
    if len == 8 {
        tkhd.write_u64::<BigEndian>(duration)?;
    } else {
        let d = u32::try_from(duration)
            .map_err(|_| Error::Bounds(format!("duration {} does not fit tkhd", duration)))?;
        tkhd.write_u32::<BigEndian>(d)?;
    }
    Ok(())
}
