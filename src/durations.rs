//! Per-frame duration extraction.
//!
//! Reads movie and track timing out of a parsed `moov` without copying
//! anything: unmodified tables are decoded straight from the source.

use crate::atom::Atom;
use crate::boxes::FourCC;
use crate::error::{Error, Result};
use crate::parser::top_level;
use crate::storage::Source;
use crate::timing::{EditList, MediaTiming, TimeToSample, decode_content};
use serde::Serialize;
use std::io::{Read, Write};

#[derive(Debug, Clone, Serialize)]
pub struct TrackTiming {
    /// Position among the `trak` children of `moov`.
    pub index: usize,
    /// Handler type from `hdlr`, e.g. "vide" or "soun".
    pub handler: Option<String>,
    pub media: Option<MediaTiming>,
    pub edits: Option<EditList>,
    pub samples: Option<TimeToSample>,
}

impl TrackTiming {
    /// Seconds per sample, expanded from the run-length `stts` table.
    pub fn frame_durations(&self) -> Result<Vec<f64>> {
        let media = self.media.ok_or(Error::NotFound(FourCC(*b"mdhd")))?;
        let samples = self
            .samples
            .as_ref()
            .ok_or(Error::NotFound(FourCC(*b"stts")))?;
        samples.frame_durations(media.timescale)
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.media.and_then(|m| m.seconds())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MovieTiming {
    pub movie: Option<MediaTiming>,
    pub tracks: Vec<TrackTiming>,
}

impl MovieTiming {
    pub fn track(&self, index: usize) -> Result<&TrackTiming> {
        self.tracks.get(index).ok_or_else(|| {
            Error::Bounds(format!(
                "track {} requested, movie has {}",
                index,
                self.tracks.len()
            ))
        })
    }
}

/// Timing of the first `moov` among already parsed top-level atoms.
pub fn collect_timing(atoms: &[Atom]) -> Result<MovieTiming> {
    let moov = atoms
        .iter()
        .find(|a| a.typ() == *b"moov")
        .ok_or(Error::NotFound(FourCC(*b"moov")))?;
    timing_of(moov)
}

/// Scan `source` for its `moov` and decode its timing.
pub fn read_timing(source: &Source) -> Result<MovieTiming> {
    for item in top_level(source)? {
        let item = item?;
        if item.atom.typ() == *b"moov" {
            return timing_of(&item.atom);
        }
    }
    Err(Error::NotFound(FourCC(*b"moov")))
}

pub fn timing_of(moov: &Atom) -> Result<MovieTiming> {
    let movie = moov.find(b"mvhd").map(MediaTiming::decode).transpose()?;
    let tracks = moov
        .iter()
        .filter(|a| a.typ() == *b"trak")
        .enumerate()
        .map(|(index, trak)| track_timing(index, trak))
        .collect::<Result<Vec<_>>>()?;
    log::debug!("moov holds {} tracks", tracks.len());
    Ok(MovieTiming { movie, tracks })
}

fn track_timing(index: usize, trak: &Atom) -> Result<TrackTiming> {
    let handler = trak
        .find_path(&[b"mdia", b"hdlr"])
        .map(read_handler)
        .transpose()?;
    let media = trak
        .find_path(&[b"mdia", b"mdhd"])
        .map(MediaTiming::decode)
        .transpose()?;
    let edits = trak
        .find_path(&[b"edts", b"elst"])
        .map(EditList::decode)
        .transpose()?;
    let samples = trak
        .find_path(&[b"mdia", b"minf", b"stbl", b"stts"])
        .map(TimeToSample::decode)
        .transpose()?;
    Ok(TrackTiming {
        index,
        handler,
        media,
        edits,
        samples,
    })
}

fn read_handler(hdlr: &Atom) -> Result<String> {
    decode_content(hdlr, |r| {
        // version/flags, pre_defined
        let mut skip = [0u8; 8];
        r.read_exact(&mut skip)?;
        let mut typ = [0u8; 4];
        r.read_exact(&mut typ)?;
        Ok(FourCC(typ).to_string())
    })
}

/// One duration per line, shortest representation that reads back exactly.
pub fn write_durations<W: Write + ?Sized>(w: &mut W, durations: &[f64]) -> Result<()> {
    for d in durations {
        writeln!(w, "{}", d)?;
    }
    Ok(())
}
