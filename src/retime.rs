//! Frame-duration rewriting.
//!
//! The output is the input with `moov` replaced: bytes before and after it
//! are copied verbatim, the movie header box is detached with
//! [`Atom::deep_clone`], patched, and written back with recomputed lengths.
//! When `moov` changes size, chunk offsets that point past it are shifted so
//! they still address the same media bytes.

use crate::atom::Atom;
use crate::boxes::FourCC;
use crate::error::{Error, Result};
use crate::parser::{TopLevelAtom, top_level};
use crate::storage::Source;
use crate::timing::{
    ChunkOffsets, MediaTiming, SttsEntry, TimeToSample, patch_track_duration, track_duration,
};
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetimeOptions {
    /// Ticks per second written to the track's `mdhd`.
    pub timescale: u32,
    /// Multiplier applied to every duration read from the table.
    pub scale: f64,
    /// Which `trak` of `moov` to retime, counting from 0.
    pub track: usize,
}

impl Default for RetimeOptions {
    fn default() -> Self {
        Self {
            timescale: 1000,
            scale: 1.0,
            track: 0,
        }
    }
}

/// Parse a frame duration table.
///
/// One column is seconds per frame. Two columns are a repeat count and
/// seconds per frame. Blank lines and lines starting with `#` are skipped;
/// columns may be separated by whitespace or commas. Adjacent rows with the
/// same tick duration are merged.
pub fn parse_duration_table(text: &str, opts: &RetimeOptions) -> Result<Vec<SttsEntry>> {
    let ticks_per_second = f64::from(opts.timescale) * opts.scale;
    let mut columns = None;
    let mut out: Vec<SttsEntry> = Vec::new();

    for (n, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields = line
            .split(|c: char| c.is_whitespace() || c == ',')
            .filter(|f| !f.is_empty())
            .map(|f| {
                f.parse::<f64>()
                    .map_err(|_| Error::Format(format!("line {}: '{}' is not a number", n + 1, f)))
            })
            .collect::<Result<Vec<_>>>()?;
        if *columns.get_or_insert(fields.len()) != fields.len() {
            return Err(Error::Format(format!(
                "line {} has {} columns, earlier lines have {}",
                n + 1,
                fields.len(),
                columns.unwrap_or_default()
            )));
        }
        let (count, seconds) = match fields[..] {
            [seconds] => (1.0, seconds),
            [count, seconds] => (count, seconds),
            _ => {
                return Err(Error::Format(format!(
                    "line {} has {} columns, expected 1 or 2",
                    n + 1,
                    fields.len()
                )));
            }
        };
        if count.fract() != 0.0 || !(1.0..=f64::from(u32::MAX)).contains(&count) {
            return Err(Error::Format(format!("line {}: bad repeat count {}", n + 1, count)));
        }
        let ticks = (seconds * ticks_per_second).round();
        if !ticks.is_finite() || !(0.0..=f64::from(u32::MAX)).contains(&ticks) {
            return Err(Error::Format(format!(
                "line {}: {} s is not representable at {} ticks/s",
                n + 1,
                seconds,
                ticks_per_second
            )));
        }
        push_run(&mut out, count as u32, ticks as u32);
    }

    if out.is_empty() {
        return Err(Error::Format("duration table is empty".into()));
    }
    Ok(out)
}

fn push_run(out: &mut Vec<SttsEntry>, count: u32, delta: u32) {
    if let Some(last) = out.last_mut()
        && last.sample_delta == delta
        && let Some(merged) = last.sample_count.checked_add(count)
    {
        last.sample_count = merged;
        return;
    }
    out.push(SttsEntry {
        sample_count: count,
        sample_delta: delta,
    });
}

#[derive(Debug, Clone, Serialize)]
pub struct RetimeReport {
    pub moov_offset: u64,
    pub old_moov_size: u64,
    pub new_moov_size: u64,
    pub frames: u64,
    /// New track duration in `timescale` ticks.
    pub duration: u64,
    pub timescale: u32,
    pub shifted_offsets: usize,
    pub bytes_written: u64,
}

impl RetimeReport {
    pub fn seconds(&self) -> f64 {
        self.duration as f64 / f64::from(self.timescale)
    }
}

/// Write a copy of `source` to `out` with the selected track's sample
/// durations replaced by `table`.
pub fn retime<W: Write>(
    source: &Source,
    out: &mut W,
    table: &[SttsEntry],
    opts: &RetimeOptions,
) -> Result<RetimeReport> {
    if opts.timescale == 0 {
        return Err(Error::Format("timescale must be positive".into()));
    }
    let stts = TimeToSample::new(table.to_vec());
    if stts.entries.is_empty() {
        return Err(Error::Format("duration table is empty".into()));
    }
    let file_len = source.stream_len()?;

    let mut found = None;
    for item in top_level(source)? {
        let item = item?;
        if item.atom.typ() == *b"moov" {
            found = Some(item);
            break;
        }
    }
    let TopLevelAtom { start, end, atom } = found.ok_or(Error::NotFound(FourCC(*b"moov")))?;
    log::info!("moov at {}..{}, detaching", start, end);
    let mut moov = atom.deep_clone()?;
    drop(atom);

    let duration = stts.total_duration();
    patch_movie(&mut moov, &stts, opts)?;

    let old_size = end - start;
    let new_size = moov.total_size();
    let delta = new_size as i64 - old_size as i64;
    let shifted = if delta != 0 {
        shift_chunk_offsets(&mut moov, end, delta)?
    } else {
        0
    };
    log::debug!(
        "moov {} -> {} bytes, {} chunk offsets shifted",
        old_size,
        new_size,
        shifted
    );

    let mut written = source.copy_range(0, start, out)?;
    written += moov.save(out)?;
    written += source.copy_range(end, file_len - end, out)?;
    out.flush()?;

    Ok(RetimeReport {
        moov_offset: start,
        old_moov_size: old_size,
        new_moov_size: moov.total_size(),
        frames: stts.sample_count(),
        duration,
        timescale: opts.timescale,
        shifted_offsets: shifted,
        bytes_written: written,
    })
}

fn patch_movie(moov: &mut Atom, stts: &TimeToSample, opts: &RetimeOptions) -> Result<()> {
    let mvhd = moov.find(b"mvhd").ok_or(Error::NotFound(FourCC(*b"mvhd")))?;
    let movie = MediaTiming::decode(mvhd)?;
    if movie.timescale == 0 {
        return Err(Error::Format("mvhd timescale is zero".into()));
    }
    let duration = stts.total_duration();
    let movie_duration = rescale(duration, opts.timescale, movie.timescale)?;

    let track_index = moov
        .iter()
        .enumerate()
        .filter(|(_, a)| a.typ() == *b"trak")
        .map(|(i, _)| i)
        .nth(opts.track)
        .ok_or(Error::NotFound(FourCC(*b"trak")))?;

    let mut longest = movie_duration;
    for (i, trak) in moov.iter().enumerate() {
        if i != track_index
            && trak.typ() == *b"trak"
            && let Some(tkhd) = trak.find(b"tkhd")
        {
            longest = longest.max(track_duration(tkhd)?);
        }
    }

    let trak = moov.get_mut(track_index)?;
    let table = trak
        .find_path_mut(&[b"mdia", b"minf", b"stbl", b"stts"])
        .ok_or(Error::NotFound(FourCC(*b"stts")))?;
    // stsz and stsc still describe the old samples
    let old = TimeToSample::decode(table)?;
    if old.sample_count() != stts.sample_count() {
        return Err(Error::Format(format!(
            "track {} has {} samples but the duration table lists {}",
            opts.track,
            old.sample_count(),
            stts.sample_count()
        )));
    }
    TimeToSample {
        version: old.version,
        flags: old.flags,
        entries: stts.entries.clone(),
    }
    .write_into(table)?;

    if trak.find_path(&[b"edts", b"elst"]).is_some() {
        log::warn!("track {} has an edit list, left unchanged", opts.track);
    }
    if let Some(tkhd) = trak.find_mut(b"tkhd") {
        patch_track_duration(tkhd, movie_duration)?;
    }
    let mdhd = trak
        .find_path_mut(&[b"mdia", b"mdhd"])
        .ok_or(Error::NotFound(FourCC(*b"mdhd")))?;
    MediaTiming::patch(mdhd, opts.timescale, duration)?;

    let mvhd = moov
        .find_mut(b"mvhd")
        .ok_or(Error::NotFound(FourCC(*b"mvhd")))?;
    MediaTiming::patch(mvhd, movie.timescale, longest)?;
    log::info!(
        "track {}: {} frames, {} ticks at {}/s",
        opts.track,
        stts.sample_count(),
        duration,
        opts.timescale
    );
    Ok(())
}

/// Convert `value` ticks at `from` per second into ticks at `to` per second.
fn rescale(value: u64, from: u32, to: u32) -> Result<u64> {
    let scaled = (u128::from(value) * u128::from(to) + u128::from(from) / 2) / u128::from(from);
    u64::try_from(scaled).map_err(|_| Error::Bounds(format!("duration {} overflows", scaled)))
}

/// Shift every `stco`/`co64` entry at or past `from` by `delta`.
fn shift_chunk_offsets(atom: &mut Atom, from: u64, delta: i64) -> Result<usize> {
    if atom.typ() == *b"stco" || atom.typ() == *b"co64" {
        let mut table = ChunkOffsets::decode(atom)?;
        let moved = table.shift(from, delta)?;
        if moved > 0 {
            table.write_into(atom)?;
        }
        return Ok(moved);
    }
    let mut moved = 0;
    for kid in atom.children_mut() {
        moved += shift_chunk_offsets(kid, from, delta)?;
    }
    Ok(moved)
}
