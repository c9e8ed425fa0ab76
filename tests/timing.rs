mod common;

use common::*;
use mp4atom::durations::{collect_timing, read_timing, write_durations};
use mp4atom::timing::{
    ChunkOffsets, EditList, MediaTiming, SttsEntry, TimeToSample, patch_track_duration,
    track_duration,
};
use mp4atom::{Atom, Error, Source, parse_file};
use std::io::{Cursor, SeekFrom};

fn parse(bytes: Vec<u8>) -> (Source, Atom) {
    let src = Source::new(Cursor::new(bytes));
    let atom = Atom::parse(&src, 0).unwrap();
    (src, atom)
}

#[test]
fn media_timing_from_the_source() {
    let (_src, atom) = parse(mvhd(600, 1200));
    let t = MediaTiming::decode(&atom).unwrap();
    assert_eq!(t.version, 0);
    assert_eq!(t.creation_time, 11);
    assert_eq!(t.modification_time, 22);
    assert_eq!(t.timescale, 600);
    assert_eq!(t.duration, 1200);
    assert_eq!(t.seconds(), Some(2.0));
}

#[test]
fn patch_leaves_the_language_alone() {
    let (_src, mut atom) = parse(mdhd(1000, 2000));
    MediaTiming::patch(&mut atom, 90000, 180000).unwrap();
    assert!(atom.is_materialized());

    let t = MediaTiming::decode(&atom).unwrap();
    assert_eq!((t.timescale, t.duration), (90000, 180000));
    assert_eq!(t.creation_time, 33);

    atom.seek(SeekFrom::Start(20)).unwrap();
    assert_eq!(atom.read_bytes(2).unwrap(), 0x55c4u16.to_be_bytes());
    assert_eq!(atom.content_len(), 24);
}

#[test]
fn patch_version_1() {
    let (_src, mut atom) = parse(mdhd_v1(1000, 5));
    MediaTiming::patch(&mut atom, 48000, u64::from(u32::MAX) + 1).unwrap();
    let t = MediaTiming::decode(&atom).unwrap();
    assert_eq!(t.version, 1);
    assert_eq!(t.timescale, 48000);
    assert_eq!(t.duration, u64::from(u32::MAX) + 1);
    assert_eq!(t.modification_time, 44);
}

#[test]
fn patch_rejects_what_does_not_fit() {
    let (_src, mut atom) = parse(mdhd(1000, 2000));
    assert!(matches!(
        MediaTiming::patch(&mut atom, 1000, u64::from(u32::MAX) + 1),
        Err(Error::Bounds(_))
    ));
    let mut short = Atom::new(b"mdhd");
    short.write_bytes(&[0u8; 10]).unwrap();
    assert!(matches!(
        MediaTiming::patch(&mut short, 1000, 1),
        Err(Error::Format(_))
    ));
}

#[test]
fn time_to_sample_table() {
    let (_src, atom) = parse(stts(&[(3, 40), (2, 80)]));
    let t = TimeToSample::decode(&atom).unwrap();
    assert_eq!(t.entries.len(), 2);
    assert_eq!(t.sample_count(), 5);
    assert_eq!(t.total_duration(), 280);
    assert_eq!(
        t.frame_durations(1000).unwrap(),
        vec![0.04, 0.04, 0.04, 0.08, 0.08]
    );
    assert!(matches!(t.frame_durations(0), Err(Error::Format(_))));
}

#[test]
fn rewriting_a_table_changes_the_saved_length() {
    let (_src, mut atom) = parse(stts(&[(5, 40)]));
    let table = TimeToSample::from_deltas(&[40, 40, 50, 50, 50, 40]);
    assert_eq!(
        table.entries,
        vec![
            SttsEntry { sample_count: 2, sample_delta: 40 },
            SttsEntry { sample_count: 3, sample_delta: 50 },
            SttsEntry { sample_count: 1, sample_delta: 40 },
        ]
    );
    table.write_into(&mut atom).unwrap();

    let mut out = Vec::new();
    atom.save(&mut out).unwrap();
    assert_eq!(out, stts(&[(2, 40), (3, 50), (1, 40)]));
    assert_eq!(TimeToSample::decode(&atom).unwrap(), table);
}

#[test]
fn edit_list() {
    let (_src, atom) = parse(elst(&[(1200, -1), (600, 512)]));
    let e = EditList::decode(&atom).unwrap();
    assert_eq!(e.entries.len(), 2);
    assert_eq!(e.entries[0].media_time, -1);
    assert_eq!(e.entries[1].segment_duration, 600);
    assert_eq!(e.entries[1].media_rate_integer, 1);
}

#[test]
fn chunk_offsets_shift_past_a_point() {
    let (_src, mut atom) = parse(stco(&[100, 200, 300]));
    let mut table = ChunkOffsets::decode(&atom).unwrap();
    assert!(!table.large);
    assert_eq!(table.shift(150, 16).unwrap(), 2);
    assert_eq!(table.offsets, [100, 216, 316]);
    table.write_into(&mut atom).unwrap();
    assert_eq!(ChunkOffsets::decode(&atom).unwrap().offsets, [100, 216, 316]);

    assert_eq!(table.shift(0, -100).unwrap(), 3);
    assert_eq!(table.offsets, [0, 116, 216]);
    assert!(matches!(table.shift(0, -1), Err(Error::Bounds(_))));
}

#[test]
fn stco_overflow_is_reported() {
    let (_src, atom) = parse(stco(&[u32::MAX - 4]));
    let mut table = ChunkOffsets::decode(&atom).unwrap();
    assert!(matches!(table.shift(0, 8), Err(Error::Bounds(_))));

    let (_src, atom) = parse(co64(&[u64::from(u32::MAX) - 4]));
    let mut table = ChunkOffsets::decode(&atom).unwrap();
    assert!(table.large);
    assert_eq!(table.shift(0, 8).unwrap(), 1);
    assert_eq!(table.offsets, [u64::from(u32::MAX) + 4]);
}

#[test]
fn track_header_duration() {
    let (_src, mut atom) = parse(tkhd(1, 1200));
    assert_eq!(track_duration(&atom).unwrap(), 1200);
    patch_track_duration(&mut atom, 7).unwrap();
    assert_eq!(track_duration(&atom).unwrap(), 7);
    assert_eq!(atom.content_len(), 84);
}

#[test]
fn movie_timing_per_track() {
    let movie = movie(true);
    let src = Source::new(Cursor::new(movie.bytes));
    let timing = read_timing(&src).unwrap();

    let mvhd = timing.movie.unwrap();
    assert_eq!((mvhd.timescale, mvhd.duration), (600, 1200));
    assert_eq!(timing.tracks.len(), 2);

    let video = timing.track(0).unwrap();
    assert_eq!(video.handler.as_deref(), Some("vide"));
    assert_eq!(video.edits.as_ref().unwrap().entries.len(), 1);
    let frames = video.frame_durations().unwrap();
    assert_eq!(frames.len(), 50);
    assert!(frames.iter().all(|&f| f == 0.04));
    assert_eq!(video.duration_seconds(), Some(2.0));

    assert_eq!(timing.track(1).unwrap().handler.as_deref(), Some("soun"));
    assert!(matches!(timing.track(2), Err(Error::Bounds(_))));
}

#[test]
fn collect_timing_reads_edited_tables() {
    let movie = movie(false);
    let src = Source::new(Cursor::new(movie.bytes));
    let mut atoms = parse_file(&src).unwrap();

    let moov = atoms.iter_mut().find(|a| a.typ() == *b"moov").unwrap();
    let stts = moov
        .find_path_mut(&[b"trak", b"mdia", b"minf", b"stbl", b"stts"])
        .unwrap();
    TimeToSample::from_deltas(&[10, 20]).write_into(stts).unwrap();

    let timing = collect_timing(&atoms).unwrap();
    let frames = timing.track(0).unwrap().frame_durations().unwrap();
    assert_eq!(frames, vec![0.01, 0.02]);
    assert!(matches!(collect_timing(&[]), Err(Error::NotFound(_))));
}

#[test]
fn durations_are_written_one_per_line() {
    let mut out = Vec::new();
    write_durations(&mut out, &[0.04, 0.5, 1.0]).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "0.04\n0.5\n1\n");
}
