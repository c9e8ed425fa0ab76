use mp4atom::{Atom, Error, Source};
use std::io::{self, Cursor, Read, Seek, SeekFrom};

fn boxed(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

fn sample_file() -> Vec<u8> {
    let mut stsd = vec![0, 0, 0, 0, 0, 0, 0, 1];
    stsd.extend(boxed(b"mp4v", b"entry"));
    let stbl = boxed(b"stbl", &[boxed(b"stsd", &stsd), boxed(b"stts", b"table")].concat());
    let trak = boxed(b"trak", &boxed(b"mdia", &boxed(b"minf", &stbl)));
    [
        boxed(b"ftyp", b"isom"),
        boxed(b"moov", &[boxed(b"mvhd", b"movie header"), trak].concat()),
        boxed(b"mdat", b"frames"),
    ]
    .concat()
}

#[test]
fn clone_is_equal_and_detached() {
    let src = Source::new(Cursor::new(sample_file()));
    let moov = Atom::parse(&src, 12).unwrap();
    let copy = moov.deep_clone().unwrap();

    assert_eq!(copy, moov);
    assert!(copy.source_offset().is_none());

    src.close().unwrap();
    let mut out = Vec::new();
    copy.save(&mut out).unwrap();
    assert_eq!(out, &sample_file()[12..12 + out.len()]);
    assert_eq!(out.len() as u64, moov.total_size());
}

#[test]
fn clone_restores_the_source_position() {
    let src = Source::new(Cursor::new(sample_file()));
    let moov = Atom::parse(&src, 12).unwrap();
    src.set_position(3).unwrap();
    moov.deep_clone().unwrap();
    assert_eq!(src.position().unwrap(), 3);
}

#[test]
fn edits_to_the_clone_leave_the_original_alone() {
    let src = Source::new(Cursor::new(sample_file()));
    let moov = Atom::parse(&src, 12).unwrap();
    let mut copy = moov.deep_clone().unwrap();

    let stts = copy
        .find_path_mut(&[b"trak", b"mdia", b"minf", b"stbl", b"stts"])
        .unwrap();
    stts.seek(SeekFrom::Start(0)).unwrap();
    stts.write_bytes(b"TABLE").unwrap();

    assert_ne!(copy, moov);
    let mut orig = moov
        .find_path(&[b"trak", b"mdia", b"minf", b"stbl", b"stts"])
        .unwrap()
        .clone();
    assert_eq!(orig.read_all().unwrap(), b"table");
}

#[test]
fn clone_preserves_hybrid_preamble() {
    let src = Source::new(Cursor::new(sample_file()));
    let moov = Atom::parse(&src, 12).unwrap();
    let copy = moov.deep_clone().unwrap();
    let mut stsd = copy
        .find_path(&[b"trak", b"mdia", b"minf", b"stbl", b"stsd"])
        .unwrap()
        .clone();
    assert!(stsd.is_special_container());
    assert_eq!(stsd.read_all().unwrap(), [0, 0, 0, 0, 0, 0, 0, 1]);
    assert_eq!(stsd.get(0).unwrap().typ(), *b"mp4v");
}

/// Claims to be longer than it is, like a file truncated after it was opened.
struct ShortStream {
    inner: Cursor<Vec<u8>>,
    claimed: u64,
}

impl Read for ShortStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Seek for ShortStream {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match pos {
            SeekFrom::End(d) => {
                let target = (self.claimed as i64 + d) as u64;
                self.inner.seek(SeekFrom::Start(target))
            }
            other => self.inner.seek(other),
        }
    }
}

#[test]
fn missing_bytes_fail_the_integrity_check() {
    let mut bytes = boxed(b"mdat", b"0123456789");
    bytes[3] = 100;
    let src = Source::new(ShortStream {
        inner: Cursor::new(bytes),
        claimed: 100,
    });

    let mdat = Atom::parse(&src, 0).unwrap();
    assert_eq!(mdat.content_len(), 92);
    assert!(matches!(mdat.deep_clone(), Err(Error::Format(_))));
}

#[test]
fn truncated_window_clones_only_what_is_left() {
    let src = Source::new(Cursor::new(boxed(b"mdat", b"0123456789")));
    let mut mdat = Atom::parse(&src, 0).unwrap();
    mdat.truncate(Some(4)).unwrap();
    let mut copy = mdat.deep_clone().unwrap();
    assert!(copy.is_materialized());
    assert_eq!(copy.read_all().unwrap(), b"0123");
}

#[test]
fn clone_after_close_fails() {
    let src = Source::new(Cursor::new(sample_file()));
    let moov = Atom::parse(&src, 12).unwrap();
    src.close().unwrap();
    assert!(matches!(moov.deep_clone(), Err(Error::SourceClosed)));
}
