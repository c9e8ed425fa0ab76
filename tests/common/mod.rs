#![allow(dead_code)]

// Hand-assembled movie files for the timing and retime tests.

pub fn boxed(typ: &[u8; 4], payload: &[u8]) -> Vec<u8> {
    let mut v = Vec::new();
    v.extend_from_slice(&(8 + payload.len() as u32).to_be_bytes());
    v.extend_from_slice(typ);
    v.extend_from_slice(payload);
    v
}

pub fn full(typ: &[u8; 4], version: u8, body: &[u8]) -> Vec<u8> {
    let mut payload = vec![version, 0, 0, 0];
    payload.extend_from_slice(body);
    boxed(typ, &payload)
}

/// Version 0 `mvhd` (100 content bytes).
pub fn mvhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&11u32.to_be_bytes()); // creation
    body.extend_from_slice(&22u32.to_be_bytes()); // modification
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&duration.to_be_bytes());
    body.extend_from_slice(&0x0001_0000u32.to_be_bytes()); // rate 1.0
    body.resize(96, 0);
    full(b"mvhd", 0, &body)
}

/// Version 0 `tkhd` (84 content bytes).
pub fn tkhd(track_id: u32, duration: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&track_id.to_be_bytes());
    body.extend_from_slice(&0u32.to_be_bytes());
    body.extend_from_slice(&duration.to_be_bytes());
    body.resize(80, 0);
    full(b"tkhd", 0, &body)
}

/// Version 0 `mdhd` with language "und".
pub fn mdhd(timescale: u32, duration: u32) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&33u32.to_be_bytes());
    body.extend_from_slice(&44u32.to_be_bytes());
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&duration.to_be_bytes());
    body.extend_from_slice(&0x55c4u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    full(b"mdhd", 0, &body)
}

/// Version 1 `mdhd`.
pub fn mdhd_v1(timescale: u32, duration: u64) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(&33u64.to_be_bytes());
    body.extend_from_slice(&44u64.to_be_bytes());
    body.extend_from_slice(&timescale.to_be_bytes());
    body.extend_from_slice(&duration.to_be_bytes());
    body.extend_from_slice(&0x55c4u16.to_be_bytes());
    body.extend_from_slice(&0u16.to_be_bytes());
    full(b"mdhd", 1, &body)
}

pub fn hdlr(handler: &[u8; 4]) -> Vec<u8> {
    let mut body = vec![0u8; 4];
    body.extend_from_slice(handler);
    body.extend_from_slice(&[0u8; 12]);
    body.extend_from_slice(b"Handler\0");
    full(b"hdlr", 0, &body)
}

pub fn elst(entries: &[(u32, i32)]) -> Vec<u8> {
    let mut body = (entries.len() as u32).to_be_bytes().to_vec();
    for &(duration, media_time) in entries {
        body.extend_from_slice(&duration.to_be_bytes());
        body.extend_from_slice(&media_time.to_be_bytes());
        body.extend_from_slice(&1i16.to_be_bytes());
        body.extend_from_slice(&0i16.to_be_bytes());
    }
    full(b"elst", 0, &body)
}

pub fn stts(entries: &[(u32, u32)]) -> Vec<u8> {
    let mut body = (entries.len() as u32).to_be_bytes().to_vec();
    for &(count, delta) in entries {
        body.extend_from_slice(&count.to_be_bytes());
        body.extend_from_slice(&delta.to_be_bytes());
    }
    full(b"stts", 0, &body)
}

pub fn stco(offsets: &[u32]) -> Vec<u8> {
    let mut body = (offsets.len() as u32).to_be_bytes().to_vec();
    for off in offsets {
        body.extend_from_slice(&off.to_be_bytes());
    }
    full(b"stco", 0, &body)
}

pub fn co64(offsets: &[u64]) -> Vec<u8> {
    let mut body = (offsets.len() as u32).to_be_bytes().to_vec();
    for off in offsets {
        body.extend_from_slice(&off.to_be_bytes());
    }
    full(b"co64", 0, &body)
}

pub fn stsd() -> Vec<u8> {
    let mut payload = vec![0, 0, 0, 0, 0, 0, 0, 1];
    payload.extend(boxed(b"mp4v", &[0u8; 16]));
    boxed(b"stsd", &payload)
}

pub fn trak(track_id: u32, handler: &[u8; 4], samples: &[(u32, u32)], chunks: &[u32]) -> Vec<u8> {
    let stbl = boxed(b"stbl", &[stsd(), stts(samples), stco(chunks)].concat());
    let minf = boxed(b"minf", &stbl);
    let mdia = boxed(b"mdia", &[mdhd(1000, 2000), hdlr(handler), minf].concat());
    let edts = boxed(b"edts", &elst(&[(1200, 0)]));
    boxed(b"trak", &[tkhd(track_id, 1200), edts, mdia].concat())
}

pub struct Movie {
    pub bytes: Vec<u8>,
    pub moov_start: u64,
    pub moov_end: u64,
    pub mdat_payload_start: u64,
}

pub const FRAMES: &[u8] = b"frame-01frame-02frame-03";

/// `ftyp`, `moov` with a 50-frame video track and a sound track, and an
/// `mdat` placed before or after `moov`. Chunk offsets point at `FRAMES`.
pub fn movie(mdat_after_moov: bool) -> Movie {
    let ftyp = boxed(b"ftyp", b"isom\0\0\0\x01isom");
    let build_moov = |chunks: &[u32]| {
        boxed(
            b"moov",
            &[
                mvhd(600, 1200),
                trak(1, b"vide", &[(50, 40)], chunks),
                trak(2, b"soun", &[(94, 1024)], &chunks[..1]),
            ]
            .concat(),
        )
    };
    let moov_len = build_moov(&[0, 0]).len() as u32;
    let ftyp_len = ftyp.len() as u32;
    let mdat = boxed(b"mdat", FRAMES);

    let (mdat_payload_start, moov_start) = if mdat_after_moov {
        (ftyp_len + moov_len + 8, ftyp_len)
    } else {
        (ftyp_len + 8, ftyp_len + mdat.len() as u32)
    };
    let moov = build_moov(&[mdat_payload_start, mdat_payload_start + 8]);
    let bytes = if mdat_after_moov {
        [ftyp, moov, mdat].concat()
    } else {
        [ftyp, mdat, moov].concat()
    };
    Movie {
        bytes,
        moov_start: moov_start as u64,
        moov_end: (moov_start + moov_len) as u64,
        mdat_payload_start: mdat_payload_start as u64,
    }
}

pub fn be32(bytes: &[u8], at: usize) -> u32 {
    u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}
