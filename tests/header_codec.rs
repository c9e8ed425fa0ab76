use mp4atom::{Error, FourCC, decode_header, encode_header};
use std::io::Cursor;

#[test]
fn encodes_empty_free() {
    let hdr = encode_header(b"free", 0).unwrap();
    assert_eq!(&hdr, b"\x00\x00\x00\x08free");
}

#[test]
fn decode_inverts_encode() {
    for n in [0u64, 1, 7, 4096, u32::MAX as u64 - 8] {
        let hdr = encode_header(b"mdat", n).unwrap();
        let mut cur = Cursor::new(hdr.to_vec());
        let h = decode_header(&mut cur).unwrap();
        assert_eq!(h.size, n + 8);
        assert_eq!(h.typ, FourCC(*b"mdat"));
        assert_eq!(h.header_size, 8);
        assert_eq!(h.start, 0);
    }
}

#[test]
fn encode_rejects_oversized_content_and_bad_tags() {
    assert!(matches!(
        encode_header(b"mdat", u32::MAX as u64 - 7),
        Err(Error::Format(_))
    ));
    assert!(matches!(encode_header(b"abc", 0), Err(Error::Format(_))));
    assert!(matches!(encode_header(b"abcde", 0), Err(Error::Format(_))));
}

#[test]
fn short_header_is_a_format_error() {
    let mut cur = Cursor::new(b"\x00\x00\x00\x08fr".to_vec());
    assert!(matches!(decode_header(&mut cur), Err(Error::Format(_))));
}

#[test]
fn size_below_header_is_rejected() {
    let mut cur = Cursor::new(b"\x00\x00\x00\x04free".to_vec());
    assert!(matches!(decode_header(&mut cur), Err(Error::Format(_))));
}

#[test]
fn large_size_form_is_decoded() {
    let mut v = Vec::new();
    v.extend_from_slice(&1u32.to_be_bytes());
    v.extend_from_slice(b"mdat");
    v.extend_from_slice(&(16u64 + 3).to_be_bytes());
    v.extend_from_slice(b"abc");

    let mut cur = Cursor::new(v);
    let h = decode_header(&mut cur).unwrap();
    assert_eq!(h.size, 19);
    assert_eq!(h.header_size, 16);
    assert_eq!(cur.position(), 16);
}

#[test]
fn zero_size_is_passed_through() {
    let mut cur = Cursor::new(b"\x00\x00\x00\x00mdat".to_vec());
    let h = decode_header(&mut cur).unwrap();
    assert_eq!(h.size, 0);
}

#[test]
fn fourcc_parsing() {
    let cc: FourCC = "stts".parse().unwrap();
    assert_eq!(cc, *b"stts");
    assert_eq!(cc.to_string(), "stts");
    assert!("st".parse::<FourCC>().is_err());
    assert!(FourCC::try_from(&b"moov"[..]).is_ok());
}
