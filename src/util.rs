/// Copy granularity for every path that streams payload bytes.
pub const CHUNK_SIZE: usize = 16 * 1024;

pub fn hex_dump(bytes: &[u8], start_offset: u64) -> String {
    let mut out = String::new();
    for (i, chunk) in bytes.chunks(16).enumerate() {
        let offs = start_offset + (i as u64) * 16;
        let hexs: String = chunk.iter().map(|b| format!("{:02x} ", b)).collect();
        let ascii: String = chunk
            .iter()
            .map(|&c| if (32..=126).contains(&c) { c as char } else { '.' })
            .collect();
        out.push_str(&format!("{:08x}  {:<48}  |{}|\n", offs, hexs, ascii));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::hex_dump;

    #[test]
    fn dumps_address_hex_and_ascii() {
        let dump = hex_dump(b"free", 0x20);
        assert_eq!(dump.lines().count(), 1);
        assert!(dump.starts_with("00000020  66 72 65 65"));
        assert!(dump.trim_end().ends_with("|free|"));
    }

    #[test]
    fn splits_rows_at_sixteen_bytes() {
        let data = [0u8; 17];
        let dump = hex_dump(&data, 0);
        let rows: Vec<_> = dump.lines().collect();
        assert_eq!(rows.len(), 2);
        assert!(rows[1].starts_with("00000010  00 "));
    }
}
