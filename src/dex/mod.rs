#[macro_use]
pub mod error;

pub mod debug_locals;
pub mod instructions;
pub mod local_list;
pub mod opcode_format;
pub mod opcodes;

/// Marker for an absent string/type index in `uleb128p1` fields.
pub const NO_INDEX: u32 = 0xffff_ffff;

pub(crate) fn write_u1(buffer: &mut Vec<u8>, val: u8) -> usize {
    buffer.push(val);
    1
}

/// Appends `val` as unsigned LEB128, returning the number of bytes written.
pub(crate) fn write_uleb128(buffer: &mut Vec<u8>, val: u32) -> usize {
    let mut remaining = val;
    let mut c = 0;
    loop {
        let low = (remaining & 0x7f) as u8;
        remaining >>= 7;
        c += 1;
        if remaining == 0 {
            buffer.push(low);
            return c;
        }
        buffer.push(low | 0x80);
    }
}

/// `uleb128p1` stores `val + 1`, so [`NO_INDEX`] encodes as a single zero byte.
pub(crate) fn write_uleb128p1(buffer: &mut Vec<u8>, val: u32) -> usize {
    write_uleb128(buffer, val.wrapping_add(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uleb128_encodings() {
        let cases: Vec<(u32, Vec<u8>)> = vec![
            (0, vec![0x00]),
            (1, vec![0x01]),
            (127, vec![0x7F]),
            (128, vec![0x80, 0x01]),
            (16256, vec![0x80, 0x7F]),
            (624485, vec![0xE5, 0x8E, 0x26]),
            (u32::MAX, vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]),
        ];

        for (value, expected) in cases {
            let mut buf = Vec::new();
            let n = write_uleb128(&mut buf, value);
            assert_eq!(buf, expected, "value {value}");
            assert_eq!(n, expected.len());
        }
    }

    #[test]
    fn uleb128p1_no_index_is_zero() {
        let mut buf = Vec::new();
        write_uleb128p1(&mut buf, NO_INDEX);
        assert_eq!(buf, vec![0x00]);

        buf.clear();
        write_uleb128p1(&mut buf, 127);
        assert_eq!(buf, vec![0x80, 0x01]);
    }
}
