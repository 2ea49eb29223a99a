// ABOUTME: Wire string framing for the debug protocol's two string layouts
// ABOUTME: Request strings carry an additive CRC, response names carry a pad word

use crate::codec::CodecError;
use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;

/// Additive 16-bit checksum over a byte slice (sum of bytes mod 2^16).
pub fn additive_crc(bytes: &[u8]) -> u16 {
    bytes.iter().fold(0u16, |sum, &b| sum.wrapping_add(u16::from(b)))
}

/// Encoded size of a request wire string: `len:u16 | crc:u16 | bytes | 0x00`.
pub fn wire_string_len(s: &str) -> usize {
    4 + s.len() + 1
}

/// Append a request wire string: `len:u16 LE | crc:u16 LE | utf8 bytes | 0x00`.
///
/// `len` counts only the UTF-8 bytes; `crc` is the additive sum of them.
pub fn put_wire_string(buf: &mut BytesMut, s: &str) {
    let bytes = s.as_bytes();
    buf.put_u16_le(bytes.len() as u16);
    buf.put_u16_le(additive_crc(bytes));
    buf.put_slice(bytes);
    buf.put_u8(0);
}

/// Parse a request wire string, validating the additive CRC and the NUL
/// terminator.
pub fn get_wire_string(
    buf: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<String, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    let len = buf.get_u16_le() as usize;
    let crc = buf.get_u16_le();
    if buf.remaining() < len + 1 {
        return Err(CodecError::Incomplete);
    }
    let bytes = buf.copy_to_bytes(len);
    if buf.get_u8() != 0 {
        return Err(CodecError::MissingTerminator { field });
    }
    let actual = additive_crc(&bytes);
    if actual != crc {
        return Err(CodecError::ChecksumMismatch {
            expected: crc,
            actual,
        });
    }
    String::from_utf8(bytes.to_vec()).map_err(|source| CodecError::Utf8Error { field, source })
}

/// Parse a response name string: `len:u16 LE | pad:u16 | bytes | 0x00`.
pub fn get_name_string(
    buf: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<String, CodecError> {
    let s = get_bare_name_string(buf, field)?;
    if !buf.has_remaining() || buf.get_u8() != 0 {
        return Err(CodecError::MissingTerminator { field });
    }
    Ok(s)
}

/// Parse a response name string without a trailing NUL:
/// `len:u16 LE | pad:u16 | bytes`. Used for the descriptor at the tail of a
/// stack-trace response and for type-name tails.
pub fn get_bare_name_string(
    buf: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<String, CodecError> {
    if buf.remaining() < 4 {
        return Err(CodecError::Incomplete);
    }
    let len = buf.get_u16_le() as usize;
    buf.advance(2);
    if buf.remaining() < len {
        return Err(CodecError::Incomplete);
    }
    let bytes = buf.copy_to_bytes(len);
    String::from_utf8(bytes.to_vec()).map_err(|source| CodecError::Utf8Error { field, source })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(bytes: &[u8]) -> Result<String, CodecError> {
        let mut cur = Cursor::new(bytes);
        get_wire_string(&mut cur, "test")
    }

    #[test]
    fn wire_string_round_trip() {
        for s in ["", "main", "([Ljava/lang/String;)V", "päällä"] {
            let mut buf = BytesMut::new();
            put_wire_string(&mut buf, s);
            assert_eq!(buf.len(), wire_string_len(s));
            assert_eq!(parse(&buf).unwrap(), s);
        }
    }

    #[test]
    fn wire_string_crc_is_additive() {
        let mut buf = BytesMut::new();
        put_wire_string(&mut buf, "AB");
        // 'A' + 'B' = 0x41 + 0x42
        assert_eq!(&buf[2..4], &0x83u16.to_le_bytes());
    }

    #[test]
    fn wire_string_rejects_bad_crc() {
        let mut buf = BytesMut::new();
        put_wire_string(&mut buf, "main");
        buf[2] ^= 0x01;
        assert!(matches!(
            parse(&buf),
            Err(CodecError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn wire_string_rejects_missing_nul() {
        let mut buf = BytesMut::new();
        put_wire_string(&mut buf, "x");
        let last = buf.len() - 1;
        buf[last] = b'!';
        assert!(matches!(
            parse(&buf),
            Err(CodecError::MissingTerminator { .. })
        ));
    }

    #[test]
    fn name_string_layouts() {
        let bytes = [
            0x03, 0x00, 0x00, 0x00, b'F', b'o', b'o', 0x00, // with NUL
            0x02, 0x00, 0x00, 0x00, b'(', b')', // bare tail
        ];
        let mut cur = Cursor::new(&bytes[..]);
        assert_eq!(get_name_string(&mut cur, "class").unwrap(), "Foo");
        assert_eq!(get_bare_name_string(&mut cur, "descriptor").unwrap(), "()");
        assert!(!cur.has_remaining());
    }

    #[test]
    fn truncated_name_string_is_incomplete() {
        let bytes = [0x05, 0x00, 0x00, 0x00, b'F'];
        let mut cur = Cursor::new(&bytes[..]);
        assert!(matches!(
            get_bare_name_string(&mut cur, "class"),
            Err(CodecError::Incomplete)
        ));
    }
}
