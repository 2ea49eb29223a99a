// ABOUTME: Frame codec for the debug agent's packet layout
// ABOUTME: Encodes cmd|len24|payload|crc16 packets and parses responses from a byte stream

use crate::datatypes::wire_string::additive_crc;
use crate::datatypes::{Command, RESPONSE_BIT, ResponseCode};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// `cmd:u8 | len:u24 LE` — `len` counts the whole packet.
pub const HEADER_SIZE: usize = 4;
/// `crc:u16 LE`, the additive sum of every preceding byte.
pub const TRAILER_SIZE: usize = 2;
/// A response always carries at least the response-code byte.
pub const MIN_RESPONSE_SIZE: usize = HEADER_SIZE + 1 + TRAILER_SIZE;
/// Frames above this claim a corrupt stream rather than a real payload.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Codec errors. `Incomplete` is the routine not-enough-bytes case hit on
/// every partial read; the rest indicate malformed data.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("incomplete frame: need more data")]
    Incomplete,

    #[error("checksum mismatch: expected {expected:#06x}, got {actual:#06x}")]
    ChecksumMismatch { expected: u16, actual: u16 },

    #[error("frame length {0} outside {MIN_RESPONSE_SIZE}..={MAX_FRAME_SIZE}")]
    InvalidLength(usize),

    #[error("string field '{field}' is not valid UTF-8")]
    Utf8Error {
        field: &'static str,
        #[source]
        source: std::string::FromUtf8Error,
    },

    #[error("string field '{field}' missing NUL terminator")]
    MissingTerminator { field: &'static str },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Encode a request packet: `cmd:u8 | len:u24 LE | payload | crc:u16 LE`.
pub fn encode_frame(cmd: Command, payload: &[u8]) -> Bytes {
    let len = HEADER_SIZE + payload.len() + TRAILER_SIZE;
    let mut buf = BytesMut::with_capacity(len);
    buf.put_u8(cmd as u8);
    put_u24_le(&mut buf, len as u32);
    buf.put_slice(payload);
    let crc = additive_crc(&buf);
    buf.put_u16_le(crc);
    buf.freeze()
}

fn put_u24_le(buf: &mut BytesMut, value: u32) {
    buf.put_u8(value as u8);
    buf.put_u8((value >> 8) as u8);
    buf.put_u8((value >> 16) as u8);
}

fn peek_u24_le(bytes: &[u8]) -> usize {
    usize::from(bytes[0]) | usize::from(bytes[1]) << 8 | usize::from(bytes[2]) << 16
}

/// A decoded response packet.
///
/// `cmd` is the echoed opcode with the response bit already masked off;
/// `data` is the payload after the response-code byte and before the CRC.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataResponse {
    pub cmd: u8,
    pub response_code: u8,
    pub data: Bytes,
}

impl DataResponse {
    pub fn is_ok(&self) -> bool {
        self.response_code == ResponseCode::Ok as u8
    }

    /// Checks whether an entire frame can be decoded from `src`. Returns the
    /// frame length usable to advance the buffer once parsed.
    pub fn check(src: &Cursor<&[u8]>) -> Result<usize, CodecError> {
        let remaining = src.remaining();
        if remaining < HEADER_SIZE {
            return Err(CodecError::Incomplete);
        }
        let bytes = &src.get_ref()[src.position() as usize..];
        let len = peek_u24_le(&bytes[1..4]);
        if !(MIN_RESPONSE_SIZE..=MAX_FRAME_SIZE).contains(&len) {
            return Err(CodecError::InvalidLength(len));
        }
        if remaining < len {
            return Err(CodecError::Incomplete);
        }
        Ok(len)
    }

    /// Parses one frame from `src`. The caller must have run [`check`] first
    /// so the full frame is known to be buffered.
    ///
    /// [`check`]: DataResponse::check
    pub fn parse(src: &mut Cursor<&[u8]>) -> Result<DataResponse, CodecError> {
        let len = Self::check(src)?;
        let start = src.position() as usize;
        let frame = &src.get_ref()[start..start + len];

        let crc = u16::from_le_bytes([frame[len - 2], frame[len - 1]]);
        let actual = additive_crc(&frame[..len - TRAILER_SIZE]);
        if actual != crc {
            src.advance(len);
            return Err(CodecError::ChecksumMismatch {
                expected: crc,
                actual,
            });
        }

        let cmd = frame[0] & !RESPONSE_BIT;
        let response_code = frame[HEADER_SIZE];
        let data = Bytes::copy_from_slice(&frame[HEADER_SIZE + 1..len - TRAILER_SIZE]);
        src.advance(len);
        Ok(DataResponse {
            cmd,
            response_code,
            data,
        })
    }
}
