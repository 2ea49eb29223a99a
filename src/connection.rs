// ABOUTME: Buffered frame I/O over any async byte stream
// ABOUTME: Accumulates arbitrary chunks, drops bad-CRC frames, surfaces clean EOF as None

use crate::codec::{CodecError, DataResponse, encode_frame};
use crate::datatypes::Command;
use bytes::{Buf, BytesMut};
use std::io::{self, Cursor};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufWriter};
use tracing::warn;

/// Frame-level connection to the debug agent.
///
/// Generic over the byte stream so tests can drive it with in-memory pipes;
/// production code wraps a `TcpStream`. The transport may deliver arbitrary
/// byte chunks: reads accumulate into an internal buffer until a whole frame
/// (per its length header) has arrived, then the CRC gates parsing. Frames
/// failing the CRC are dropped without surfacing an error; the request that
/// awaited them retires via its timeout.
#[derive(Debug)]
pub struct Connection<S> {
    stream: BufWriter<S>,

    // Assembly buffer for partially received frames.
    buffer: BytesMut,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a new `Connection` backed by `stream`.
    pub fn new(stream: S) -> Connection<S> {
        Connection {
            stream: BufWriter::new(stream),
            // Responses are small; stack traces and array reads dominate and
            // still fit comfortably in 4KB before the buffer grows.
            buffer: BytesMut::with_capacity(4 * 1024),
        }
    }

    /// Read a single response frame from the underlying stream.
    ///
    /// Waits until enough data has arrived to parse a frame. Data left in
    /// the buffer after the frame stays for the next call. Returns `None`
    /// when the stream closed cleanly between frames; closing mid-frame is
    /// an error.
    pub async fn read_frame(&mut self) -> Result<Option<DataResponse>, CodecError> {
        loop {
            if let Some(response) = self.parse_frame()? {
                return Ok(Some(response));
            }

            if 0 == self.stream.read_buf(&mut self.buffer).await? {
                return if self.buffer.is_empty() {
                    Ok(None)
                } else {
                    Err(CodecError::Io(io::Error::new(
                        io::ErrorKind::ConnectionReset,
                        "connection reset mid-frame",
                    )))
                };
            }
        }
    }

    /// Try to parse a frame out of the assembly buffer. `Ok(None)` means
    /// more bytes are needed. Frames with a bad CRC are consumed and
    /// skipped; a nonsensical length header poisons the stream and errors.
    fn parse_frame(&mut self) -> Result<Option<DataResponse>, CodecError> {
        loop {
            let mut buf = Cursor::new(&self.buffer[..]);

            let len = match DataResponse::check(&buf) {
                Ok(len) => len,
                Err(CodecError::Incomplete) => return Ok(None),
                Err(e) => return Err(e),
            };

            match DataResponse::parse(&mut buf) {
                Ok(response) => {
                    self.buffer.advance(len);
                    return Ok(Some(response));
                }
                Err(CodecError::ChecksumMismatch { expected, actual }) => {
                    warn!(expected, actual, len, "dropping frame with bad checksum");
                    self.buffer.advance(len);
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Encode and write one request frame, flushing the buffered writer so
    /// the packet actually reaches the wire.
    pub async fn write_frame(&mut self, cmd: Command, payload: &[u8]) -> io::Result<()> {
        let frame = encode_frame(cmd, payload);
        self.stream.write_all(&frame).await?;
        self.stream.flush().await
    }

    /// Shut down the write half, signalling the agent we are done.
    pub async fn shutdown(&mut self) -> io::Result<()> {
        self.stream.shutdown().await
    }
}

impl Connection<tokio::net::TcpStream> {
    /// Connect to a debug agent listening on `addr`.
    pub async fn connect<T: tokio::net::ToSocketAddrs>(
        addr: T,
    ) -> io::Result<Connection<tokio::net::TcpStream>> {
        let socket = tokio::net::TcpStream::connect(addr).await?;
        Ok(Connection::new(socket))
    }
}
