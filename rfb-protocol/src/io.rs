//! Buffered I/O streams for the RFB handshake.
//!
//! This module provides buffered reading and writing for the RFB protocol,
//! with methods for reading/writing primitive types in network byte order, and
//! the [`HandshakeTransport`] trait the handshake phases drive.
//!
//! # Examples
//!
//! ```no_run
//! use rfb_protocol::io::{RfbInStream, RfbOutStream};
//! use tokio::net::TcpStream;
//!
//! # async fn example() -> std::io::Result<()> {
//! let socket = TcpStream::connect("localhost:5900").await?;
//! let (reader, writer) = tokio::io::split(socket);
//!
//! let mut input = RfbInStream::new(reader);
//! let mut version = [0u8; 12];
//! input.read_bytes(&mut version).await?;
//!
//! let mut output = RfbOutStream::new(writer);
//! output.write_bytes(b"RFB 003.008\n");
//! output.flush().await?;
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use bytes::{Buf, BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

/// Buffered input stream for reading RFB protocol data.
///
/// Data is buffered internally (default 8KB) and filled on demand. Methods
/// like `read_u32()` read from this buffer when possible, only performing I/O
/// when the buffer needs refilling.
pub struct RfbInStream<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> RfbInStream<R> {
    /// Create a new input stream with default buffer size (8KB).
    pub fn new(reader: R) -> Self {
        Self::with_capacity(reader, 8192)
    }

    /// Create a new input stream with specified buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Ensure at least `n` bytes are available in the buffer.
    ///
    /// Returns `UnexpectedEof` if the reader is exhausted first.
    async fn ensure_bytes(&mut self, n: usize) -> std::io::Result<()> {
        while self.buffer.len() < n {
            let bytes_read = self.reader.read_buf(&mut self.buffer).await?;
            if bytes_read == 0 {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("expected {} bytes, got {}", n, self.buffer.len()),
                ));
            }
        }
        Ok(())
    }

    /// Read a single byte (u8).
    pub async fn read_u8(&mut self) -> std::io::Result<u8> {
        self.ensure_bytes(1).await?;
        Ok(self.buffer.get_u8())
    }

    /// Read a 32-bit unsigned integer in network byte order (big-endian).
    pub async fn read_u32(&mut self) -> std::io::Result<u32> {
        self.ensure_bytes(4).await?;
        Ok(self.buffer.get_u32())
    }

    /// Read exactly `buf.len()` bytes into the provided buffer.
    ///
    /// # Errors
    ///
    /// Returns an error if EOF is reached before the buffer is filled,
    /// or if an I/O error occurs.
    pub async fn read_bytes(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.ensure_bytes(buf.len()).await?;
        self.buffer.copy_to_slice(buf);
        Ok(())
    }

    /// Get the number of bytes currently available in the buffer.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the stream and return the underlying reader.
    ///
    /// **Warning:** buffered bytes that have not been read are dropped.
    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Buffered output stream for writing RFB protocol data.
///
/// Data is buffered internally and only written when [`flush()`](Self::flush)
/// is called. Dropping the stream without flushing loses buffered data.
pub struct RfbOutStream<W> {
    writer: W,
    buffer: BytesMut,
}

impl<W: AsyncWrite + Unpin> RfbOutStream<W> {
    /// Create a new output stream with default buffer size (8KB).
    pub fn new(writer: W) -> Self {
        Self::with_capacity(writer, 8192)
    }

    /// Create a new output stream with specified buffer capacity.
    pub fn with_capacity(writer: W, capacity: usize) -> Self {
        Self {
            writer,
            buffer: BytesMut::with_capacity(capacity),
        }
    }

    /// Write a single byte (u8). Buffered until [`flush()`](Self::flush).
    pub fn write_u8(&mut self, value: u8) {
        self.buffer.put_u8(value);
    }

    /// Write a 32-bit unsigned integer in network byte order (big-endian).
    pub fn write_u32(&mut self, value: u32) {
        self.buffer.put_u32(value);
    }

    /// Write a byte slice to the buffer.
    pub fn write_bytes(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Flush all buffered data to the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails or if the underlying writer's
    /// `flush()` method returns an error.
    pub async fn flush(&mut self) -> std::io::Result<()> {
        if !self.buffer.is_empty() {
            self.writer.write_all(&self.buffer).await?;
            self.buffer.clear();
        }
        self.writer.flush().await
    }

    /// Get the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Consume the stream and return the underlying writer.
    ///
    /// **Warning:** Any buffered data will be lost. Call [`flush()`](Self::flush)
    /// first if you need to send buffered data.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Byte-stream primitives consumed by the handshake.
///
/// The handshake owns the transport exclusively while it runs. Every method
/// may fail; any failure aborts the handshake and leaves the transport in an
/// unknown state, so callers must close it. Deadlines belong here too: a
/// transport that enforces a timeout reports it as an ordinary `io::Error`.
///
/// The trait is object safe so that security mechanisms can be stored as
/// trait objects and receive `&mut dyn HandshakeTransport`.
#[async_trait]
pub trait HandshakeTransport: Send {
    /// Read exactly `buf.len()` bytes.
    async fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()>;

    /// Write all of `data` and push it to the peer.
    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()>;

    /// Read one byte.
    async fn read_u8(&mut self) -> std::io::Result<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf).await?;
        Ok(buf[0])
    }

    /// Read a big-endian `u32`.
    async fn read_u32(&mut self) -> std::io::Result<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf).await?;
        Ok(u32::from_be_bytes(buf))
    }

    /// Write one byte.
    async fn write_u8(&mut self, value: u8) -> std::io::Result<()> {
        self.write_all(&[value]).await
    }
}

/// A buffered read/write pair implementing [`HandshakeTransport`].
///
/// After the handshake, [`into_parts`](Self::into_parts) returns the buffered
/// streams so that bytes the server sent early are not lost.
pub struct RfbStream<R, W> {
    input: RfbInStream<R>,
    output: RfbOutStream<W>,
}

impl<R: AsyncRead + Unpin, W: AsyncWrite + Unpin> RfbStream<R, W> {
    /// Wrap a raw reader and writer.
    pub fn new(reader: R, writer: W) -> Self {
        Self::from_parts(RfbInStream::new(reader), RfbOutStream::new(writer))
    }

    /// Combine already-buffered streams.
    pub fn from_parts(input: RfbInStream<R>, output: RfbOutStream<W>) -> Self {
        Self { input, output }
    }

    /// Split back into the buffered input and output streams.
    pub fn into_parts(self) -> (RfbInStream<R>, RfbOutStream<W>) {
        (self.input, self.output)
    }
}

#[async_trait]
impl<R, W> HandshakeTransport for RfbStream<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.input.read_bytes(buf).await
    }

    async fn write_all(&mut self, data: &[u8]) -> std::io::Result<()> {
        self.output.write_bytes(data);
        self.output.flush().await
    }

    async fn read_u8(&mut self) -> std::io::Result<u8> {
        self.input.read_u8().await
    }

    async fn read_u32(&mut self) -> std::io::Result<u32> {
        self.input.read_u32().await
    }
}
