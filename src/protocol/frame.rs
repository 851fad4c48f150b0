//! Frame reader and writer bound to one in-flight message.
//!
//! A [`FrameReader`] or [`FrameWriter`] exclusively owns the interface for the
//! duration of one message transfer; exclusivity is structural (they hold
//! `&mut W`), not enforced by locks, because only one cooperative task touches
//! an interface at a time.
//!
//! [`PendingFrame`] is the passive counterpart of a reader: header bookkeeping
//! without the interface borrow. It is what travels inside
//! [`WireError::Unexpected`](crate::error::WireError::Unexpected) when a frame
//! arrives mid-wait, and is resumed against the interface once the session
//! handler is ready to re-dispatch it.

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::wire_format::{HEADER_SIZE, Header};
use crate::error::{Result, WireError};

/// Byte-stream interface with transport framing already applied below.
pub trait Wire: AsyncRead + AsyncWrite + Unpin + Send + 'static {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send + 'static> Wire for T {}

/// Scratch size for draining unwanted payloads.
const DRAIN_CHUNK: usize = 64;

/// Cancellation-safe header accumulator.
///
/// `fill` may be raced against another future and dropped mid-read; partial
/// header bytes stay in the accumulator so the next `fill` resumes where the
/// aborted one stopped. Without this, an interrupted wait could eat the first
/// bytes of the very frame that interrupted it.
#[derive(Debug, Default)]
pub(crate) struct HeaderBuf {
    buf: [u8; HEADER_SIZE],
    filled: usize,
}

impl HeaderBuf {
    /// Suspend until a full header has been read, then decode it.
    ///
    /// Cancel-safe: each `read` either completes or consumes nothing.
    pub(crate) async fn fill<W: Wire>(&mut self, io: &mut W) -> Result<Header> {
        while self.filled < HEADER_SIZE {
            let n = io.read(&mut self.buf[self.filled..]).await?;
            if n == 0 {
                return Err(WireError::InterfaceClosed);
            }
            self.filled += n;
        }
        self.filled = 0;
        Ok(Header::from_bytes(&self.buf))
    }
}

/// Header bookkeeping for a frame whose payload is still (partially) on the
/// wire, detached from the interface borrow.
#[derive(Debug)]
pub struct PendingFrame {
    header: Header,
    remaining: u32,
}

impl PendingFrame {
    /// Track a freshly-opened frame; nothing of the payload has been read yet.
    pub fn new(header: Header) -> Self {
        Self {
            remaining: header.payload_length,
            header,
        }
    }

    /// Session id from the frame header.
    #[inline]
    pub fn session_id(&self) -> u32 {
        self.header.session_id
    }

    /// Message type tag from the frame header.
    #[inline]
    pub fn msg_type(&self) -> u16 {
        self.header.msg_type
    }

    /// Payload bytes not yet read off the interface.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Rebind this frame to the interface so the payload can be consumed.
    pub fn resume<W: Wire>(self, io: &mut W) -> FrameReader<'_, W> {
        FrameReader {
            io,
            header: self.header,
            remaining: self.remaining,
        }
    }
}

/// Streaming reader for the payload of one frame.
pub struct FrameReader<'a, W: Wire> {
    io: &'a mut W,
    header: Header,
    remaining: u32,
}

impl<'a, W: Wire> FrameReader<'a, W> {
    /// Session id from the frame header.
    #[inline]
    pub fn session_id(&self) -> u32 {
        self.header.session_id
    }

    /// Message type tag from the frame header.
    #[inline]
    pub fn msg_type(&self) -> u16 {
        self.header.msg_type
    }

    /// Payload bytes not yet read.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Read the next payload chunk into `buf`, suspending until bytes arrive.
    ///
    /// Returns the number of bytes read; `Ok(0)` once the payload is
    /// exhausted. The interface closing mid-payload is an error: a frame must
    /// be delivered whole.
    pub async fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.remaining == 0 || buf.is_empty() {
            return Ok(0);
        }
        let limit = buf.len().min(self.remaining as usize);
        let n = self.io.read(&mut buf[..limit]).await?;
        if n == 0 {
            return Err(WireError::InterfaceClosed);
        }
        self.remaining -= n as u32;
        Ok(n)
    }

    /// Read the entire remaining payload.
    pub async fn read_payload(&mut self) -> Result<Bytes> {
        let mut buf = BytesMut::zeroed(self.remaining as usize);
        let mut offset = 0;
        while self.remaining > 0 {
            let n = self.io.read(&mut buf[offset..]).await?;
            if n == 0 {
                return Err(WireError::InterfaceClosed);
            }
            offset += n;
            self.remaining -= n as u32;
        }
        Ok(buf.freeze())
    }

    /// Read the remaining payload off the interface and throw it away.
    pub async fn drain(&mut self) -> Result<()> {
        let mut scratch = [0u8; DRAIN_CHUNK];
        while self.remaining > 0 {
            self.read_chunk(&mut scratch).await?;
        }
        Ok(())
    }

    /// Release the interface borrow, keeping the frame bookkeeping.
    pub fn into_pending(self) -> PendingFrame {
        PendingFrame {
            header: self.header,
            remaining: self.remaining,
        }
    }
}

/// Streaming writer for one frame: header up front, payload in chunks, then an
/// explicit close that enforces the declared length.
pub struct FrameWriter<'a, W: Wire> {
    io: &'a mut W,
    remaining: u32,
}

impl<'a, W: Wire> FrameWriter<'a, W> {
    /// Write the frame header and return a writer for the payload.
    pub async fn open(io: &'a mut W, header: Header) -> Result<Self> {
        io.write_all(&header.encode()).await?;
        Ok(Self {
            io,
            remaining: header.payload_length,
        })
    }

    /// Payload bytes still owed before `close`.
    #[inline]
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Write the next payload chunk.
    ///
    /// Writing past the length declared in the header is a framing error; the
    /// header is already on the wire and cannot be amended.
    pub async fn write_chunk(&mut self, chunk: &[u8]) -> Result<()> {
        if chunk.len() as u32 > self.remaining {
            return Err(WireError::Framing(format!(
                "payload overrun: {} bytes left, {} written",
                self.remaining,
                chunk.len()
            )));
        }
        self.io.write_all(chunk).await?;
        self.remaining -= chunk.len() as u32;
        Ok(())
    }

    /// Finalize the frame: verify the declared length was written and flush.
    pub async fn close(self) -> Result<()> {
        if self.remaining != 0 {
            return Err(WireError::Framing(format!(
                "payload underrun: {} bytes still owed",
                self.remaining
            )));
        }
        self.io.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::duplex;

    async fn write_frame<W: Wire>(io: &mut W, session_id: u32, msg_type: u16, payload: &[u8]) {
        let header = Header::new(session_id, msg_type, payload.len() as u32);
        let mut writer = FrameWriter::open(io, header).await.unwrap();
        writer.write_chunk(payload).await.unwrap();
        writer.close().await.unwrap();
    }

    async fn open_frame<W: Wire>(io: &mut W) -> PendingFrame {
        let mut hdr = HeaderBuf::default();
        let header = hdr.fill(io).await.unwrap();
        PendingFrame::new(header)
    }

    #[tokio::test]
    async fn test_write_read_roundtrip() {
        let (mut host, mut device) = duplex(256);
        write_frame(&mut host, 3, 26, b"hello").await;

        let pending = open_frame(&mut device).await;
        assert_eq!(pending.session_id(), 3);
        assert_eq!(pending.msg_type(), 26);
        assert_eq!(pending.remaining(), 5);

        let mut reader = pending.resume(&mut device);
        let payload = reader.read_payload().await.unwrap();
        assert_eq!(&payload[..], b"hello");
        assert_eq!(reader.remaining(), 0);
    }

    #[tokio::test]
    async fn test_read_chunk_respects_frame_boundary() {
        let (mut host, mut device) = duplex(256);
        write_frame(&mut host, 0, 1, b"abcdef").await;
        // a second frame right behind the first
        write_frame(&mut host, 0, 2, b"xy").await;

        let pending = open_frame(&mut device).await;
        let mut reader = pending.resume(&mut device);

        let mut buf = [0u8; 32];
        let mut collected = Vec::new();
        loop {
            let n = reader.read_chunk(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            collected.extend_from_slice(&buf[..n]);
        }
        assert_eq!(collected, b"abcdef");

        // the second frame's header is untouched
        let next = open_frame(&mut device).await;
        assert_eq!(next.msg_type(), 2);
    }

    #[tokio::test]
    async fn test_drain_consumes_whole_payload() {
        let (mut host, mut device) = duplex(1024);
        let payload = vec![0xAB; 300];
        write_frame(&mut host, 0, 0xFFFF, &payload).await;
        write_frame(&mut host, 0, 1, b"next").await;

        let pending = open_frame(&mut device).await;
        let mut reader = pending.resume(&mut device);
        reader.drain().await.unwrap();
        assert_eq!(reader.remaining(), 0);

        let next = open_frame(&mut device).await;
        assert_eq!(next.msg_type(), 1);
    }

    #[tokio::test]
    async fn test_into_pending_keeps_progress() {
        let (mut host, mut device) = duplex(256);
        write_frame(&mut host, 0, 9, b"0123456789").await;

        let pending = open_frame(&mut device).await;
        let mut reader = pending.resume(&mut device);
        let mut buf = [0u8; 4];
        reader.read_chunk(&mut buf).await.unwrap();

        let pending = reader.into_pending();
        assert_eq!(pending.remaining(), 6);

        let mut reader = pending.resume(&mut device);
        let rest = reader.read_payload().await.unwrap();
        assert_eq!(&rest[..], b"456789");
    }

    #[tokio::test]
    async fn test_writer_overrun_is_framing_error() {
        let (mut device, _host) = duplex(256);
        let header = Header::new(0, 1, 4);
        let mut writer = FrameWriter::open(&mut device, header).await.unwrap();
        let err = writer.write_chunk(b"too long").await.unwrap_err();
        assert!(matches!(err, WireError::Framing(_)));
    }

    #[tokio::test]
    async fn test_writer_underrun_is_framing_error() {
        let (mut device, _host) = duplex(256);
        let header = Header::new(0, 1, 8);
        let mut writer = FrameWriter::open(&mut device, header).await.unwrap();
        writer.write_chunk(b"half").await.unwrap();
        let err = writer.close().await.unwrap_err();
        assert!(matches!(err, WireError::Framing(_)));
    }

    #[tokio::test]
    async fn test_header_buf_accumulates_across_partial_reads() {
        let (mut host, mut device) = duplex(256);
        let header = Header::new(1, 2, 0);
        let bytes = header.encode();

        let mut hdr = HeaderBuf::default();

        // first half of the header only
        host.write_all(&bytes[..4]).await.unwrap();
        let fill = hdr.fill(&mut device);
        tokio::pin!(fill);
        assert!(
            futures_poll_once(fill.as_mut()).await.is_none(),
            "fill must suspend on a partial header"
        );

        host.write_all(&bytes[4..]).await.unwrap();
        let got = fill.await.unwrap();
        assert_eq!(got, header);
    }

    #[tokio::test]
    async fn test_closed_interface_mid_payload_errors() {
        let (mut host, mut device) = duplex(256);
        let header = Header::new(0, 1, 10);
        host.write_all(&header.encode()).await.unwrap();
        host.write_all(b"abc").await.unwrap();
        drop(host);

        let pending = open_frame(&mut device).await;
        let mut reader = pending.resume(&mut device);
        let err = reader.read_payload().await.unwrap_err();
        assert!(matches!(err, WireError::InterfaceClosed));
    }

    /// Poll a future exactly once; `None` if it is still pending.
    async fn futures_poll_once<F: Future + Unpin>(fut: F) -> Option<F::Output> {
        use std::task::Poll;
        let mut fut = fut;
        std::future::poll_fn(move |cx| {
            let polled = std::pin::Pin::new(&mut fut).poll(cx);
            match polled {
                Poll::Ready(out) => Poll::Ready(Some(out)),
                Poll::Pending => Poll::Ready(None),
            }
        })
        .await
    }
}
