//! Session context - the per-connection facade workflows use to talk to the
//! host.
//!
//! The context is the single owner of the physical interface. Frame readers
//! and writers borrow it exclusively for the duration of one message, so two
//! transfers can never interleave on the wire.
//!
//! # Example
//!
//! ```ignore
//! async fn confirm<W: Wire>(ctx: &mut Context<W>) -> Result<()> {
//!     let _ack: ButtonAck = ctx.call(ButtonRequest { code: ButtonRequestCode::Other }).await?;
//!     let confirmed = ctx.wait(dialog()).await?;
//!     if confirmed { Ok(()) } else { Err(WireError::action_cancelled()) }
//! }
//! ```

use crate::codec::MsgPackCodec;
use crate::error::{Result, WireError};
use crate::messages::WireMessage;
use crate::protocol::{
    DEFAULT_MAX_PAYLOAD_SIZE, FrameReader, FrameWriter, Header, HeaderBuf, PendingFrame, Wire,
};

/// Per-session I/O context.
///
/// One context exists per physical interface; a session id distinguishes the
/// logical channel stamped on outgoing frames.
pub struct Context<W: Wire> {
    io: W,
    iface: u8,
    sid: u32,
    header_buf: HeaderBuf,
    max_payload: u32,
}

impl<W: Wire> Context<W> {
    /// Create a context over an interface byte stream.
    pub fn new(io: W, iface: u8, sid: u32) -> Self {
        Self {
            io,
            iface,
            sid,
            header_buf: HeaderBuf::default(),
            max_payload: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Override the per-frame payload bound.
    pub fn with_max_payload(mut self, max_payload: u32) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Interface number, for log correlation.
    #[inline]
    pub fn interface(&self) -> u8 {
        self.iface
    }

    /// Session id stamped on outgoing frames.
    #[inline]
    pub fn session_id(&self) -> u32 {
        self.sid
    }

    /// Suspend until a frame header is available and return its handle.
    ///
    /// The payload stays on the wire until the frame is resumed into a reader.
    pub async fn open_frame(&mut self) -> Result<PendingFrame> {
        let header = self.header_buf.fill(&mut self.io).await?;
        header.validate(self.max_payload)?;
        Ok(PendingFrame::new(header))
    }

    /// Rebind a pending frame to the interface so its payload can be read.
    pub fn resume_frame(&mut self, frame: PendingFrame) -> FrameReader<'_, W> {
        frame.resume(&mut self.io)
    }

    /// Wait for an incoming message of type `M` and decode it.
    ///
    /// A frame of any other type aborts the read with
    /// [`WireError::Unexpected`], carrying the already-opened frame; callers
    /// must propagate that outcome untouched so the session handler can
    /// re-dispatch it.
    pub async fn read<M: WireMessage>(&mut self) -> Result<M> {
        tracing::debug!(
            iface = self.iface,
            sid = self.sid,
            msg = M::NAME,
            "read"
        );
        let frame = self.open_frame().await?;
        self.decode_expected(frame).await
    }

    /// Decode `M` from an already-opened frame, or raise it as unexpected.
    pub(crate) async fn decode_expected<M: WireMessage>(
        &mut self,
        frame: PendingFrame,
    ) -> Result<M> {
        if frame.msg_type() != M::MSG_TYPE {
            return Err(WireError::Unexpected(frame));
        }
        let payload = {
            let mut reader = self.resume_frame(frame);
            reader.read_payload().await?
        };
        MsgPackCodec::decode(&payload)
    }

    /// Write a message to this wire context.
    ///
    /// The payload size is computed up front so the header can declare it; the
    /// frame is fully flushed before this returns.
    pub async fn write<M: WireMessage>(&mut self, msg: &M) -> Result<()> {
        tracing::debug!(
            iface = self.iface,
            sid = self.sid,
            msg = M::NAME,
            "write"
        );
        let payload = MsgPackCodec::encode(msg)?;
        let header = Header::new(self.sid, M::MSG_TYPE, payload.len() as u32);
        let mut writer = FrameWriter::open(&mut self.io, header).await?;
        writer.write_chunk(&payload).await?;
        writer.close().await
    }

    /// Reply with `msg` and wait for a message of type `R`.
    ///
    /// The request is dropped before the read so a large message does not sit
    /// in memory while the host thinks.
    pub async fn call<M: WireMessage, R: WireMessage>(&mut self, msg: M) -> Result<R> {
        self.write(&msg).await?;
        drop(msg);
        self.read().await
    }

    /// Run `task` to completion while servicing the wire.
    ///
    /// Any incoming frame interrupts the wait: the race is between an
    /// anonymous header read and the supplied task, and an arriving header
    /// surfaces as [`WireError::Unexpected`] exactly like a mismatched
    /// [`read`](Self::read). Header bytes consumed by an aborted race are kept
    /// for the next open, so no frame is ever lost to the race itself.
    pub async fn wait<F>(&mut self, task: F) -> Result<F::Output>
    where
        F: Future + Send,
    {
        let Self {
            io,
            header_buf,
            max_payload,
            ..
        } = self;
        tokio::select! {
            header = header_buf.fill(io) => {
                let header = header?;
                header.validate(*max_payload)?;
                Err(WireError::Unexpected(PendingFrame::new(header)))
            }
            out = task => Ok(out),
        }
    }
}
