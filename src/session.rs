//! Session handler - the per-interface state machine.
//!
//! One handler runs per physical interface for the life of the process:
//! wait for a frame header, look the type tag up in the registry, run the
//! (adapter-wrapped) workflow to completion, recover, repeat. Recovery never
//! closes the session; the loop only ends when the interface itself goes away.
//!
//! The one piece of control flow worth spelling out is interruption: when a
//! frame arrives while a workflow is waiting for something else, the wait
//! aborts with [`WireError::Unexpected`] carrying the opened frame. The loop
//! catches it here and re-enters dispatch with that frame instead of reading a
//! fresh header, so the interrupting request is served, not lost.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register_typed(ChangePinFlow::new(config, ui));
//!
//! let session = SessionHandler::builder(registry)
//!     .interface(0)
//!     .build(usb_hid_stream);
//! session.run().await?;
//! ```

use crate::error::{Result, WireError};
use crate::handler::{Context, Registry, unexpected_msg};
use crate::protocol::{DEFAULT_MAX_PAYLOAD_SIZE, PendingFrame, Wire};

/// Per-invocation housekeeping collaborator.
///
/// `on_start` runs before a workflow is invoked and `on_close` after it
/// returns, on every outcome. Firmware uses this to scope transient caches and
/// timers to one invocation so workflows cannot leak state into each other.
pub trait SessionHooks: Send + Sync {
    /// Called before each workflow invocation.
    fn on_start(&self) {}
    /// Called after each workflow invocation, on every outcome.
    fn on_close(&self) {}
}

/// Builder for configuring a session handler.
pub struct SessionBuilder<W: Wire> {
    registry: Registry<W>,
    iface: u8,
    session_id: u32,
    max_payload: u32,
    hooks: Option<Box<dyn SessionHooks>>,
}

impl<W: Wire> SessionBuilder<W> {
    /// Start a builder around a boot-time registry.
    pub fn new(registry: Registry<W>) -> Self {
        Self {
            registry,
            iface: 0,
            session_id: 0,
            max_payload: DEFAULT_MAX_PAYLOAD_SIZE,
            hooks: None,
        }
    }

    /// Interface number this session serves (log correlation only).
    pub fn interface(mut self, iface: u8) -> Self {
        self.iface = iface;
        self
    }

    /// Session id stamped on outgoing frames.
    pub fn session_id(mut self, session_id: u32) -> Self {
        self.session_id = session_id;
        self
    }

    /// Per-frame payload bound.
    pub fn max_payload_size(mut self, max_payload: u32) -> Self {
        self.max_payload = max_payload;
        self
    }

    /// Install per-invocation housekeeping hooks.
    pub fn hooks(mut self, hooks: impl SessionHooks + 'static) -> Self {
        self.hooks = Some(Box::new(hooks));
        self
    }

    /// Bind the session to an interface byte stream.
    pub fn build(self, io: W) -> SessionHandler<W> {
        let ctx = Context::new(io, self.iface, self.session_id).with_max_payload(self.max_payload);
        SessionHandler {
            ctx,
            registry: self.registry,
            hooks: self.hooks,
        }
    }
}

/// The per-interface session state machine.
pub struct SessionHandler<W: Wire> {
    ctx: Context<W>,
    registry: Registry<W>,
    hooks: Option<Box<dyn SessionHooks>>,
}

impl<W: Wire> SessionHandler<W> {
    /// Create a session builder.
    pub fn builder(registry: Registry<W>) -> SessionBuilder<W> {
        SessionBuilder::new(registry)
    }

    /// Serve the interface until it is closed.
    ///
    /// Workflow failures and faults never end the loop; they are logged and
    /// the next header read proceeds. Only loss of the interface returns.
    pub async fn run(mut self) -> Result<()> {
        let iface = self.ctx.interface();
        let sid = self.ctx.session_id();
        let mut carried: Option<PendingFrame> = None;

        loop {
            // wait for a new message, unless an interruption carried one over
            let frame = match carried.take() {
                Some(frame) => frame,
                None => match self.ctx.open_frame().await {
                    Ok(frame) => frame,
                    Err(WireError::InterfaceClosed) => {
                        tracing::debug!(iface, sid, "interface closed, session ends");
                        return Ok(());
                    }
                    Err(WireError::Framing(reason)) => {
                        tracing::warn!(iface, sid, %reason, "malformed frame header");
                        continue;
                    }
                    Err(err) => return Err(err),
                },
            };

            let msg_type = frame.msg_type();
            tracing::debug!(iface, sid, msg_type, "dispatch");

            if let Some(hooks) = &self.hooks {
                hooks.on_start();
            }
            let outcome = match self.registry.get(msg_type) {
                Some(workflow) => workflow.run(&mut self.ctx, frame).await,
                None => unexpected_msg(&mut self.ctx, frame).await,
            };
            if let Some(hooks) = &self.hooks {
                hooks.on_close();
            }

            match outcome {
                Ok(()) => {}
                Err(WireError::Unexpected(frame)) => {
                    // retry with the frame carried by the interruption
                    carried = Some(frame);
                }
                Err(WireError::Failure { code, message }) => {
                    // recoverable by design; the failure reply is already on
                    // the wire
                    tracing::warn!(iface, sid, ?code, %message, "workflow failure");
                }
                Err(err) => {
                    // sessions are never closed by workflow faults
                    tracing::error!(iface, sid, %err, "workflow fault");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    #[test]
    fn test_builder_defaults() {
        let builder: SessionBuilder<DuplexStream> = SessionBuilder::new(Registry::new());
        assert_eq!(builder.iface, 0);
        assert_eq!(builder.session_id, 0);
        assert_eq!(builder.max_payload, DEFAULT_MAX_PAYLOAD_SIZE);
        assert!(builder.hooks.is_none());
    }

    #[test]
    fn test_builder_configuration() {
        struct NoopHooks;
        impl SessionHooks for NoopHooks {}

        let builder: SessionBuilder<DuplexStream> = SessionHandler::builder(Registry::new())
            .interface(2)
            .session_id(7)
            .max_payload_size(512)
            .hooks(NoopHooks);

        assert_eq!(builder.iface, 2);
        assert_eq!(builder.session_id, 7);
        assert_eq!(builder.max_payload, 512);
        assert!(builder.hooks.is_some());
    }
}
