//! Dispatch adapters - composable wrappers around concrete workflows.
//!
//! A registered workflow is a [`Workflow`] trait object. Cross-cutting
//! concerns are layered on by wrapping:
//!
//! - [`TypedWorkflow`] decodes the typed request from the raw frame, runs the
//!   business handler and translates its outcome onto the wire (response
//!   message, or a failure reply for domain failures and faults).
//! - [`KeychainWorkflow`] acquires a scoped credential handle before the inner
//!   handler runs and guarantees its release on every exit path.
//! - [`LazyWorkflow`] defers construction of the concrete workflow until the
//!   first message of its type arrives, then caches it.
//!
//! The unexpected-message interruption passes through every adapter untouched;
//! only the session handler may consume it.

use std::pin::Pin;
use std::sync::{Arc, OnceLock};

use crate::codec::MsgPackCodec;
use crate::error::{Result, WireError};
use crate::keychain::{Keychain, KeychainProvider};
use crate::messages::{Failure, FailureCode, WireMessage};
use crate::protocol::{PendingFrame, Wire};

use super::context::Context;

/// Boxed future for workflow results.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// An executable workflow, dispatched by message type tag.
///
/// Implementations receive the session context and the still-open frame that
/// triggered them, and run to completion before the session handler waits for
/// the next message.
pub trait Workflow<W: Wire>: Send + Sync {
    /// Run the workflow for one received frame.
    fn run<'a>(&'a self, ctx: &'a mut Context<W>, frame: PendingFrame) -> BoxFuture<'a, Result<()>>;
}

/// Business handler with a typed request and reply.
pub trait TypedHandler<W: Wire>: Send + Sync {
    /// Request message this handler consumes; its tag keys the registry entry.
    type Req: WireMessage;
    /// Reply message written when the handler returns one.
    type Reply: WireMessage;

    /// Handle one decoded request.
    ///
    /// Returning `Ok(None)` means the handler already wrote its replies
    /// through the context.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context<W>,
        req: Self::Req,
    ) -> BoxFuture<'a, Result<Option<Self::Reply>>>;
}

/// Adapter that decodes the request and translates handler outcomes onto the
/// wire.
pub struct TypedWorkflow<H> {
    handler: H,
}

impl<H> TypedWorkflow<H> {
    /// Wrap a typed handler.
    pub fn new(handler: H) -> Self {
        Self { handler }
    }
}

impl<W: Wire, H: TypedHandler<W>> Workflow<W> for TypedWorkflow<H> {
    fn run<'a>(
        &'a self,
        ctx: &'a mut Context<W>,
        frame: PendingFrame,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let req: H::Req = ctx.decode_expected(frame).await?;

            match self.handler.handle(ctx, req).await {
                Ok(Some(reply)) => ctx.write(&reply).await,
                Ok(None) => Ok(()),
                // the session handler takes care of this one
                Err(err @ WireError::Unexpected(_)) => Err(err),
                Err(WireError::Failure { code, message }) => {
                    // respond with the specific code and message
                    ctx.write(&Failure {
                        code,
                        message: message.clone(),
                    })
                    .await?;
                    Err(WireError::Failure { code, message })
                }
                Err(err) => {
                    // respond with a generic code and message
                    ctx.write(&Failure {
                        code: FailureCode::FirmwareError,
                        message: "Firmware error".to_string(),
                    })
                    .await?;
                    Err(err)
                }
            }
        })
    }
}

/// Business handler that additionally needs a scoped credential handle.
pub trait KeychainHandler<W: Wire>: Send + Sync {
    /// Request message this handler consumes.
    type Req: WireMessage;
    /// Reply message written when the handler returns one.
    type Reply: WireMessage;

    /// Handle one decoded request with an acquired keychain.
    ///
    /// The keychain is owned by this invocation; dropping it (on any path)
    /// releases the credential.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context<W>,
        req: Self::Req,
        keychain: Keychain,
    ) -> BoxFuture<'a, Result<Option<Self::Reply>>>;
}

/// Adapter that scopes a credential handle to one handler invocation.
pub struct KeychainWorkflow<W: Wire, H> {
    namespace: Vec<u32>,
    provider: Arc<dyn KeychainProvider<W>>,
    inner: H,
}

impl<W: Wire, H> KeychainWorkflow<W, H> {
    /// Bind a handler to a credential namespace and provider.
    pub fn new(namespace: Vec<u32>, provider: Arc<dyn KeychainProvider<W>>, inner: H) -> Self {
        Self {
            namespace,
            provider,
            inner,
        }
    }
}

impl<W: Wire, H: KeychainHandler<W>> TypedHandler<W> for KeychainWorkflow<W, H> {
    type Req = H::Req;
    type Reply = H::Reply;

    fn handle<'a>(
        &'a self,
        ctx: &'a mut Context<W>,
        req: Self::Req,
    ) -> BoxFuture<'a, Result<Option<Self::Reply>>> {
        Box::pin(async move {
            let keychain = self.provider.acquire(ctx, &self.namespace).await?;
            // the handle moves into the inner invocation and is released when
            // that invocation ends, whichever way it ends
            self.inner.handle(ctx, req, keychain).await
        })
    }
}

/// Adapter that resolves the concrete workflow on first use and caches it.
pub struct LazyWorkflow<W: Wire> {
    resolve: fn() -> Box<dyn Workflow<W>>,
    cached: OnceLock<Box<dyn Workflow<W>>>,
}

impl<W: Wire> LazyWorkflow<W> {
    /// Defer workflow construction behind a resolver.
    pub fn new(resolve: fn() -> Box<dyn Workflow<W>>) -> Self {
        Self {
            resolve,
            cached: OnceLock::new(),
        }
    }
}

impl<W: Wire> Workflow<W> for LazyWorkflow<W> {
    fn run<'a>(
        &'a self,
        ctx: &'a mut Context<W>,
        frame: PendingFrame,
    ) -> BoxFuture<'a, Result<()>> {
        let workflow = self.cached.get_or_init(self.resolve);
        workflow.run(ctx, frame)
    }
}

/// Generic workflow for messages nothing is registered for.
///
/// Receives the payload and throws it away, then rejects with an
/// unexpected-message failure. Draining matters: the next header read must not
/// see leftover payload bytes.
pub async fn unexpected_msg<W: Wire>(ctx: &mut Context<W>, frame: PendingFrame) -> Result<()> {
    {
        let mut reader = ctx.resume_frame(frame);
        reader.drain().await?;
    }
    ctx.write(&Failure {
        code: FailureCode::UnexpectedMessage,
        message: "Unexpected message".to_string(),
    })
    .await
}
