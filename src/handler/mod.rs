//! Handler module - session context, workflow registry and dispatch adapters.
//!
//! Provides:
//! - [`Context`] - the single-owner facade workflows use to talk to the host
//! - [`Registry`] - boot-time mapping from message type tag to workflow
//! - [`Workflow`] / [`TypedHandler`] / [`KeychainHandler`] - the handler
//!   contracts, with [`TypedWorkflow`], [`KeychainWorkflow`] and
//!   [`LazyWorkflow`] as the composable adapters around them

mod context;
mod dispatch;
mod registry;

pub use context::Context;
pub use dispatch::{
    BoxFuture, KeychainHandler, KeychainWorkflow, LazyWorkflow, TypedHandler, TypedWorkflow,
    Workflow, unexpected_msg,
};
pub use registry::Registry;
