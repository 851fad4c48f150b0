//! Workflow registry - boot-time dispatch table keyed by message type tag.
//!
//! The registry is built once during device startup and handed to the session
//! handler; it never changes afterwards. Registering the same tag twice is a
//! configuration error and aborts boot.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = Registry::new();
//! registry.register_typed(ChangePinFlow::new(config, ui));
//! registry.add_deferred(msg_type::SIGN_TX, || Box::new(build_sign_tx()));
//!
//! let session = SessionHandler::builder(registry).build(io);
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use crate::keychain::KeychainProvider;
use crate::messages::WireMessage;
use crate::protocol::Wire;

use super::dispatch::{
    KeychainHandler, KeychainWorkflow, LazyWorkflow, TypedHandler, TypedWorkflow, Workflow,
};

/// Immutable-after-boot mapping from message type tag to workflow.
pub struct Registry<W: Wire> {
    workflows: HashMap<u16, Box<dyn Workflow<W>>>,
}

impl<W: Wire> Registry<W> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            workflows: HashMap::new(),
        }
    }

    /// Register `workflow` to get scheduled after a `msg_type` message is
    /// received.
    ///
    /// # Panics
    ///
    /// Panics if `msg_type` is already registered; a tag maps to exactly one
    /// workflow for the lifetime of the process.
    pub fn register(&mut self, msg_type: u16, workflow: Box<dyn Workflow<W>>) {
        let previous = self.workflows.insert(msg_type, workflow);
        assert!(
            previous.is_none(),
            "workflow already registered for message type {msg_type}"
        );
    }

    /// Register a typed handler; the tag comes from its request type.
    ///
    /// The handler is wrapped in the request-decoding and failure-translating
    /// adapter.
    ///
    /// # Panics
    ///
    /// Panics if the request type's tag is already registered.
    pub fn register_typed<H>(&mut self, handler: H)
    where
        H: TypedHandler<W> + 'static,
    {
        self.register(H::Req::MSG_TYPE, Box::new(TypedWorkflow::new(handler)));
    }

    /// Register a typed handler that needs a scoped credential handle.
    ///
    /// # Panics
    ///
    /// Panics if the request type's tag is already registered.
    pub fn register_keychain<H>(
        &mut self,
        handler: H,
        namespace: Vec<u32>,
        provider: Arc<dyn KeychainProvider<W>>,
    ) where
        H: KeychainHandler<W> + 'static,
    {
        self.register_typed(KeychainWorkflow::new(namespace, provider, handler));
    }

    /// Shortcut for registering a deferred-construction workflow.
    ///
    /// The resolver runs on the first `msg_type` message and its result is
    /// cached for the rest of the process lifetime.
    ///
    /// # Panics
    ///
    /// Panics if `msg_type` is already registered.
    pub fn add_deferred(&mut self, msg_type: u16, resolve: fn() -> Box<dyn Workflow<W>>) {
        self.register(msg_type, Box::new(LazyWorkflow::new(resolve)));
    }

    /// Look up the workflow for a message type tag.
    pub fn get(&self, msg_type: u16) -> Option<&dyn Workflow<W>> {
        self.workflows.get(&msg_type).map(|w| w.as_ref())
    }

    /// Whether a workflow is registered for `msg_type`.
    pub fn contains(&self, msg_type: u16) -> bool {
        self.workflows.contains_key(&msg_type)
    }

    /// Number of registered workflows.
    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

impl<W: Wire> Default for Registry<W> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::handler::{BoxFuture, Context};
    use crate::messages::{Ping, Success, msg_type};
    use tokio::io::DuplexStream;

    struct NullFlow;

    impl<W: Wire> TypedHandler<W> for NullFlow {
        type Req = Ping;
        type Reply = Success;

        fn handle<'a>(
            &'a self,
            _ctx: &'a mut Context<W>,
            _req: Ping,
        ) -> BoxFuture<'a, Result<Option<Success>>> {
            Box::pin(async move { Ok(None) })
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry: Registry<DuplexStream> = Registry::new();
        registry.register_typed(NullFlow);

        assert!(registry.get(msg_type::PING).is_some());
        assert!(registry.contains(msg_type::PING));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_miss() {
        let registry: Registry<DuplexStream> = Registry::new();
        assert!(registry.get(0xFFFF).is_none());
        assert!(registry.is_empty());
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn test_duplicate_registration_is_fatal() {
        let mut registry: Registry<DuplexStream> = Registry::new();
        registry.register_typed(NullFlow);
        registry.register_typed(NullFlow);
    }

    #[test]
    fn test_distinct_tags_never_conflict() {
        let mut registry: Registry<DuplexStream> = Registry::new();
        registry.register_typed(NullFlow);
        registry.add_deferred(msg_type::CHANGE_PIN, || {
            Box::new(TypedWorkflow::new(NullFlow))
        });

        assert_eq!(registry.len(), 2);
        assert!(registry.get(msg_type::PING).is_some());
        assert!(registry.get(msg_type::CHANGE_PIN).is_some());
    }
}
