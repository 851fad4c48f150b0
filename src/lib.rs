//! # coldwire
//!
//! Wire-protocol session layer for an embedded hardware wallet.
//!
//! The crate multiplexes one physical interface into discrete, typed
//! request/response exchanges ("workflows") while the device performs
//! security-sensitive, user-confirmed operations. A second, unexpected request
//! arriving mid-workflow interrupts the pending wait and is re-dispatched
//! without losing a byte off the wire; no workflow failure ever tears the
//! session down.
//!
//! ## Architecture
//!
//! - **Protocol**: 10-byte big-endian frame header (session id, type tag,
//!   payload length) plus streaming frame readers/writers
//! - **Context**: per-session facade - `write`, `read`, `call`, and the
//!   interruptible `wait` race
//! - **Registry + adapters**: boot-time dispatch table; typed decode,
//!   credential scoping and deferred resolution compose around each handler
//! - **Session handler**: the perpetual per-interface loop that dispatches,
//!   recovers from interruption and logs failures
//!
//! ## Example
//!
//! ```ignore
//! use coldwire::{Registry, SessionHandler};
//! use coldwire::flows::ChangePinFlow;
//!
//! let mut registry = Registry::new();
//! registry.register_typed(ChangePinFlow::new(config, ui));
//!
//! let session = SessionHandler::builder(registry)
//!     .interface(0)
//!     .build(interface_stream);
//! session.run().await?;
//! ```

pub mod codec;
pub mod error;
pub mod flows;
pub mod handler;
pub mod keychain;
pub mod messages;
pub mod protocol;
pub mod session;

pub use error::{Result, WireError};
pub use handler::{Context, Registry, TypedHandler, Workflow};
pub use protocol::Wire;
pub use session::{SessionBuilder, SessionHandler, SessionHooks};
