//! Scoped secure-credential handles.
//!
//! Workflows that sign or derive keys acquire a [`Keychain`] for their
//! namespace at dispatch time and hold it for exactly one invocation. Release
//! is tied to `Drop`, so it runs on every exit path - success, domain failure
//! or fault - without any explicit bookkeeping in workflow code. The store
//! behind the handle is an external collaborator; only the acquisition and
//! release contract lives here.

use crate::error::Result;
use crate::handler::{BoxFuture, Context};
use crate::protocol::Wire;

/// Credential material behind a keychain handle.
///
/// Implementations release their resources in `Drop`; the wrapping
/// [`Keychain`] guarantees that happens exactly once, when the owning workflow
/// invocation ends.
pub trait Credential: Send {
    /// Derive the node secret for a path under the acquired namespace.
    fn derive(&self, path: &[u32]) -> Result<Vec<u8>>;
}

/// Per-invocation secure-credential handle.
///
/// Owned by the workflow invocation that acquired it and never outlives it.
pub struct Keychain {
    inner: Box<dyn Credential>,
}

impl Keychain {
    /// Wrap acquired credential material.
    pub fn new(inner: Box<dyn Credential>) -> Self {
        Self { inner }
    }

    /// Derive the node secret for a path under the acquired namespace.
    pub fn derive(&self, path: &[u32]) -> Result<Vec<u8>> {
        self.inner.derive(path)
    }
}

/// External store that hands out scoped credential handles.
///
/// Acquisition may be interactive (e.g. a passphrase prompt over the wire),
/// hence the context parameter.
pub trait KeychainProvider<W: Wire>: Send + Sync {
    /// Acquire a credential handle scoped to `namespace`.
    fn acquire<'a>(
        &'a self,
        ctx: &'a mut Context<W>,
        namespace: &'a [u32],
    ) -> BoxFuture<'a, Result<Keychain>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CountingCredential {
        released: Arc<AtomicUsize>,
    }

    impl Credential for CountingCredential {
        fn derive(&self, _path: &[u32]) -> Result<Vec<u8>> {
            Ok(vec![0u8; 32])
        }
    }

    impl Drop for CountingCredential {
        fn drop(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_release_runs_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let keychain = Keychain::new(Box::new(CountingCredential {
            released: released.clone(),
        }));

        assert!(keychain.derive(&[44, 0]).is_ok());
        assert_eq!(released.load(Ordering::SeqCst), 0);

        drop(keychain);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
