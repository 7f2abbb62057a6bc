//! Cancellation signal passed into every session operation.

use super::errors::{AuthError, AuthResult};
use std::future::Future;
use tokio::sync::watch;

/// Fires a [`CancelSignal`]
#[derive(Debug)]
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Receiving side of a cancellation channel.
///
/// Reads are raced against the signal; writes only check it before they start,
/// so a write that has already been issued is never abandoned halfway.
#[derive(Debug, Clone, Default)]
pub struct CancelSignal {
    rx: Option<watch::Receiver<bool>>,
}

impl CancelSignal {
    /// Create a linked handle/signal pair
    pub fn new() -> (CancelHandle, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (CancelHandle { tx }, CancelSignal { rx: Some(rx) })
    }

    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().is_some_and(|rx| *rx.borrow())
    }

    /// Fail with `AuthError::Cancelled` if the signal has fired
    pub fn check(&self) -> AuthResult<()> {
        if self.is_cancelled() {
            return Err(AuthError::Cancelled);
        }
        Ok(())
    }

    /// Resolves once the signal fires; pending forever otherwise
    pub async fn cancelled(&self) {
        let Some(rx) = &self.rx else {
            return std::future::pending().await;
        };
        let mut rx = rx.clone();
        let fired = rx.wait_for(|cancelled| *cancelled).await.is_ok();
        if !fired {
            // Handle dropped without cancelling.
            std::future::pending::<()>().await;
        }
    }

    /// Run a read-only future unless the signal fires first
    pub async fn guard<F, T>(&self, future: F) -> AuthResult<T>
    where
        F: Future<Output = AuthResult<T>>,
    {
        self.check()?;
        tokio::select! {
            biased;
            _ = self.cancelled() => Err(AuthError::Cancelled),
            result = future => result,
        }
    }
}
