//! Notification producer contract
//!
//! A [`Listener`] posts the whole current set into `out` every time it
//! changes. [`crate::listener::PollListener`] is the canonical
//! implementation; the update coordinator accepts any other one.

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::traits::ObservableSet;

/// Producer of full observable sets on change
#[async_trait]
pub trait Listener: Send {
    /// Run until the source is exhausted, `out` is closed, or `cancel` fires
    ///
    /// Implementations must always post the whole new set, never a delta,
    /// and must not post two consecutive equal sets.
    async fn listen(&mut self, out: mpsc::Sender<ObservableSet>, cancel: CancellationToken);
}
