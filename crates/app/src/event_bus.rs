//! In-process diagnostics bus backed by a tokio broadcast channel.

use std::future::Future;

use tokio::sync::broadcast;

use coverctl_domain::diagnostics::Diagnostics;
use coverctl_domain::error::CoverError;

use crate::ports::DiagnosticsPublisher;

/// In-process bus using a tokio [`broadcast`] channel.
///
/// Publishing succeeds even when there are no active subscribers
/// (the record is simply dropped).
pub struct InProcessEventBus {
    sender: broadcast::Sender<Diagnostics>,
}

impl InProcessEventBus {
    /// Create a new bus with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to diagnostics published *after* this call.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Diagnostics> {
        self.sender.subscribe()
    }

    #[must_use]
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl DiagnosticsPublisher for InProcessEventBus {
    fn publish(
        &self,
        diagnostics: Diagnostics,
    ) -> impl Future<Output = Result<(), CoverError>> + Send {
        // send only fails without receivers
        let _ = self.sender.send(diagnostics);
        async { Ok(()) }
    }
}
