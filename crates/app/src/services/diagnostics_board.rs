use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, PoisonError, RwLock};

use coverctl_domain::diagnostics::Diagnostics;
use coverctl_domain::error::CoverError;
use coverctl_domain::id::CoverId;

use crate::event_bus::InProcessEventBus;
use crate::ports::DiagnosticsPublisher;

/// Keeps the latest diagnostics record per cover and forwards every record
/// to the event bus.
pub struct DiagnosticsBoard {
    latest: RwLock<BTreeMap<CoverId, Diagnostics>>,
    bus: Arc<InProcessEventBus>,
}

impl DiagnosticsBoard {
    #[must_use]
    pub fn new(bus: Arc<InProcessEventBus>) -> Self {
        Self {
            latest: RwLock::new(BTreeMap::new()),
            bus,
        }
    }

    #[must_use]
    pub fn latest(&self, id: &CoverId) -> Option<Diagnostics> {
        let latest = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        latest.get(id).cloned()
    }

    /// Latest record of every cover, ordered by id.
    #[must_use]
    pub fn all(&self) -> Vec<Diagnostics> {
        let latest = self.latest.read().unwrap_or_else(PoisonError::into_inner);
        latest.values().cloned().collect()
    }

    #[must_use]
    pub fn bus(&self) -> &Arc<InProcessEventBus> {
        &self.bus
    }
}

impl DiagnosticsPublisher for DiagnosticsBoard {
    fn publish(
        &self,
        diagnostics: Diagnostics,
    ) -> impl Future<Output = Result<(), CoverError>> + Send {
        self.latest
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(diagnostics.cover_id.clone(), diagnostics.clone());
        self.bus.publish(diagnostics)
    }
}
