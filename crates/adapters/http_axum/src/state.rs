//! Shared application state for axum handlers.

use std::sync::Arc;

use coverctl_app::event_bus::InProcessEventBus;
use coverctl_app::services::cover_service::CoverService;

/// Application state shared across all axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub cover_service: Arc<CoverService>,
    /// Bus the diagnostics stream subscribes to.
    pub event_bus: Arc<InProcessEventBus>,
}

impl AppState {
    pub fn new(cover_service: Arc<CoverService>, event_bus: Arc<InProcessEventBus>) -> Self {
        Self {
            cover_service,
            event_bus,
        }
    }

    /// Take the bus from the service's diagnostics board.
    pub fn from_service(cover_service: Arc<CoverService>) -> Self {
        let event_bus = Arc::clone(cover_service.board().bus());
        Self::new(cover_service, event_bus)
    }
}
