//! Virtual sun: publishes the computed sun position as a sensor.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use coverctl_app::ports::Clock;
use coverctl_app::services::cover_service::CoverService;
use coverctl_domain::id::EntityRef;
use coverctl_domain::sensor::SensorValue;
use coverctl_domain::site::Location;
use coverctl_domain::sun;
use coverctl_domain::time::Timestamp;

/// Feeds a sun entity for sites without an external sun sensor.
#[derive(Debug, Clone)]
pub struct VirtualSun {
    location: Location,
    entity: EntityRef,
}

impl VirtualSun {
    #[must_use]
    pub fn new(location: Location, entity: EntityRef) -> Self {
        Self { location, entity }
    }

    #[must_use]
    pub fn entity(&self) -> &EntityRef {
        &self.entity
    }

    #[must_use]
    pub fn reading(&self, at: Timestamp) -> SensorValue {
        SensorValue::Sun(sun::position(self.location, at))
    }

    /// Push a fresh reading into the service every `interval`.
    pub fn spawn<C>(self, service: Arc<CoverService>, clock: C, interval: Duration) -> JoinHandle<()>
    where
        C: Clock + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(entity = %self.entity, ?interval, "virtual sun started");
            loop {
                ticker.tick().await;
                let value = self.reading(clock.now());
                let woken = service.handle_sensor_event(self.entity.clone(), value);
                tracing::trace!(entity = %self.entity, covers = woken.len(), "sun position published");
            }
        })
    }
}
