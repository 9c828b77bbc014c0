//! Shared fixtures for handler tests.

use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::response::Response;
use chrono::{TimeZone, Utc};

use coverctl_app::controller::ControllerSettings;
use coverctl_app::event_bus::InProcessEventBus;
use coverctl_app::ports::{Actuator, ActuatorError, Clock, CoverCommand};
use coverctl_app::sensor_store::SensorStore;
use coverctl_app::services::cover_service::{CoverService, ServiceRuntime};
use coverctl_app::services::diagnostics_board::DiagnosticsBoard;
use coverctl_domain::config::CoverConfig;
use coverctl_domain::id::{CoverId, EntityRef};
use coverctl_domain::schedule::WindowSpec;
use coverctl_domain::site::Site;
use coverctl_domain::time::{TimeOfDay, Timestamp};

use crate::state::AppState;

#[derive(Clone, Copy)]
pub struct StubActuator;

impl Actuator for StubActuator {
    async fn set_position(&self, _cover: &CoverId, _command: CoverCommand) -> Result<(), ActuatorError> {
        Ok(())
    }
}

pub struct FixedClock;

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        Utc.with_ymd_and_hms(2024, 5, 6, 22, 0, 0).unwrap()
    }
}

fn office() -> CoverConfig {
    CoverConfig::builder(CoverId::new("office").unwrap())
        .name("Office")
        .opening(WindowSpec::between(
            TimeOfDay::hm(7, 0).unwrap(),
            TimeOfDay::hm(21, 0).unwrap(),
        ))
        .closing(WindowSpec::between(
            TimeOfDay::hm(21, 0).unwrap(),
            TimeOfDay::hm(7, 0).unwrap(),
        ))
        .brightness_sensor(EntityRef::new("sensor.lux").unwrap())
        .build()
        .unwrap()
}

/// One cover named `office`, automation disabled so nothing runs unasked.
pub fn test_state() -> AppState {
    let bus = Arc::new(InProcessEventBus::new(16));
    let service = CoverService::start(
        vec![office()],
        &Site::default(),
        StubActuator,
        ServiceRuntime {
            sensors: SensorStore::new(),
            board: Arc::new(DiagnosticsBoard::new(Arc::clone(&bus))),
            clock: Arc::new(FixedClock),
            settings: ControllerSettings::default(),
            enabled: false,
        },
    )
    .unwrap();
    AppState::new(Arc::new(service), bus)
}

pub async fn json_body(response: Response<Body>) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}
