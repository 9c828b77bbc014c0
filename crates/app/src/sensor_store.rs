//! Shared store of the latest reading per sensor entity.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use coverctl_domain::id::EntityRef;
use coverctl_domain::sensor::{SensorReading, SensorValue};
use coverctl_domain::time::Timestamp;

/// Cheaply cloneable handle to the readings every controller reads from.
#[derive(Debug, Clone, Default)]
pub struct SensorStore {
    inner: Arc<RwLock<HashMap<EntityRef, SensorReading>>>,
}

impl SensorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a value. `last_changed` only moves when the value differs.
    ///
    /// Returns `true` when the value changed.
    pub fn update(&self, entity: EntityRef, value: SensorValue, at: Timestamp) -> bool {
        let mut readings = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        match readings.get_mut(&entity) {
            Some(reading) if reading.value == value => false,
            Some(reading) => {
                reading.value = value;
                reading.last_changed = at;
                true
            }
            None => {
                readings.insert(
                    entity,
                    SensorReading {
                        value,
                        last_changed: at,
                    },
                );
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, entity: &EntityRef) -> Option<SensorReading> {
        let readings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        readings.get(entity).copied()
    }

    /// Run `f` against a consistent view of every reading.
    pub fn with_readings<R>(&self, f: impl FnOnce(&HashMap<EntityRef, SensorReading>) -> R) -> R {
        let readings = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        f(&readings)
    }
}
