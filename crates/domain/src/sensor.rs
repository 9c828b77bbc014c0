//! Sensor values, readings and optional sensor sources.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::id::EntityRef;
use crate::time::Timestamp;

/// Position of the sun as reported by a sun entity or the ephemeris.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunState {
    /// Degrees above the horizon.
    pub elevation: f64,
    /// Degrees clockwise from north.
    pub azimuth: f64,
    /// `true` before solar noon.
    pub rising: bool,
}

/// Latest value published by a sensor entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SensorValue {
    On,
    Off,
    Number(f64),
    Sun(SunState),
    Unavailable,
}

impl SensorValue {
    /// Binary interpretation; `None` when the value is not a binary state.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::On => Some(true),
            Self::Off => Some(false),
            _ => None,
        }
    }

    /// Numeric interpretation; `None` for non-finite or non-numeric values.
    #[must_use]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) if n.is_finite() => Some(*n),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_sun(&self) -> Option<SunState> {
        match self {
            Self::Sun(sun) if sun.elevation.is_finite() => Some(*sun),
            _ => None,
        }
    }
}

/// A value together with the instant it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub value: SensorValue,
    pub last_changed: Timestamp,
}

/// Read access to the latest sensor readings.
pub trait SensorLookup {
    fn reading(&self, entity: &EntityRef) -> Option<&SensorReading>;
}

impl SensorLookup for HashMap<EntityRef, SensorReading> {
    fn reading(&self, entity: &EntityRef) -> Option<&SensorReading> {
        self.get(entity)
    }
}

/// An optional sensor. `Unconfigured` means the condition it guards is
/// always satisfied.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "Option<EntityRef>", into = "Option<EntityRef>")]
pub enum SensorSource {
    Configured(EntityRef),
    #[default]
    Unconfigured,
}

impl SensorSource {
    #[must_use]
    pub fn entity(&self) -> Option<&EntityRef> {
        match self {
            Self::Configured(entity) => Some(entity),
            Self::Unconfigured => None,
        }
    }

    #[must_use]
    pub fn is_configured(&self) -> bool {
        matches!(self, Self::Configured(_))
    }

    /// The current reading of the configured entity.
    ///
    /// `None` when unconfigured, never reported, or reported unavailable.
    pub fn read<'a>(&self, readings: &'a impl SensorLookup) -> Option<&'a SensorReading> {
        self.entity()
            .and_then(|entity| readings.reading(entity))
            .filter(|reading| reading.value != SensorValue::Unavailable)
    }

    /// Binary state of the configured entity, `None` when unknown.
    pub fn read_bool(&self, readings: &impl SensorLookup) -> Option<bool> {
        self.read(readings).and_then(|r| r.value.as_bool())
    }
}

impl From<Option<EntityRef>> for SensorSource {
    fn from(value: Option<EntityRef>) -> Self {
        value.map_or(Self::Unconfigured, Self::Configured)
    }
}

impl From<SensorSource> for Option<EntityRef> {
    fn from(value: SensorSource) -> Self {
        match value {
            SensorSource::Configured(entity) => Some(entity),
            SensorSource::Unconfigured => None,
        }
    }
}

impl From<EntityRef> for SensorSource {
    fn from(value: EntityRef) -> Self {
        Self::Configured(value)
    }
}
