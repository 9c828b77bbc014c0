//! Environment snapshot: the sensor picture one evaluation decides on.
//!
//! Captured fresh for every evaluation and never persisted. Unknown values
//! are kept as `None` so the engine can apply its own fail-open or
//! fail-closed policy per rule.

use chrono::TimeDelta;
use serde::Serialize;

use crate::config::{ContactRole, CoverConfig};
use crate::id::EntityRef;
use crate::sensor::{SensorLookup, SensorSource, SunState};
use crate::time::Timestamp;

/// Brightness as seen by one cover.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "status", content = "lux", rename_all = "snake_case")]
pub enum Brightness {
    /// No sensor configured, the brightness condition always holds.
    Unconfigured,
    /// A sensor is configured but has no usable value.
    Unknown,
    Lux(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnvironmentSnapshot {
    pub now: Timestamp,
    pub brightness: Brightness,
    pub sun: Option<SunState>,
    pub vacation: bool,
    pub resident_asleep: bool,
    pub workday: Option<bool>,
    /// Full contacts open for at least the contact delay.
    pub full_contacts: Vec<EntityRef>,
    /// Tilt contacts open for at least the contact delay.
    pub tilt_contacts: Vec<EntityRef>,
    /// Earliest moment a contact that is open but still inside its delay
    /// starts to count.
    pub pending_contact_at: Option<Timestamp>,
    pub ventilation_flag: bool,
}

impl EnvironmentSnapshot {
    /// A quiet environment: no sensors, no sun data, nobody home.
    #[must_use]
    pub fn at(now: Timestamp) -> Self {
        Self {
            now,
            brightness: Brightness::Unconfigured,
            sun: None,
            vacation: false,
            resident_asleep: false,
            workday: None,
            full_contacts: Vec::new(),
            tilt_contacts: Vec::new(),
            pending_contact_at: None,
            ventilation_flag: false,
        }
    }

    /// Read every sensor the cover references.
    ///
    /// Unavailable vacation, asleep and ventilation-flag sensors read as off.
    pub fn capture(
        config: &CoverConfig,
        sun: &SensorSource,
        readings: &impl SensorLookup,
        now: Timestamp,
    ) -> Self {
        let brightness = match &config.shading.brightness_sensor {
            SensorSource::Unconfigured => Brightness::Unconfigured,
            source => source
                .read(readings)
                .and_then(|reading| reading.value.as_number())
                .map_or(Brightness::Unknown, Brightness::Lux),
        };

        let delay = TimeDelta::seconds(i64::from(config.contact_delay_seconds));
        let mut full_contacts = Vec::new();
        let mut tilt_contacts = Vec::new();
        let mut pending_contact_at: Option<Timestamp> = None;
        for contact in &config.contacts {
            let Some(reading) = readings.reading(&contact.entity) else {
                continue;
            };
            if reading.value.as_bool() != Some(true) {
                continue;
            }
            if now - reading.last_changed < delay {
                if let Some(at) = reading.last_changed.checked_add_signed(delay) {
                    pending_contact_at = Some(pending_contact_at.map_or(at, |prev| prev.min(at)));
                }
                continue;
            }
            match contact.role {
                ContactRole::Full => full_contacts.push(contact.entity.clone()),
                ContactRole::Tilt => tilt_contacts.push(contact.entity.clone()),
            }
        }

        Self {
            now,
            brightness,
            sun: sun.read(readings).and_then(|reading| reading.value.as_sun()),
            vacation: config.presence.vacation.read_bool(readings) == Some(true),
            resident_asleep: config.presence.resident_asleep.read_bool(readings) == Some(true),
            workday: config.presence.workday.read_bool(readings),
            full_contacts,
            tilt_contacts,
            pending_contact_at,
            ventilation_flag: config.ventilation.flag.read_bool(readings) == Some(true),
        }
    }

    #[must_use]
    pub fn full_contact_open(&self) -> bool {
        !self.full_contacts.is_empty()
    }

    #[must_use]
    pub fn tilt_contact_open(&self) -> bool {
        !self.tilt_contacts.is_empty()
    }
}
