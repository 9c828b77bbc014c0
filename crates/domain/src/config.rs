//! Cover configuration: immutable per cover, validated at load.

use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::error::{CoverError, ValidationError};
use crate::id::{CoverId, EntityRef};
use crate::overrides::Gate;
use crate::schedule::{WindowKind, WindowSpec};
use crate::sensor::SensorSource;
use crate::time::TimeOfDay;

/// Target positions in percent, `0` fully closed, `100` fully open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Positions {
    pub open: u8,
    pub close: u8,
    pub shade: u8,
    pub tilt: u8,
}

impl Default for Positions {
    fn default() -> Self {
        Self {
            open: 100,
            close: 0,
            shade: 25,
            tilt: 30,
        }
    }
}

impl Positions {
    /// Position an action drives the cover to. `Stop` and `NoOp` have none.
    #[must_use]
    pub fn for_action(&self, action: Action) -> Option<u8> {
        match action {
            Action::Open => Some(self.open),
            Action::Close => Some(self.close),
            Action::Shade => Some(self.shade),
            Action::Tilt => Some(self.tilt),
            Action::Stop | Action::NoOp => None,
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("open", self.open),
            ("close", self.close),
            ("shade", self.shade),
            ("tilt", self.tilt),
        ] {
            if value > 100 {
                return Err(ValidationError::PositionOutOfRange { field, value });
            }
        }
        Ok(())
    }
}

/// Azimuth sector (degrees clockwise from north) the facade faces.
/// `start > end` means the sector contains north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AzimuthRange {
    pub start: f64,
    pub end: f64,
}

impl AzimuthRange {
    #[must_use]
    pub fn contains(&self, azimuth: f64) -> bool {
        if self.start <= self.end {
            (self.start..=self.end).contains(&azimuth)
        } else {
            azimuth >= self.start || azimuth <= self.end
        }
    }
}

/// Thresholds for sun protection. Engaging uses the enter thresholds,
/// holding uses `enter - margin`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadingConfig {
    /// Lux at or above which shading engages.
    pub brightness_enter: f64,
    pub brightness_margin: f64,
    /// Sun elevation in degrees at or above which shading engages.
    pub elevation_enter: f64,
    pub elevation_margin: f64,
    pub elevation_max: Option<f64>,
    pub azimuth: Option<AzimuthRange>,
    pub brightness_sensor: SensorSource,
}

impl Default for ShadingConfig {
    fn default() -> Self {
        Self {
            brightness_enter: 30_000.0,
            brightness_margin: 5_000.0,
            elevation_enter: 10.0,
            elevation_margin: 2.0,
            elevation_max: None,
            azimuth: None,
            brightness_sensor: SensorSource::Unconfigured,
        }
    }
}

impl ShadingConfig {
    #[must_use]
    pub fn brightness_exit(&self) -> f64 {
        self.brightness_enter - self.brightness_margin
    }

    #[must_use]
    pub fn elevation_exit(&self) -> f64 {
        self.elevation_enter - self.elevation_margin
    }

    fn validate(&self) -> Result<(), ValidationError> {
        for (field, value) in [
            ("brightness_enter", self.brightness_enter),
            ("elevation_enter", self.elevation_enter),
        ] {
            if !value.is_finite() {
                return Err(ValidationError::NonFinite { field });
            }
        }
        for (field, value) in [
            ("brightness", self.brightness_margin),
            ("elevation", self.elevation_margin),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::NonPositiveMargin { field, value });
            }
        }
        if let Some(max) = self.elevation_max
            && (!max.is_finite() || !(-90.0..=90.0).contains(&max))
        {
            return Err(ValidationError::ElevationOutOfRange { value: max });
        }
        if let Some(range) = self.azimuth {
            for value in [range.start, range.end] {
                if !value.is_finite() || !(0.0..=360.0).contains(&value) {
                    return Err(ValidationError::AzimuthOutOfRange { value });
                }
            }
        }
        Ok(())
    }
}

/// What the cover does while ventilating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VentilationMode {
    /// Move to the tilt position.
    #[default]
    Tilt,
    /// Halt wherever the cover is.
    Stop,
}

impl VentilationMode {
    #[must_use]
    pub fn action(self) -> Action {
        match self {
            Self::Tilt => Action::Tilt,
            Self::Stop => Action::Stop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VentilationConfig {
    pub windows: Vec<WindowSpec>,
    pub mode: VentilationMode,
    /// Flag entity requesting ventilation regardless of windows.
    pub flag: SensorSource,
}

/// How a door or window contact affects the cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContactRole {
    /// Fully opened door: vetoes ventilation and shading, blocks closing.
    Full,
    /// Tilted window: requests ventilation.
    Tilt,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactSensor {
    pub entity: EntityRef,
    pub role: ContactRole,
}

/// Condition entities guarding each gate. Unconfigured gates are open.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GateSources {
    pub open: SensorSource,
    pub close: SensorSource,
    pub vent_start: SensorSource,
    pub vent_stop: SensorSource,
    pub shade_in: SensorSource,
    pub shade_out: SensorSource,
    pub shade_tilt: SensorSource,
}

impl GateSources {
    #[must_use]
    pub fn source(&self, gate: Gate) -> &SensorSource {
        match gate {
            Gate::Open => &self.open,
            Gate::Close => &self.close,
            Gate::VentStart => &self.vent_start,
            Gate::VentStop => &self.vent_stop,
            Gate::ShadeIn => &self.shade_in,
            Gate::ShadeOut => &self.shade_out,
            Gate::ShadeTilt => &self.shade_tilt,
        }
    }

    fn source_mut(&mut self, gate: Gate) -> &mut SensorSource {
        match gate {
            Gate::Open => &mut self.open,
            Gate::Close => &mut self.close,
            Gate::VentStart => &mut self.vent_start,
            Gate::VentStop => &mut self.vent_stop,
            Gate::ShadeIn => &mut self.shade_in,
            Gate::ShadeOut => &mut self.shade_out,
            Gate::ShadeTilt => &mut self.shade_tilt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceSources {
    pub vacation: SensorSource,
    pub resident_asleep: SensorSource,
    pub workday: SensorSource,
}

/// When a pause triggered by an external move ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ResetMode {
    /// After the configured number of minutes.
    #[default]
    Timeout,
    /// At the next occurrence of a local time.
    At { time: TimeOfDay },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ManualOverrideConfig {
    pub minutes: u32,
    pub reset: ResetMode,
    /// How long an activated shading holds off automation.
    pub shading_hold_minutes: u32,
}

impl Default for ManualOverrideConfig {
    fn default() -> Self {
        Self {
            minutes: 120,
            reset: ResetMode::Timeout,
            shading_hold_minutes: 60,
        }
    }
}

/// Per-cover automation switches. Each one turns a whole rule family off
/// without touching its configuration. Explicit commands ignore them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Automation {
    /// Scheduled opening, and opening after shading ends.
    pub open: bool,
    /// Scheduled closing, resident asleep, and closing after shading ends.
    pub close: bool,
    pub shading: bool,
    pub ventilation: bool,
}

impl Default for Automation {
    fn default() -> Self {
        Self {
            open: true,
            close: true,
            shading: true,
            ventilation: true,
        }
    }
}

/// Everything the engine needs to know about one cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoverConfig {
    pub id: CoverId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub positions: Positions,
    #[serde(default)]
    pub opening: Vec<WindowSpec>,
    #[serde(default)]
    pub closing: Vec<WindowSpec>,
    #[serde(default)]
    pub ventilation: VentilationConfig,
    #[serde(default)]
    pub shading: ShadingConfig,
    #[serde(default)]
    pub gates: GateSources,
    #[serde(default)]
    pub contacts: Vec<ContactSensor>,
    /// Seconds a contact must stay open before it counts.
    #[serde(default)]
    pub contact_delay_seconds: u32,
    #[serde(default)]
    pub presence: PresenceSources,
    #[serde(default)]
    pub manual_override: ManualOverrideConfig,
    #[serde(default)]
    pub automation: Automation,
    /// An open full contact blocks closing.
    #[serde(default = "default_true")]
    pub lockout_protection: bool,
    /// Vacation mode suppresses scheduled opening.
    #[serde(default = "default_true")]
    pub vacation_keeps_closed: bool,
}

fn default_true() -> bool {
    true
}

impl CoverConfig {
    /// Create a builder for constructing a [`CoverConfig`].
    #[must_use]
    pub fn builder(id: CoverId) -> CoverConfigBuilder {
        CoverConfigBuilder::new(id)
    }

    /// Check domain invariants.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::Validation`] when:
    /// - a position is above 100 ([`ValidationError::PositionOutOfRange`])
    /// - a shading threshold is not finite or a margin is not positive
    /// - a window is empty, has an empty weekday list or an invalid anchor
    /// - the manual override duration is zero ([`ValidationError::NonPositiveDuration`])
    pub fn validate(&self) -> Result<(), CoverError> {
        self.positions.validate()?;
        self.shading.validate()?;
        for kind in [WindowKind::Opening, WindowKind::Closing, WindowKind::Ventilation] {
            for (index, window) in self.windows(kind).iter().enumerate() {
                window.validate(kind, index)?;
            }
        }
        if self.manual_override.minutes == 0 || self.manual_override.shading_hold_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration.into());
        }
        Ok(())
    }

    /// Display name, falling back to the id.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }

    #[must_use]
    pub fn windows(&self, kind: WindowKind) -> &[WindowSpec] {
        match kind {
            WindowKind::Opening => &self.opening,
            WindowKind::Closing => &self.closing,
            WindowKind::Ventilation => &self.ventilation.windows,
        }
    }

    /// Every entity whose change can alter this cover's decision.
    #[must_use]
    pub fn referenced_entities(&self) -> Vec<&EntityRef> {
        let mut entities: Vec<&EntityRef> = Gate::ALL
            .iter()
            .filter_map(|gate| self.gates.source(*gate).entity())
            .chain(self.shading.brightness_sensor.entity())
            .chain(self.ventilation.flag.entity())
            .chain(self.presence.vacation.entity())
            .chain(self.presence.resident_asleep.entity())
            .chain(self.presence.workday.entity())
            .chain(self.contacts.iter().map(|contact| &contact.entity))
            .collect();
        entities.sort();
        entities.dedup();
        entities
    }
}

/// Step-by-step builder for [`CoverConfig`].
#[derive(Debug)]
pub struct CoverConfigBuilder {
    config: CoverConfig,
}

impl CoverConfigBuilder {
    fn new(id: CoverId) -> Self {
        Self {
            config: CoverConfig {
                name: id.to_string(),
                id,
                positions: Positions::default(),
                opening: Vec::new(),
                closing: Vec::new(),
                ventilation: VentilationConfig::default(),
                shading: ShadingConfig::default(),
                gates: GateSources::default(),
                contacts: Vec::new(),
                contact_delay_seconds: 0,
                presence: PresenceSources::default(),
                manual_override: ManualOverrideConfig::default(),
                automation: Automation::default(),
                lockout_protection: true,
                vacation_keeps_closed: true,
            },
        }
    }

    #[must_use]
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    #[must_use]
    pub fn positions(mut self, positions: Positions) -> Self {
        self.config.positions = positions;
        self
    }

    #[must_use]
    pub fn opening(mut self, window: WindowSpec) -> Self {
        self.config.opening.push(window);
        self
    }

    #[must_use]
    pub fn closing(mut self, window: WindowSpec) -> Self {
        self.config.closing.push(window);
        self
    }

    #[must_use]
    pub fn ventilation_window(mut self, window: WindowSpec) -> Self {
        self.config.ventilation.windows.push(window);
        self
    }

    #[must_use]
    pub fn ventilation_mode(mut self, mode: VentilationMode) -> Self {
        self.config.ventilation.mode = mode;
        self
    }

    #[must_use]
    pub fn ventilation_flag(mut self, entity: EntityRef) -> Self {
        self.config.ventilation.flag = SensorSource::Configured(entity);
        self
    }

    #[must_use]
    pub fn shading(mut self, shading: ShadingConfig) -> Self {
        self.config.shading = shading;
        self
    }

    #[must_use]
    pub fn brightness_sensor(mut self, entity: EntityRef) -> Self {
        self.config.shading.brightness_sensor = SensorSource::Configured(entity);
        self
    }

    #[must_use]
    pub fn gate(mut self, gate: Gate, entity: EntityRef) -> Self {
        *self.config.gates.source_mut(gate) = SensorSource::Configured(entity);
        self
    }

    #[must_use]
    pub fn contact(mut self, entity: EntityRef, role: ContactRole) -> Self {
        self.config.contacts.push(ContactSensor { entity, role });
        self
    }

    #[must_use]
    pub fn contact_delay_seconds(mut self, seconds: u32) -> Self {
        self.config.contact_delay_seconds = seconds;
        self
    }

    #[must_use]
    pub fn vacation(mut self, entity: EntityRef) -> Self {
        self.config.presence.vacation = SensorSource::Configured(entity);
        self
    }

    #[must_use]
    pub fn resident_asleep(mut self, entity: EntityRef) -> Self {
        self.config.presence.resident_asleep = SensorSource::Configured(entity);
        self
    }

    #[must_use]
    pub fn workday(mut self, entity: EntityRef) -> Self {
        self.config.presence.workday = SensorSource::Configured(entity);
        self
    }

    #[must_use]
    pub fn manual_override(mut self, settings: ManualOverrideConfig) -> Self {
        self.config.manual_override = settings;
        self
    }

    #[must_use]
    pub fn automation(mut self, automation: Automation) -> Self {
        self.config.automation = automation;
        self
    }

    #[must_use]
    pub fn lockout_protection(mut self, enabled: bool) -> Self {
        self.config.lockout_protection = enabled;
        self
    }

    #[must_use]
    pub fn vacation_keeps_closed(mut self, enabled: bool) -> Self {
        self.config.vacation_keeps_closed = enabled;
        self
    }

    /// Consume the builder, validate, and return a [`CoverConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::Validation`] if any invariant fails.
    pub fn build(self) -> Result<CoverConfig, CoverError> {
        self.config.validate()?;
        Ok(self.config)
    }
}
