//! Actions, reason codes and the externally visible cover state.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Physical action the engine wants applied to a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Open,
    Close,
    Shade,
    Tilt,
    Stop,
    NoOp,
}

impl Action {
    /// `true` for every action that moves (or halts) the cover.
    #[must_use]
    pub fn is_actuation(self) -> bool {
        !matches!(self, Self::NoOp)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::Shade => "shade",
            Self::Tilt => "tilt",
            Self::Stop => "stop",
            Self::NoOp => "no_op",
        };
        f.write_str(s)
    }
}

/// Why the engine picked its target action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    ManualOverrideActive,
    ForcedShading,
    ForcedOpen,
    ForcedClose,
    ShadeGateClosed,
    VentilationWindow,
    VentilationEndBlocked,
    VentilationEnded,
    BrightnessShading,
    ShadeReleaseBlocked,
    ShadingReleased,
    ScheduledOpen,
    ScheduledClose,
    ResidentAsleep,
    LockoutProtection,
    NoTriggerConditionMet,
    DispatchFailed,
}

impl ReasonCode {
    /// Reasons that keep the cover in (or holding) its ventilation position.
    #[must_use]
    pub fn is_ventilation(self) -> bool {
        matches!(self, Self::VentilationWindow | Self::VentilationEndBlocked)
    }

    /// Reasons after which shading counts as engaged.
    #[must_use]
    pub fn engages_shading(self) -> bool {
        matches!(
            self,
            Self::BrightnessShading | Self::ForcedShading | Self::ShadeReleaseBlocked
        )
    }

    /// Short human readable explanation.
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::ManualOverrideActive => "automation paused by manual override",
            Self::ForcedShading => "shading activated on request",
            Self::ForcedOpen => "opened on request",
            Self::ForcedClose => "closed on request",
            Self::ShadeGateClosed => "shading requested but the shade-in gate is closed",
            Self::VentilationWindow => "ventilation requested",
            Self::VentilationEndBlocked => "ventilation ended but the vent-stop gate is closed",
            Self::VentilationEnded => "ventilation ended, previous position restored",
            Self::BrightnessShading => "bright sun on the facade",
            Self::ShadeReleaseBlocked => "shading would end but the shade-out gate is closed",
            Self::ShadingReleased => "shading conditions no longer hold",
            Self::ScheduledOpen => "inside an opening window",
            Self::ScheduledClose => "inside a closing window",
            Self::ResidentAsleep => "resident is asleep",
            Self::LockoutProtection => "closing blocked by an open door",
            Self::NoTriggerConditionMet => "no rule applies",
            Self::DispatchFailed => "the actuator did not confirm the command",
        }
    }
}

impl fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Externally visible state of a cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CoverState {
    #[default]
    Idle,
    Open,
    Closed,
    Shaded,
    Ventilating,
    Paused,
}

impl CoverState {
    /// Derive the visible state from the pause status and the last action the
    /// actuator confirmed.
    #[must_use]
    pub fn derive(paused: bool, last_applied: Option<Action>) -> Self {
        if paused {
            return Self::Paused;
        }
        match last_applied {
            Some(Action::Open) => Self::Open,
            Some(Action::Close) => Self::Closed,
            Some(Action::Shade) => Self::Shaded,
            Some(Action::Tilt | Action::Stop) => Self::Ventilating,
            Some(Action::NoOp) | None => Self::Idle,
        }
    }
}
