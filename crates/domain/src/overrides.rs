//! Override registry: gates, automation switches, manual pause and one-shot
//! forced actions.

use std::fmt;

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

use crate::config::{Automation, GateSources};
use crate::error::CommandError;
use crate::sensor::{SensorLookup, SensorSource};
use crate::time::Timestamp;

/// A permission the engine checks before choosing an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Gate {
    Open,
    Close,
    VentStart,
    VentStop,
    ShadeIn,
    ShadeOut,
    ShadeTilt,
}

impl Gate {
    pub const ALL: [Self; 7] = [
        Self::Open,
        Self::Close,
        Self::VentStart,
        Self::VentStop,
        Self::ShadeIn,
        Self::ShadeOut,
        Self::ShadeTilt,
    ];

    fn index(self) -> usize {
        match self {
            Self::Open => 0,
            Self::Close => 1,
            Self::VentStart => 2,
            Self::VentStop => 3,
            Self::ShadeIn => 4,
            Self::ShadeOut => 5,
            Self::ShadeTilt => 6,
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Open => "open",
            Self::Close => "close",
            Self::VentStart => "vent_start",
            Self::VentStop => "vent_stop",
            Self::ShadeIn => "shade_in",
            Self::ShadeOut => "shade_out",
            Self::ShadeTilt => "shade_tilt",
        };
        f.write_str(s)
    }
}

/// The seven gates, resolved once per evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gates([bool; 7]);

impl Default for Gates {
    fn default() -> Self {
        Self::all_open()
    }
}

impl Gates {
    #[must_use]
    pub fn all_open() -> Self {
        Self([true; 7])
    }

    /// Unconfigured gates are open; a configured gate is open only while its
    /// entity reports on. Unavailable entities close their gate.
    pub fn resolve(sources: &GateSources, readings: &impl SensorLookup) -> Self {
        let mut gates = Self::all_open();
        for gate in Gate::ALL {
            let source = sources.source(gate);
            if matches!(source, SensorSource::Configured(_)) {
                gates.0[gate.index()] = source.read_bool(readings) == Some(true);
            }
        }
        gates
    }

    #[must_use]
    pub fn get(&self, gate: Gate) -> bool {
        self.0[gate.index()]
    }

    #[must_use]
    pub fn with(mut self, gate: Gate, open: bool) -> Self {
        self.0[gate.index()] = open;
        self
    }

    /// Gates currently closed, for diagnostics.
    #[must_use]
    pub fn closed(&self) -> Vec<Gate> {
        Gate::ALL.into_iter().filter(|gate| !self.get(*gate)).collect()
    }
}

/// A one-shot command waiting for the next evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForcedAction {
    /// Shade, then pause for `hold` (the cover's shading hold when `None`).
    Shade { hold: Option<TimeDelta> },
    Open,
    Close,
}

/// Mutable override state of one cover.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverrideRegistry {
    manual_pause_until: Option<Timestamp>,
    forced: Option<ForcedAction>,
    automation: Automation,
    gates: Gates,
}

impl OverrideRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_automation(automation: Automation) -> Self {
        Self {
            automation,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn gate(&self, gate: Gate) -> bool {
        self.gates.get(gate)
    }

    #[must_use]
    pub fn gates(&self) -> Gates {
        self.gates
    }

    /// Replace the gates resolved for the current evaluation.
    pub fn refresh_gates(&mut self, gates: Gates) {
        self.gates = gates;
    }

    #[must_use]
    pub fn automation(&self) -> Automation {
        self.automation
    }

    pub fn set_automation(&mut self, automation: Automation) {
        self.automation = automation;
    }

    /// A pause in the past counts as unset.
    #[must_use]
    pub fn is_paused(&self, now: Timestamp) -> bool {
        self.paused_until(now).is_some()
    }

    /// End of the active pause, if any.
    #[must_use]
    pub fn paused_until(&self, now: Timestamp) -> Option<Timestamp> {
        self.manual_pause_until.filter(|until| *until > now)
    }

    /// Pause automation for `duration` from `now`.
    ///
    /// # Errors
    ///
    /// Returns [`CommandError::NonPositivePause`] for a zero or negative
    /// duration and [`CommandError::DurationOutOfRange`] when the end is not
    /// representable; the registry is left untouched.
    pub fn set_pause(
        &mut self,
        duration: TimeDelta,
        now: Timestamp,
    ) -> Result<Timestamp, CommandError> {
        let minutes = duration.num_minutes();
        if duration <= TimeDelta::zero() {
            return Err(CommandError::NonPositivePause { minutes });
        }
        let until = now
            .checked_add_signed(duration)
            .ok_or(CommandError::DurationOutOfRange { minutes })?;
        self.manual_pause_until = Some(until);
        Ok(until)
    }

    pub fn pause_until(&mut self, until: Timestamp) {
        self.manual_pause_until = Some(until);
    }

    pub fn cancel_pause(&mut self) {
        self.manual_pause_until = None;
    }

    /// Ask the next evaluation to shade, optionally for a custom hold.
    pub fn request_force_shade(&mut self, hold: Option<TimeDelta>) {
        self.request_forced(ForcedAction::Shade { hold });
    }

    /// Queue a forced action. A newer request replaces a pending one.
    pub fn request_forced(&mut self, action: ForcedAction) {
        self.forced = Some(action);
    }

    #[must_use]
    pub fn pending_forced(&self) -> Option<ForcedAction> {
        self.forced
    }

    /// Take the pending forced action, if any.
    pub fn take_forced(&mut self) -> Option<ForcedAction> {
        self.forced.take()
    }

    /// Finish a forced action chosen by the last evaluation.
    ///
    /// When the command was not issued the request is queued again, unless a
    /// newer one arrived meanwhile. An issued shade starts its hold pause.
    pub fn settle_forced(&mut self, action: ForcedAction, issued: bool, now: Timestamp) {
        if !issued {
            self.forced.get_or_insert(action);
            return;
        }
        if let ForcedAction::Shade { hold: Some(hold) } = action
            && let Some(until) = now.checked_add_signed(hold)
        {
            self.pause_until(until);
        }
    }
}
