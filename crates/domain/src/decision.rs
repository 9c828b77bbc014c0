//! Decision engine: one authoritative target action per evaluation.
//!
//! Rules are checked in a fixed precedence order:
//!
//! 1. forced action (shade, open, close)
//! 2. manual pause
//! 3. ventilation
//! 4. shading in / hold
//! 5. shading out
//! 6. schedule (closing, resident asleep, opening)
//! 7. nothing to do
//!
//! The engine owns a small memory (shading engaged, last reason, the action
//! before ventilation started) so that shading uses hysteresis and
//! ventilation can hand the cover back to where it was. The automation
//! switches of the override registry mute whole rule families.

use std::sync::Arc;

use chrono::TimeDelta;
use serde::Serialize;

use crate::action::{Action, ReasonCode};
use crate::config::CoverConfig;
use crate::environment::{Brightness, EnvironmentSnapshot};
use crate::overrides::{ForcedAction, Gate, OverrideRegistry};
use crate::schedule::{ScheduleEvaluator, WindowKind};
use crate::time::Timestamp;

/// Outcome of one evaluation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    pub target_action: Action,
    pub reason: ReasonCode,
    pub next_open_at: Option<Timestamp>,
    pub next_close_at: Option<Timestamp>,
    /// Send even if the same action was applied last time.
    pub repeat: bool,
    pub evaluated_at: Timestamp,
    /// The forced action this decision carries out, with its hold resolved.
    /// Hand it back through [`OverrideRegistry::settle_forced`] once the
    /// dispatch outcome is known.
    #[serde(skip)]
    pub forced: Option<ForcedAction>,
}

/// What the engine remembers between evaluations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineMemory {
    pub shading_engaged: bool,
    pub last_reason: Option<ReasonCode>,
    /// Last actuation chosen before the current ventilation began.
    pub pre_ventilation: Option<Action>,
    pub last_actuation: Option<Action>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Verdict {
    action: Action,
    reason: ReasonCode,
    repeat: bool,
    forced: Option<ForcedAction>,
}

impl Verdict {
    fn new(action: Action, reason: ReasonCode) -> Self {
        Self {
            action,
            reason,
            repeat: false,
            forced: None,
        }
    }

    fn noop(reason: ReasonCode) -> Self {
        Self::new(Action::NoOp, reason)
    }
}

/// Decides for a single cover.
#[derive(Debug, Clone)]
pub struct DecisionEngine {
    config: Arc<CoverConfig>,
    schedule: ScheduleEvaluator,
    memory: EngineMemory,
}

impl DecisionEngine {
    #[must_use]
    pub fn new(config: Arc<CoverConfig>, schedule: ScheduleEvaluator) -> Self {
        Self {
            config,
            schedule,
            memory: EngineMemory::default(),
        }
    }

    #[must_use]
    pub fn config(&self) -> &CoverConfig {
        &self.config
    }

    #[must_use]
    pub fn memory(&self) -> &EngineMemory {
        &self.memory
    }

    /// Evaluate every rule for `env` and update the engine memory.
    ///
    /// Gates must already be refreshed on `overrides`. A pending forced
    /// action is taken; the caller settles it after dispatching.
    pub fn evaluate(
        &mut self,
        env: &EnvironmentSnapshot,
        overrides: &mut OverrideRegistry,
    ) -> Decision {
        let now = env.now;
        let forced = overrides.take_forced();
        let verdict = self.decide(env, overrides, forced);
        if verdict.reason != ReasonCode::ManualOverrideActive {
            self.remember(verdict);
        }
        Decision {
            target_action: verdict.action,
            reason: verdict.reason,
            next_open_at: self
                .schedule
                .next_start(WindowKind::Opening, &self.config, now, env.workday),
            next_close_at: self
                .schedule
                .next_start(WindowKind::Closing, &self.config, now, env.workday),
            repeat: verdict.repeat,
            evaluated_at: now,
            forced: verdict.forced,
        }
    }

    /// Earliest upcoming window boundary of any kind.
    #[must_use]
    pub fn next_boundary(&self, now: Timestamp, workday: Option<bool>) -> Option<Timestamp> {
        [
            WindowKind::Opening,
            WindowKind::Closing,
            WindowKind::Ventilation,
        ]
        .into_iter()
        .filter_map(|kind| self.schedule.next_boundary(kind, &self.config, now, workday))
        .min()
    }

    fn decide(
        &self,
        env: &EnvironmentSnapshot,
        overrides: &OverrideRegistry,
        forced: Option<ForcedAction>,
    ) -> Verdict {
        if let Some(forced) = forced {
            return self.forced(forced, env, overrides);
        }

        if overrides.is_paused(env.now) {
            return Verdict::noop(ReasonCode::ManualOverrideActive);
        }

        let window = self.schedule.classify(&self.config, env);

        let ending_ventilation = match self.ventilation(env, overrides) {
            Ventilation::Active(verdict) => return verdict,
            Ventilation::EndBlocked => {
                return Verdict::noop(ReasonCode::VentilationEndBlocked);
            }
            Ventilation::Ending => true,
            Ventilation::Idle => false,
        };

        if self.shading_holds(env, overrides) {
            return Verdict::new(Action::Shade, ReasonCode::BrightnessShading);
        }

        if self.memory.shading_engaged {
            if !overrides.gate(Gate::ShadeOut) {
                return Verdict::noop(ReasonCode::ShadeReleaseBlocked);
            }
            let action = self
                .release_target(window, env, overrides)
                .unwrap_or(Action::NoOp);
            return Verdict::new(action, ReasonCode::ShadingReleased);
        }

        if let Some(verdict) = self.schedule_rule(window, env, overrides) {
            return verdict;
        }

        if ending_ventilation {
            let restore = self
                .memory
                .pre_ventilation
                .filter(|action| !matches!(action, Action::Tilt | Action::Stop | Action::NoOp))
                .unwrap_or(Action::NoOp);
            return Verdict::new(restore, ReasonCode::VentilationEnded);
        }

        Verdict::noop(ReasonCode::NoTriggerConditionMet)
    }

    /// Forced actions run through a pause but still respect the shade-in
    /// gate and lockout protection.
    fn forced(
        &self,
        forced: ForcedAction,
        env: &EnvironmentSnapshot,
        overrides: &OverrideRegistry,
    ) -> Verdict {
        let (action, reason, forced) = match forced {
            ForcedAction::Shade { hold } => {
                if !overrides.gate(Gate::ShadeIn) {
                    return Verdict::noop(ReasonCode::ShadeGateClosed);
                }
                let hold = hold.unwrap_or_else(|| {
                    TimeDelta::minutes(i64::from(self.config.manual_override.shading_hold_minutes))
                });
                let forced = ForcedAction::Shade { hold: Some(hold) };
                (Action::Shade, ReasonCode::ForcedShading, forced)
            }
            ForcedAction::Open => (Action::Open, ReasonCode::ForcedOpen, forced),
            ForcedAction::Close => {
                if self.locked_out(env) {
                    return Verdict::noop(ReasonCode::LockoutProtection);
                }
                (Action::Close, ReasonCode::ForcedClose, forced)
            }
        };
        Verdict {
            action,
            reason,
            repeat: true,
            forced: Some(forced),
        }
    }

    fn ventilation(&self, env: &EnvironmentSnapshot, overrides: &OverrideRegistry) -> Ventilation {
        let requested = overrides.automation().ventilation
            && (env.ventilation_flag
                || env.tilt_contact_open()
                || self.schedule.in_window(WindowKind::Ventilation, &self.config, env));
        let locked = env.vacation || env.full_contact_open();

        if requested && !locked && overrides.gate(Gate::VentStart) {
            let action = self.config.ventilation.mode.action();
            return Ventilation::Active(Verdict::new(action, ReasonCode::VentilationWindow));
        }

        let was_ventilating = self
            .memory
            .last_reason
            .is_some_and(ReasonCode::is_ventilation);
        if !was_ventilating {
            Ventilation::Idle
        } else if overrides.gate(Gate::VentStop) {
            Ventilation::Ending
        } else {
            Ventilation::EndBlocked
        }
    }

    /// Whether shading should be on. Uses the exit thresholds while engaged.
    fn shading_holds(&self, env: &EnvironmentSnapshot, overrides: &OverrideRegistry) -> bool {
        if !overrides.automation().shading
            || env.full_contact_open()
            || !overrides.gate(Gate::ShadeIn)
        {
            return false;
        }
        if env.tilt_contact_open() && !overrides.gate(Gate::ShadeTilt) {
            return false;
        }

        let engaged = self.memory.shading_engaged;
        let shading = &self.config.shading;

        let bright = match env.brightness {
            Brightness::Unconfigured => true,
            Brightness::Unknown => engaged,
            Brightness::Lux(lux) if engaged => lux > shading.brightness_exit(),
            Brightness::Lux(lux) => lux >= shading.brightness_enter,
        };
        if !bright {
            return false;
        }

        let Some(sun) = env.sun else {
            return engaged;
        };
        let high_enough = if engaged {
            sun.elevation > shading.elevation_exit()
        } else {
            sun.elevation >= shading.elevation_enter
        };
        let below_max = shading.elevation_max.is_none_or(|max| sun.elevation <= max);
        let facing = shading
            .azimuth
            .is_none_or(|range| range.contains(sun.azimuth));
        high_enough && below_max && facing
    }

    /// Target after shading ends: whatever the schedule currently permits.
    fn release_target(
        &self,
        window: Option<WindowKind>,
        env: &EnvironmentSnapshot,
        overrides: &OverrideRegistry,
    ) -> Option<Action> {
        let automation = overrides.automation();
        let wants_close = window == Some(WindowKind::Closing) || env.resident_asleep;
        if wants_close && automation.close && overrides.gate(Gate::Close) && !self.locked_out(env) {
            return Some(Action::Close);
        }
        if automation.open && overrides.gate(Gate::Open) && !self.vacation_forces_closed(env) {
            return Some(Action::Open);
        }
        None
    }

    fn schedule_rule(
        &self,
        window: Option<WindowKind>,
        env: &EnvironmentSnapshot,
        overrides: &OverrideRegistry,
    ) -> Option<Verdict> {
        let automation = overrides.automation();
        let closing = window == Some(WindowKind::Closing);
        if (closing || env.resident_asleep) && automation.close && overrides.gate(Gate::Close) {
            if self.locked_out(env) {
                return Some(Verdict::noop(ReasonCode::LockoutProtection));
            }
            let reason = if closing {
                ReasonCode::ScheduledClose
            } else {
                ReasonCode::ResidentAsleep
            };
            return Some(Verdict::new(Action::Close, reason));
        }
        if window == Some(WindowKind::Opening)
            && automation.open
            && overrides.gate(Gate::Open)
            && !self.vacation_forces_closed(env)
        {
            return Some(Verdict::new(Action::Open, ReasonCode::ScheduledOpen));
        }
        None
    }

    fn locked_out(&self, env: &EnvironmentSnapshot) -> bool {
        self.config.lockout_protection && env.full_contact_open()
    }

    fn vacation_forces_closed(&self, env: &EnvironmentSnapshot) -> bool {
        self.config.vacation_keeps_closed && env.vacation
    }

    fn remember(&mut self, verdict: Verdict) {
        let memory = &mut self.memory;
        if verdict.reason.engages_shading() {
            memory.shading_engaged = true;
        } else if verdict.reason == ReasonCode::ShadingReleased || verdict.action.is_actuation() {
            memory.shading_engaged = false;
        }

        let was_ventilating = memory.last_reason.is_some_and(ReasonCode::is_ventilation);
        if verdict.reason == ReasonCode::VentilationWindow && !was_ventilating {
            memory.pre_ventilation = memory.last_actuation;
        }
        if verdict.action.is_actuation() {
            memory.last_actuation = Some(verdict.action);
        }
        memory.last_reason = Some(verdict.reason);
    }
}

enum Ventilation {
    Active(Verdict),
    EndBlocked,
    Ending,
    Idle,
}
