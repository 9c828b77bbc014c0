//! Per-cover controller task and the handle used to command it.
//!
//! Each cover gets one task that serialises its evaluations: snapshot,
//! decision, dispatch and diagnostics run to completion before the next
//! trigger is observed. Triggers are coalesced through a [`Notify`], so a
//! burst of sensor changes costs at most one extra evaluation.
//!
//! Between triggers the task sleeps until the earliest of the pause expiry,
//! the next window boundary, the end of a pending contact delay, or the
//! safety interval.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use tokio::sync::Notify;
use tokio::task::JoinHandle;

use coverctl_domain::action::{Action, CoverState, ReasonCode};
use coverctl_domain::config::{Automation, CoverConfig, ResetMode};
use coverctl_domain::decision::DecisionEngine;
use coverctl_domain::diagnostics::{Diagnostics, DispatchStatus};
use coverctl_domain::environment::EnvironmentSnapshot;
use coverctl_domain::error::{CommandError, CoverError};
use coverctl_domain::id::CoverId;
use coverctl_domain::overrides::{ForcedAction, Gates, OverrideRegistry};
use coverctl_domain::schedule::ScheduleEvaluator;
use coverctl_domain::sensor::SensorSource;
use coverctl_domain::site::Site;
use coverctl_domain::time::Timestamp;

use crate::dispatcher::ActionDispatcher;
use crate::ports::{Actuator, Clock, DiagnosticsPublisher};
use crate::sensor_store::SensorStore;

const MIN_WAIT: Duration = Duration::from_millis(100);

/// Timing knobs shared by every controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerSettings {
    /// Longest time between two evaluations.
    pub safety_interval: Duration,
    pub actuator_timeout: Duration,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            safety_interval: Duration::from_secs(60),
            actuator_timeout: Duration::from_secs(30),
        }
    }
}

/// Global automation switch. While off, no evaluation runs and nothing is
/// dispatched; commands are still accepted.
#[derive(Debug, Clone)]
pub struct EngineSwitch(Arc<AtomicBool>);

impl EngineSwitch {
    #[must_use]
    pub fn new(enabled: bool) -> Self {
        Self(Arc::new(AtomicBool::new(enabled)))
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }

    /// Returns the previous value.
    pub fn set(&self, enabled: bool) -> bool {
        self.0.swap(enabled, Ordering::AcqRel)
    }
}

/// Everything a controller needs besides its own configuration.
pub struct ControllerContext<A, P, C> {
    pub actuator: A,
    pub publisher: P,
    pub clock: C,
    pub sensors: SensorStore,
    pub switch: EngineSwitch,
    pub settings: ControllerSettings,
}

#[derive(Debug)]
struct Shared {
    overrides: Mutex<OverrideRegistry>,
    trigger: Notify,
    moved: AtomicBool,
}

impl Shared {
    fn new(automation: Automation) -> Self {
        Self {
            overrides: Mutex::new(OverrideRegistry::with_automation(automation)),
            trigger: Notify::new(),
            moved: AtomicBool::new(false),
        }
    }

    fn overrides(&self) -> MutexGuard<'_, OverrideRegistry> {
        self.overrides.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Command side of one cover. Cheap to clone.
#[derive(Debug, Clone)]
pub struct CoverHandle {
    config: Arc<CoverConfig>,
    schedule: ScheduleEvaluator,
    shared: Arc<Shared>,
}

impl CoverHandle {
    #[must_use]
    pub fn id(&self) -> &CoverId {
        &self.config.id
    }

    #[must_use]
    pub fn config(&self) -> &CoverConfig {
        &self.config
    }

    /// Ask the controller to re-evaluate.
    pub fn trigger(&self) {
        self.shared.trigger.notify_one();
    }

    /// Pause automation for `minutes`.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::InvalidCommand`] for a zero, negative or
    /// unrepresentable duration; nothing changes in that case.
    pub fn set_manual_override(&self, minutes: i64, now: Timestamp) -> Result<Timestamp, CoverError> {
        let duration =
            TimeDelta::try_minutes(minutes).ok_or(CommandError::DurationOutOfRange { minutes })?;
        let until = self.shared.overrides().set_pause(duration, now)?;
        self.shared.moved.store(true, Ordering::Release);
        self.trigger();
        Ok(until)
    }

    pub fn clear_manual_override(&self) {
        self.shared.overrides().cancel_pause();
        self.trigger();
    }

    /// Shade on the next evaluation, even while paused.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::InvalidCommand`] when `hold_minutes` is given
    /// and not positive.
    pub fn activate_shading(&self, hold_minutes: Option<i64>) -> Result<(), CoverError> {
        let hold = match hold_minutes {
            Some(minutes) if minutes <= 0 => {
                return Err(CommandError::NonPositiveHold { minutes }.into());
            }
            Some(minutes) => Some(
                TimeDelta::try_minutes(minutes)
                    .ok_or(CommandError::DurationOutOfRange { minutes })?,
            ),
            None => None,
        };
        self.shared.overrides().request_force_shade(hold);
        self.trigger();
        Ok(())
    }

    /// The cover moved without us asking: pause per the reset mode.
    pub fn external_move(&self, now: Timestamp) -> Option<Timestamp> {
        let until = self.resume_at(now)?;
        self.shared.overrides().pause_until(until);
        self.shared.moved.store(true, Ordering::Release);
        self.trigger();
        Some(until)
    }

    /// Open or close right away, then pause per the reset mode.
    ///
    /// The command is retried on later evaluations until the actuator
    /// confirms it. Returns when automation resumes.
    ///
    /// # Errors
    ///
    /// Returns [`CoverError::InvalidCommand`] for any action other than
    /// open and close.
    pub fn force_action(&self, action: Action, now: Timestamp) -> Result<Option<Timestamp>, CoverError> {
        let forced = match action {
            Action::Open => ForcedAction::Open,
            Action::Close => ForcedAction::Close,
            other => return Err(CommandError::NotForceable { action: other }.into()),
        };
        let until = self.resume_at(now);
        {
            let mut overrides = self.shared.overrides();
            if let Some(until) = until {
                overrides.pause_until(until);
            }
            overrides.request_forced(forced);
        }
        self.trigger();
        Ok(until)
    }

    #[must_use]
    pub fn automation(&self) -> Automation {
        self.shared.overrides().automation()
    }

    /// Replace the automation switches and re-evaluate.
    pub fn set_automation(&self, automation: Automation) {
        self.shared.overrides().set_automation(automation);
        self.trigger();
    }

    fn resume_at(&self, now: Timestamp) -> Option<Timestamp> {
        let settings = self.config.manual_override;
        match settings.reset {
            ResetMode::Timeout => {
                now.checked_add_signed(TimeDelta::minutes(i64::from(settings.minutes)))
            }
            ResetMode::At { time } => self.schedule.next_occurrence(time, now),
        }
    }

    #[must_use]
    pub fn paused_until(&self, now: Timestamp) -> Option<Timestamp> {
        self.shared.overrides().paused_until(now)
    }
}

/// The task side of one cover.
pub struct CoverController<A, P, C> {
    config: Arc<CoverConfig>,
    engine: DecisionEngine,
    dispatcher: ActionDispatcher<A>,
    publisher: P,
    clock: C,
    sensors: SensorStore,
    sun: SensorSource,
    switch: EngineSwitch,
    safety_interval: Duration,
    shared: Arc<Shared>,
    paused_until: Option<Timestamp>,
    next_boundary: Option<Timestamp>,
    pending_contact_at: Option<Timestamp>,
    last_outcome: Option<(ReasonCode, DispatchStatus)>,
}

impl<A, P, C> CoverController<A, P, C>
where
    A: Actuator + Send + Sync + 'static,
    P: DiagnosticsPublisher + Send + Sync + 'static,
    C: Clock + Send + Sync + 'static,
{
    /// Build the controller and the handle that commands it.
    pub fn new(
        config: Arc<CoverConfig>,
        site: &Site,
        context: ControllerContext<A, P, C>,
    ) -> (Self, CoverHandle) {
        let schedule = ScheduleEvaluator::for_site(site);
        let shared = Arc::new(Shared::new(config.automation));
        let handle = CoverHandle {
            config: Arc::clone(&config),
            schedule,
            shared: Arc::clone(&shared),
        };
        let controller = Self {
            engine: DecisionEngine::new(Arc::clone(&config), schedule),
            dispatcher: ActionDispatcher::new(
                config.id.clone(),
                config.positions,
                context.actuator,
                context.settings.actuator_timeout,
            ),
            config,
            publisher: context.publisher,
            clock: context.clock,
            sensors: context.sensors,
            sun: site.sun.clone(),
            switch: context.switch,
            safety_interval: context.settings.safety_interval,
            shared,
            paused_until: None,
            next_boundary: None,
            pending_contact_at: None,
            last_outcome: None,
        };
        (controller, handle)
    }

    /// Run the controller on the tokio runtime.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    /// Evaluate, then wait for the next trigger or timer, forever.
    pub async fn run(mut self) {
        tracing::info!(cover = %self.config.id, "cover controller started");
        loop {
            if self.switch.is_enabled() {
                self.evaluate_once().await;
            }
            let wait = self.next_wait();
            tokio::select! {
                () = self.shared.trigger.notified() => {}
                () = tokio::time::sleep(wait) => {}
            }
        }
    }

    /// One full evaluation: snapshot, decision, dispatch, diagnostics.
    pub async fn evaluate_once(&mut self) -> Diagnostics {
        let now = self.clock.now();
        let (env, gates) = self.sensors.with_readings(|readings| {
            (
                EnvironmentSnapshot::capture(&self.config, &self.sun, readings, now),
                Gates::resolve(&self.config.gates, readings),
            )
        });

        if self.shared.moved.swap(false, Ordering::AcqRel) {
            self.dispatcher.forget();
        }

        let decision = {
            let mut overrides = self.shared.overrides();
            overrides.refresh_gates(gates);
            self.engine.evaluate(&env, &mut overrides)
        };

        let status = match self.dispatcher.apply(&decision).await {
            Ok(status) => status,
            Err(err) => {
                tracing::warn!(cover = %self.config.id, error = %err, "dispatch failed");
                DispatchStatus::Failed
            }
        };

        let paused_until = {
            let mut overrides = self.shared.overrides();
            if let Some(forced) = decision.forced {
                overrides.settle_forced(forced, status != DispatchStatus::Failed, now);
            }
            overrides.paused_until(now)
        };

        let state = CoverState::derive(
            decision.reason == ReasonCode::ManualOverrideActive,
            self.dispatcher.last_applied(),
        );
        let diagnostics = Diagnostics::from_decision(
            self.config.id.clone(),
            &decision,
            state,
            self.config.positions.for_action(decision.target_action),
            paused_until,
            status,
        );

        let outcome = (decision.reason, status);
        if self.last_outcome == Some(outcome) {
            tracing::trace!(cover = %self.config.id, reason = ?decision.reason, "decision unchanged");
        } else {
            tracing::info!(
                cover = %self.config.id,
                action = %decision.target_action,
                reason = ?decision.reason,
                status = ?status,
                "cover decision"
            );
            self.last_outcome = Some(outcome);
        }

        if let Err(err) = self.publisher.publish(diagnostics.clone()).await {
            tracing::warn!(cover = %self.config.id, error = %err, "failed to publish diagnostics");
        }

        self.paused_until = paused_until;
        self.next_boundary = self.engine.next_boundary(now, env.workday);
        self.pending_contact_at = env.pending_contact_at;
        diagnostics
    }

    fn next_wait(&self) -> Duration {
        let now = self.clock.now();
        [self.paused_until, self.next_boundary, self.pending_contact_at]
            .into_iter()
            .flatten()
            .filter(|at| *at > now)
            .filter_map(|at| (at - now).to_std().ok())
            .fold(self.safety_interval, Duration::min)
            .max(MIN_WAIT)
    }
}
