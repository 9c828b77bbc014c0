//! Action dispatcher: turns decisions into actuator commands.
//!
//! `NoOp` is never sent. A decision equal to the last applied action is
//! suppressed unless it asks for a repeat. Every actuator call is bounded by
//! a timeout; a failed call leaves the last applied action unchanged so the
//! next evaluation retries it.

use std::time::Duration;

use coverctl_domain::action::Action;
use coverctl_domain::config::Positions;
use coverctl_domain::decision::Decision;
use coverctl_domain::diagnostics::DispatchStatus;
use coverctl_domain::id::CoverId;

use crate::ports::{Actuator, ActuatorError, CoverCommand};

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The actuator failed (`source` set) or timed out (`source` empty).
    #[error("actuator unavailable for cover {cover}")]
    ActuatorUnavailable {
        cover: CoverId,
        #[source]
        source: Option<ActuatorError>,
    },
}

pub struct ActionDispatcher<A> {
    cover: CoverId,
    positions: Positions,
    actuator: A,
    timeout: Duration,
    last_applied: Option<Action>,
}

impl<A: Actuator> ActionDispatcher<A> {
    pub fn new(cover: CoverId, positions: Positions, actuator: A, timeout: Duration) -> Self {
        Self {
            cover,
            positions,
            actuator,
            timeout,
            last_applied: None,
        }
    }

    /// Last action the actuator confirmed.
    #[must_use]
    pub fn last_applied(&self) -> Option<Action> {
        self.last_applied
    }

    /// Forget the last applied action, e.g. after the cover was moved by hand.
    pub fn forget(&mut self) {
        self.last_applied = None;
    }

    /// Apply a decision.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ActuatorUnavailable`] when the actuator
    /// reports a failure or does not answer within the timeout.
    pub async fn apply(&mut self, decision: &Decision) -> Result<DispatchStatus, DispatchError> {
        let action = decision.target_action;
        if !action.is_actuation() {
            return Ok(DispatchStatus::Skipped);
        }
        if self.last_applied == Some(action) && !decision.repeat {
            tracing::debug!(cover = %self.cover, %action, "suppressing repeated action");
            return Ok(DispatchStatus::Suppressed);
        }

        let command = CoverCommand {
            action,
            position: self.positions.for_action(action),
        };
        let call = self.actuator.set_position(&self.cover, command);
        match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(())) => {
                tracing::info!(
                    cover = %self.cover,
                    %action,
                    position = ?command.position,
                    "cover command applied"
                );
                self.last_applied = Some(action);
                Ok(DispatchStatus::Sent)
            }
            Ok(Err(err)) => Err(DispatchError::ActuatorUnavailable {
                cover: self.cover.clone(),
                source: Some(err),
            }),
            Err(_elapsed) => Err(DispatchError::ActuatorUnavailable {
                cover: self.cover.clone(),
                source: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use coverctl_domain::action::ReasonCode;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingActuator {
        calls: Mutex<Vec<CoverCommand>>,
        fail: bool,
        delay: Option<Duration>,
    }

    impl Actuator for RecordingActuator {
        async fn set_position(
            &self,
            _cover: &CoverId,
            command: CoverCommand,
        ) -> Result<(), ActuatorError> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.calls.lock().unwrap().push(command);
            if self.fail {
                Err(ActuatorError::Rejected("motor jammed".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn decision(action: Action, repeat: bool) -> Decision {
        Decision {
            target_action: action,
            reason: ReasonCode::ScheduledClose,
            next_open_at: None,
            next_close_at: None,
            repeat,
            evaluated_at: Utc.with_ymd_and_hms(2024, 5, 6, 22, 0, 0).unwrap(),
            forced: None,
        }
    }

    fn dispatcher(actuator: RecordingActuator) -> ActionDispatcher<RecordingActuator> {
        ActionDispatcher::new(
            CoverId::new("office").unwrap(),
            Positions::default(),
            actuator,
            Duration::from_millis(50),
        )
    }

    #[tokio::test]
    async fn should_send_once_when_same_target_twice() {
        let mut d = dispatcher(RecordingActuator::default());
        assert_eq!(
            d.apply(&decision(Action::Close, false)).await.unwrap(),
            DispatchStatus::Sent
        );
        assert_eq!(
            d.apply(&decision(Action::Close, false)).await.unwrap(),
            DispatchStatus::Suppressed
        );
        let calls = d.actuator.calls.lock().unwrap();
        assert_eq!(
            *calls,
            vec![CoverCommand {
                action: Action::Close,
                position: Some(0)
            }]
        );
    }

    #[tokio::test]
    async fn should_resend_when_repeat_requested() {
        let mut d = dispatcher(RecordingActuator::default());
        d.apply(&decision(Action::Shade, true)).await.unwrap();
        assert_eq!(
            d.apply(&decision(Action::Shade, true)).await.unwrap(),
            DispatchStatus::Sent
        );
        assert_eq!(d.actuator.calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_never_send_noop() {
        let mut d = dispatcher(RecordingActuator::default());
        assert_eq!(
            d.apply(&decision(Action::NoOp, true)).await.unwrap(),
            DispatchStatus::Skipped
        );
        assert!(d.actuator.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_keep_last_action_when_actuator_fails() {
        let mut d = dispatcher(RecordingActuator {
            fail: true,
            ..RecordingActuator::default()
        });
        let result = d.apply(&decision(Action::Open, false)).await;
        assert!(matches!(
            result,
            Err(DispatchError::ActuatorUnavailable {
                source: Some(ActuatorError::Rejected(_)),
                ..
            })
        ));
        assert_eq!(d.last_applied(), None);
    }

    #[tokio::test]
    async fn should_report_unavailable_when_actuator_times_out() {
        let mut d = dispatcher(RecordingActuator {
            delay: Some(Duration::from_secs(5)),
            ..RecordingActuator::default()
        });
        let result = d.apply(&decision(Action::Open, false)).await;
        assert!(matches!(
            result,
            Err(DispatchError::ActuatorUnavailable { source: None, .. })
        ));
        assert_eq!(d.last_applied(), None);
    }

    #[tokio::test]
    async fn should_resend_after_forget() {
        let mut d = dispatcher(RecordingActuator::default());
        d.apply(&decision(Action::Close, false)).await.unwrap();
        d.forget();
        assert_eq!(
            d.apply(&decision(Action::Close, false)).await.unwrap(),
            DispatchStatus::Sent
        );
    }

    #[tokio::test]
    async fn should_send_stop_without_position() {
        let mut d = dispatcher(RecordingActuator::default());
        d.apply(&decision(Action::Stop, false)).await.unwrap();
        assert_eq!(d.actuator.calls.lock().unwrap()[0].position, None);
    }
}
