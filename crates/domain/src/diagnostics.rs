//! Diagnostics record published after every evaluation.

use serde::{Deserialize, Serialize};

use crate::action::{Action, CoverState, ReasonCode};
use crate::decision::Decision;
use crate::id::CoverId;
use crate::time::Timestamp;

/// What happened to the decision's command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchStatus {
    /// Sent and confirmed by the actuator.
    Sent,
    /// Same as the last applied action, not sent again.
    Suppressed,
    /// Nothing to send.
    Skipped,
    /// The actuator failed or timed out.
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub cover_id: CoverId,
    pub state: CoverState,
    pub target_action: Action,
    pub target_position: Option<u8>,
    /// `DispatchFailed` when the actuator did not confirm, else the decision's reason.
    pub reason: ReasonCode,
    pub decision_reason: ReasonCode,
    pub manual_override_until: Option<Timestamp>,
    pub next_open_at: Option<Timestamp>,
    pub next_close_at: Option<Timestamp>,
    /// An actuator command was sent and confirmed during this evaluation.
    pub dispatched: bool,
    pub evaluated_at: Timestamp,
}

impl Diagnostics {
    /// Build the record for a decision and its dispatch outcome.
    #[must_use]
    pub fn from_decision(
        cover_id: CoverId,
        decision: &Decision,
        state: CoverState,
        target_position: Option<u8>,
        manual_override_until: Option<Timestamp>,
        status: DispatchStatus,
    ) -> Self {
        Self {
            cover_id,
            state,
            target_action: decision.target_action,
            target_position,
            reason: if status == DispatchStatus::Failed {
                ReasonCode::DispatchFailed
            } else {
                decision.reason
            },
            decision_reason: decision.reason,
            manual_override_until,
            next_open_at: decision.next_open_at,
            next_close_at: decision.next_close_at,
            dispatched: status == DispatchStatus::Sent,
            evaluated_at: decision.evaluated_at,
        }
    }
}
