//! Actuator port: the only way a cover is physically moved.

use std::future::Future;

use coverctl_domain::action::Action;
use coverctl_domain::id::CoverId;

/// Command sent to a cover. `position` is `None` for `Stop`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoverCommand {
    pub action: Action,
    pub position: Option<u8>,
}

/// Why an actuator call did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActuatorError {
    #[error("cover {0} is unavailable")]
    Unavailable(CoverId),

    #[error("command rejected: {0}")]
    Rejected(String),
}

/// Moves covers. Resolves once the command is done or has failed.
pub trait Actuator {
    fn set_position(
        &self,
        cover: &CoverId,
        command: CoverCommand,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send;
}

impl<T: Actuator + Send + Sync> Actuator for std::sync::Arc<T> {
    fn set_position(
        &self,
        cover: &CoverId,
        command: CoverCommand,
    ) -> impl Future<Output = Result<(), ActuatorError>> + Send {
        (**self).set_position(cover, command)
    }
}
