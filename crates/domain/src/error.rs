//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`CoverError`]
//! via `#[from]`.

use crate::action::Action;
use crate::schedule::WindowKind;

/// Base error for domain and application operations.
#[derive(Debug, thiserror::Error)]
pub enum CoverError {
    #[error("validation error")]
    Validation(#[from] ValidationError),

    #[error("not found")]
    NotFound(#[from] NotFoundError),

    #[error("invalid command")]
    InvalidCommand(#[from] CommandError),
}

/// A configuration value breaks a domain invariant.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("identifier must not be empty")]
    EmptyIdentifier,

    #[error("{field} position {value} is outside 0..=100")]
    PositionOutOfRange { field: &'static str, value: u8 },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} margin must be positive, got {value}")]
    NonPositiveMargin { field: &'static str, value: f64 },

    #[error("{kind} window #{index} starts and ends at the same time")]
    EmptyWindow { kind: WindowKind, index: usize },

    #[error("{kind} window #{index} has an empty weekday list")]
    EmptyDayFilter { kind: WindowKind, index: usize },

    #[error("sun elevation {value} is outside -90..=90")]
    ElevationOutOfRange { value: f64 },

    #[error("azimuth {value} is outside 0..=360")]
    AzimuthOutOfRange { value: f64 },

    #[error("{field} {value} is out of range")]
    CoordinateOutOfRange { field: &'static str, value: f64 },

    #[error("not_before {not_before} is after not_after {not_after}")]
    InvertedClamp {
        not_before: chrono::NaiveTime,
        not_after: chrono::NaiveTime,
    },

    #[error("manual override duration must be positive")]
    NonPositiveDuration,

    #[error("duplicate cover id {0}")]
    DuplicateCover(String),
}

/// A requested resource does not exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{entity} {id} not found")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A command was rejected without any state change.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("pause duration must be positive, got {minutes} minutes")]
    NonPositivePause { minutes: i64 },

    #[error("shading hold must be positive, got {minutes} minutes")]
    NonPositiveHold { minutes: i64 },

    #[error("{minutes} minutes is too long")]
    DurationOutOfRange { minutes: i64 },

    #[error("{action} cannot be forced, only open and close")]
    NotForceable { action: Action },
}
