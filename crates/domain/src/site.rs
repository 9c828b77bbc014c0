//! Site-wide settings shared by every cover: time zone, location, sun entity.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::sensor::SensorSource;

/// Geographic coordinates in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// # Errors
    ///
    /// Returns [`ValidationError::CoordinateOutOfRange`] for a latitude
    /// outside `-90..=90` or a longitude outside `-180..=180`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !(-90.0..=90.0).contains(&self.latitude) {
            return Err(ValidationError::CoordinateOutOfRange {
                field: "latitude",
                value: self.latitude,
            });
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ValidationError::CoordinateOutOfRange {
                field: "longitude",
                value: self.longitude,
            });
        }
        Ok(())
    }
}

/// Where the covers are installed.
#[derive(Debug, Clone, PartialEq)]
pub struct Site {
    /// Zone every window time is interpreted in.
    pub timezone: Tz,
    /// Enables the solar ephemeris for next-boundary estimates.
    pub location: Option<Location>,
    /// Entity publishing the live [`SunState`](crate::sensor::SunState).
    pub sun: SensorSource,
}

impl Default for Site {
    fn default() -> Self {
        Self {
            timezone: Tz::UTC,
            location: None,
            sun: SensorSource::Unconfigured,
        }
    }
}

impl Site {
    /// # Errors
    ///
    /// Propagates [`Location::validate`].
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.location {
            Some(location) => location.validate(),
            None => Ok(()),
        }
    }
}
