//! Low-precision solar ephemeris.
//!
//! Accurate to a fraction of a degree, which is plenty for choosing when a
//! cover should move. Used to estimate when a sun-anchored window edge will
//! be crossed; live decisions read the sun entity instead.

use std::f64::consts::{PI, TAU};

use chrono::TimeDelta;

use crate::schedule::SunDirection;
use crate::sensor::SunState;
use crate::site::Location;
use crate::time::Timestamp;

const UNIX_EPOCH_JULIAN_DAY: f64 = 2_440_587.5;
const J2000: f64 = 2_451_545.0;
const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Sun position seen from `location` at `at`.
#[must_use]
pub fn position(location: Location, at: Timestamp) -> SunState {
    #[allow(clippy::cast_precision_loss)]
    let julian_day = at.timestamp_millis() as f64 / MILLIS_PER_DAY + UNIX_EPOCH_JULIAN_DAY;
    let n = julian_day - J2000;

    let mean_longitude = (280.460 + 0.985_647_4 * n).rem_euclid(360.0);
    let mean_anomaly = (357.528 + 0.985_600_3 * n).rem_euclid(360.0).to_radians();
    let ecliptic_longitude = (mean_longitude
        + 1.915 * mean_anomaly.sin()
        + 0.020 * (2.0 * mean_anomaly).sin())
    .to_radians();
    let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

    let right_ascension =
        (obliquity.cos() * ecliptic_longitude.sin()).atan2(ecliptic_longitude.cos());
    let declination = (obliquity.sin() * ecliptic_longitude.sin()).asin();

    let sidereal = (280.460_618_37 + 360.985_647_366_29 * n).rem_euclid(360.0);
    let hour_angle =
        normalize_angle((sidereal + location.longitude).to_radians() - right_ascension);

    let latitude = location.latitude.to_radians();
    let elevation = (latitude.sin() * declination.sin()
        + latitude.cos() * declination.cos() * hour_angle.cos())
    .asin();
    let azimuth = (-hour_angle.sin())
        .atan2(declination.tan() * latitude.cos() - latitude.sin() * hour_angle.cos());

    SunState {
        elevation: elevation.to_degrees(),
        azimuth: azimuth.to_degrees().rem_euclid(360.0),
        rising: hour_angle < 0.0,
    }
}

/// First instant in `[from, to)` where the sun crosses `threshold` in the
/// given direction.
#[must_use]
pub fn crossing(
    location: Location,
    from: Timestamp,
    to: Timestamp,
    threshold: f64,
    direction: SunDirection,
) -> Option<Timestamp> {
    let step = TimeDelta::minutes(10);
    let mut t0 = from;
    let mut e0 = position(location, t0).elevation;
    while t0 < to {
        let t1 = (t0 + step).min(to);
        let e1 = position(location, t1).elevation;
        if crosses(e0, e1, threshold, direction) {
            return Some(refine(location, t0, t1, threshold, direction));
        }
        t0 = t1;
        e0 = e1;
    }
    None
}

fn crosses(before: f64, after: f64, threshold: f64, direction: SunDirection) -> bool {
    match direction {
        SunDirection::Rising => before < threshold && after >= threshold,
        SunDirection::Setting => before > threshold && after <= threshold,
    }
}

fn refine(
    location: Location,
    mut lo: Timestamp,
    mut hi: Timestamp,
    threshold: f64,
    direction: SunDirection,
) -> Timestamp {
    while hi - lo > TimeDelta::seconds(1) {
        let mid = lo + (hi - lo) / 2;
        let elevation = position(location, mid).elevation;
        let reached = match direction {
            SunDirection::Rising => elevation >= threshold,
            SunDirection::Setting => elevation <= threshold,
        };
        if reached {
            hi = mid;
        } else {
            lo = mid;
        }
    }
    hi
}

fn normalize_angle(radians: f64) -> f64 {
    (radians + PI).rem_euclid(TAU) - PI
}
