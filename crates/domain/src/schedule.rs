//! Schedule evaluation: opening, closing and ventilation windows.
//!
//! A window is the half-open interval `[start, end)` in the site's local time
//! zone. Each edge is an [`Anchor`]: a fixed local time, or the moment the sun
//! crosses an elevation in a given direction (optionally clamped by
//! `not_before` / `not_after`). When the end's nominal time is not after the
//! start's, the window wraps midnight and the part after midnight belongs to
//! the previous day's [`DayFilter`].
//!
//! Membership is decided from the live [`SunState`] of the environment
//! snapshot. The solar ephemeris in [`crate::sun`] is only used to estimate
//! upcoming boundaries.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, TimeDelta, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::CoverConfig;
use crate::environment::EnvironmentSnapshot;
use crate::error::ValidationError;
use crate::sensor::SunState;
use crate::site::{Location, Site};
use crate::sun;
use crate::time::{TimeOfDay, Timestamp};

/// Which family of windows is being asked about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowKind {
    Opening,
    Closing,
    Ventilation,
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Opening => "opening",
            Self::Closing => "closing",
            Self::Ventilation => "ventilation",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SunDirection {
    Rising,
    Setting,
}

/// A sun-relative window edge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SunAnchor {
    #[serde(rename = "sun")]
    pub direction: SunDirection,
    /// Elevation threshold in degrees.
    pub elevation: f64,
    /// The edge never passes before this local time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_before: Option<TimeOfDay>,
    /// The edge always passes at this local time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<TimeOfDay>,
}

/// One edge of a window.
///
/// In TOML either `"06:30"` or
/// `{ sun = "rising", elevation = 3.0, not_before = "06:00" }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Anchor {
    At(TimeOfDay),
    Sun(SunAnchor),
}

impl Anchor {
    /// Whether the edge has passed today at local `time`.
    ///
    /// `None` when it depends on a sun state that is not known.
    #[must_use]
    pub fn passed(&self, time: NaiveTime, sun: Option<SunState>) -> Option<bool> {
        match self {
            Self::At(at) => Some(time >= at.0),
            Self::Sun(anchor) => {
                if anchor.not_before.is_some_and(|nb| time < nb.0) {
                    return Some(false);
                }
                if anchor.not_after.is_some_and(|na| time >= na.0) {
                    return Some(true);
                }
                let sun = sun?;
                Some(match anchor.direction {
                    SunDirection::Rising => !sun.rising || sun.elevation >= anchor.elevation,
                    SunDirection::Setting => !sun.rising && sun.elevation <= anchor.elevation,
                })
            }
        }
    }

    /// Time of day used to decide whether a window wraps midnight.
    #[must_use]
    pub fn nominal(&self) -> NaiveTime {
        match self {
            Self::At(at) => at.0,
            Self::Sun(anchor) => anchor
                .not_before
                .or(anchor.not_after)
                .map_or_else(|| default_sun_time(anchor.direction), |t| t.0),
        }
    }

    fn validate(&self) -> Result<(), ValidationError> {
        let Self::Sun(anchor) = self else {
            return Ok(());
        };
        if !anchor.elevation.is_finite() || !(-90.0..=90.0).contains(&anchor.elevation) {
            return Err(ValidationError::ElevationOutOfRange {
                value: anchor.elevation,
            });
        }
        if let (Some(nb), Some(na)) = (anchor.not_before, anchor.not_after)
            && nb > na
        {
            return Err(ValidationError::InvertedClamp {
                not_before: nb.0,
                not_after: na.0,
            });
        }
        Ok(())
    }
}

fn default_sun_time(direction: SunDirection) -> NaiveTime {
    let hour = match direction {
        SunDirection::Rising => 6,
        SunDirection::Setting => 18,
    };
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

/// Which days a window applies to.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "DayFilterRepr", into = "DayFilterRepr")]
pub enum DayFilter {
    #[default]
    Every,
    Days(Vec<Weekday>),
    /// Days the workday sensor reports as workdays, Monday–Friday without one.
    Workdays,
    NonWorkdays,
}

impl DayFilter {
    /// `workday` is the workday sensor's verdict for `date`, when known.
    #[must_use]
    pub fn matches(&self, date: NaiveDate, workday: Option<bool>) -> bool {
        let is_workday =
            || workday.unwrap_or_else(|| !matches!(date.weekday(), Weekday::Sat | Weekday::Sun));
        match self {
            Self::Every => true,
            Self::Days(days) => days.contains(&date.weekday()),
            Self::Workdays => is_workday(),
            Self::NonWorkdays => !is_workday(),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum DayFilterRepr {
    Named(NamedDays),
    Days(Vec<Weekday>),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum NamedDays {
    Every,
    Workdays,
    NonWorkdays,
}

impl From<DayFilterRepr> for DayFilter {
    fn from(value: DayFilterRepr) -> Self {
        match value {
            DayFilterRepr::Named(NamedDays::Every) => Self::Every,
            DayFilterRepr::Named(NamedDays::Workdays) => Self::Workdays,
            DayFilterRepr::Named(NamedDays::NonWorkdays) => Self::NonWorkdays,
            DayFilterRepr::Days(days) => Self::Days(days),
        }
    }
}

impl From<DayFilter> for DayFilterRepr {
    fn from(value: DayFilter) -> Self {
        match value {
            DayFilter::Every => Self::Named(NamedDays::Every),
            DayFilter::Workdays => Self::Named(NamedDays::Workdays),
            DayFilter::NonWorkdays => Self::Named(NamedDays::NonWorkdays),
            DayFilter::Days(days) => Self::Days(days),
        }
    }
}

/// A recurring `[start, end)` window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub start: Anchor,
    pub end: Anchor,
    #[serde(default)]
    pub days: DayFilter,
}

impl WindowSpec {
    /// Fixed-time window applying every day.
    #[must_use]
    pub fn between(start: TimeOfDay, end: TimeOfDay) -> Self {
        Self {
            start: Anchor::At(start),
            end: Anchor::At(end),
            days: DayFilter::Every,
        }
    }

    #[must_use]
    pub fn on(mut self, days: DayFilter) -> Self {
        self.days = days;
        self
    }

    /// `true` when the window runs across midnight.
    #[must_use]
    pub fn wraps(&self) -> bool {
        self.end.nominal() <= self.start.nominal()
    }

    /// Check the window's invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] when an anchor is out of range, both edges
    /// are the same fixed time, or the weekday list is empty.
    pub fn validate(&self, kind: WindowKind, index: usize) -> Result<(), ValidationError> {
        self.start.validate()?;
        self.end.validate()?;
        if let (Anchor::At(start), Anchor::At(end)) = (&self.start, &self.end)
            && start == end
        {
            return Err(ValidationError::EmptyWindow { kind, index });
        }
        if matches!(&self.days, DayFilter::Days(days) if days.is_empty()) {
            return Err(ValidationError::EmptyDayFilter { kind, index });
        }
        Ok(())
    }
}

/// Answers window membership questions in the site's time zone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScheduleEvaluator {
    timezone: Tz,
    location: Option<Location>,
}

impl ScheduleEvaluator {
    #[must_use]
    pub fn new(timezone: Tz, location: Option<Location>) -> Self {
        Self { timezone, location }
    }

    #[must_use]
    pub fn for_site(site: &Site) -> Self {
        Self::new(site.timezone, site.location)
    }

    #[must_use]
    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Whether the snapshot's instant is inside any window of `kind`.
    #[must_use]
    pub fn in_window(
        &self,
        kind: WindowKind,
        config: &CoverConfig,
        env: &EnvironmentSnapshot,
    ) -> bool {
        config
            .windows(kind)
            .iter()
            .any(|window| self.window_contains(window, env.now, env.sun, env.workday))
    }

    /// Closing wins over an overlapping opening window.
    #[must_use]
    pub fn classify(&self, config: &CoverConfig, env: &EnvironmentSnapshot) -> Option<WindowKind> {
        if self.in_window(WindowKind::Closing, config, env) {
            Some(WindowKind::Closing)
        } else if self.in_window(WindowKind::Opening, config, env) {
            Some(WindowKind::Opening)
        } else {
            None
        }
    }

    /// Whether `now` falls inside a single window.
    #[must_use]
    pub fn window_contains(
        &self,
        window: &WindowSpec,
        now: Timestamp,
        sun: Option<SunState>,
        workday: Option<bool>,
    ) -> bool {
        let local = now.with_timezone(&self.timezone);
        let time = local.time();
        let today = local.date_naive();
        let start = window.start.passed(time, sun);
        let end = window.end.passed(time, sun);

        if window.wraps() {
            let yesterday_matches = || {
                today
                    .pred_opt()
                    .is_some_and(|yesterday| window.days.matches(yesterday, None))
            };
            // A sun start can still read as passed after midnight; before the
            // pivot the window belongs to the previous day.
            let (start_nominal, end_nominal) = (window.start.nominal(), window.end.nominal());
            let pivot = end_nominal + (start_nominal - end_nominal) / 2;
            let evening = start == Some(true)
                && if time < pivot {
                    yesterday_matches()
                } else {
                    window.days.matches(today, workday)
                };
            let after_midnight = end == Some(false) && yesterday_matches();
            evening || after_midnight
        } else {
            start == Some(true) && end == Some(false) && window.days.matches(today, workday)
        }
    }

    /// Next start or end of any window of `kind` strictly after `now`.
    #[must_use]
    pub fn next_boundary(
        &self,
        kind: WindowKind,
        config: &CoverConfig,
        now: Timestamp,
        workday: Option<bool>,
    ) -> Option<Timestamp> {
        config
            .windows(kind)
            .iter()
            .filter_map(|window| self.next_edge(window, now, workday, true))
            .min()
    }

    /// Next start of any window of `kind` strictly after `now`.
    #[must_use]
    pub fn next_start(
        &self,
        kind: WindowKind,
        config: &CoverConfig,
        now: Timestamp,
        workday: Option<bool>,
    ) -> Option<Timestamp> {
        config
            .windows(kind)
            .iter()
            .filter_map(|window| self.next_edge(window, now, workday, false))
            .min()
    }

    /// Next instant strictly after `now` showing `time` on the local clock.
    #[must_use]
    pub fn next_occurrence(&self, time: TimeOfDay, now: Timestamp) -> Option<Timestamp> {
        let today = now.with_timezone(&self.timezone).date_naive();
        [Some(today), today.succ_opt()]
            .into_iter()
            .flatten()
            .filter_map(|date| self.local_instant(date, time.0))
            .find(|ts| *ts > now)
    }

    fn next_edge(
        &self,
        window: &WindowSpec,
        now: Timestamp,
        workday: Option<bool>,
        include_ends: bool,
    ) -> Option<Timestamp> {
        let today = now.with_timezone(&self.timezone).date_naive();
        let wraps = window.wraps();
        let mut best: Option<Timestamp> = None;

        for offset in -1..=7 {
            let Some(date) = today.checked_add_signed(TimeDelta::days(offset)) else {
                continue;
            };
            let day_workday = if offset == 0 { workday } else { None };
            if !window.days.matches(date, day_workday) {
                continue;
            }
            let start = self.resolve(&window.start, date);
            let end = if include_ends {
                let end_date = if wraps { date.succ_opt() } else { Some(date) };
                end_date.and_then(|d| self.resolve(&window.end, d))
            } else {
                None
            };
            for ts in [start, end].into_iter().flatten() {
                if ts > now && best.is_none_or(|b| ts < b) {
                    best = Some(ts);
                }
            }
        }
        best
    }

    /// Instant an anchor is expected to pass on local `date`.
    fn resolve(&self, anchor: &Anchor, date: NaiveDate) -> Option<Timestamp> {
        match anchor {
            Anchor::At(at) => self.local_instant(date, at.0),
            Anchor::Sun(anchor) => {
                let not_before = anchor.not_before.and_then(|t| self.local_instant(date, t.0));
                let not_after = anchor.not_after.and_then(|t| self.local_instant(date, t.0));
                let estimate = self.location.and_then(|location| {
                    let from = self.local_instant(date, NaiveTime::MIN)?;
                    let to = self.local_instant(date.succ_opt()?, NaiveTime::MIN)?;
                    sun::crossing(location, from, to, anchor.elevation, anchor.direction)
                });
                match estimate {
                    Some(ts) => {
                        let ts = not_before.map_or(ts, |nb| ts.max(nb));
                        Some(not_after.map_or(ts, |na| ts.min(na)))
                    }
                    None => not_after.or(not_before),
                }
            }
        }
    }

    /// Local wall-clock time to UTC. Times skipped by a DST jump move forward
    /// by one hour.
    fn local_instant(&self, date: NaiveDate, time: NaiveTime) -> Option<Timestamp> {
        let naive = date.and_time(time);
        self.timezone
            .from_local_datetime(&naive)
            .earliest()
            .or_else(|| {
                self.timezone
                    .from_local_datetime(&(naive + TimeDelta::hours(1)))
                    .earliest()
            })
            .map(|dt| dt.with_timezone(&Utc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CoverConfig;
    use crate::id::CoverId;

    fn hm(h: u32, m: u32) -> TimeOfDay {
        TimeOfDay::hm(h, m).unwrap()
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    fn evaluator() -> ScheduleEvaluator {
        ScheduleEvaluator::new(Tz::UTC, None)
    }

    fn sun(elevation: f64, rising: bool) -> Option<SunState> {
        Some(SunState {
            elevation,
            azimuth: 180.0,
            rising,
        })
    }

    fn rising_anchor(elevation: f64) -> SunAnchor {
        SunAnchor {
            direction: SunDirection::Rising,
            elevation,
            not_before: None,
            not_after: None,
        }
    }

    fn config(opening: WindowSpec, closing: WindowSpec) -> CoverConfig {
        CoverConfig::builder(CoverId::new("office").unwrap())
            .opening(opening)
            .closing(closing)
            .build()
            .unwrap()
    }

    #[test]
    fn should_contain_now_when_inside_fixed_window() {
        let window = WindowSpec::between(hm(7, 0), hm(21, 0));
        let eval = evaluator();
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 7, 0), None, None));
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 20, 59), None, None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 6, 21, 0), None, None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 6, 6, 59), None, None));
    }

    #[test]
    fn should_wrap_midnight_when_end_is_before_start() {
        let window = WindowSpec::between(hm(22, 0), hm(6, 0));
        let eval = evaluator();
        assert!(window.wraps());
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 23, 30), None, None));
        assert!(eval.window_contains(&window, utc(2024, 5, 7, 5, 59), None, None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 7, 6, 0), None, None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 7, 12, 0), None, None));
    }

    #[test]
    fn should_use_previous_day_filter_when_after_midnight_of_wrapped_window() {
        // Friday night only: 2024-05-10 is a Friday.
        let window =
            WindowSpec::between(hm(22, 0), hm(6, 0)).on(DayFilter::Days(vec![Weekday::Fri]));
        let eval = evaluator();
        assert!(eval.window_contains(&window, utc(2024, 5, 10, 23, 0), None, None));
        assert!(eval.window_contains(&window, utc(2024, 5, 11, 3, 0), None, None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 11, 23, 0), None, None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 10, 3, 0), None, None));
    }

    #[test]
    fn should_use_previous_day_filter_when_sun_start_still_passed_after_midnight() {
        // Monday nights only: 2024-05-06 is a Monday.
        let window = WindowSpec {
            start: Anchor::Sun(SunAnchor {
                direction: SunDirection::Setting,
                elevation: -6.0,
                not_before: None,
                not_after: None,
            }),
            end: Anchor::At(hm(6, 0)),
            days: DayFilter::Days(vec![Weekday::Mon]),
        };
        let eval = evaluator();
        let before_solar_midnight = sun(-20.0, false);
        assert!(window.wraps());
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 21, 30), before_solar_midnight, None));
        assert!(eval.window_contains(&window, utc(2024, 5, 7, 0, 30), before_solar_midnight, None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 6, 0, 30), before_solar_midnight, None));
        // Winter sunset before the nominal 18:00 still opens Monday's window.
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 16, 30), sun(-7.0, false), None));
        assert!(!eval.window_contains(&window, utc(2024, 5, 7, 16, 30), sun(-7.0, false), None));
    }

    #[test]
    fn should_follow_workday_sensor_when_reported() {
        // 2024-05-08 is a Wednesday; the sensor says it is a holiday.
        let window = WindowSpec::between(hm(6, 0), hm(8, 0)).on(DayFilter::Workdays);
        let eval = evaluator();
        let now = utc(2024, 5, 8, 7, 0);
        assert!(eval.window_contains(&window, now, None, None));
        assert!(!eval.window_contains(&window, now, None, Some(false)));
        assert!(!eval.window_contains(&window, utc(2024, 5, 11, 7, 0), None, None));
    }

    #[test]
    fn should_pass_rising_anchor_when_sun_above_threshold() {
        let window = WindowSpec {
            start: Anchor::Sun(rising_anchor(5.0)),
            end: Anchor::At(hm(21, 0)),
            days: DayFilter::Every,
        };
        let eval = evaluator();
        let now = utc(2024, 5, 6, 6, 0);
        assert!(!eval.window_contains(&window, now, sun(2.0, true), None));
        assert!(eval.window_contains(&window, now, sun(6.0, true), None));
        // After solar noon the rising edge has long passed.
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 15, 0), sun(-1.0, false), None));
    }

    #[test]
    fn should_fail_closed_when_sun_unknown_and_no_fixed_clamp() {
        let window = WindowSpec {
            start: Anchor::Sun(rising_anchor(5.0)),
            end: Anchor::At(hm(21, 0)),
            days: DayFilter::Every,
        };
        assert!(!evaluator().window_contains(&window, utc(2024, 5, 6, 10, 0), None, None));
    }

    #[test]
    fn should_force_anchor_when_not_after_reached_without_sun_data() {
        let window = WindowSpec {
            start: Anchor::Sun(SunAnchor {
                not_after: Some(hm(8, 0)),
                ..rising_anchor(5.0)
            }),
            end: Anchor::At(hm(21, 0)),
            days: DayFilter::Every,
        };
        let eval = evaluator();
        assert!(!eval.window_contains(&window, utc(2024, 5, 6, 7, 0), None, None));
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 8, 0), None, None));
    }

    #[test]
    fn should_delay_anchor_when_before_not_before() {
        let window = WindowSpec {
            start: Anchor::Sun(SunAnchor {
                not_before: Some(hm(7, 0)),
                ..rising_anchor(0.0)
            }),
            end: Anchor::At(hm(21, 0)),
            days: DayFilter::Every,
        };
        let eval = evaluator();
        assert!(!eval.window_contains(&window, utc(2024, 5, 6, 6, 0), sun(10.0, true), None));
        assert!(eval.window_contains(&window, utc(2024, 5, 6, 7, 0), sun(10.0, true), None));
    }

    #[test]
    fn should_pass_setting_anchor_only_when_falling_below_threshold() {
        let anchor = Anchor::Sun(SunAnchor {
            direction: SunDirection::Setting,
            elevation: 2.0,
            not_before: None,
            not_after: None,
        });
        let noon = NaiveTime::from_hms_opt(12, 0, 0).unwrap();
        assert_eq!(anchor.passed(noon, sun(1.0, true)), Some(false));
        assert_eq!(anchor.passed(noon, sun(20.0, false)), Some(false));
        assert_eq!(anchor.passed(noon, sun(1.5, false)), Some(true));
        assert_eq!(anchor.passed(noon, None), None);
    }

    #[test]
    fn should_classify_overlap_as_closing() {
        let cfg = config(
            WindowSpec::between(hm(6, 0), hm(22, 0)),
            WindowSpec::between(hm(20, 0), hm(6, 0)),
        );
        let eval = evaluator();
        let env = EnvironmentSnapshot::at(utc(2024, 5, 6, 21, 0));
        assert_eq!(eval.classify(&cfg, &env), Some(WindowKind::Closing));
        let env = EnvironmentSnapshot::at(utc(2024, 5, 6, 12, 0));
        assert_eq!(eval.classify(&cfg, &env), Some(WindowKind::Opening));
    }

    #[test]
    fn should_classify_none_when_outside_all_windows() {
        let cfg = config(
            WindowSpec::between(hm(7, 0), hm(12, 0)),
            WindowSpec::between(hm(22, 0), hm(5, 0)),
        );
        let env = EnvironmentSnapshot::at(utc(2024, 5, 6, 17, 0));
        assert_eq!(evaluator().classify(&cfg, &env), None);
    }

    #[test]
    fn should_find_next_boundary_across_midnight() {
        let cfg = config(
            WindowSpec::between(hm(7, 0), hm(21, 0)),
            WindowSpec::between(hm(21, 0), hm(7, 0)),
        );
        let eval = evaluator();
        let now = utc(2024, 5, 6, 22, 0);
        assert_eq!(
            eval.next_boundary(WindowKind::Closing, &cfg, now, None),
            Some(utc(2024, 5, 7, 7, 0))
        );
        assert_eq!(
            eval.next_start(WindowKind::Closing, &cfg, now, None),
            Some(utc(2024, 5, 7, 21, 0))
        );
        assert_eq!(
            eval.next_start(WindowKind::Opening, &cfg, now, None),
            Some(utc(2024, 5, 7, 7, 0))
        );
    }

    #[test]
    fn should_interpret_times_in_site_timezone() {
        let eval = ScheduleEvaluator::new(chrono_tz::Europe::Berlin, None);
        let window = WindowSpec::between(hm(7, 0), hm(8, 0));
        // 05:30 UTC is 07:30 in Berlin during summer time.
        assert!(eval.window_contains(&window, utc(2024, 7, 1, 5, 30), None, None));
        assert!(!eval.window_contains(&window, utc(2024, 7, 1, 7, 30), None, None));
    }

    #[test]
    fn should_estimate_sun_anchor_with_ephemeris_when_location_known() {
        let eval = ScheduleEvaluator::new(
            chrono_tz::Europe::Berlin,
            Some(Location {
                latitude: 52.52,
                longitude: 13.40,
            }),
        );
        let cfg = config(
            WindowSpec {
                start: Anchor::Sun(rising_anchor(0.0)),
                end: Anchor::At(hm(21, 0)),
                days: DayFilter::Every,
            },
            WindowSpec::between(hm(22, 0), hm(1, 0)),
        );
        let next = eval
            .next_start(WindowKind::Opening, &cfg, utc(2024, 6, 20, 22, 0), None)
            .unwrap();
        assert!(next > utc(2024, 6, 21, 2, 30) && next < utc(2024, 6, 21, 3, 10));
    }

    #[test]
    fn should_fall_back_to_clamp_when_no_location() {
        let cfg = config(
            WindowSpec {
                start: Anchor::Sun(SunAnchor {
                    not_after: Some(hm(8, 0)),
                    ..rising_anchor(0.0)
                }),
                end: Anchor::At(hm(21, 0)),
                days: DayFilter::Every,
            },
            WindowSpec::between(hm(22, 0), hm(1, 0)),
        );
        assert_eq!(
            evaluator().next_start(WindowKind::Opening, &cfg, utc(2024, 6, 21, 0, 0), None),
            Some(utc(2024, 6, 21, 8, 0))
        );
    }

    #[test]
    fn should_roll_over_to_tomorrow_when_time_already_passed() {
        let eval = evaluator();
        assert_eq!(
            eval.next_occurrence(hm(3, 0), utc(2024, 5, 6, 1, 0)),
            Some(utc(2024, 5, 6, 3, 0))
        );
        assert_eq!(
            eval.next_occurrence(hm(3, 0), utc(2024, 5, 6, 3, 0)),
            Some(utc(2024, 5, 7, 3, 0))
        );
    }

    #[test]
    fn should_reject_window_when_edges_equal() {
        let window = WindowSpec::between(hm(7, 0), hm(7, 0));
        assert_eq!(
            window.validate(WindowKind::Opening, 0),
            Err(ValidationError::EmptyWindow {
                kind: WindowKind::Opening,
                index: 0
            })
        );
    }

    #[test]
    fn should_reject_inverted_clamps() {
        let window = WindowSpec {
            start: Anchor::Sun(SunAnchor {
                not_before: Some(hm(9, 0)),
                not_after: Some(hm(8, 0)),
                ..rising_anchor(0.0)
            }),
            end: Anchor::At(hm(21, 0)),
            days: DayFilter::Every,
        };
        assert!(matches!(
            window.validate(WindowKind::Opening, 0),
            Err(ValidationError::InvertedClamp { .. })
        ));
    }

    #[test]
    fn should_deserialize_fixed_and_sun_anchors_from_toml() {
        let window: WindowSpec = toml::from_str(
            r#"
            start = { sun = "rising", elevation = 3.0, not_before = "06:00" }
            end = "21:30"
            days = ["mon", "tue"]
            "#,
        )
        .unwrap();
        assert!(matches!(window.start, Anchor::Sun(SunAnchor { direction: SunDirection::Rising, .. })));
        assert_eq!(window.end, Anchor::At(hm(21, 30)));
        assert_eq!(window.days, DayFilter::Days(vec![Weekday::Mon, Weekday::Tue]));

        let named: WindowSpec =
            toml::from_str("start = \"22:00\"\nend = \"06:00\"\ndays = \"workdays\"").unwrap();
        assert_eq!(named.days, DayFilter::Workdays);
    }
}
