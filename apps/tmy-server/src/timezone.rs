//! Site-local time zone resolution.
//!
//! Resolution order: numeric `TZ` offset hint in the provider metadata, then a
//! named zone looked up from the coordinates, then UTC. Nothing here returns an
//! error; every failed step falls through to the next one.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use chrono_tz::Tz;
use serde_json::{Map, Value as JsonValue};
use std::str::FromStr;
use tzf_rs::DefaultFinder;

use crate::json::finite_number;

pub const OFFSET_HINT_KEY: &str = "TZ";

/// The zone every row timestamp is converted into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalZone {
    /// Constant offset from UTC; no daylight-saving transitions.
    Fixed(FixedOffset),
    /// IANA zone with its full rule set.
    Named(Tz),
}

impl LocalZone {
    pub const UTC: LocalZone = LocalZone::Named(Tz::UTC);

    /// Hours east of UTC, rounded to the second. `None` for non-finite input or
    /// offsets of a day or more.
    pub fn from_offset_hours(hours: f64) -> Option<Self> {
        if !hours.is_finite() {
            return None;
        }
        let seconds = (hours * 3600.0).round();
        if seconds.abs() >= 86_400.0 {
            return None;
        }
        FixedOffset::east_opt(seconds as i32).map(LocalZone::Fixed)
    }

    pub fn from_zone_name(name: &str) -> Option<Self> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Tz::from_str(name).ok().map(LocalZone::Named)
    }

    /// `America/Los_Angeles` for named zones, `UTC-09:00` style for fixed offsets.
    pub fn identifier(&self) -> String {
        match self {
            LocalZone::Named(tz) => tz.name().to_string(),
            LocalZone::Fixed(offset) => {
                let total = offset.local_minus_utc();
                if total == 0 {
                    return "UTC".to_string();
                }
                let sign = if total < 0 { '-' } else { '+' };
                let abs = total.unsigned_abs();
                let hours = abs / 3600;
                let minutes = (abs % 3600) / 60;
                let seconds = abs % 60;
                if seconds == 0 {
                    format!("UTC{sign}{hours:02}:{minutes:02}")
                } else {
                    format!("UTC{sign}{hours:02}:{minutes:02}:{seconds:02}")
                }
            }
        }
    }

    /// Wall-clock time at the site for a UTC instant.
    pub fn localize(&self, utc: &DateTime<Utc>) -> NaiveDateTime {
        match self {
            LocalZone::Fixed(offset) => utc.with_timezone(offset).naive_local(),
            LocalZone::Named(tz) => utc.with_timezone(tz).naive_local(),
        }
    }
}

/// Reads the numeric UTC-offset hint from provider metadata, if usable.
pub fn offset_hint(meta: &Map<String, JsonValue>) -> Option<f64> {
    meta.get(OFFSET_HINT_KEY).and_then(finite_number)
}

/// Coordinate to zone-name lookup over the bundled boundary polygons.
///
/// Building the finder parses the whole polygon set, so one instance is built
/// at startup and shared read-only between requests.
pub struct TimezoneResolver {
    finder: DefaultFinder,
}

impl Default for TimezoneResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TimezoneResolver {
    pub fn new() -> Self {
        Self {
            finder: DefaultFinder::new(),
        }
    }

    pub fn zone_name(&self, latitude: f64, longitude: f64) -> Option<&str> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return None;
        }
        let name = self.finder.get_tz_name(longitude, latitude).trim();
        (!name.is_empty()).then_some(name)
    }

    pub fn resolve(
        &self,
        latitude: f64,
        longitude: f64,
        meta: &Map<String, JsonValue>,
    ) -> LocalZone {
        if let Some(hours) = offset_hint(meta) {
            match LocalZone::from_offset_hours(hours) {
                Some(zone) => return zone,
                None => {
                    tracing::warn!(hours, "ignoring out-of-range TZ offset hint");
                }
            }
        }

        let name = self.zone_name(latitude, longitude);
        match name.and_then(LocalZone::from_zone_name) {
            Some(zone) => zone,
            None => {
                tracing::warn!(
                    latitude,
                    longitude,
                    zone = name.unwrap_or(""),
                    "no usable time zone for coordinates; falling back to UTC"
                );
                LocalZone::UTC
            }
        }
    }
}
