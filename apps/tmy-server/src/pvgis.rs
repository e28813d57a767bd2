//! Client for the PVGIS typical-meteorological-year endpoint.
//!
//! The hourly table comes back in UTC with provider variable names; rows are
//! renamed to the canonical irradiance/weather names used by the record builder
//! and the `inputs` block is kept as site metadata.

use chrono::{DateTime, Datelike, NaiveDateTime, Utc};
use serde_json::{Map, Value as JsonValue};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::config::Config;
use crate::json;

const TIME_COLUMN: &str = "time(UTC)";
const TIME_FORMAT: &str = "%Y%m%d:%H%M";
const MAX_ERROR_BODY_CHARS: usize = 300;

/// Provider variable name -> canonical name.
const VARIABLE_MAP: &[(&str, &str)] = &[
    ("T2m", "temp_air"),
    ("RH", "relative_humidity"),
    ("G(h)", "ghi"),
    ("Gb(n)", "dni"),
    ("Gd(h)", "dhi"),
    ("IR(h)", "ghi_infrared"),
    ("WS10m", "wind_speed"),
    ("WD10m", "wind_direction"),
    ("SP", "pressure"),
];

#[derive(Debug, Error)]
pub enum PvgisError {
    #[error("TMY request to {url} failed")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("TMY provider returned HTTP {status}: {message}")]
    HttpStatus {
        status: reqwest::StatusCode,
        message: String,
    },

    #[error("failed to decode TMY payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("TMY payload has no outputs.tmy_hourly table")]
    MissingTable,

    #[error("unparsable TMY timestamp {value:?}")]
    Timestamp { value: String },
}

/// One hourly observation, keyed by canonical field name.
#[derive(Debug, Clone, PartialEq)]
pub struct RawWeatherRow {
    pub timestamp: DateTime<Utc>,
    pub fields: BTreeMap<String, JsonValue>,
}

#[derive(Debug, Clone)]
pub struct TmyDataset {
    pub rows: Vec<RawWeatherRow>,
    pub meta: Map<String, JsonValue>,
}

#[derive(Debug, Clone)]
pub struct PvgisClient {
    http: reqwest::Client,
    base_url: String,
    use_horizon: bool,
    start_year: Option<i32>,
    end_year: Option<i32>,
    coerce_year: Option<i32>,
    timeout: Option<Duration>,
}

impl PvgisClient {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            base_url: config.pvgis_base_url.trim_end_matches('/').to_string(),
            use_horizon: config.use_horizon,
            start_year: config.start_year,
            end_year: config.end_year,
            coerce_year: config.coerce_year,
            timeout: config.upstream_timeout,
        }
    }

    pub async fn fetch_tmy(&self, latitude: f64, longitude: f64) -> Result<TmyDataset, PvgisError> {
        let url = format!("{}/tmy", self.base_url);
        let mut query: Vec<(&str, String)> = vec![
            ("lat", latitude.to_string()),
            ("lon", longitude.to_string()),
            ("outputformat", "json".to_string()),
            ("usehorizon", u8::from(self.use_horizon).to_string()),
        ];
        if let Some(year) = self.start_year {
            query.push(("startyear", year.to_string()));
        }
        if let Some(year) = self.end_year {
            query.push(("endyear", year.to_string()));
        }

        let mut request = self.http.get(&url).query(&query);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        tracing::debug!(%url, latitude, longitude, "requesting TMY table");
        let response = request.send().await.map_err(|source| PvgisError::Request {
            url: url.clone(),
            source,
        })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|source| PvgisError::Request {
                url: url.clone(),
                source,
            })?;
        if !status.is_success() {
            return Err(PvgisError::HttpStatus {
                status,
                message: upstream_error_message(&body),
            });
        }

        let payload: JsonValue = serde_json::from_str(&body)?;
        parse_tmy_payload(&payload, self.coerce_year)
    }
}

/// Prefers the provider's JSON `message`; falls back to a truncated body.
fn upstream_error_message(body: &str) -> String {
    if let Ok(JsonValue::Object(obj)) = serde_json::from_str::<JsonValue>(body) {
        if let Some(message) = obj.get("message").and_then(JsonValue::as_str) {
            return message.trim().to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
}

pub(crate) fn parse_tmy_payload(
    payload: &JsonValue,
    coerce_year: Option<i32>,
) -> Result<TmyDataset, PvgisError> {
    let outputs = payload.get("outputs");
    let table = outputs
        .and_then(|o| o.get("tmy_hourly"))
        .and_then(JsonValue::as_array)
        .ok_or(PvgisError::MissingTable)?;

    let mut rows = Vec::with_capacity(table.len());
    let mut dropped_leap_days = 0usize;
    for entry in table {
        let Some(obj) = entry.as_object() else {
            return Err(PvgisError::Timestamp {
                value: entry.to_string(),
            });
        };
        let raw_time = obj
            .get(TIME_COLUMN)
            .and_then(JsonValue::as_str)
            .ok_or_else(|| PvgisError::Timestamp {
                value: obj
                    .get(TIME_COLUMN)
                    .map(JsonValue::to_string)
                    .unwrap_or_else(|| "<missing>".to_string()),
            })?;
        let Some(timestamp) = parse_timestamp(raw_time, coerce_year)? else {
            dropped_leap_days += 1;
            continue;
        };

        let fields = obj
            .iter()
            .filter(|(key, _)| key.as_str() != TIME_COLUMN)
            .map(|(key, value)| (canonical_name(key).to_string(), value.clone()))
            .collect();
        rows.push(RawWeatherRow { timestamp, fields });
    }
    if dropped_leap_days > 0 {
        tracing::debug!(
            dropped = dropped_leap_days,
            coerce_year = ?coerce_year,
            "dropped 29 February rows with no counterpart in the coerced year"
        );
    }

    let mut meta = match payload.get("inputs") {
        Some(inputs) => json::normalize_meta(inputs.clone()),
        None => Map::new(),
    };
    if let Some(months) = outputs.and_then(|o| o.get("months_selected")) {
        meta.insert("months_selected".to_string(), months.clone());
    }
    if let Some(descriptions) = payload.get("meta") {
        meta.insert("descriptions".to_string(), descriptions.clone());
    }

    Ok(TmyDataset { rows, meta })
}

/// `Ok(None)` for a 29 February row when `coerce_year` has no such day.
fn parse_timestamp(
    raw: &str,
    coerce_year: Option<i32>,
) -> Result<Option<DateTime<Utc>>, PvgisError> {
    let mut naive = NaiveDateTime::parse_from_str(raw.trim(), TIME_FORMAT).map_err(|_| {
        PvgisError::Timestamp {
            value: raw.to_string(),
        }
    })?;
    if let Some(year) = coerce_year {
        match naive.with_year(year) {
            Some(coerced) => naive = coerced,
            None => return Ok(None),
        }
    }
    Ok(Some(naive.and_utc()))
}

fn canonical_name(provider: &str) -> &str {
    VARIABLE_MAP
        .iter()
        .find(|(from, _)| *from == provider)
        .map(|(_, to)| *to)
        .unwrap_or(provider)
}
