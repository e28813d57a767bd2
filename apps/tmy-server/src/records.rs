//! Flattening of localized TMY rows into fixed-shape hourly records.

use chrono::{Datelike, NaiveDateTime, Timelike};
use serde::Serialize;
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

use crate::json::finite_number;
use crate::pvgis::RawWeatherRow;
use crate::timezone::LocalZone;

/// Row keys an output field may be sourced from, in priority order.
struct FieldSpec {
    sources: &'static [&'static str],
}

const DNI: FieldSpec = FieldSpec { sources: &["dni"] };
const DHI: FieldSpec = FieldSpec { sources: &["dhi"] };
const GHI: FieldSpec = FieldSpec { sources: &["ghi"] };
const TA: FieldSpec = FieldSpec {
    sources: &["temp_air", "t2m"],
};
const VWIND: FieldSpec = FieldSpec {
    sources: &["wind_speed", "ws10m"],
};

/// One local-time hour of the typical year. `hour_n` is 0..=23.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRecord {
    #[serde(rename = "dayN")]
    pub day_n: u32,
    #[serde(rename = "hourN")]
    pub hour_n: u32,
    pub dni: f64,
    pub dhi: f64,
    pub ghi: f64,
    pub ta: f64,
    pub vwind: f64,
}

/// Missing, null, NaN and non-numeric values all become `0.0`.
pub fn fnum(value: Option<&JsonValue>) -> f64 {
    value.and_then(finite_number).unwrap_or(0.0)
}

/// First source key present in the row wins, even when its value is unusable;
/// later keys are only consulted when earlier ones are absent.
fn lookup<'a>(
    fields: &'a BTreeMap<String, JsonValue>,
    sources: &[&str],
) -> Option<&'a JsonValue> {
    sources.iter().find_map(|key| fields.get(*key))
}

fn field(fields: &BTreeMap<String, JsonValue>, spec: &FieldSpec) -> f64 {
    fnum(lookup(fields, spec.sources))
}

pub fn flatten_row(local: NaiveDateTime, fields: &BTreeMap<String, JsonValue>) -> OutputRecord {
    OutputRecord {
        day_n: local.ordinal(),
        hour_n: local.hour(),
        dni: field(fields, &DNI),
        dhi: field(fields, &DHI),
        ghi: field(fields, &GHI),
        ta: field(fields, &TA),
        vwind: field(fields, &VWIND),
    }
}

/// Converts every row timestamp into `zone` in one pass, then flattens each
/// row from its converted timestamp. Output order matches input order.
pub fn build_records(rows: &[RawWeatherRow], zone: &LocalZone) -> Vec<OutputRecord> {
    let local_times: Vec<NaiveDateTime> = rows
        .iter()
        .map(|row| zone.localize(&row.timestamp))
        .collect();
    local_times
        .into_iter()
        .zip(rows)
        .map(|(local, row)| flatten_row(local, &row.fields))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use serde_json::json;
    use std::collections::HashSet;

    fn fields(value: JsonValue) -> BTreeMap<String, JsonValue> {
        match value {
            JsonValue::Object(map) => map.into_iter().collect(),
            _ => panic!("expected object"),
        }
    }

    fn row(timestamp: DateTime<Utc>, value: JsonValue) -> RawWeatherRow {
        RawWeatherRow {
            timestamp,
            fields: fields(value),
        }
    }

    fn year_of_rows(year: i32) -> Vec<RawWeatherRow> {
        let start = Utc.with_ymd_and_hms(year, 1, 1, 0, 0, 0).single().expect("start");
        let end = Utc.with_ymd_and_hms(year + 1, 1, 1, 0, 0, 0).single().expect("end");
        (0..(end - start).num_hours())
            .map(|hour| row(start + Duration::hours(hour), json!({"ghi": 1.0})))
            .collect()
    }

    #[test]
    fn missing_fields_become_zero() {
        let local = Utc
            .with_ymd_and_hms(2010, 3, 1, 12, 0, 0)
            .single()
            .expect("utc")
            .naive_utc();
        let record = flatten_row(local, &BTreeMap::new());
        assert_eq!(record.day_n, 60);
        assert_eq!(record.hour_n, 12);
        assert_eq!(
            (record.dni, record.dhi, record.ghi, record.ta, record.vwind),
            (0.0, 0.0, 0.0, 0.0, 0.0)
        );
    }

    #[test]
    fn null_and_text_values_become_zero() {
        let local = NaiveDateTime::default();
        let record = flatten_row(
            local,
            &fields(json!({"dni": null, "dhi": "n/a", "ghi": "NaN", "temp_air": "12.5"})),
        );
        assert_eq!(record.dni, 0.0);
        assert_eq!(record.dhi, 0.0);
        assert_eq!(record.ghi, 0.0);
        assert_eq!(record.ta, 12.5);
    }

    #[test]
    fn alternate_source_keys_are_used() {
        let record = flatten_row(
            NaiveDateTime::default(),
            &fields(json!({"t2m": 21.5, "ws10m": 3.25})),
        );
        assert_eq!(record.ta, 21.5);
        assert_eq!(record.vwind, 3.25);
    }

    #[test]
    fn primary_key_takes_precedence() {
        let record = flatten_row(
            NaiveDateTime::default(),
            &fields(json!({"temp_air": 10.0, "t2m": 99.0, "wind_speed": 1.0, "ws10m": 99.0})),
        );
        assert_eq!(record.ta, 10.0);
        assert_eq!(record.vwind, 1.0);
    }

    #[test]
    fn utc_zone_keeps_utc_hours() {
        let rows = year_of_rows(2010);
        let records = build_records(&rows, &LocalZone::UTC);
        assert_eq!(records.len(), rows.len());
        for (record, row) in records.iter().zip(&rows) {
            assert_eq!(record.hour_n, row.timestamp.hour());
            assert_eq!(record.day_n, row.timestamp.ordinal());
        }
    }

    #[test]
    fn fixed_offset_shifts_labels_without_reordering() {
        let zone = LocalZone::from_offset_hours(-9.0).expect("zone");
        let rows = year_of_rows(2010);
        let records = build_records(&rows, &zone);

        assert_eq!(records[0].day_n, 365);
        assert_eq!(records[0].hour_n, 15);
        assert_eq!(records[9].day_n, 1);
        assert_eq!(records[9].hour_n, 0);
        for (record, row) in records.iter().zip(&rows) {
            let shifted = row.timestamp - Duration::hours(9);
            assert_eq!(record.hour_n, shifted.hour());
            assert_eq!(record.day_n, shifted.ordinal());
        }
    }

    #[test]
    fn every_day_has_each_hour_once() {
        let rows = year_of_rows(2010);
        let records = build_records(&rows, &LocalZone::UTC);
        let mut seen = HashSet::new();
        for record in &records {
            assert!((1..=366).contains(&record.day_n));
            assert!(record.hour_n <= 23);
            assert!(seen.insert((record.day_n, record.hour_n)));
        }
        assert_eq!(seen.len(), 8760);
        let days: HashSet<u32> = records.iter().map(|r| r.day_n).collect();
        assert_eq!(days.len(), 365);
    }

    #[test]
    fn leap_year_table_covers_day_366() {
        let rows = year_of_rows(2012);
        assert_eq!(rows.len(), 8784);
        let records = build_records(&rows, &LocalZone::UTC);
        assert_eq!(records.len(), 8784);

        let mut hours_per_day: BTreeMap<u32, HashSet<u32>> = BTreeMap::new();
        for record in &records {
            hours_per_day
                .entry(record.day_n)
                .or_default()
                .insert(record.hour_n);
        }
        assert_eq!(hours_per_day.len(), 366);
        assert_eq!(
            hours_per_day.keys().copied().collect::<Vec<_>>(),
            (1..=366).collect::<Vec<_>>()
        );
        assert!(hours_per_day.values().all(|hours| hours.len() == 24));

        // 29 February is day 60, 1 March moves to day 61.
        assert_eq!(records[59 * 24].day_n, 60);
        assert_eq!(records[60 * 24].day_n, 61);
    }

    #[test]
    fn each_field_reads_its_own_source() {
        let record = flatten_row(
            NaiveDateTime::default(),
            &fields(json!({
                "dni": 1.0,
                "dhi": 2.0,
                "ghi": 3.0,
                "temp_air": 4.0,
                "wind_speed": 5.0
            })),
        );
        assert_eq!(
            (record.dni, record.dhi, record.ghi, record.ta, record.vwind),
            (1.0, 2.0, 3.0, 4.0, 5.0)
        );
    }

    #[test]
    fn named_zone_uses_local_calendar_day() {
        let zone = LocalZone::Named(chrono_tz::America::Los_Angeles);
        let ts = Utc.with_ymd_and_hms(2010, 1, 2, 3, 0, 0).single().expect("utc");
        let records = build_records(&[row(ts, json!({}))], &zone);
        assert_eq!(records[0].day_n, 1);
        assert_eq!(records[0].hour_n, 19);
    }

    #[test]
    fn serializes_with_contract_field_names() {
        let record = flatten_row(NaiveDateTime::default(), &fields(json!({"ghi": 5.0})));
        let value = serde_json::to_value(&record).expect("serialize");
        let keys: Vec<&str> = value
            .as_object()
            .expect("object")
            .keys()
            .map(String::as_str)
            .collect();
        for key in ["dayN", "hourN", "dni", "dhi", "ghi", "ta", "vwind"] {
            assert!(keys.contains(&key), "missing {key}");
        }
        assert_eq!(value["ghi"], json!(5.0));
    }
}
