use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MeteoError, Result};

/// Run dates use hour precision, e.g. `2024-01-15T00`.
pub(crate) const RUN_DATE_FORMAT: &str = "%Y-%m-%dT%H";

/// How far back a forecast run may start and still be used.
const MAX_RUN_AGE_HOURS: i64 = 24;

/// Values of a single timestamp: field name -> level -> value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForecastRecord {
    fields: BTreeMap<String, BTreeMap<i32, Value>>,
}

impl ForecastRecord {
    /// Value of `field` at level 0.
    pub fn value(&self, field: &str) -> Option<&Value> {
        self.value_at(field, 0)
    }

    pub fn value_at(&self, field: &str, level: i32) -> Option<&Value> {
        self.fields.get(field).and_then(|levels| levels.get(&level))
    }

    /// Level 0 value as a float; `None` if missing or not numeric.
    pub fn get_f64(&self, field: &str) -> Option<f64> {
        self.value(field).and_then(Value::as_f64)
    }

    pub fn levels(&self, field: &str) -> Option<&BTreeMap<i32, Value>> {
        self.fields.get(field)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub(crate) fn insert(&mut self, field: &str, level: i32, value: Value) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .insert(level, value);
    }
}

/// Forecast data keyed by timestamp, in timestamp order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ForecastResult {
    entries: BTreeMap<String, ForecastRecord>,
}

impl ForecastResult {
    pub fn get(&self, time: &str) -> Option<&ForecastRecord> {
        self.entries.get(time)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ForecastRecord)> {
        self.entries.iter().map(|(t, r)| (t.as_str(), r))
    }

    pub fn times(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a result document.
    ///
    /// Accepts `{"<time>": {"<field>": <number>}}` (the value is stored at
    /// level 0) as well as the per-level form this type serializes to,
    /// `{"<time>": {"<field>": {"<level>": <value>}}}`.
    pub fn from_json(text: &str) -> Result<Self> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> =
            serde_json::from_str(text).map_err(|e| MeteoError::parse("<document>", e))?;

        let mut result = ForecastResult::default();
        for (time, fields) in raw {
            let record = result.entries.entry(time.clone()).or_default();
            for (field, value) in fields {
                match value {
                    Value::Number(_) => record.insert(&field, 0, value),
                    Value::Object(levels) => {
                        for (level, v) in levels {
                            let level = level.parse::<i32>().map_err(|_| {
                                MeteoError::parse(
                                    "<document>",
                                    format!("level `{}` of {} at {} is not an integer", level, field, time),
                                )
                            })?;
                            record.insert(&field, level, v);
                        }
                    }
                    other => {
                        return Err(MeteoError::parse(
                            "<document>",
                            format!("{} at {} is neither a number nor a level map: {}", field, time, other),
                        ));
                    }
                }
            }
        }
        Ok(result)
    }

    pub(crate) fn insert(&mut self, time: String, field: &str, level: i32, value: Value) {
        self.entries.entry(time).or_default().insert(field, level, value);
    }
}

impl IntoIterator for ForecastResult {
    type Item = (String, ForecastRecord);
    type IntoIter = std::collections::btree_map::IntoIter<String, ForecastRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// One series of forecast runs: `count` runs every `interval` hours.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct DateWindow {
    #[serde(rename = "starting-date")]
    pub(crate) starting_date: String,
    pub(crate) interval: i64,
    pub(crate) count: u32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DatesReply {
    pub(crate) dates: Vec<DateWindow>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ForecastReply {
    pub(crate) times: Vec<String>,
    pub(crate) data: Vec<Value>,
}

impl ForecastReply {
    /// Zips times with values into `result` under `field`/`level`.
    pub(crate) fn merge_into(self, result: &mut ForecastResult, field: &str, level: i32) {
        for (time, value) in self.times.into_iter().zip(self.data) {
            result.insert(time, field, level, value);
        }
    }
}

fn parse_run_date(s: &str) -> Result<NaiveDateTime> {
    // chrono will not build a time from an hour alone.
    NaiveDateTime::parse_from_str(&format!("{}:00", s.trim()), "%Y-%m-%dT%H:%M")
        .map_err(|e| MeteoError::parse("<dates>", format!("bad run date `{}`: {}", s, e)))
}

impl DateWindow {
    /// The `i`-th run of this window.
    fn run(&self, start: NaiveDateTime, i: u32) -> Option<NaiveDateTime> {
        let hours = self.interval.checked_mul(i64::from(i))?;
        start.checked_add_signed(Duration::try_hours(hours)?)
    }
}

/// Picks the newest run that started no earlier than 24 hours before `now`
/// (truncated to the hour). Windows and the runs inside them are walked from
/// last to first.
pub(crate) fn select_run_date(
    windows: &[DateWindow],
    now: DateTime<Utc>,
) -> Result<Option<String>> {
    let now = now
        .with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now);
    let oldest = (now - Duration::hours(MAX_RUN_AGE_HOURS)).naive_utc();

    for window in windows.iter().rev() {
        let start = parse_run_date(&window.starting_date)?;
        for i in (0..window.count).rev() {
            match window.run(start, i) {
                Some(run) if run >= oldest => {
                    return Ok(Some(run.format(RUN_DATE_FORMAT).to_string()));
                }
                _ => continue,
            }
        }
    }
    Ok(None)
}
