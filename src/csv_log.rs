//! Parser for the controller's `log` endpoint
//!
//! The endpoint returns a `;`-separated CSV: a header line, then one line
//! per sample. Only the newest sample is of interest.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::Serialize;

use crate::error::{Error, Result};

/// One typed CSV cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogValue {
    Int(i64),
    Float(f64),
    Date(NaiveDate),
    Time(NaiveTime),
    Text(String),
}

impl LogValue {
    fn parse(cell: &str) -> Self {
        if cell.contains(',') {
            if let Ok(f) = cell.replace(',', ".").parse::<f64>() {
                return Self::Float(f);
            }
        }

        let dotted: Vec<&str> = cell.split('.').collect();
        if dotted.len() == 3 {
            if let Some(date) = parse_date(&dotted) {
                return Self::Date(date);
            }
        }

        let coloned: Vec<&str> = cell.split(':').collect();
        if coloned.len() == 3 {
            if let Some(time) = parse_time(&coloned) {
                return Self::Time(time);
            }
        }

        if !cell.is_empty() && cell.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(i) = cell.parse() {
                return Self::Int(i);
            }
        }

        Self::Text(cell.to_string())
    }
}

fn parse_date(parts: &[&str]) -> Option<NaiveDate> {
    let day = parts[0].trim().parse().ok()?;
    let month = parts[1].trim().parse().ok()?;
    let year = parts[2].trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn parse_time(parts: &[&str]) -> Option<NaiveTime> {
    let hour = parts[0].trim().parse().ok()?;
    let minute = parts[1].trim().parse().ok()?;
    let second = parts[2].trim().parse().ok()?;
    NaiveTime::from_hms_opt(hour, minute, second)
}

/// The newest log sample
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord {
    /// Date and time cells combined; date falls back to `today`
    pub timestamp: Option<NaiveDateTime>,
    pub columns: Vec<(String, LogValue)>,
}

impl LogRecord {
    pub fn get(&self, column: &str) -> Option<&LogValue> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }
}

/// Parse the CSV text, keeping the header and the last non-empty line
pub fn parse(text: &str, today: NaiveDate) -> Result<LogRecord> {
    let mut lines = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty());

    let header = lines
        .next()
        .ok_or_else(|| Error::UnexpectedPayload("log is empty".to_string()))?;
    let record = lines
        .last()
        .ok_or_else(|| Error::UnexpectedPayload("log has no samples".to_string()))?;

    let mut date = None;
    let mut time = None;
    let mut columns = Vec::new();

    for (name, cell) in header.split(';').zip(record.split(';')) {
        let value = LogValue::parse(cell);
        match &value {
            LogValue::Date(d) => date = Some(*d),
            LogValue::Time(t) => time = Some(*t),
            _ => {}
        }

        let name = name.replace("[»C]", "[°C]");
        let name = name.trim_end();
        if !name.is_empty() {
            columns.push((name.to_string(), value));
        }
    }

    Ok(LogRecord {
        timestamp: time.map(|t| date.unwrap_or(today).and_time(t)),
        columns,
    })
}
