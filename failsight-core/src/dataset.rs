//! In-memory sensor table.
//!
//! Loaded eagerly from a delimited file and never mutated afterwards. Queries
//! filter by work order, group by `(sensor_name, sensor_id)` in first-appearance
//! order and sort each group by timestamp. The sort is stable: readings that
//! share a timestamp keep their original row order.
//!
//! `sensor_name` and `sensor_id` are compared as trimmed text, so `1` and `1.0`
//! are distinct sensors. Identifiers such as `007` or `T-1` must survive
//! untouched, which rules out numeric coercion.
//!
//! A `NaN` reading is kept as a gap in its series; infinite readings are
//! rejected at load.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use indexmap::IndexMap;

use crate::config::DatasetConfig;
use crate::encoding::{decode_with_fallback, resolve_label};
use crate::error::{FailsightError, Result, SourceKind};
use crate::fingerprint::SourceFingerprint;
use crate::models::{SensorKey, SensorReading, SensorSeries, SeriesPoint};

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

#[derive(Debug, Clone)]
pub struct SensorTable {
    readings: Vec<SensorReading>,
    by_work_order: HashMap<i64, Vec<usize>>,
    fingerprint: SourceFingerprint,
}

struct ColumnIndex {
    work_order: usize,
    sensor_name: usize,
    sensor_id: usize,
    timestamp: usize,
    reading: usize,
}

impl SensorTable {
    pub fn load(path: &Path, config: &DatasetConfig) -> Result<Self> {
        let bytes = std::fs::read(path).map_err(|e| {
            tracing::debug!("Reading {} failed: {}", path.display(), e);
            FailsightError::SourceNotFound {
                kind: SourceKind::Dataset,
                path: path.to_path_buf(),
            }
        })?;
        let table = Self::from_bytes(&bytes, path, config)?;
        tracing::info!(
            "Loaded dataset {} ({} readings, {} work orders)",
            path.display(),
            table.readings.len(),
            table.work_order_count()
        );
        Ok(table)
    }

    /// Parse an in-memory table; `origin` is only used in errors and the fingerprint.
    pub fn from_bytes(bytes: &[u8], origin: &Path, config: &DatasetConfig) -> Result<Self> {
        let decoded = decode_with_fallback(bytes, resolve_label(&config.fallback_encoding)?)
            .map_err(|e| FailsightError::format(SourceKind::Dataset, origin, e))?;
        let format_err = |reason: String| FailsightError::format(SourceKind::Dataset, origin, reason);

        let delimiter = u8::try_from(config.delimiter)
            .map_err(|_| format_err(format!("delimiter {:?} is not a single byte", config.delimiter)))?;
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(csv::Trim::All)
            .from_reader(decoded.text.as_bytes());

        let headers = reader
            .headers()
            .map_err(|e| format_err(format!("bad header row: {}", e)))?
            .clone();
        let columns = ColumnIndex::resolve(&headers, origin, config)?;

        let mut readings = Vec::new();
        let mut by_work_order: HashMap<i64, Vec<usize>> = HashMap::new();
        for (index, record) in reader.records().enumerate() {
            let row = index + 1;
            let record = record.map_err(|e| format_err(format!("row {}: {}", row, e)))?;
            let field = |i: usize| record.get(i).unwrap_or("");

            let work_order_id = parse_work_order(field(columns.work_order)).ok_or_else(|| {
                format_err(format!(
                    "row {}: work order {:?} is not an integer",
                    row,
                    field(columns.work_order)
                ))
            })?;
            let timestamp = parse_timestamp(field(columns.timestamp)).ok_or_else(|| {
                format_err(format!(
                    "row {}: timestamp {:?} is not a recognised date/time",
                    row,
                    field(columns.timestamp)
                ))
            })?;
            let value: f64 = field(columns.reading)
                .parse()
                .ok()
                .filter(|v: &f64| !v.is_infinite())
                .ok_or_else(|| {
                    format_err(format!(
                        "row {}: reading {:?} is not numeric",
                        row,
                        field(columns.reading)
                    ))
                })?;

            by_work_order.entry(work_order_id).or_default().push(readings.len());
            readings.push(SensorReading {
                work_order_id,
                sensor_name: field(columns.sensor_name).to_string(),
                sensor_id: field(columns.sensor_id).to_string(),
                timestamp,
                value,
            });
        }

        Ok(Self {
            readings,
            by_work_order,
            fingerprint: SourceFingerprint::of(origin, bytes),
        })
    }

    /// Per-sensor series for one work order; empty when nothing matches.
    ///
    /// The identifier is coerced to the table's integer work-order type, so an
    /// identifier that is not an integer matches nothing.
    pub fn series<'a>(&'a self, work_order: &str) -> impl Iterator<Item = SensorSeries> + 'a {
        let rows: &[usize] = parse_work_order(work_order)
            .and_then(|id| self.by_work_order.get(&id))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut groups: IndexMap<SensorKey<'a>, Vec<&'a SensorReading>> = IndexMap::new();
        for &row in rows {
            let reading = &self.readings[row];
            groups.entry(reading.key()).or_default().push(reading);
        }

        groups.into_iter().map(|(key, mut group)| {
            group.sort_by_key(|r| r.timestamp);
            SensorSeries {
                sensor_name: key.sensor_name.to_string(),
                sensor_id: key.sensor_id.to_string(),
                points: group
                    .into_iter()
                    .map(|r| SeriesPoint {
                        timestamp: r.timestamp,
                        value: r.value,
                    })
                    .collect(),
            }
        })
    }

    pub fn len(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn work_order_count(&self) -> usize {
        self.by_work_order.len()
    }

    pub fn fingerprint(&self) -> &SourceFingerprint {
        &self.fingerprint
    }
}

impl ColumnIndex {
    fn resolve(headers: &csv::StringRecord, origin: &Path, config: &DatasetConfig) -> Result<Self> {
        let find = |column: &str| -> Result<usize> {
            headers
                .iter()
                .position(|h| h == column)
                .ok_or_else(|| FailsightError::MissingColumn {
                    path: PathBuf::from(origin),
                    column: column.to_string(),
                })
        };
        Ok(Self {
            work_order: find(config.work_order_column.as_str())?,
            sensor_name: find(config.sensor_name_column.as_str())?,
            sensor_id: find(config.sensor_id_column.as_str())?,
            timestamp: find(config.timestamp_column.as_str())?,
            reading: find(config.reading_column.as_str())?,
        })
    }
}

/// Integer work order; integral floats such as `"273496284.0"` are accepted.
pub fn parse_work_order(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Some(id);
    }
    let float: f64 = raw.parse().ok()?;
    if float.is_finite() && float.fract() == 0.0 && float.abs() < i64::MAX as f64 {
        Some(float as i64)
    } else {
        None
    }
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
