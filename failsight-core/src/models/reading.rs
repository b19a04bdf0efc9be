use chrono::NaiveDateTime;
use serde::{Deserialize, Deserializer, Serialize};

/// One row of the sensor table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub work_order_id: i64,
    pub sensor_name: String,
    pub sensor_id: String,
    pub timestamp: NaiveDateTime,
    #[serde(deserialize_with = "null_as_nan")]
    pub value: f64,
}

impl SensorReading {
    pub fn key(&self) -> SensorKey<'_> {
        SensorKey {
            sensor_name: &self.sensor_name,
            sensor_id: &self.sensor_id,
        }
    }
}

/// Composite key identifying one sensor channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SensorKey<'a> {
    pub sensor_name: &'a str,
    pub sensor_id: &'a str,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    /// `NaN` for a missing reading; JSON carries it as `null`.
    #[serde(deserialize_with = "null_as_nan")]
    pub value: f64,
}

/// Time-ordered readings of one sensor channel for one work order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorSeries {
    pub sensor_name: String,
    pub sensor_id: String,
    pub points: Vec<SeriesPoint>,
}

// serde_json writes NaN as `null`
fn null_as_nan<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}
