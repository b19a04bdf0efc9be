mod narrative;
mod reading;
mod report;

pub use narrative::NarrativeRecord;
pub use reading::{SensorKey, SensorReading, SensorSeries, SeriesPoint};
pub use report::{DeepDive, ReportEntry, NO_NARRATIVE, NO_SENSOR_DATA};
