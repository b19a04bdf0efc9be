use serde::{Deserialize, Serialize};

use super::SensorSeries;

/// Display text for a work order whose narrative is absent from the document.
pub const NO_NARRATIVE: &str = "No narrative found in document.";

/// Display text for a work order with no sensor rows.
pub const NO_SENSOR_DATA: &str = "No data found for this WorkOrderID.";

/// One block of the failure prediction report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub work_order: String,
    pub narrative: Option<String>,
    pub display_text: String,
}

impl ReportEntry {
    pub fn new(work_order: impl Into<String>, narrative: Option<&str>) -> Self {
        Self {
            work_order: work_order.into(),
            narrative: narrative.map(str::to_string),
            display_text: narrative.unwrap_or(NO_NARRATIVE).to_string(),
        }
    }
}

/// Per-sensor charts for one work order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeepDive {
    pub work_order: String,
    pub series: Vec<SensorSeries>,
    pub message: Option<String>,
}

impl DeepDive {
    pub fn new(work_order: impl Into<String>, series: Vec<SensorSeries>) -> Self {
        let message = series.is_empty().then(|| NO_SENSOR_DATA.to_string());
        Self {
            work_order: work_order.into(),
            series,
            message,
        }
    }
}
