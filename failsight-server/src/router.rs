use failsight_core::protocol::{DashboardRequest, DashboardResponse};
use failsight_core::DashboardContext;

/// Answer one query against the loaded context. Absent narratives and empty
/// series are successful responses, never errors.
pub fn handle_request(request: DashboardRequest, context: &DashboardContext) -> DashboardResponse {
    match request {
        DashboardRequest::Ping => DashboardResponse::pong(),
        DashboardRequest::Health => DashboardResponse::ok(serde_json::json!({
            "status": "healthy",
            "work_orders": context.work_order_ids(),
            "narratives": context.narrative_count(),
            "readings": context.reading_count(),
            "sources": context.fingerprints(),
        })),
        DashboardRequest::Report => {
            let report = context.report();
            DashboardResponse::ok(serde_json::json!({
                "count": report.len(),
                "entries": report,
            }))
        }
        DashboardRequest::DeepDive => {
            let dives = context.deep_dives();
            DashboardResponse::ok(serde_json::json!({
                "count": dives.len(),
                "work_orders": dives,
            }))
        }
        DashboardRequest::Narratives => {
            let records = context.narrative_records();
            DashboardResponse::ok(serde_json::json!({
                "count": records.len(),
                "narratives": records,
            }))
        }
        DashboardRequest::Narrative { work_order } => {
            let entry = failsight_core::models::ReportEntry::new(
                work_order.as_str(),
                context.get_narrative(&work_order),
            );
            match serde_json::to_value(&entry) {
                Ok(v) => DashboardResponse::ok(v),
                Err(e) => DashboardResponse::err(format!("Serialization error: {}", e)),
            }
        }
        DashboardRequest::Series { work_order } => {
            let dive = failsight_core::models::DeepDive::new(
                work_order.as_str(),
                context.get_sensor_series(&work_order),
            );
            match serde_json::to_value(&dive) {
                Ok(v) => DashboardResponse::ok(v),
                Err(e) => DashboardResponse::err(format!("Serialization error: {}", e)),
            }
        }
    }
}
