use serde::{Deserialize, Serialize};

/// Protocol identifier reported by the version endpoint.
pub const PROTOCOL: &str = "failsight/1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DashboardRequest {
    Ping,
    Health,
    Report,
    DeepDive,
    Narratives,
    Narrative {
        work_order: String,
    },
    Series {
        work_order: String,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DashboardResponse {
    pub status: String,
    pub data: Option<serde_json::Value>,
    pub error: Option<String>,
    pub version: String,
}

impl DashboardResponse {
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            status: "ok".to_string(),
            data: Some(data),
            error: None,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn err(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            data: None,
            error: Some(msg.into()),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn pong() -> Self {
        Self::ok(serde_json::json!({"pong": true}))
    }

    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_tagging() {
        let req: DashboardRequest =
            serde_json::from_str(r#"{"action":"narrative","work_order":"273496284"}"#).unwrap();
        assert_eq!(
            req,
            DashboardRequest::Narrative {
                work_order: "273496284".to_string()
            }
        );

        let req: DashboardRequest = serde_json::from_str(r#"{"action":"deep_dive"}"#).unwrap();
        assert_eq!(req, DashboardRequest::DeepDive);

        let req: DashboardRequest = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert_eq!(req, DashboardRequest::Ping);

        assert!(serde_json::from_str::<DashboardRequest>(r#"{"action":"predict"}"#).is_err());
    }

    #[test]
    fn test_response_envelopes() {
        let ok = DashboardResponse::ok(serde_json::json!({"count": 2}));
        assert!(ok.is_ok());
        assert_eq!(ok.error, None);

        let err = DashboardResponse::err("dataset not found");
        assert!(!err.is_ok());
        assert_eq!(err.error.as_deref(), Some("dataset not found"));
        assert!(err.data.is_none());

        let pong = DashboardResponse::pong();
        assert!(pong.is_ok());
        assert_eq!(pong.data.unwrap()["pong"], true);
    }
}
