//! Client for the remote REST API.

use serde::{Deserialize, Serialize};

mod client;
mod endpoints;
mod request;

pub use client::{ApiClient, GET_RETRIES};
pub use endpoints::Credentials;
pub use request::ApiRequest;

/// Envelope every API endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn envelope_tolerates_missing_fields() {
        let parsed: ApiResponse<Vec<Value>> =
            serde_json::from_value(json!({ "success": true, "data": [{ "id": 1 }] })).unwrap();
        assert!(parsed.success);
        assert_eq!(parsed.data.unwrap().len(), 1);
        assert_eq!(parsed.message, None);

        let failed: ApiResponse<Value> =
            serde_json::from_value(json!({ "error": "nope" })).unwrap();
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("nope"));
    }
}
