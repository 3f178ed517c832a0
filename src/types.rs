// Shared response types
use serde::{Deserialize, Serialize};

// ============================================================================
// Response envelope
// ============================================================================

/// Every API response: `{success, message?, data?}`; `error` carries
/// failure detail outside production only.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
            error: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            data: None,
            error: None,
        }
    }
}

// ============================================================================
// Health and index
// ============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
    pub environment: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiInfo {
    pub name: String,
    pub version: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_omits_empty_parts() {
        let ok = serde_json::to_value(ApiResponse::ok(json!([1])).with_message("Berhasil")).unwrap();
        assert_eq!(ok, json!({"success": true, "message": "Berhasil", "data": [1]}));

        let failed = serde_json::to_value(ApiResponse::failure("Data tidak lengkap")).unwrap();
        assert_eq!(failed, json!({"success": false, "message": "Data tidak lengkap"}));
    }
}
