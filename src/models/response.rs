use serde::Serialize;
use serde_json::Value;

/// JSON envelope for non-order responses. Absent fields are omitted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApiResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    // for whoever is debugging the backend
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<Value>,
}

impl ApiResponse {
    pub fn failure() -> Self {
        ApiResponse {
            success: Some(false),
            ..Default::default()
        }
    }

    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(Value::String(msg.into()));
        self
    }

    pub fn errors(mut self, errors: impl Serialize) -> Self {
        self.errors = serde_json::to_value(errors).ok();
        self
    }

    pub fn detail(mut self, detail: impl Serialize) -> Self {
        self.detail = serde_json::to_value(detail).ok();
        self
    }
}
