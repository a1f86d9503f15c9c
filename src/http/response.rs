//! JSON response envelope for requests that never reach the relay.
//!
//! ```text
//! {"RetCode": -1, "RetMsg": "not websocket request"}
//! ```
//! `Data` is only serialized when present.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

pub const NOT_WEBSOCKET_REQUEST: &str = "not websocket request";
pub const TOO_MANY_SESSIONS: &str = "too many sessions";

/// Common response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommResponse {
    #[serde(rename = "RetCode")]
    pub ret_code: i32,

    #[serde(rename = "RetMsg")]
    pub ret_msg: String,

    #[serde(rename = "Data", default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl CommResponse {
    pub fn new(ret_code: i32, ret_msg: impl Into<String>) -> Self {
        Self {
            ret_code,
            ret_msg: ret_msg.into(),
            data: None,
        }
    }

    pub fn not_websocket() -> Self {
        Self::new(-1, NOT_WEBSOCKET_REQUEST)
    }

    pub fn too_many_sessions() -> Self {
        Self::new(-1, TOO_MANY_SESSIONS)
    }

    /// Render with an explicit HTTP status.
    pub fn with_status(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

/// Always HTTP 200; failure lives in `RetCode`.
impl IntoResponse for CommResponse {
    fn into_response(self) -> Response {
        self.with_status(StatusCode::OK)
    }
}
