use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dar_recorder::RecorderError;
use serde_json::json;

/// Error body: `{"error": <code>, "message": <text>}`.
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl ApiError {
    pub fn not_found(id: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "JOB_NOT_FOUND",
            message: format!("job \"{id}\" not found"),
        }
    }
}

impl From<RecorderError> for ApiError {
    fn from(e: RecorderError) -> Self {
        let status = match &e {
            RecorderError::Config(_) | RecorderError::UnsupportedScheduleType(_) => {
                StatusCode::BAD_REQUEST
            }
            RecorderError::Streamer(_) => StatusCode::BAD_REQUEST,
            _ if e.code() == "JOB_NOT_FOUND" => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            code: e.code(),
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(code = self.code, "{}", self.message);
        }
        (
            self.status,
            Json(json!({ "error": self.code, "message": self.message })),
        )
            .into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
