use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

#[derive(Debug)]
pub enum ApiError {
    StationNotFound(String),
    PlatformNotFound(String),
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StationNotFound(name) => write!(f, "unknown station: {name}"),
            Self::PlatformNotFound(id) => write!(f, "unknown platform: {id}"),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let message = self.to_string();
        (StatusCode::NOT_FOUND, Json(json!({ "error": message }))).into_response()
    }
}
