use axum::extract::rejection::{PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// Error returned by every handler. Client mistakes map to 4xx with the
/// message passed through; store failures are logged and reported as a
/// bare 500.
#[derive(Debug)]
pub enum ApiError {
    Core(taskmgr::Error),
    BadRequest(String),
    Internal(String),
}

impl From<taskmgr::Error> for ApiError {
    fn from(e: taskmgr::Error) -> Self {
        Self::Core(e)
    }
}

impl From<PathRejection> for ApiError {
    fn from(e: PathRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(e: QueryRejection) -> Self {
        Self::BadRequest(e.body_text())
    }
}

impl ApiError {
    fn status_and_message(self) -> (StatusCode, String) {
        match self {
            Self::Core(taskmgr::Error::Validation(msg)) | Self::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg)
            }
            Self::Core(taskmgr::Error::NotFound(_)) => (StatusCode::NOT_FOUND, "Not found".into()),
            Self::Core(e @ taskmgr::Error::Store(_)) => {
                log::error!("{e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".into())
            }
            Self::Internal(msg) => {
                log::error!("{msg}");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".into())
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = self.status_and_message();
        (status, Json(json!({ "error": message }))).into_response()
    }
}
