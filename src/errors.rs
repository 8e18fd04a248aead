use actix_web::{HttpResponse, ResponseError};
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Db(rusqlite::Error),
    Pool(r2d2::Error),
    Io(std::io::Error),
    Json(serde_json::Error),
    NotFound(&'static str),
    InvalidInput(String),
    UpstreamAuth(String),
    UpstreamRateLimited(String),
    Upstream(String),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Db(e) => write!(f, "Database error: {e}"),
            AppError::Pool(e) => write!(f, "Pool error: {e}"),
            AppError::Io(e) => write!(f, "I/O error: {e}"),
            AppError::Json(e) => write!(f, "Document parse error: {e}"),
            AppError::NotFound(what) => write!(f, "{what} not found"),
            AppError::InvalidInput(msg) => write!(f, "{msg}"),
            AppError::UpstreamAuth(msg) => write!(f, "{msg}"),
            AppError::UpstreamRateLimited(msg) => write!(f, "{msg}"),
            AppError::Upstream(msg) => write!(f, "{msg}"),
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::NotFound(what) => HttpResponse::NotFound()
                .json(serde_json::json!({ "error": format!("{what} not found") })),
            AppError::InvalidInput(msg) => {
                HttpResponse::BadRequest().json(serde_json::json!({ "error": msg }))
            }
            AppError::UpstreamAuth(msg) => {
                HttpResponse::Unauthorized().json(serde_json::json!({ "error": msg }))
            }
            AppError::UpstreamRateLimited(msg) => {
                HttpResponse::TooManyRequests().json(serde_json::json!({ "error": msg }))
            }
            AppError::Upstream(msg) => {
                log::error!("Upstream failure: {msg}");
                HttpResponse::InternalServerError().json(serde_json::json!({ "error": msg }))
            }
            _ => {
                log::error!("{self}");
                HttpResponse::InternalServerError()
                    .json(serde_json::json!({ "error": "Internal storage error" }))
            }
        }
    }
}

/// Turn actix's JSON extractor failures into the API's error body shape.
pub fn json_error_handler(
    err: actix_web::error::JsonPayloadError,
    _req: &actix_web::HttpRequest,
) -> actix_web::Error {
    let body = serde_json::json!({ "error": err.to_string() });
    actix_web::error::InternalError::from_response(err, HttpResponse::BadRequest().json(body))
        .into()
}

impl From<rusqlite::Error> for AppError {
    fn from(e: rusqlite::Error) -> Self {
        AppError::Db(e)
    }
}

impl From<r2d2::Error> for AppError {
    fn from(e: r2d2::Error) -> Self {
        AppError::Pool(e)
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(e: serde_json::Error) -> Self {
        AppError::Json(e)
    }
}
