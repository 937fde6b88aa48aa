use actix_web::HttpResponse;
use actix_web::error::{ErrorBadGateway, ErrorInternalServerError, InternalError};
use serde_json::json;
use tracing::error;

use crate::store::SheetError;

/// Logs a worksheet failure and turns it into the response error.
pub fn store_error(e: SheetError) -> actix_web::Error {
    error!(error = %e, "Spreadsheet operation failed");
    if e.is_upstream() {
        ErrorBadGateway(json!({"message": "Spreadsheet service unavailable"}))
    } else {
        ErrorInternalServerError(json!({"message": "Internal Server Error"}))
    }
}

pub fn message(builder: &mut actix_web::HttpResponseBuilder, msg: impl Into<String>) -> HttpResponse {
    builder.json(json!({ "message": msg.into() }))
}

pub fn bad_request(msg: impl Into<String>) -> HttpResponse {
    message(&mut HttpResponse::BadRequest(), msg)
}

pub fn not_found(msg: impl Into<String>) -> HttpResponse {
    message(&mut HttpResponse::NotFound(), msg)
}

pub fn conflict(msg: impl Into<String>) -> HttpResponse {
    message(&mut HttpResponse::Conflict(), msg)
}

pub fn unauthorized(msg: impl Into<String>) -> HttpResponse {
    message(&mut HttpResponse::Unauthorized(), msg)
}

/// 403 as an error, for role checks that bail out with `?`.
pub fn forbidden(msg: &'static str) -> actix_web::Error {
    InternalError::from_response(msg, message(&mut HttpResponse::Forbidden(), msg)).into()
}
