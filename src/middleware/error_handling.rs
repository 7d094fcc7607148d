use crate::error::AppError;
use actix_web::{http::StatusCode, HttpResponse};
use error_types::{error_codes, error_types as kinds, ErrorResponse};

// Map domain errors to HTTP responses
pub fn map_error(err: &AppError) -> (StatusCode, ErrorResponse) {
    let status =
        StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let (error_type, code) = match err {
        AppError::BadRequest(_) => (kinds::VALIDATION_ERROR, error_codes::INVALID_REQUEST),
        AppError::MissingToken => (kinds::AUTHENTICATION_ERROR, error_codes::TOKEN_MISSING),
        AppError::Unauthorized => (kinds::AUTHENTICATION_ERROR, error_codes::TOKEN_INVALID),
        AppError::Storage(_) => (
            kinds::SERVICE_UNAVAILABLE_ERROR,
            error_codes::STORAGE_UNAVAILABLE,
        ),
        AppError::Config(_) => (kinds::SERVER_ERROR, error_codes::CONFIG_ERROR),
        AppError::StartServer(_) | AppError::Internal => {
            (kinds::SERVER_ERROR, error_codes::INTERNAL_SERVER_ERROR)
        }
    };

    // storage failures keep the document path and parse error out of the message
    let message = match err {
        AppError::Storage(_) => "chat storage unavailable".to_string(),
        other => other.to_string(),
    };
    let mut response = ErrorResponse::new(
        match status {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::UNAUTHORIZED => "Unauthorized",
            StatusCode::SERVICE_UNAVAILABLE => "Service Unavailable",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        },
        &message,
        status.as_u16(),
        error_type,
        code,
    );
    if let AppError::Storage(reason) = err {
        response = response.with_details(reason.clone());
    }

    (status, response)
}

pub fn into_response(err: AppError) -> HttpResponse {
    let (status, response) = map_error(&err);
    HttpResponse::build(status).json(response)
}
