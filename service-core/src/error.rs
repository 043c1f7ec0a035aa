use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::validation::FieldErrors;

pub const SERVER_ERROR_MESSAGE: &str =
    "the server encountered a problem and could not process your request";

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation error: {0}")]
    Validation(FieldErrors),

    #[error("invalid or missing authentication token")]
    InvalidAuthenticationToken,

    #[error("you must be authenticated to access this resource")]
    AuthenticationRequired,

    #[error("invalid authentication credentials")]
    InvalidCredentials,

    #[error("your user account must be activated to access this resource")]
    NotActivated,

    #[error("your user account doesn't have the necessary permissions to access this resource")]
    NotPermitted,

    #[error("the requested resource could not be found")]
    NotFound,

    #[error("the requested method is not supported for this resource")]
    MethodNotAllowed,

    #[error("unable to update the record due to an edit conflict, please try again")]
    EditConflict,

    #[error("Too many requests: {0}")]
    TooManyRequests(String, Option<u64>),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Configuration error: {0}")]
    Config(anyhow::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(anyhow::Error::new(err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal(anyhow::Error::new(err))
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::InvalidAuthenticationToken
            | AppError::AuthenticationRequired
            | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::NotActivated | AppError::NotPermitted => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            AppError::EditConflict => StatusCode::CONFLICT,
            AppError::TooManyRequests(..) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) | AppError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Body of every error response: a single message or a field → messages map.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Message(String),
    Fields(FieldErrors),
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = match &self {
            AppError::TooManyRequests(_, retry) => *retry,
            _ => None,
        };
        let challenge = matches!(self, AppError::InvalidAuthenticationToken);

        let body = match self {
            AppError::Validation(errors) => ErrorBody::Fields(errors),
            AppError::BadRequest(msg) | AppError::TooManyRequests(msg, _) => ErrorBody::Message(msg),
            AppError::Internal(err) | AppError::Config(err) => {
                tracing::error!(error = ?err, "request failed");
                ErrorBody::Message(SERVER_ERROR_MESSAGE.to_string())
            }
            other => ErrorBody::Message(other.to_string()),
        };

        let mut res = (status, Json(ErrorEnvelope { error: body })).into_response();

        if let Some(retry) = retry_after {
            res.headers_mut().insert(header::RETRY_AFTER, retry.into());
        }
        if challenge {
            res.headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }

        res
    }
}
