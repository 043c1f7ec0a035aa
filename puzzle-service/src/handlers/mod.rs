//! HTTP handlers for the puzzle API.

pub mod health;
pub mod puzzles;
pub mod tokens;
pub mod users;

use service_core::error::AppError;

/// Resource ids are positive integers; anything else names nothing.
pub fn parse_id(raw: &str) -> Result<i64, AppError> {
    match raw.parse::<i64>() {
        Ok(id) if id >= 1 => Ok(id),
        _ => Err(AppError::NotFound),
    }
}

pub async fn not_found() -> AppError {
    AppError::NotFound
}

pub async fn method_not_allowed() -> AppError {
    AppError::MethodNotAllowed
}
