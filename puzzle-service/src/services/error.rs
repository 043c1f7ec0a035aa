use std::time::Duration;

use service_core::error::AppError;
use service_core::validation::FieldValidator;
use thiserror::Error;

/// Unique constraint on `users.email`.
pub const EMAIL_CONSTRAINT: &str = "users_email_key";
/// Unique constraint on `users.display_name`.
pub const DISPLAY_NAME_CONSTRAINT: &str = "unique_display_name";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("edit conflict")]
    EditConflict,

    #[error("duplicate email")]
    DuplicateEmail,

    #[error("duplicate display name")]
    DuplicateDisplayName,

    #[error("store call did not finish within {0:?}")]
    Timeout(Duration),

    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                match db.constraint() {
                    Some(EMAIL_CONSTRAINT) => return StoreError::DuplicateEmail,
                    Some(DISPLAY_NAME_CONSTRAINT) => return StoreError::DuplicateDisplayName,
                    _ => {}
                }
            }
        }

        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            other => StoreError::Database(other),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound => AppError::NotFound,
            StoreError::EditConflict => AppError::EditConflict,
            StoreError::DuplicateEmail => {
                duplicate("email", "a user with this email address already exists")
            }
            StoreError::DuplicateDisplayName => {
                duplicate("display_name", "this display name is already in use")
            }
            StoreError::Timeout(_) | StoreError::Database(_) => {
                AppError::Internal(anyhow::Error::new(err))
            }
            StoreError::Internal(e) => AppError::Internal(e),
        }
    }
}

fn duplicate(field: &str, message: &str) -> AppError {
    let mut v = FieldValidator::new();
    v.add_error(field, message);
    AppError::Validation(v.into_errors())
}
