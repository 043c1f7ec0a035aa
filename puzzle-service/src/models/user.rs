//! User accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use service_core::validation::{is_email, rune_count, FieldValidator};
use sqlx::FromRow;

use crate::utils::password::{validate_password_plaintext, Credential};

pub const MAX_NAME_CHARS: usize = 200;

/// A stored account. `version` is bumped on every successful update.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub full_name: String,
    pub display_name: String,
    #[sqlx(rename = "password_hash")]
    pub credential: Credential,
    pub activated: bool,
    pub version: i32,
}

/// An account that has not been written yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub display_name: String,
    pub credential: Credential,
    pub activated: bool,
}

/// User representation returned to API clients (never carries the credential).
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub email: String,
    pub full_name: String,
    pub display_name: String,
    pub activated: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            created_at: user.created_at,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            display_name: user.display_name.clone(),
            activated: user.activated,
        }
    }
}

/// Profile text is stored without surrounding spaces, so `" ada"` and `"ada"`
/// collide on the uniqueness constraints.
pub fn trim_profile_field(value: &str) -> String {
    value.trim_matches(' ').to_string()
}

pub fn validate_email(v: &mut FieldValidator, email: &str) {
    v.check(!email.is_empty(), "email", "must be provided");
    v.check(is_email(email), "email", "must be a valid email address");
}

/// Profile fields shared by creation and update.
pub fn validate_user(v: &mut FieldValidator, email: &str, full_name: &str, display_name: &str) {
    validate_email(v, email);
    v.check(!full_name.is_empty(), "full_name", "must be provided");
    v.check(
        rune_count(full_name) <= MAX_NAME_CHARS,
        "full_name",
        format!("must not be more than {} characters", MAX_NAME_CHARS),
    );
    v.check(!display_name.is_empty(), "display_name", "must be provided");
    v.check(
        rune_count(display_name) <= MAX_NAME_CHARS,
        "display_name",
        format!("must not be more than {} characters", MAX_NAME_CHARS),
    );
}

/// Everything a new account needs before its password is hashed.
pub fn validate_new_user(
    v: &mut FieldValidator,
    email: &str,
    full_name: &str,
    display_name: &str,
    password: &str,
) {
    validate_user(v, email, full_name, display_name);
    validate_password_plaintext(v, password);
}
