use serde::Deserialize;
use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Json},
    error::AppError,
    validation::FieldValidator,
};

use crate::{
    middleware::CurrentIdentity,
    models::{
        user::{trim_profile_field, validate_new_user, validate_user},
        NewUser, PermissionCode, UserResponse,
    },
    utils::{password::validate_password_plaintext, Credential, StrictJson},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AddUserRequest {
    pub email: String,
    pub full_name: String,
    pub display_name: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateUserRequest {
    pub email: String,
    pub full_name: String,
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChangePasswordRequest {
    pub password: String,
}

/// Create an activated account with the standard permission grant.
pub async fn add_user(
    State(state): State<AppState>,
    StrictJson(mut input): StrictJson<AddUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    input.email = trim_profile_field(&input.email);
    input.full_name = trim_profile_field(&input.full_name);
    input.display_name = trim_profile_field(&input.display_name);

    let mut v = FieldValidator::new();
    validate_new_user(
        &mut v,
        &input.email,
        &input.full_name,
        &input.display_name,
        &input.password,
    );
    v.into_result()?;

    let new_user = NewUser {
        email: input.email,
        full_name: input.full_name,
        display_name: input.display_name,
        credential: Credential::set(&input.password)?,
        activated: true,
    };

    let user = state.store.insert_user(&new_user).await?;
    state
        .store
        .add_permissions_for_user(user.id, &PermissionCode::STANDARD)
        .await?;

    tracing::info!(user_id = user.id, "user created");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "user": UserResponse::from(&user) })),
    ))
}

pub async fn show_current_user(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
) -> Result<Json<serde_json::Value>, AppError> {
    let user = identity.require_authenticated()?;
    let permissions = state.store.get_permissions_for_user(user.id).await?;

    Ok(Json(serde_json::json!({
        "user": UserResponse::from(user),
        "permissions": permissions,
    })))
}

/// Replace the caller's profile fields. The write is conditional on the
/// version read during authentication.
pub async fn update_current_user(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    StrictJson(input): StrictJson<UpdateUserRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut user = identity.require_activated()?.clone();

    let email = trim_profile_field(&input.email);
    let full_name = trim_profile_field(&input.full_name);
    let display_name = trim_profile_field(&input.display_name);

    let mut v = FieldValidator::new();
    validate_user(&mut v, &email, &full_name, &display_name);
    v.into_result()?;

    user.email = email;
    user.full_name = full_name;
    user.display_name = display_name;

    // A taken email or display name surfaces as a 422 on that field.
    state.store.update_user(&mut user).await?;

    tracing::info!(user_id = user.id, version = user.version, "user profile updated");

    Ok(Json(serde_json::json!({ "user": UserResponse::from(&user) })))
}

pub async fn change_password(
    State(state): State<AppState>,
    CurrentIdentity(identity): CurrentIdentity,
    StrictJson(input): StrictJson<ChangePasswordRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut user = identity.require_authenticated()?.clone();

    let mut v = FieldValidator::new();
    validate_password_plaintext(&mut v, &input.password);
    v.into_result()?;

    user.credential = Credential::set(&input.password)?;
    state.store.update_user(&mut user).await?;

    tracing::info!(user_id = user.id, "password changed");

    Ok(Json(serde_json::json!({ "message": "password successfully changed" })))
}
