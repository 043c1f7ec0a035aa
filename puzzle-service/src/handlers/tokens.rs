use serde::Deserialize;
use service_core::{
    axum::{extract::State, http::StatusCode, response::IntoResponse, Extension, Json},
    error::AppError,
    validation::FieldValidator,
};

use crate::{
    middleware::PresentedToken,
    models::{user::validate_email, TokenScope},
    services::StoreError,
    utils::{password::validate_password_plaintext, token::generate_token, StrictJson},
    AppState,
};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateAuthenticationTokenRequest {
    pub email: String,
    pub password: String,
}

/// Exchange email and password for a bearer token.
pub async fn create_authentication_token(
    State(state): State<AppState>,
    StrictJson(input): StrictJson<CreateAuthenticationTokenRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut v = FieldValidator::new();
    validate_email(&mut v, &input.email);
    validate_password_plaintext(&mut v, &input.password);
    v.into_result()?;

    let user = match state.store.get_user_by_email(&input.email).await {
        Ok(user) => user,
        Err(StoreError::NotFound) => return Err(AppError::InvalidCredentials),
        Err(e) => return Err(e.into()),
    };

    if !user.credential.matches(&input.password)? {
        tracing::warn!(user_id = user.id, "login with wrong password");
        return Err(AppError::InvalidCredentials);
    }

    let (issued, token) = generate_token(user.id, state.config.token.ttl(), TokenScope::Authentication);
    state.store.insert_token(&token).await?;

    let store = state.store.clone();
    let user_id = user.id;
    state.tasks.spawn("purge_expired_tokens", async move {
        match store.delete_expired_tokens_for_user(user_id).await {
            Ok(0) => {}
            Ok(removed) => tracing::info!(user_id, removed, "purged expired tokens"),
            Err(e) => tracing::warn!(user_id, error = %e, "failed to purge expired tokens"),
        }
    });

    tracing::info!(user_id = user.id, "authentication token issued");

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "authentication_token": issued })),
    ))
}

/// Revoke the token this request was authenticated with.
pub async fn logout(
    State(state): State<AppState>,
    Extension(PresentedToken(hash)): Extension<PresentedToken>,
) -> Result<Json<serde_json::Value>, AppError> {
    state
        .store
        .delete_token(TokenScope::Authentication, &hash)
        .await?;

    Ok(Json(serde_json::json!({ "message": "you have been logged out" })))
}
