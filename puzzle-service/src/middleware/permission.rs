//! Route guards. Each runs after [`authenticate`](super::auth::authenticate)
//! and reads the [`Identity`] it left in the request extensions.

use service_core::{
    axum::{
        extract::{Request, State},
        middleware::Next,
        response::Response,
    },
    error::AppError,
};

use crate::{
    models::{Identity, PermissionCode},
    AppState,
};

/// State for [`require_permission`]: the code a route demands.
#[derive(Clone)]
pub struct PermissionGuard {
    pub state: AppState,
    pub code: PermissionCode,
}

impl PermissionGuard {
    pub fn new(state: &AppState, code: PermissionCode) -> Self {
        Self {
            state: state.clone(),
            code,
        }
    }
}

fn identity(req: &Request) -> Result<&Identity, AppError> {
    req.extensions().get::<Identity>().ok_or_else(|| {
        AppError::Internal(anyhow::anyhow!("identity missing from request extensions"))
    })
}

/// Authenticated, activated, and holding the guard's code. Permissions are
/// read fresh from the store on every request.
pub async fn require_permission(
    State(guard): State<PermissionGuard>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = identity(&req)?.require_activated()?.id;

    let permissions = guard.state.store.get_permissions_for_user(user_id).await?;
    if !permissions.includes(guard.code) {
        tracing::warn!(
            user_id,
            required_permission = %guard.code,
            "permission denied"
        );
        return Err(AppError::NotPermitted);
    }

    Ok(next.run(req).await)
}

pub async fn require_activated_user(req: Request, next: Next) -> Result<Response, AppError> {
    identity(&req)?.require_activated()?;
    Ok(next.run(req).await)
}

pub async fn require_authenticated_user(req: Request, next: Next) -> Result<Response, AppError> {
    identity(&req)?.require_authenticated()?;
    Ok(next.run(req).await)
}
