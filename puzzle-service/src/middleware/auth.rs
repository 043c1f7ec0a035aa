use service_core::{
    axum::{
        async_trait,
        extract::{FromRequestParts, Request, State},
        http::{header, request::Parts, HeaderValue},
        middleware::Next,
        response::{IntoResponse, Response},
    },
    error::AppError,
};

use crate::{
    models::{Identity, TokenScope},
    services::StoreError,
    utils::token::{hash_token, is_well_formed},
    AppState,
};

/// SHA-256 of the bearer token that authenticated this request.
#[derive(Debug, Clone)]
pub struct PresentedToken(pub Vec<u8>);

/// Resolve the caller from `Authorization: Bearer <token>`.
///
/// No header means [`Identity::Anonymous`]. A header that is malformed,
/// names an unknown token, or names an expired one is rejected outright with
/// the same 401, so callers cannot probe which case applied. Every response,
/// rejections included, varies on `Authorization`.
pub async fn authenticate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let mut res = match resolve_identity(&state, req).await {
        Ok(req) => next.run(req).await,
        Err(e) => e.into_response(),
    };
    res.headers_mut()
        .append(header::VARY, HeaderValue::from_static("Authorization"));
    res
}

async fn resolve_identity(state: &AppState, mut req: Request) -> Result<Request, AppError> {
    let presented = req.headers().get(header::AUTHORIZATION).map(|value| {
        value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|t| is_well_formed(t))
            .map(hash_token)
    });

    let identity = match presented {
        None => Identity::Anonymous,
        Some(None) => return Err(AppError::InvalidAuthenticationToken),
        Some(Some(hash)) => {
            let user = match state
                .store
                .get_user_for_token(TokenScope::Authentication, &hash)
                .await
            {
                Ok(user) => user,
                Err(StoreError::NotFound) => return Err(AppError::InvalidAuthenticationToken),
                Err(e) => return Err(e.into()),
            };

            tracing::debug!(user_id = user.id, "request authenticated");
            req.extensions_mut().insert(PresentedToken(hash));
            Identity::Authenticated(user)
        }
    };

    req.extensions_mut().insert(identity);
    Ok(req)
}

/// Extractor for the identity resolved by [`authenticate`].
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = parts.extensions.get::<Identity>().ok_or_else(|| {
            AppError::Internal(anyhow::anyhow!("identity missing from request extensions"))
        })?;

        Ok(CurrentIdentity(identity.clone()))
    }
}
