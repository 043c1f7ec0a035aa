pub mod config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use std::sync::Arc;

use service_core::axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::{header, HeaderValue, Method},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, patch, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::{
    rate_limit::{create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter},
    recover::recover_panic_layer,
    tracing::{make_request_span, request_id_middleware},
};
use service_core::tasks::TaskSupervisor;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::PuzzleConfig;
use crate::middleware::{
    authenticate, require_activated_user, require_authenticated_user, require_permission,
    PermissionGuard,
};
use crate::models::{Identity, PermissionCode, PermissionSet};
use crate::services::Store;
use crate::utils::json::MAX_BODY_BYTES;

#[derive(Clone)]
pub struct AppState {
    pub config: PuzzleConfig,
    pub store: Arc<dyn Store>,
    pub tasks: TaskSupervisor,
    pub rate_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(config: PuzzleConfig, store: Arc<dyn Store>, tasks: TaskSupervisor) -> Self {
        let rate_limiter = create_ip_rate_limiter(
            config.rate_limit.requests_per_second,
            config.rate_limit.burst,
        );
        Self {
            config,
            store,
            tasks,
            rate_limiter,
        }
    }

    /// Anonymous callers hold nothing and cost no store round trip.
    pub async fn permissions_for(&self, identity: &Identity) -> Result<PermissionSet, AppError> {
        match identity.user() {
            None => Ok(PermissionSet::new()),
            Some(user) => Ok(self.store.get_permissions_for_user(user.id).await?),
        }
    }

    pub async fn can_edit_puzzles(&self, identity: &Identity) -> Result<bool, AppError> {
        Ok(self
            .permissions_for(identity)
            .await?
            .includes(PermissionCode::PuzzlesUpdate))
    }
}

pub fn build_router(state: AppState) -> Router {
    let guard = |code| from_fn_with_state(PermissionGuard::new(&state, code), require_permission);

    let puzzles = Router::new()
        .route(
            "/v1/puzzles",
            get(handlers::puzzles::list_puzzles)
                .merge(
                    post(handlers::puzzles::create_puzzle)
                        .route_layer(guard(PermissionCode::PuzzlesCreate)),
                )
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/v1/puzzles/:id",
            get(handlers::puzzles::show_puzzle)
                .merge(
                    patch(handlers::puzzles::update_puzzle)
                        .route_layer(guard(PermissionCode::PuzzlesUpdate)),
                )
                .merge(
                    service_core::axum::routing::delete(handlers::puzzles::delete_puzzle)
                        .route_layer(guard(PermissionCode::PuzzlesDelete)),
                )
                .fallback(handlers::method_not_allowed),
        );

    let users = Router::new()
        .route(
            "/v1/user",
            get(handlers::users::show_current_user)
                .route_layer(guard(PermissionCode::UsersRead))
                .merge(
                    put(handlers::users::update_current_user)
                        .route_layer(from_fn(require_activated_user)),
                )
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/v1/users",
            post(handlers::users::add_user)
                .route_layer(guard(PermissionCode::UsersCreate))
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/v1/user/password",
            put(handlers::users::change_password)
                .route_layer(from_fn(require_authenticated_user))
                .fallback(handlers::method_not_allowed),
        );

    let tokens = Router::new()
        .route(
            "/v1/tokens/authentication",
            post(handlers::tokens::create_authentication_token)
                .fallback(handlers::method_not_allowed),
        )
        .route(
            "/v1/logout",
            post(handlers::tokens::logout)
                .route_layer(from_fn(require_authenticated_user))
                .fallback(handlers::method_not_allowed),
        );

    let app = Router::new()
        .route(
            "/v1/healthcheck",
            get(handlers::health::healthcheck).fallback(handlers::method_not_allowed),
        )
        .merge(puzzles)
        .merge(users)
        .merge(tokens)
        .fallback(handlers::not_found)
        .layer(from_fn_with_state(state.clone(), authenticate))
        .with_state(state.clone());

    let app = if state.config.rate_limit.enabled {
        app.layer(from_fn_with_state(
            state.rate_limiter.clone(),
            ip_rate_limit_middleware,
        ))
    } else {
        app
    };

    app.layer(TraceLayer::new_for_http().make_span_with(make_request_span::<Body>))
        .layer(from_fn(request_id_middleware))
        .layer(cors_layer(&state.config.cors.trusted_origins))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(recover_panic_layer())
}

fn cors_layer(trusted_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = trusted_origins
        .iter()
        .filter_map(|o| match o.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!("Invalid CORS origin '{}': {}. Skipping.", o, e);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}
