use service_core::{
    axum::{extract::State, Json},
    error::AppError,
};

use crate::AppState;

/// Liveness plus a store round trip.
pub async fn healthcheck(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    state.store.health_check().await?;

    Ok(Json(serde_json::json!({
        "status": "available",
        "system_info": {
            "service": state.config.service_name,
            "environment": state.config.environment.as_str(),
            "version": state.config.service_version,
        }
    })))
}
