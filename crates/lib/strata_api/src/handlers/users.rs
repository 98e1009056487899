//! Admin user-state handlers.
//!
//! These are the collaborators that mutate authorization inputs, so each
//! write is followed by a status-cache invalidation; without it a stale
//! role or active flag could be honored for up to the cache TTL.

use axum::Json;
use axum::extract::{Path, State};
use tracing::info;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{SuccessBody, UpdateRoleRequest, UpdateStatusRequest, UserStateResponse};

async fn load_user_state(state: &AppState, user_id: &str) -> AppResult<UserStateResponse> {
    let user = state
        .store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    Ok(UserStateResponse::from(&user))
}

/// `PUT /api/admin/users/{id}/role` — change a user's role.
pub async fn set_role_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateRoleRequest>,
) -> AppResult<Json<SuccessBody<UserStateResponse>>> {
    let updated = state.store.set_user_role(&user_id, body.role).await?;
    if !updated {
        return Err(AppError::NotFound("User not found".into()));
    }
    state.status_cache.invalidate(&user_id);
    info!(%user_id, role = body.role.as_str(), "user role updated");

    Ok(Json(SuccessBody::new(load_user_state(&state, &user_id).await?)))
}

/// `PUT /api/admin/users/{id}/status` — suspend or restore a user.
pub async fn set_status_handler(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> AppResult<Json<SuccessBody<UserStateResponse>>> {
    let updated = state.store.set_user_active(&user_id, body.is_active).await?;
    if !updated {
        return Err(AppError::NotFound("User not found".into()));
    }
    state.status_cache.invalidate(&user_id);
    info!(%user_id, is_active = body.is_active, "user status updated");

    Ok(Json(SuccessBody::new(load_user_state(&state, &user_id).await?)))
}
