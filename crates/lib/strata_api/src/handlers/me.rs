//! Current-principal handler.

use axum::{Extension, Json};

use crate::middleware::auth::CurrentUser;
use crate::models::{MeResponse, SuccessBody};

/// `GET /api/me` — echo the authenticated principal.
pub async fn me_handler(
    Extension(CurrentUser(principal)): Extension<CurrentUser>,
) -> Json<SuccessBody<MeResponse>> {
    Json(SuccessBody::new(MeResponse::from(&principal)))
}
