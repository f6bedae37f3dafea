use axum::{Json, extract::Extension};
use serde::Serialize;

use crate::middleware::auth::CurrentIdentity;

#[derive(Serialize)]
pub struct MeResponse {
    id: i64,
}

pub async fn get_current_user(
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
) -> Json<MeResponse> {
    Json(MeResponse { id: identity.0 })
}
