use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AppState,
    error::ApiError,
    middleware::auth::BearerToken,
    models::jwt::TokenPair,
};

#[derive(Deserialize)]
pub struct CredentialsRequest {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    refresh_token: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    access_token: String,
    refresh_token: String,
}

impl From<TokenPair> for TokenResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
        }
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<Value>, ApiError> {
    let identity = state
        .credentials
        .register(&payload.email, &payload.password)
        .await?;

    Ok(Json(json!({ "id": identity.0 })))
}

pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<CredentialsRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let identity = state
        .credentials
        .verify_credentials(&payload.email, &payload.password)
        .await?;

    let pair = state.sessions.login(identity).await?;

    Ok(Json(pair.into()))
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenResponse>, ApiError> {
    let pair = state.sessions.refresh(&payload.refresh_token).await?;

    Ok(Json(pair.into()))
}

pub async fn logout(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<Json<Value>, ApiError> {
    state.sessions.revoke(&token).await?;

    Ok(Json(json!({ "message": "Successfully logged out" })))
}
