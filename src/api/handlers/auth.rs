use crate::api::error::AppError;
use crate::services::auth_service::TokenPair;
use crate::services::user_service::UserProfile;
use crate::utils::auth::Claims;
use crate::AppState;
use axum::{Extension, Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

#[derive(Deserialize, ToSchema, Validate)]
pub struct RegisterRequest {
    #[validate(email(message = "Email is not valid"))]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
    #[validate(length(max = 255, message = "Name cannot exceed 255 characters"))]
    pub name: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = UserProfile),
        (status = 400, description = "Invalid email or password"),
        (status = 409, description = "Email already registered")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), AppError> {
    payload.validate()?;

    let profile = state
        .auth_service
        .register(&payload.email, &payload.password, payload.name)
        .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenPair),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let tokens = state
        .auth_service
        .login(&payload.email, &payload.password)
        .await?;
    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token missing"),
        (status = 403, description = "Refresh token invalid, expired or superseded")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let token = payload
        .refresh_token
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| AppError::Unauthorized("Refresh token is required".to_string()))?;

    let tokens = state.auth_service.refresh(&token).await?;
    Ok(Json(tokens))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "auth"
)]
pub async fn logout(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<MessageResponse>, AppError> {
    state.auth_service.logout(claims.sub).await?;
    Ok(Json(MessageResponse {
        message: "Logged out successfully".to_string(),
    }))
}

#[utoipa::path(
    get,
    path = "/auth/profile",
    responses(
        (status = 200, description = "Current user", body = UserProfile),
        (status = 401, description = "Unauthorized")
    ),
    security(
        ("jwt" = [])
    ),
    tag = "auth"
)]
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<UserProfile>, AppError> {
    let user = state
        .user_service
        .find_by_id(claims.sub)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(Json(UserProfile::from(user)))
}
