use crate::api::error::AppError;
use crate::entities::{prelude::Users, sea_orm_active_enums::Role};
use crate::utils::auth::{Claims, validate_access_token};
use crate::AppState;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use sea_orm::EntityTrait;
use serde::Deserialize;

/// Roles allowed to create templates and edit their structure.
pub const TEMPLATE_EDITORS: &[Role] = &[Role::DocBuilder, Role::Admin];

#[derive(Deserialize)]
struct AuthQuery {
    token: Option<String>,
}

fn bearer_token(req: &Request) -> Option<String> {
    let header = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|s| s.trim().to_string());

    header.or_else(|| {
        // Try query parameter
        let query = req.uri().query().unwrap_or_default();
        serde_urlencoded::from_str::<AuthQuery>(query)
            .ok()
            .and_then(|q| q.token)
    })
}

/// Verifies the access token and puts its [`Claims`] into the request
/// extensions. The user must still exist and still hold the role the token
/// was issued for.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let unauthorized = || AppError::Unauthorized("Invalid or missing access token".to_string());

    let token = bearer_token(&req)
        .filter(|t| !t.is_empty())
        .ok_or_else(unauthorized)?;

    let claims = validate_access_token(&token, &state.config.jwt_secret).map_err(|e| {
        tracing::debug!("Access token rejected: {}", e);
        unauthorized()
    })?;

    let user = Users::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(unauthorized)?;

    if user.role != claims.role {
        tracing::warn!(
            "Token for user {} carries role {} but the user is now {}",
            user.id,
            claims.role.as_str(),
            user.role.as_str()
        );
        return Err(unauthorized());
    }

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

/// Rejects requests whose authenticated role is not in `allowed`.
/// Must run inside [`auth_middleware`].
pub async fn require_roles(
    State(allowed): State<&'static [Role]>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = req
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

    if !allowed.contains(&claims.role) {
        return Err(AppError::Forbidden(format!(
            "Role '{}' is not allowed to perform this action",
            claims.role.as_str()
        )));
    }

    Ok(next.run(req).await)
}
