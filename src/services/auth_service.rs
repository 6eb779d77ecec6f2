use crate::api::error::AppError;
use crate::config::SecurityConfig;
use crate::entities::sea_orm_active_enums::Role;
use crate::services::user_service::{UserProfile, UserService};
use crate::utils::auth::{create_access_token, create_refresh_token, validate_refresh_token};
use crate::utils::password::{hash_secret, verify_secret};
use chrono::TimeDelta;
use serde::Serialize;
use tracing::{info, warn};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Credential checks and the access/refresh token lifecycle.
///
/// Only an argon2 hash of the latest refresh token is stored per user, so a
/// new login or refresh invalidates every refresh token issued before it.
pub struct AuthService {
    users: UserService,
    config: SecurityConfig,
}

impl AuthService {
    pub fn new(users: UserService, config: SecurityConfig) -> Self {
        Self { users, config }
    }

    /// Returns `None` both for an unknown email and for a wrong password.
    pub async fn validate_credentials(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<UserProfile>, AppError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            return Ok(None);
        };

        if !verify_secret(password, &user.password_hash) {
            return Ok(None);
        }

        Ok(Some(UserProfile::from(user)))
    }

    pub async fn issue_tokens(
        &self,
        user_id: i32,
        email: &str,
        role: Role,
    ) -> Result<TokenPair, AppError> {
        let access_ttl = TimeDelta::try_minutes(self.config.jwt_expiration_minutes)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Access token lifetime of {} minutes is out of range",
                    self.config.jwt_expiration_minutes
                ))
            })?;
        let refresh_ttl = TimeDelta::try_days(self.config.jwt_refresh_expiration_days)
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Refresh token lifetime of {} days is out of range",
                    self.config.jwt_refresh_expiration_days
                ))
            })?;

        let access_token = create_access_token(
            user_id,
            email,
            role,
            &self.config.jwt_secret,
            access_ttl,
        )?;
        let refresh_token =
            create_refresh_token(user_id, &self.config.jwt_refresh_secret, refresh_ttl)?;

        let hash = hash_secret(&refresh_token)?;
        self.users.set_refresh_token_hash(user_id, Some(hash)).await?;

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let user = self
            .validate_credentials(email, password)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Invalid credentials".to_string()))?;

        info!("🔑 User {} logged in", user.id);
        self.issue_tokens(user.id, &user.email, user.role).await
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<String>,
    ) -> Result<UserProfile, AppError> {
        let user = self.users.create_user(email, password, name).await?;
        info!("👤 Registered user {} ({})", user.id, user.email);
        Ok(UserProfile::from(user))
    }

    /// Exchanges a refresh token for a brand-new pair.
    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair, AppError> {
        let secret = &self.config.jwt_refresh_secret;

        let claims = validate_refresh_token(refresh_token, secret).map_err(|e| {
            warn!("Refresh token rejected: {}", e);
            AppError::Forbidden("Access denied (invalid or expired refresh token)".to_string())
        })?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or_else(|| AppError::Forbidden("Access denied (user not found)".to_string()))?;

        let Some(stored_hash) = user.hashed_refresh_token.as_deref() else {
            return Err(AppError::Forbidden(
                "Access denied (no active session)".to_string(),
            ));
        };

        if !verify_secret(refresh_token, stored_hash) {
            warn!("Stale or foreign refresh token presented for user {}", user.id);
            return Err(AppError::Forbidden(
                "Access denied (invalid refresh token)".to_string(),
            ));
        }

        self.revoke_unless_valid(user.id, refresh_token).await?;

        self.issue_tokens(user.id, &user.email, user.role).await
    }

    /// A token that matched the stored hash but no longer verifies is treated
    /// as stolen: the session is revoked.
    async fn revoke_unless_valid(&self, user_id: i32, refresh_token: &str) -> Result<(), AppError> {
        if validate_refresh_token(refresh_token, &self.config.jwt_refresh_secret).is_err() {
            warn!("Revoking session of user {} after a late refresh failure", user_id);
            self.logout(user_id).await?;
            return Err(AppError::Forbidden(
                "Access denied (expired or invalid refresh token)".to_string(),
            ));
        }
        Ok(())
    }

    /// Clears the stored refresh-token hash. Safe to call repeatedly.
    pub async fn logout(&self, user_id: i32) -> Result<(), AppError> {
        self.users.set_refresh_token_hash(user_id, None).await?;
        info!("🚪 User {} logged out", user_id);
        Ok(())
    }
}
