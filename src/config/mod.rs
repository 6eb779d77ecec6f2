use std::env;

/// Security configuration for authentication and uploads
#[derive(Debug, Clone)]
pub struct SecurityConfig {
    /// Secret used to sign access tokens
    pub jwt_secret: String,

    /// Access token lifetime in minutes (default: 15)
    pub jwt_expiration_minutes: i64,

    /// Secret used to sign refresh tokens, distinct from `jwt_secret`
    pub jwt_refresh_secret: String,

    /// Refresh token lifetime in days (default: 7)
    pub jwt_refresh_expiration_days: i64,

    /// Maximum uploaded file size in bytes (default: 20 MB)
    pub max_file_size: usize,

    /// Allowed CORS Origins (comma separated)
    pub allowed_origins: Vec<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "secret".to_string(),
            jwt_expiration_minutes: 15,
            jwt_refresh_secret: "refresh-secret".to_string(),
            jwt_refresh_expiration_days: 7,
            max_file_size: 20 * 1024 * 1024, // 20 MB
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(), // Vite default
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn parse_origins(default: Vec<String>) -> Vec<String> {
    env::var("ALLOWED_ORIGINS")
        .ok()
        .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
        .unwrap_or(default)
}

impl SecurityConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let default = Self::default();

        Self {
            // Fallbacks keep local development frictionless; `production()` refuses them.
            jwt_secret: env::var("JWT_SECRET").unwrap_or(default.jwt_secret),
            jwt_expiration_minutes: parse_env(
                "JWT_EXPIRATION_MINUTES",
                default.jwt_expiration_minutes,
            ),
            jwt_refresh_secret: env::var("JWT_REFRESH_SECRET")
                .unwrap_or(default.jwt_refresh_secret),
            jwt_refresh_expiration_days: parse_env(
                "JWT_REFRESH_EXPIRATION_DAYS",
                default.jwt_refresh_expiration_days,
            ),
            max_file_size: parse_env("MAX_FILE_SIZE", default.max_file_size),
            allowed_origins: parse_origins(default.allowed_origins),
        }
    }

    /// Create config for development (relaxed limits)
    pub fn development() -> Self {
        Self {
            max_file_size: 100 * 1024 * 1024,
            ..Self::default()
        }
    }

    /// Create config for production (strict security)
    pub fn production() -> anyhow::Result<Self> {
        let default = Self::default();
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("CRITICAL: JWT_SECRET must be set"))?;
        let jwt_refresh_secret = env::var("JWT_REFRESH_SECRET")
            .map_err(|_| anyhow::anyhow!("CRITICAL: JWT_REFRESH_SECRET must be set"))?;
        if jwt_secret == jwt_refresh_secret {
            anyhow::bail!("JWT_SECRET and JWT_REFRESH_SECRET must differ");
        }

        Ok(Self {
            jwt_secret,
            jwt_expiration_minutes: parse_env(
                "JWT_EXPIRATION_MINUTES",
                default.jwt_expiration_minutes,
            ),
            jwt_refresh_secret,
            jwt_refresh_expiration_days: parse_env(
                "JWT_REFRESH_EXPIRATION_DAYS",
                default.jwt_refresh_expiration_days,
            ),
            max_file_size: parse_env("MAX_FILE_SIZE", default.max_file_size),
            allowed_origins: parse_origins(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SecurityConfig::default();
        assert_eq!(config.jwt_expiration_minutes, 15);
        assert_eq!(config.jwt_refresh_expiration_days, 7);
        assert_ne!(config.jwt_secret, config.jwt_refresh_secret);
        assert_eq!(config.max_file_size, 20 * 1024 * 1024);
    }

    #[test]
    fn test_development_config() {
        let config = SecurityConfig::development();
        assert_eq!(config.max_file_size, 100 * 1024 * 1024);
        assert_eq!(config.jwt_expiration_minutes, 15);
    }

    #[test]
    fn test_production_rejects_shared_secret() {
        unsafe {
            env::set_var("JWT_SECRET", "same");
            env::set_var("JWT_REFRESH_SECRET", "same");
        }
        let result = SecurityConfig::production();
        unsafe {
            env::remove_var("JWT_SECRET");
            env::remove_var("JWT_REFRESH_SECRET");
        }
        assert!(result.is_err());
    }

    #[test]
    fn test_from_env_cors_fallback() {
        unsafe { env::remove_var("ALLOWED_ORIGINS") };
        let config = SecurityConfig::from_env();
        let default_config = SecurityConfig::default();
        assert_eq!(config.allowed_origins, default_config.allowed_origins);
        assert!(!config.allowed_origins.contains(&"*".to_string()));
    }
}
