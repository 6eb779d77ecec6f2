use crate::entities::sea_orm_active_enums::Role;
use anyhow::Result;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

/// Claims carried by a short-lived access token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    pub sub: i32, // user_id
    pub email: String,
    pub role: Role,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

/// Claims carried by a refresh token. Only the user id travels in it.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RefreshClaims {
    pub sub: i32,
    pub iat: usize,
    pub exp: usize,
    pub jti: String,
}

fn timestamps(ttl: Duration) -> Result<(usize, usize)> {
    let now = Utc::now();
    let expiration = now
        .checked_add_signed(ttl)
        .ok_or_else(|| anyhow::anyhow!("Token expiry overflows"))?;
    Ok((now.timestamp() as usize, expiration.timestamp() as usize))
}

fn sign<T: Serialize>(claims: &T, secret: &str) -> Result<String> {
    let token = encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?;
    Ok(token)
}

fn verify<T: DeserializeOwned>(token: &str, secret: &str) -> Result<T> {
    let mut validation = Validation::default();
    validation.leeway = 0;
    let token_data = decode::<T>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )?;
    Ok(token_data.claims)
}

pub fn create_access_token(
    user_id: i32,
    email: &str,
    role: Role,
    secret: &str,
    ttl: Duration,
) -> Result<String> {
    let (iat, exp) = timestamps(ttl)?;
    let claims = Claims {
        sub: user_id,
        email: email.to_owned(),
        role,
        iat,
        exp,
        jti: uuid::Uuid::new_v4().to_string(),
    };
    sign(&claims, secret)
}

pub fn create_refresh_token(user_id: i32, secret: &str, ttl: Duration) -> Result<String> {
    let (iat, exp) = timestamps(ttl)?;
    let claims = RefreshClaims {
        sub: user_id,
        iat,
        exp,
        jti: uuid::Uuid::new_v4().to_string(),
    };
    sign(&claims, secret)
}

pub fn validate_access_token(token: &str, secret: &str) -> Result<Claims> {
    verify(token, secret)
}

pub fn validate_refresh_token(token: &str, secret: &str) -> Result<RefreshClaims> {
    verify(token, secret)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_cycle() {
        let token =
            create_access_token(42, "a@b.c", Role::Admin, "access", Duration::minutes(5)).unwrap();
        let claims = validate_access_token(&token, "access").unwrap();
        assert_eq!(claims.sub, 42);
        assert_eq!(claims.email, "a@b.c");
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn test_secrets_are_not_interchangeable() {
        let refresh = create_refresh_token(1, "refresh", Duration::days(1)).unwrap();
        assert!(validate_refresh_token(&refresh, "refresh").is_ok());
        assert!(validate_refresh_token(&refresh, "access").is_err());

        let access =
            create_access_token(1, "a@b.c", Role::User, "access", Duration::minutes(5)).unwrap();
        assert!(validate_access_token(&access, "refresh").is_err());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = create_refresh_token(1, "refresh", Duration::seconds(-10)).unwrap();
        assert!(validate_refresh_token(&token, "refresh").is_err());
    }

    #[test]
    fn test_tokens_are_unique() {
        let a = create_refresh_token(1, "refresh", Duration::days(1)).unwrap();
        let b = create_refresh_token(1, "refresh", Duration::days(1)).unwrap();
        assert_ne!(a, b);
    }
}
