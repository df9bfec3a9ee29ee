//! Admin gate: password exchange issues a signed token, every privileged
//! request verifies it fresh. The server holds no session state, so an
//! issued token cannot be revoked before it expires; the expiry window is
//! the only bound on a leaked token's lifetime.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    error::{AppError, AppResult},
    state::State,
};

const TOKEN_LIFETIME_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub user: UserClaims,
    pub exp: usize,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct UserClaims {
    #[serde(rename = "isAdmin")]
    pub is_admin: bool,
}

pub fn create_token(secret: &str) -> AppResult<String> {
    let expiration = Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS);

    let claims = Claims {
        user: UserClaims { is_admin: true },
        exp: expiration.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Configuration(format!("failed to sign token: {e}")))
}

/// Checks signature and expiry. Expired, malformed and mis-signed tokens
/// all come back as the same authentication error.
pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))
}

/// Verified admin credentials, extracted from the bearer header before the
/// handler body runs. Privileged handlers take this as an argument so no
/// side effect can precede the check.
pub struct AdminClaims(pub Claims);

impl FromRequestParts<Arc<State>> for AdminClaims {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<State>,
    ) -> Result<Self, Self::Rejection> {
        let secret = state
            .config
            .token_secret
            .as_deref()
            .ok_or_else(|| AppError::Configuration("TOKEN_SECRET is not set".to_string()))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Authentication("No token provided".to_string()))?;

        let claims = verify_token(token, secret)?;

        // Signature validity alone is not authorization; the claim must
        // actually say admin.
        if !claims.user.is_admin {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }

        Ok(AdminClaims(claims))
    }
}
