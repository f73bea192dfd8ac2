//! # Request authentication
//!
//! Bearer JWT, HS256. [`CurrentUser`] is the extractor handlers take
//! to get the authenticated, non-blocked user; blocked accounts and
//! blocked companies are rejected here so usecases never see them.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use chrono::{Duration, Utc};
use declarant_domain::user::{User, UserId};
use declarant_infra::repository::UserRepository;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::ApiError, state::AppState, usecase::auth::ensure_not_blocked};

const TOKEN_TTL_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub exp: i64,
    #[serde(default)]
    pub is_admin: bool,
}

/// Encoding and decoding keys derived from the configured secret.
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn issue(&self, user: &User) -> Result<String, ApiError> {
        let claims = Claims {
            sub: *user.id().as_uuid(),
            exp: (Utc::now() + Duration::hours(TOKEN_TTL_HOURS)).timestamp(),
            is_admin: user.is_admin(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|_| ApiError::Unauthorized)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|_| ApiError::Unauthorized)
    }
}

/// The authenticated user behind the bearer token.
pub struct CurrentUser(pub User);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::Unauthorized)?;

        let claims = state.jwt.verify(bearer.token())?;
        let user_id = UserId::from_uuid(claims.sub);
        let user = state
            .user_repo
            .find_by_id(&user_id)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        ensure_not_blocked(&state.company_repo, &user).await?;
        Ok(Self(user))
    }
}

#[cfg(test)]
mod tests {
    use declarant_domain::value_objects::{ActivityType, Email};
    use pretty_assertions::assert_eq;

    use super::*;

    fn user() -> User {
        User::new(
            UserId::new(),
            Email::new("user@example.com").unwrap(),
            "hash".to_string(),
            "Иванов Иван".to_string(),
            String::new(),
            ActivityType::Declarant,
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let keys = JwtKeys::new("test-secret");
        let user = user();

        let token = keys.issue(&user).unwrap();
        let claims = keys.verify(&token).unwrap();
        assert_eq!(claims.sub, *user.id().as_uuid());
        assert!(!claims.is_admin);
    }

    #[test]
    fn test_wrong_secret_is_rejected() {
        let keys = JwtKeys::new("test-secret");
        let token = keys.issue(&user()).unwrap();

        let other = JwtKeys::new("other-secret");
        assert!(other.verify(&token).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        let keys = JwtKeys::new("test-secret");
        assert!(keys.verify("not-a-token").is_err());
    }
}
