//! HS256 JWT による TokenVerifier 実装
//!
//! トークンのクレームは `{userId, username, exp}` で、署名鍵は共有シークレット。

use std::time::Duration;

use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};

use crate::domain::{AuthError, DisplayName, Timestamp, TokenVerifier, UserId, UserIdentity};

/// Claims carried by session tokens
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub username: String,
    /// Expiry as Unix seconds
    pub exp: u64,
}

/// JWT TokenVerifier 実装
pub struct JwtTokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtTokenVerifier {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }
}

impl TokenVerifier for JwtTokenVerifier {
    fn verify(&self, token: &str) -> Result<UserIdentity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => AuthError::TokenExpired,
                    _ => {
                        tracing::debug!("Token rejected: {}", e);
                        AuthError::InvalidToken
                    }
                }
            })?;

        let claims = data.claims;
        let user_id = UserId::new(claims.user_id).map_err(|_| AuthError::InvalidToken)?;
        let display_name =
            DisplayName::new(claims.username).map_err(|_| AuthError::InvalidToken)?;
        let expires_at = i64::try_from(claims.exp)
            .ok()
            .map(|secs| Timestamp::new(secs.saturating_mul(1000)));

        Ok(UserIdentity::new(user_id, display_name, expires_at))
    }
}

/// Sign a session token for `user_id` valid for `valid_for` from now
pub fn issue_token(
    secret: &str,
    user_id: &str,
    username: &str,
    valid_for: Duration,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now_secs = u64::try_from(Timestamp::now().value() / 1000).unwrap_or_default();
    let claims = Claims {
        user_id: user_id.to_string(),
        username: username.to_string(),
        exp: now_secs.saturating_add(valid_for.as_secs()),
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}
