//! HS256 access tokens for admin sessions.

use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Admin username. Optional so that tokens without a subject decode and
    /// are rejected by the caller instead of failing as malformed.
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub is_super_admin: bool,
    pub exp: i64,
}

#[derive(Clone)]
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    lifetime: Duration,
}

impl TokenCodec {
    #[must_use]
    pub fn new(config: &AuthConfig) -> Self {
        let secret = config.jwt_secret.as_bytes();
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
            lifetime: Duration::minutes(config.jwt_expire_minutes),
        }
    }

    pub fn issue(
        &self,
        username: &str,
        is_super_admin: bool,
    ) -> Result<String, jsonwebtoken::errors::Error> {
        let claims = Claims {
            sub: Some(username.to_string()),
            is_super_admin,
            exp: (Utc::now() + self.lifetime).timestamp(),
        };
        self.encode(&claims)
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, jsonwebtoken::errors::Error> {
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &self.encoding)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
    }
}
