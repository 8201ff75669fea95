use chrono::{Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::{Error as JwtError, ErrorKind},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

const ACCESS_TOKEN_TYPE: &str = "access";

/// Claims of a site access token. Only `sub` matters to the comment service;
/// the profile behind it is looked up per request.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AccessClaims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

impl AccessClaims {
    pub fn user_id(&self) -> Option<Uuid> {
        Uuid::parse_str(&self.sub).ok()
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl: Duration,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    /// Token lifetime, issuer and audience come from `JWT_EXPIRATION_HOURS`,
    /// `JWT_ISSUER` and `JWT_AUDIENCE`.
    pub fn from_env(secret: String) -> Self {
        let hours = env_trimmed("JWT_EXPIRATION_HOURS")
            .and_then(|value| value.parse::<i64>().ok())
            .filter(|value| *value > 0)
            .unwrap_or(24);
        Self {
            secret,
            ttl: Duration::hours(hours),
            issuer: env_trimmed("JWT_ISSUER"),
            audience: env_trimmed("JWT_AUDIENCE"),
        }
    }

    /// Signs an access token for `user_id`. The service never logs anyone in;
    /// this exists for local tooling and tests.
    pub fn issue(&self, user_id: Uuid) -> Result<String, JwtError> {
        let now = Utc::now();
        let claims = AccessClaims {
            sub: user_id.to_string(),
            exp: (now + self.ttl).timestamp(),
            iat: now.timestamp(),
            typ: Some(ACCESS_TOKEN_TYPE.to_string()),
            iss: self.issuer.clone(),
            aud: self.audience.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
    }

    /// Verifies signature, expiry, issuer and audience. Tokens carrying a
    /// `typ` other than `access` (refresh tokens, invites) are rejected;
    /// tokens without one are accepted.
    pub fn verify(&self, token: &str) -> Result<AccessClaims, JwtError> {
        let claims = decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &self.validation(),
        )?
        .claims;

        match claims.typ.as_deref() {
            None | Some(ACCESS_TOKEN_TYPE) => Ok(claims),
            Some(_) => Err(ErrorKind::InvalidToken.into()),
        }
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
        }
        validation
    }
}

fn env_trimmed(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
