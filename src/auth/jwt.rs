use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use uuid::Uuid;

use super::{Claims, IssuedTokens, TokenKind};
use crate::{config::AuthConfig, error::AppError};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("token signature is invalid")]
    InvalidSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is malformed")]
    Malformed,
    #[error("expected a {0:?} token")]
    WrongKind(TokenKind),
    #[error("token encoding failed: {0}")]
    Encoding(String),
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Encoding(detail) => {
                tracing::error!(%detail, "token encoding failed");
                AppError::internal("Token encoding failed")
            }
            TokenError::Expired => AppError::unauthorized("Token has expired"),
            TokenError::InvalidSignature | TokenError::Malformed | TokenError::WrongKind(_) => {
                AppError::unauthorized("Invalid token")
            }
        }
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    pub enc: EncodingKey,
    pub dec: DecodingKey,
}

impl JwtKeys {
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            enc: EncodingKey::from_secret(secret),
            dec: DecodingKey::from_secret(secret),
        }
    }
}

/// Symmetric algorithms only; the codec signs with a shared secret.
pub fn parse_algorithm(raw: &str) -> Option<Algorithm> {
    match raw.trim().to_ascii_uppercase().as_str() {
        "HS256" => Some(Algorithm::HS256),
        "HS384" => Some(Algorithm::HS384),
        "HS512" => Some(Algorithm::HS512),
        _ => None,
    }
}

/// Mints and verifies signed access/refresh pairs. Holds no state besides the key,
/// and every call takes the clock from the caller.
#[derive(Clone)]
pub struct TokenCodec {
    keys: JwtKeys,
    algorithm: Algorithm,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenCodec {
    pub fn new(
        secret: &[u8],
        algorithm: Algorithm,
        access_ttl: Duration,
        refresh_multiplier: i32,
    ) -> Self {
        Self {
            keys: JwtKeys::from_secret(secret),
            algorithm,
            access_ttl,
            refresh_ttl: access_ttl * refresh_multiplier,
        }
    }

    pub fn from_config(cfg: &AuthConfig) -> Result<Self, AppError> {
        let algorithm = parse_algorithm(&cfg.jwt_algorithm).ok_or_else(|| {
            AppError::internal(format!("Unsupported JWT algorithm: {}", cfg.jwt_algorithm))
        })?;
        Ok(Self::new(
            cfg.jwt_secret.as_bytes(),
            algorithm,
            Duration::minutes(cfg.access_ttl_minutes),
            cfg.refresh_ttl_multiplier,
        ))
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn issue(
        &self,
        user_id: Uuid,
        role: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedTokens, TokenError> {
        let iat = now.timestamp();
        let access_claims = Claims {
            jti: Uuid::new_v4(),
            user_id,
            iat,
            exp: (now + self.access_ttl).timestamp(),
            role: role.to_string(),
            kind: TokenKind::Access,
        };
        let refresh_claims = Claims {
            jti: Uuid::new_v4(),
            user_id,
            iat,
            exp: (now + self.refresh_ttl).timestamp(),
            role: role.to_string(),
            kind: TokenKind::Refresh,
        };

        Ok(IssuedTokens {
            access: self.encode(&access_claims)?,
            refresh: self.encode(&refresh_claims)?,
            access_claims,
            refresh_claims,
        })
    }

    /// Verifies the signature first, then expiry against `now`.
    pub fn decode(&self, token: &str, now: DateTime<Utc>) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = decode::<Claims>(token, &self.keys.dec, &validation)
            .map_err(|err| classify(err.kind()))?;

        if data.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        Ok(data.claims)
    }

    /// `decode`, then rejects a token from the other half of the pair.
    pub fn decode_as(
        &self,
        token: &str,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<Claims, TokenError> {
        let claims = self.decode(token, now)?;
        if claims.kind != kind {
            return Err(TokenError::WrongKind(kind));
        }
        Ok(claims)
    }

    fn encode(&self, claims: &Claims) -> Result<String, TokenError> {
        let mut header = Header::new(self.algorithm);
        header.typ = Some("JWT".into());

        encode(&header, claims, &self.keys.enc)
            .map_err(|err| TokenError::Encoding(err.to_string()))
    }
}

fn classify(kind: &ErrorKind) -> TokenError {
    match kind {
        ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => TokenError::InvalidSignature,
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Malformed,
    }
}

/// Seconds left before `claims` expire, or `None` once they have.
pub fn remaining_lifetime(claims: &Claims, now: DateTime<Utc>) -> Option<std::time::Duration> {
    let secs = claims.exp - now.timestamp();
    (secs > 0).then(|| std::time::Duration::from_secs(secs as u64))
}
