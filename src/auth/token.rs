use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::{ConfigError, JwtConfig};
use crate::error::AppError;

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Distinguishes short-lived access tokens from long-lived refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// Represents the claims encoded within a JWT.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub kind: TokenKind,
    /// Issuer.
    pub iss: String,
    /// Issued at, Unix seconds.
    pub iat: i64,
    /// Expires at, Unix seconds.
    pub exp: i64,
}

impl Claims {
    pub fn is_refresh(&self) -> bool {
        self.kind == TokenKind::Refresh
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

impl IssuedToken {
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

/// Signs and verifies HS256 identity tokens with a single process-wide secret.
///
/// The engine is immutable once built and shared read-only across requests.
/// Tokens are never stored, so there is no revocation: a refresh token stays
/// valid until it expires, even after it has been used.
pub struct TokenEngine {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    issuer: String,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenEngine {
    /// Fails if the secret is empty; the server must not start without one.
    pub fn new(config: &JwtConfig) -> Result<Self, ConfigError> {
        if config.secret.trim().is_empty() {
            return Err(ConfigError::Invalid {
                key: "JWT_SECRET",
                expected: "a non-empty secret",
                value: String::new(),
            });
        }

        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            issuer: config.issuer.clone(),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        })
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl_secs
    }

    pub fn refresh_ttl_secs(&self) -> i64 {
        self.refresh_ttl_secs
    }

    /// Mints a token for `user_id`. `iat` and `exp` come from the same clock reading,
    /// so `exp - iat` is exactly the configured lifetime for `kind`.
    pub fn issue(&self, user_id: i64, username: &str, kind: TokenKind) -> Result<IssuedToken, AppError> {
        let now = Utc::now().timestamp();
        let ttl = match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        };
        let exp = now
            .checked_add(ttl)
            .ok_or_else(|| AppError::Signing(format!("{:?} token lifetime out of range", kind)))?;

        let claims = Claims {
            user_id,
            username: username.to_string(),
            kind,
            iss: self.issuer.clone(),
            iat: now,
            exp,
        };

        let token = encode(&Header::new(ALGORITHM), &claims, &self.encoding_key)
            .map_err(|e| AppError::Signing(e.to_string()))?;

        Ok(IssuedToken { token, claims })
    }

    /// Checks signature, algorithm, issuer and expiry. Nothing from a token that
    /// fails any check is returned.
    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)?.claims;

        // jsonwebtoken accepts exp == now; a token is only live strictly before exp.
        if claims.exp <= Utc::now().timestamp() {
            return Err(AppError::InvalidToken("ExpiredSignature".into()));
        }

        Ok(claims)
    }

    /// `verify` plus a check that the token is of the expected kind.
    pub fn verify_kind(&self, token: &str, kind: TokenKind) -> Result<Claims, AppError> {
        let claims = self.verify(token)?;
        if claims.kind != kind {
            return Err(AppError::InvalidToken(
                format!("expected {:?} token", kind).to_lowercase(),
            ));
        }
        Ok(claims)
    }

    /// Exchanges a valid refresh token for a new access token for the same identity.
    /// No new refresh token is issued and the presented one is not revoked.
    pub fn refresh(&self, refresh_token: &str) -> Result<IssuedToken, AppError> {
        let claims = self.verify_kind(refresh_token, TokenKind::Refresh)?;
        self.issue(claims.user_id, &claims.username, TokenKind::Access)
    }
}
