//! Access-token signing/verification and opaque refresh-token generation.

use core::str::FromStr;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;
use uuid::Uuid;

use crate::{AccessClaims, AuthUser, TokenValidationError, validate_claims};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TokenError {
    #[error("unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("jwt secret must not be empty")]
    EmptySecret,

    #[error("token duration must be positive")]
    InvalidDuration,

    #[error("token encode failed: {0}")]
    Encode(String),

    #[error("invalid token: {0}")]
    Invalid(String),

    #[error(transparent)]
    Claims(#[from] TokenValidationError),
}

/// A freshly signed access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedToken {
    pub token: String,
    /// Validity window in seconds.
    pub expires_in: i64,
}

/// Signs access tokens for an authenticated identity.
pub trait TokenSigner: Send + Sync {
    fn sign(&self, user: &AuthUser) -> Result<SignedToken, TokenError>;

    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError>;
}

/// HMAC-SHA JWT signer. Algorithm and validity window come from configuration.
#[derive(Clone)]
pub struct JwtSigner {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
    duration_secs: i64,
}

impl core::fmt::Debug for JwtSigner {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("JwtSigner")
            .field("algorithm", &self.algorithm)
            .field("duration_secs", &self.duration_secs)
            .finish_non_exhaustive()
    }
}

impl JwtSigner {
    /// `algorithm` is one of `HS256`, `HS384`, `HS512`.
    pub fn new(algorithm: &str, secret: &str, duration_secs: i64) -> Result<Self, TokenError> {
        let algorithm = Algorithm::from_str(algorithm.trim())
            .map_err(|_| TokenError::UnsupportedAlgorithm(algorithm.to_string()))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(TokenError::UnsupportedAlgorithm(format!("{algorithm:?}")));
        }
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        if duration_secs <= 0 {
            return Err(TokenError::InvalidDuration);
        }

        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            duration_secs,
        })
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration_secs
    }
}

impl TokenSigner for JwtSigner {
    fn sign(&self, user: &AuthUser) -> Result<SignedToken, TokenError> {
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            id: user.id.get(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.duration_secs,
        };

        let token = jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| TokenError::Encode(e.to_string()))?;

        Ok(SignedToken {
            token,
            expires_in: self.duration_secs,
        })
    }

    fn verify(&self, token: &str) -> Result<AccessClaims, TokenError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat"]);

        let claims = jsonwebtoken::decode::<AccessClaims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    TokenError::Claims(TokenValidationError::Expired)
                }
                _ => TokenError::Invalid(e.to_string()),
            })?;

        validate_claims(&claims, Utc::now())?;
        Ok(claims)
    }
}

/// Produces unique opaque refresh tokens.
pub trait RefreshTokenGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// 64 hex chars built from two random v4 UUIDs.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidTokenGenerator;

impl RefreshTokenGenerator for UuidTokenGenerator {
    fn generate(&self) -> String {
        format!(
            "{}{}",
            Uuid::new_v4().simple(),
            Uuid::new_v4().simple()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Role;
    use adminhub_core::EntityId;

    fn alice() -> AuthUser {
        AuthUser {
            id: EntityId::new(7),
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::Admin,
        }
    }

    #[test]
    fn sign_then_verify_carries_identity() {
        let signer = JwtSigner::new("HS384", "secret", 60).unwrap();
        let signed = signer.sign(&alice()).unwrap();
        assert_eq!(signed.expires_in, 60);

        let claims = signer.verify(&signed.token).unwrap();
        assert_eq!(AuthUser::from(claims.clone()), alice());
        assert_eq!(claims.exp - claims.iat, 60);
    }

    #[test]
    fn verify_rejects_foreign_secret() {
        let signer = JwtSigner::new("HS256", "secret", 60).unwrap();
        let other = JwtSigner::new("HS256", "other", 60).unwrap();
        let token = other.sign(&alice()).unwrap().token;
        assert!(matches!(signer.verify(&token), Err(TokenError::Invalid(_))));
    }

    #[test]
    fn verify_rejects_expired_token() {
        let signer = JwtSigner::new("HS256", "secret", 60).unwrap();
        let now = Utc::now().timestamp();
        let claims = AccessClaims {
            id: 7,
            username: "alice".into(),
            email: "alice@example.com".into(),
            role: Role::Admin,
            iat: now - 120,
            exp: now - 60,
        };
        let token = jsonwebtoken::encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(b"secret"),
        )
        .unwrap();
        assert_eq!(
            signer.verify(&token),
            Err(TokenError::Claims(TokenValidationError::Expired))
        );
    }

    #[test]
    fn only_hmac_algorithms_are_accepted() {
        assert!(matches!(
            JwtSigner::new("RS256", "secret", 60),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            JwtSigner::new("HS999", "secret", 60),
            Err(TokenError::UnsupportedAlgorithm(_))
        ));
        assert_eq!(JwtSigner::new("HS256", "", 60).unwrap_err(), TokenError::EmptySecret);
        assert_eq!(JwtSigner::new("HS256", "s", 0).unwrap_err(), TokenError::InvalidDuration);
    }

    #[test]
    fn refresh_tokens_are_unique_hex() {
        let generator = UuidTokenGenerator;
        let a = generator.generate();
        let b = generator.generate();
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
