//! Stateless session credentials (HS256 JWT).
//!
//! The server keeps no session table: a credential is valid exactly when
//! its signature checks out under the server secret and `exp` lies in the
//! future.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims carried by a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub address: String,
    #[serde(rename = "chainId")]
    pub chain_id: String,
    pub iat: i64,
    pub exp: i64,
}

/// A freshly minted credential and the claims it encodes.
#[derive(Debug, Clone)]
pub struct SessionCredential {
    pub token: String,
    pub claims: SessionClaims,
}

impl SessionCredential {
    pub fn expires_at(&self) -> i64 {
        self.claims.exp
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SigningError {
    #[error("session secret is not configured")]
    MissingSecret,

    #[error("failed to sign session token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),

    #[error("session expiry is out of range")]
    ExpiryOutOfRange,
}

/// Reasons a presented credential is not accepted.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("malformed token")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("unsupported signing algorithm")]
    UnsupportedAlgorithm,

    #[error("token expired")]
    Expired,
}

/// Mints session credentials.
pub struct SessionIssuer {
    key: EncodingKey,
    ttl: Duration,
}

impl SessionIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Result<Self, SigningError> {
        if secret.is_empty() {
            return Err(SigningError::MissingSecret);
        }
        Ok(Self {
            key: EncodingKey::from_secret(secret),
            ttl,
        })
    }

    pub fn issue(&self, address: &str, chain_id: u64) -> Result<SessionCredential, SigningError> {
        self.issue_at(address, chain_id, Utc::now())
    }

    pub fn issue_at(
        &self,
        address: &str,
        chain_id: u64,
        now: DateTime<Utc>,
    ) -> Result<SessionCredential, SigningError> {
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(SigningError::ExpiryOutOfRange)?;
        let claims = SessionClaims {
            address: address.to_string(),
            chain_id: chain_id.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };
        self.sign(claims)
    }

    /// A credential that is already expired, used to overwrite the
    /// client's copy on logout.
    pub fn issue_expired(&self) -> Result<SessionCredential, SigningError> {
        let now = Utc::now().timestamp();
        self.sign(SessionClaims {
            address: String::new(),
            chain_id: String::new(),
            iat: now,
            exp: now - 1,
        })
    }

    fn sign(&self, claims: SessionClaims) -> Result<SessionCredential, SigningError> {
        let token = encode(&Header::new(ALGORITHM), &claims, &self.key)?;
        Ok(SessionCredential { token, claims })
    }
}

/// Checks presented session credentials.
pub struct SessionValidator {
    key: DecodingKey,
    validation: Validation,
}

impl SessionValidator {
    pub fn new(secret: &[u8]) -> Self {
        // Only the algorithm we sign with is accepted; the token header
        // never chooses the verification method.
        let mut validation = Validation::new(ALGORITHM);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        Self {
            key: DecodingKey::from_secret(secret),
            validation,
        }
    }

    pub fn validate(&self, token: &str) -> Result<SessionClaims, TokenError> {
        self.validate_at(token, Utc::now())
    }

    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> Result<SessionClaims, TokenError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
                    TokenError::UnsupportedAlgorithm
                }
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Malformed,
            }
        })?;

        if data.claims.exp <= now.timestamp() {
            return Err(TokenError::Expired);
        }
        if data.claims.address.is_empty() {
            return Err(TokenError::Malformed);
        }

        Ok(data.claims)
    }

    /// Whether `token` is a currently valid credential.
    pub fn is_valid(&self, token: &str) -> bool {
        self.validate(token).is_ok()
    }
}
