//! Login orchestration: challenge issuance, signed-challenge exchange and
//! session checks.
//!
//! Per attempt: challenge issued -> signature submitted -> accepted or
//! rejected. An accepted login yields a client-held credential that stays
//! active until it expires or the client replaces it on logout.

use crate::auth::challenge::MessageBuilder;
use crate::auth::message::ChallengeMessage;
use crate::auth::token::{SessionClaims, SessionCredential, SessionIssuer, SessionValidator};
use crate::auth::address::normalize_address;
use crate::auth::verify::verify_signature;
use crate::config::{Config, ConfigError};
use crate::error::AppError;
use crate::models::SignedLoginRequest;
use crate::storage::nonce::NonceStore;

/// Result of a login attempt.
#[derive(Debug)]
pub enum LoginOutcome {
    Accepted(SessionCredential),
    Rejected,
}

impl LoginOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, LoginOutcome::Accepted(_))
    }
}

pub struct AuthService {
    builder: MessageBuilder,
    issuer: SessionIssuer,
    validator: SessionValidator,
    nonces: NonceStore,
}

impl AuthService {
    pub fn new(
        builder: MessageBuilder,
        issuer: SessionIssuer,
        validator: SessionValidator,
        nonces: NonceStore,
    ) -> Self {
        Self {
            builder,
            issuer,
            validator,
            nonces,
        }
    }

    /// Wire the service from configuration. Fails on missing secret,
    /// domain or URI so the server never starts half-configured.
    pub fn from_config(config: &Config, nonces: NonceStore) -> Result<Self, ConfigError> {
        let builder = MessageBuilder::from_config(config)?;
        let issuer = SessionIssuer::new(config.secret.as_bytes(), config.session_ttl()?)
            .map_err(|e| ConfigError::InvalidValue("SECRET".to_string(), e.to_string()))?;
        let validator = SessionValidator::new(config.secret.as_bytes());

        Ok(Self::new(builder, issuer, validator, nonces))
    }

    /// Issue a challenge for `address` on `chain_id`.
    pub async fn begin_login(
        &self,
        address: Option<&str>,
        chain_id: Option<&str>,
    ) -> Result<ChallengeMessage, AppError> {
        let address = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .ok_or_else(|| AppError::InvalidRequest("address is required".to_string()))?;

        let chain_id = chain_id
            .and_then(|c| c.trim().parse::<u64>().ok())
            .filter(|c| *c > 0)
            .ok_or_else(|| AppError::InvalidRequest("invalid chainId".to_string()))?;

        let message = self.builder.build_challenge(address, chain_id)?;

        if !self
            .nonces
            .remember(&message.nonce, message.expiration_time.instant())
            .await?
        {
            return Err(AppError::Internal("Generated nonce collided".to_string()));
        }

        tracing::info!(action = "challenge_issued", address = %message.address, chain_id = message.chain_id, "Login challenge issued");

        Ok(message)
    }

    /// Exchange a signed challenge for a session credential.
    ///
    /// Structurally invalid challenges are client errors; every other
    /// failure is reported only as `Rejected`.
    pub async fn complete_login(&self, req: SignedLoginRequest) -> Result<LoginOutcome, AppError> {
        let SignedLoginRequest { signature, payload } = req;
        payload.validate()?;

        if payload.domain != self.builder.domain() || payload.uri != self.builder.uri() {
            tracing::warn!(action = "auth_failed", address = %payload.address, "Challenge names a foreign domain or URI");
            return Ok(LoginOutcome::Rejected);
        }

        if !verify_signature(&payload, &signature, None) {
            tracing::warn!(action = "auth_failed", address = %payload.address, "Invalid signed challenge");
            return Ok(LoginOutcome::Rejected);
        }
        let address = normalize_address(&payload.address)
            .ok_or_else(|| AppError::InvalidRequest("invalid address".to_string()))?;

        // Consumed only after the signature checks out, so a forged
        // request cannot burn someone else's pending challenge.
        if !self.nonces.consume(&payload.nonce).await? {
            tracing::warn!(action = "auth_failed", address = %address, "Challenge nonce unknown or already used");
            return Ok(LoginOutcome::Rejected);
        }

        let credential = self.issuer.issue(&address, payload.chain_id)?;

        tracing::info!(action = "auth_success", address = %address, chain_id = payload.chain_id, "Wallet authenticated");

        Ok(LoginOutcome::Accepted(credential))
    }

    /// Claims of a currently valid credential.
    pub fn session_claims(&self, token: &str) -> Option<SessionClaims> {
        match self.validator.validate(token) {
            Ok(claims) => Some(claims),
            Err(reason) => {
                tracing::debug!(reason = %reason, "Session credential rejected");
                None
            }
        }
    }

    /// Whether the presented credential (if any) is active.
    pub fn check_session(&self, token: Option<&str>) -> bool {
        token.is_some_and(|t| self.session_claims(t).is_some())
    }

    /// Expired replacement credential for the client to store on logout.
    pub fn end_session(&self) -> Result<String, AppError> {
        Ok(self.issuer.issue_expired()?.token)
    }
}
