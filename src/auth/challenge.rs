//! Challenge construction.

use crate::auth::address::normalize_address;
use crate::auth::message::{ChallengeMessage, MessageError, Timestamp, SIWE_VERSION};
use crate::auth::nonce::generate_challenge_nonce;
use crate::config::{Config, ConfigError};
use chrono::{DateTime, Duration, Utc};

/// Builds challenges bound to this server's domain and URI.
///
/// Domain, URI and statement always come from configuration so a client
/// cannot ask for a challenge naming some other site.
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    domain: String,
    uri: String,
    statement: String,
    ttl: Duration,
}

impl MessageBuilder {
    pub fn new(
        domain: impl Into<String>,
        uri: impl Into<String>,
        statement: impl Into<String>,
        ttl: Duration,
    ) -> Result<Self, ConfigError> {
        let domain = domain.into();
        let uri = uri.into();
        if domain.trim().is_empty() {
            return Err(ConfigError::MissingVar("DOMAIN".to_string()));
        }
        if uri.trim().is_empty() {
            return Err(ConfigError::MissingVar("URI".to_string()));
        }
        Ok(Self {
            domain,
            uri,
            statement: statement.into(),
            ttl,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        Self::new(
            config.domain.clone(),
            config.uri.clone(),
            config.statement.clone(),
            config.challenge_ttl()?,
        )
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn build_challenge(
        &self,
        address: &str,
        chain_id: u64,
    ) -> Result<ChallengeMessage, MessageError> {
        self.build_challenge_at(address, chain_id, Utc::now())
    }

    /// Challenge valid from `now - ttl` through `now + ttl`.
    pub fn build_challenge_at(
        &self,
        address: &str,
        chain_id: u64,
        now: DateTime<Utc>,
    ) -> Result<ChallengeMessage, MessageError> {
        let address = normalize_address(address).ok_or(MessageError::InvalidAddress)?;
        if chain_id == 0 {
            return Err(MessageError::InvalidChainId);
        }

        let issued_at = Timestamp::from_datetime(now);
        let now = issued_at.instant();
        let expires_at = now
            .checked_add_signed(self.ttl)
            .ok_or(MessageError::InvalidTimeBounds)?;
        let not_before = now
            .checked_sub_signed(self.ttl)
            .ok_or(MessageError::InvalidTimeBounds)?;

        Ok(ChallengeMessage {
            domain: self.domain.clone(),
            address,
            statement: self.statement.clone(),
            version: SIWE_VERSION.to_string(),
            nonce: generate_challenge_nonce(),
            expiration_time: Timestamp::from_datetime(expires_at),
            not_before: Timestamp::from_datetime(not_before),
            issued_at,
            chain_id,
            uri: self.uri.clone(),
            request_id: None,
            resources: Vec::new(),
        })
    }
}
