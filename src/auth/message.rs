//! EIP-4361 challenge message and its canonical text form.
//!
//! [`ChallengeMessage`] is the JSON shape exchanged with the web client. The
//! text a wallet signs is always rendered by converting it into a
//! [`siwe::Message`], so field formatting lives in one place. Timestamps keep
//! the exact string they were parsed from for the same reason.

use crate::auth::address::parse_address;
use crate::auth::nonce::is_valid_nonce;
use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// The only message version defined by EIP-4361.
pub const SIWE_VERSION: &str = "1";

/// An RFC 3339 instant that remembers its original text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timestamp {
    instant: DateTime<Utc>,
    text: String,
}

impl Timestamp {
    /// Whole-second UTC timestamp, rendered as `YYYY-MM-DDTHH:MM:SSZ`.
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        let instant = at.trunc_subsecs(0);
        Self {
            text: instant.to_rfc3339_opts(SecondsFormat::Secs, true),
            instant,
        }
    }

    pub fn parse(text: &str) -> Result<Self, chrono::ParseError> {
        let instant = DateTime::parse_from_rfc3339(text)?.with_timezone(&Utc);
        Ok(Self {
            instant,
            text: text.to_string(),
        })
    }

    pub fn instant(&self) -> DateTime<Utc> {
        self.instant
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn to_siwe(&self) -> Result<siwe::TimeStamp, MessageError> {
        self.text.parse().map_err(|_| MessageError::InvalidTimestamp)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Timestamp::parse(&text).map_err(de::Error::custom)
    }
}

/// Structural problems with a submitted challenge.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MessageError {
    #[error("{0} is required")]
    EmptyField(&'static str),

    #[error("{0} must not contain line breaks")]
    LineBreak(&'static str),

    #[error("invalid address")]
    InvalidAddress,

    #[error("invalid nonce")]
    InvalidNonce,

    #[error("unsupported version")]
    UnsupportedVersion,

    #[error("invalid chainId")]
    InvalidChainId,

    #[error("inconsistent time bounds")]
    InvalidTimeBounds,

    #[error("invalid domain")]
    InvalidDomain,

    #[error("invalid uri")]
    InvalidUri,

    #[error("invalid resource")]
    InvalidResource,

    #[error("invalid timestamp")]
    InvalidTimestamp,
}

/// A Sign-In-With-Ethereum challenge.
///
/// Serialized with the field names the web client expects; `chain_id`
/// travels as a decimal string but numbers are accepted too.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChallengeMessage {
    pub domain: String,
    pub address: String,
    pub statement: String,
    pub version: String,
    pub nonce: String,
    pub issued_at: Timestamp,
    pub expiration_time: Timestamp,
    #[serde(rename = "invalid_before", alias = "not_before")]
    pub not_before: Timestamp,
    #[serde(
        serialize_with = "serialize_chain_id",
        deserialize_with = "deserialize_chain_id"
    )]
    pub chain_id: u64,
    pub uri: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub resources: Vec<String>,
}

impl ChallengeMessage {
    /// Check the invariants every signed challenge must satisfy.
    pub fn validate(&self) -> Result<(), MessageError> {
        for (name, value) in [
            ("domain", &self.domain),
            ("address", &self.address),
            ("version", &self.version),
            ("nonce", &self.nonce),
            ("uri", &self.uri),
        ] {
            if value.trim().is_empty() {
                return Err(MessageError::EmptyField(name));
            }
        }

        let single_line = [
            ("domain", Some(&self.domain)),
            ("address", Some(&self.address)),
            ("statement", Some(&self.statement)),
            ("uri", Some(&self.uri)),
            ("request_id", self.request_id.as_ref()),
        ];
        for (name, value) in single_line {
            if value.is_some_and(|v| v.contains(['\n', '\r'])) {
                return Err(MessageError::LineBreak(name));
            }
        }
        if self.resources.iter().any(|r| r.contains(['\n', '\r'])) {
            return Err(MessageError::LineBreak("resources"));
        }

        if parse_address(&self.address).is_none() {
            return Err(MessageError::InvalidAddress);
        }
        if !is_valid_nonce(&self.nonce) {
            return Err(MessageError::InvalidNonce);
        }
        if self.version != SIWE_VERSION {
            return Err(MessageError::UnsupportedVersion);
        }
        if self.chain_id == 0 {
            return Err(MessageError::InvalidChainId);
        }

        let (not_before, issued_at, expires) = (
            self.not_before.instant(),
            self.issued_at.instant(),
            self.expiration_time.instant(),
        );
        if not_before > issued_at || issued_at > expires {
            return Err(MessageError::InvalidTimeBounds);
        }

        self.to_siwe().map(|_| ())
    }

    /// Convert into the `siwe` representation of the same message.
    pub fn to_siwe(&self) -> Result<siwe::Message, MessageError> {
        if self.version != SIWE_VERSION {
            return Err(MessageError::UnsupportedVersion);
        }
        let address = parse_address(&self.address).ok_or(MessageError::InvalidAddress)?;

        let resources = self
            .resources
            .iter()
            .map(|r| convert(r.as_str(), MessageError::InvalidResource))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(siwe::Message {
            domain: convert(self.domain.as_str(), MessageError::InvalidDomain)?,
            address: address.0.0,
            statement: Some(self.statement.clone()).filter(|s| !s.is_empty()),
            uri: convert(self.uri.as_str(), MessageError::InvalidUri)?,
            version: siwe::Version::V1,
            chain_id: self.chain_id,
            nonce: self.nonce.clone(),
            issued_at: self.issued_at.to_siwe()?,
            expiration_time: Some(self.expiration_time.to_siwe()?),
            not_before: Some(self.not_before.to_siwe()?),
            request_id: self.request_id.clone(),
            resources,
        })
    }

    /// The exact EIP-4361 text a wallet signs for this message.
    pub fn to_canonical_string(&self) -> Result<String, MessageError> {
        Ok(self.to_siwe()?.to_string())
    }
}

fn convert<T, U: TryInto<T>>(value: U, err: MessageError) -> Result<T, MessageError> {
    value.try_into().map_err(|_| err)
}

fn serialize_chain_id<S: Serializer>(chain_id: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(chain_id)
}

fn deserialize_chain_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawChainId {
        Number(u64),
        Text(String),
    }

    match RawChainId::deserialize(deserializer)? {
        RawChainId::Number(n) => Ok(n),
        RawChainId::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom("invalid chainId")),
    }
}
