//! secp256k1 signature verification for EIP-4361 challenges.

use crate::auth::address::{parse_address, same_address, to_checksum};
use crate::auth::message::ChallengeMessage;
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};

/// Length of an `r || s || v` recoverable signature.
pub const SIGNATURE_LEN: usize = 65;

/// Why a signed challenge was not accepted.
///
/// Only ever logged; callers see a plain `false`.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum VerificationFailure {
    #[error("signature is missing")]
    MissingSignature,

    #[error("signature is malformed: {0}")]
    MalformedSignature(&'static str),

    #[error("public key recovery failed")]
    RecoveryFailed,

    #[error("message is not valid yet")]
    NotYetValid,

    #[error("message has expired")]
    Expired,

    #[error("message address is malformed")]
    InvalidAddress,

    #[error("message cannot be rendered: {0}")]
    InvalidMessage(#[from] crate::auth::message::MessageError),

    #[error("recovered signer does not match message address")]
    AddressMismatch,

    #[error("recovered signer does not match expected address")]
    ExpectedAddressMismatch,
}

/// Verify `signature` over `message` at the current time.
///
/// Returns `false` for every kind of failure.
pub fn verify_signature(
    message: &ChallengeMessage,
    signature: &str,
    expected_address: Option<&str>,
) -> bool {
    match check_signature_at(message, signature, expected_address, Utc::now()) {
        Ok(_) => true,
        Err(reason) => {
            tracing::debug!(reason = %reason, nonce = %message.nonce, "Challenge signature rejected");
            false
        }
    }
}

/// Verify `signature` over `message` as of `now`.
///
/// On success returns the signer's address in checksum form.
pub fn check_signature_at(
    message: &ChallengeMessage,
    signature: &str,
    expected_address: Option<&str>,
    now: DateTime<Utc>,
) -> Result<String, VerificationFailure> {
    if now < message.not_before.instant() {
        return Err(VerificationFailure::NotYetValid);
    }
    if now > message.expiration_time.instant() {
        return Err(VerificationFailure::Expired);
    }

    let claimed = parse_address(&message.address).ok_or(VerificationFailure::InvalidAddress)?;
    let signature = decode_signature(signature)?;

    // Rebuild the signed text from the structured fields, never from
    // anything the client sent as text.
    message
        .to_siwe()?
        .verify_eip191(&signature)
        .map_err(|e| match e {
            siwe::VerificationError::Signer => VerificationFailure::AddressMismatch,
            _ => VerificationFailure::RecoveryFailed,
        })?;

    let signer = to_checksum(&claimed);
    if let Some(expected) = expected_address.filter(|e| !e.trim().is_empty()) {
        if !same_address(expected, &signer) {
            return Err(VerificationFailure::ExpectedAddressMismatch);
        }
    }

    Ok(signer)
}

/// Decode a hex (`0x` optional) or base64 encoded 65-byte signature.
fn decode_signature(encoded: &str) -> Result<[u8; SIGNATURE_LEN], VerificationFailure> {
    let encoded = encoded.trim();
    if encoded.is_empty() {
        return Err(VerificationFailure::MissingSignature);
    }

    let hex_digits = encoded
        .strip_prefix("0x")
        .or_else(|| encoded.strip_prefix("0X"))
        .unwrap_or(encoded);

    let bytes = if hex_digits.len() == SIGNATURE_LEN * 2 {
        hex::decode(hex_digits).map_err(|_| VerificationFailure::MalformedSignature("hex"))?
    } else {
        general_purpose::STANDARD
            .decode(encoded)
            .map_err(|_| VerificationFailure::MalformedSignature("encoding"))?
    };

    let mut bytes: [u8; SIGNATURE_LEN] = bytes
        .try_into()
        .map_err(|_| VerificationFailure::MalformedSignature("length"))?;

    // Wallets emit 27/28; some libraries emit the raw 0/1 parity
    bytes[64] = match bytes[64] {
        0 | 1 => bytes[64],
        27 | 28 => bytes[64] - 27,
        _ => return Err(VerificationFailure::MalformedSignature("recovery id")),
    };

    Ok(bytes)
}
