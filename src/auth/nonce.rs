//! Challenge nonce generation.

/// Generate a cryptographically random challenge nonce.
///
/// EIP-4361 restricts nonces to at least 8 alphanumeric characters;
/// `siwe` draws 17 of them from the OS RNG, roughly 101 bits.
pub fn generate_challenge_nonce() -> String {
    siwe::generate_nonce()
}

/// Whether `nonce` is acceptable in a challenge message.
pub fn is_valid_nonce(nonce: &str) -> bool {
    nonce.len() >= 8 && nonce.chars().all(|c| c.is_ascii_alphanumeric())
}
