//! Shared-secret request tokens.

use rand::Rng;

/// Token length in bytes (32 hex characters).
const TOKEN_BYTES: usize = 16;

/// Generates a random token as a lowercase hex string.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill(&mut bytes);
    hex::encode(bytes)
}

/// Compares a presented token with the configured one in constant time.
pub fn validate_token(presented: &str, expected: &str) -> bool {
    if presented.len() != expected.len() {
        return false;
    }
    presented
        .bytes()
        .zip(expected.bytes())
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
