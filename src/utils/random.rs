// ABOUTME: Secure random string generation for codes, states, and opaque tokens
// ABOUTME: Uses ring's SystemRandom and URL-safe base64 without padding

use crate::errors::{AppError, AppResult};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ring::rand::{SecureRandom, SystemRandom};

/// Generate a URL-safe random string of exactly `length` characters
///
/// Draws `ceil(length * 3 / 4)` random bytes so the unpadded base64 encoding is at
/// least `length` characters, then truncates.
///
/// # Errors
/// Returns an error if the system RNG fails. This is a critical security failure
/// and callers must not fall back to weaker randomness.
pub fn generate_random_string(length: usize) -> AppResult<String> {
    if length == 0 {
        return Ok(String::new());
    }

    let rng = SystemRandom::new();
    let mut bytes = vec![0u8; (length * 3).div_ceil(4)];

    rng.fill(&mut bytes).map_err(|e| {
        tracing::error!(
            "CRITICAL: SystemRandom failed - cannot generate secure random bytes: {}",
            e
        );
        AppError::internal("System RNG failure - server cannot operate securely")
    })?;

    let mut encoded = URL_SAFE_NO_PAD.encode(&bytes);
    encoded.truncate(length);
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_exact_length() {
        for length in [1, 16, 31, 32, 33, 64] {
            assert_eq!(generate_random_string(length).unwrap().len(), length);
        }
        assert!(generate_random_string(0).unwrap().is_empty());
    }

    #[test]
    fn test_url_safe_alphabet() {
        let value = generate_random_string(256).unwrap();
        assert!(value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_values_are_unique() {
        let values: HashSet<String> = (0..100)
            .map(|_| generate_random_string(32).unwrap())
            .collect();
        assert_eq!(values.len(), 100);
    }
}
