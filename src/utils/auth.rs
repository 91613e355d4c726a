// ABOUTME: Generic authentication utilities for bearer token extraction
// ABOUTME: Shared by the bearer gate and the authorization endpoint

/// Reasons a presented Authorization header cannot yield a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BearerError {
    /// Header absent or empty
    Missing,
    /// Header present but not `Bearer <token>`
    Malformed,
}

/// Extract bearer token from an optional Authorization header value
///
/// # Errors
///
/// Returns [`BearerError::Missing`] when no header was sent and
/// [`BearerError::Malformed`] when it lacks the `Bearer ` scheme or carries no token.
pub fn extract_bearer_token(auth_header: Option<&str>) -> Result<&str, BearerError> {
    let header = match auth_header {
        Some(value) if !value.trim().is_empty() => value,
        _ => return Err(BearerError::Missing),
    };

    let token = header
        .strip_prefix("Bearer ")
        .ok_or(BearerError::Malformed)?
        .trim();

    if token.is_empty() {
        return Err(BearerError::Malformed);
    }

    Ok(token)
}
