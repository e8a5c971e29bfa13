use {
    axum::http::{HeaderMap, header::AUTHORIZATION},
    subtle::ConstantTimeEq,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Authentic,
    Rejected,
}

/// Compare a presented token against the configured secret in constant time.
/// An empty secret rejects everything.
pub fn verify_shared_secret(presented: Option<&str>, secret: &str) -> Verdict {
    match presented {
        Some(token)
            if !secret.is_empty() && bool::from(token.as_bytes().ct_eq(secret.as_bytes())) =>
        {
            Verdict::Authentic
        }
        _ => Verdict::Rejected,
    }
}

/// Value of a custom token header, falling back to `Authorization: Bearer`.
/// Returned as sent; the comparison sees every byte.
pub fn header_or_bearer<'h>(headers: &'h HeaderMap, header: &str) -> Option<&'h str> {
    headers
        .get(header)
        .and_then(|v| v.to_str().ok())
        .filter(|t| !t.is_empty())
        .or_else(|| {
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.strip_prefix("Bearer "))
                .filter(|t| !t.is_empty())
        })
}
