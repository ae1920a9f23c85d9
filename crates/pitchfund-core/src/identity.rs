use uuid::Uuid;

use crate::error::SettlementResult;

/// Resolves a bearer credential to the subject it was issued for.
pub trait IdentityVerifier: Send + Sync {
    fn verify(&self, token: &str) -> SettlementResult<Uuid>;
}

/// Extract the token from an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header_value: &str) -> Option<&str> {
    let (scheme, token) = header_value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
