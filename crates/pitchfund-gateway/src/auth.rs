use axum::{
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
};
use pitchfund_core::{Profile, Role, SettlementError, identity::bearer_token};
use uuid::Uuid;

use crate::app::{AppState, settlement_error};

/// Authenticated user behind the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct Caller {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for Caller {
    type Rejection = (StatusCode, String);

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    "missing or malformed bearer token".to_string(),
                )
            })?;

        let user_id = state.verifier.verify(token).map_err(settlement_error)?;
        Ok(Self { user_id })
    }
}

impl Caller {
    /// Load the caller's profile and require it to carry `role`.
    pub async fn require_role(
        &self,
        state: &AppState,
        role: Role,
    ) -> Result<Profile, (StatusCode, String)> {
        let profile = state
            .engine
            .ledger()
            .repository()
            .profile(self.user_id)
            .await
            .map_err(|err| settlement_error(err.into()))?
            .ok_or_else(|| settlement_error(SettlementError::NotFound("profile")))?;

        if profile.role != role {
            return Err((
                StatusCode::FORBIDDEN,
                format!("only {} accounts can do this", role.as_str()),
            ));
        }
        Ok(profile)
    }
}
