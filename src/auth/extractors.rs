use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::gate;
use crate::{error::AppError, state::AppState, users::repo_types::User};

/// The authenticated caller, resolved through the access gate.
pub struct CurrentUser(pub User);

/// Pulls `<token>` out of `Authorization: Bearer <token>`; scheme is case-insensitive.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts);
        let user = gate::authenticate_request(&state.keys, state.store.as_ref(), token).await?;
        Ok(CurrentUser(user))
    }
}
