//! Resolves the caller from a bearer token and enforces self-only access.

use tracing::{debug, warn};

use super::jwt::JwtKeys;
use crate::{
    error::{AppError, AppResult},
    users::{repo::UserStore, repo_types::User, services as directory},
};

/// Token failures and subjects that no longer resolve all collapse into
/// `Unauthenticated`. Store faults still propagate as themselves.
pub async fn authenticate_request(
    keys: &JwtKeys,
    store: &dyn UserStore,
    token: Option<&str>,
) -> AppResult<User> {
    let token = token.ok_or(AppError::Unauthenticated)?;

    let subject = keys.verify(token).map_err(|e| {
        debug!(code = e.code(), "bearer token rejected");
        AppError::Unauthenticated
    })?;

    match directory::get_by_email(store, &subject).await {
        Ok(user) => Ok(user),
        Err(AppError::NotFound) => {
            warn!(email = %subject, "token subject no longer exists");
            Err(AppError::Unauthenticated)
        }
        Err(e) => Err(e),
    }
}

pub fn authorize_self(current: &User, target_id: i64) -> bool {
    current.id == target_id
}

pub fn ensure_self(current: &User, target_id: i64) -> AppResult<()> {
    if authorize_self(current, target_id) {
        Ok(())
    } else {
        warn!(user_id = current.id, target_id, "access to another user denied");
        Err(AppError::Forbidden)
    }
}
