use std::fmt;

use sqlx::FromRow;
use time::OffsetDateTime;

/// User record as stored. Deliberately not `Serialize`: callers render
/// [`PublicUser`](super::dto::PublicUser) instead.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String, // Argon2 PHC string
    pub created_at: OffsetDateTime,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password_hash", &"[REDACTED]")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Row to insert; the hash has already been produced by the hasher.
#[derive(Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: Option<String>,
    pub password_hash: String,
}

/// Partial update; `None` leaves the column unchanged.
#[derive(Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password_hash: Option<String>,
}
