use serde::{Deserialize, Serialize};

use super::repo_types::User;

/// Request body for user registration.
#[derive(Deserialize)]
pub struct UserCreate {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub password: String,
}

/// Request body for `PUT /{user_id}`. Absent fields are left alone.
#[derive(Default, Deserialize)]
pub struct UserUpdate {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: i64,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        }
    }
}
