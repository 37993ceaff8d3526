use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, warn};

use super::{
    dto::{UserCreate, UserUpdate},
    repo::UserStore,
    repo_types::{NewUser, User, UserChanges},
};
use crate::{
    auth::password::{hash_password, hash_password_blocking, verify_password_blocking},
    error::{AppError, AppResult},
};

const DUMMY_PASSWORD: &str = "userdemo-timing-equalizer";

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    // Verified against when the email is unknown so both login failures cost the same.
    static ref DUMMY_HASH: Option<String> = hash_password(DUMMY_PASSWORD).ok();
}

/// Computes the unknown-email hash ahead of the first login. Blocking; run it
/// off the async workers.
pub fn prepare_dummy_hash() {
    lazy_static::initialize(&DUMMY_HASH);
}

/// Emails are matched case-insensitively: stored and looked up trimmed and lower-cased.
pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn valid_email(raw: &str) -> AppResult<String> {
    let email = normalize_email(raw);
    if !EMAIL_RE.is_match(&email) {
        return Err(AppError::invalid_input("Invalid email"));
    }
    Ok(email)
}

pub async fn create(store: &dyn UserStore, payload: UserCreate) -> AppResult<User> {
    let email = valid_email(&payload.email)?;

    if store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "email already registered");
        return Err(AppError::DuplicateEmail);
    }

    let password_hash = hash_password_blocking(payload.password).await?;
    // The store re-checks uniqueness; a concurrent insert surfaces as DuplicateEmail.
    let user = store
        .insert(NewUser {
            email,
            full_name: payload.full_name,
            password_hash,
        })
        .await?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok(user)
}

pub async fn authenticate(store: &dyn UserStore, email: &str, password: &str) -> AppResult<User> {
    let email = normalize_email(email);

    let Some(user) = store.find_by_email(&email).await? else {
        if let Some(dummy) = DUMMY_HASH.as_ref() {
            verify_password_blocking(password.to_owned(), dummy.clone()).await?;
        }
        warn!(email = %email, "login failed");
        return Err(AppError::InvalidCredentials);
    };

    if !verify_password_blocking(password.to_owned(), user.password_hash.clone()).await? {
        warn!(email = %email, "login failed");
        return Err(AppError::InvalidCredentials);
    }

    info!(user_id = user.id, "user logged in");
    Ok(user)
}

pub async fn get(store: &dyn UserStore, id: i64) -> AppResult<User> {
    store.find_by_id(id).await?.ok_or(AppError::NotFound)
}

pub async fn get_by_email(store: &dyn UserStore, email: &str) -> AppResult<User> {
    store
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or(AppError::NotFound)
}

pub async fn update(store: &dyn UserStore, id: i64, payload: UserUpdate) -> AppResult<User> {
    let current = get(store, id).await?;

    let email = match payload.email {
        Some(raw) => {
            let email = valid_email(&raw)?;
            if email != current.email {
                if let Some(other) = store.find_by_email(&email).await? {
                    if other.id != id {
                        warn!(user_id = id, email = %email, "email already registered");
                        return Err(AppError::DuplicateEmail);
                    }
                }
            }
            Some(email)
        }
        None => None,
    };

    let password_hash = match payload.password {
        Some(plain) => Some(hash_password_blocking(plain).await?),
        None => None,
    };

    let changes = UserChanges {
        email,
        full_name: payload.full_name,
        password_hash,
    };
    let user = store.update(id, changes).await?.ok_or(AppError::NotFound)?;

    debug!(user_id = id, "user updated");
    Ok(user)
}

pub async fn delete(store: &dyn UserStore, id: i64) -> AppResult<()> {
    if !store.delete(id).await? {
        return Err(AppError::NotFound);
    }
    info!(user_id = id, "user deleted");
    Ok(())
}
