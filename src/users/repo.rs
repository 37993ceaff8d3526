use async_trait::async_trait;
use sqlx::PgPool;

use super::repo_types::{NewUser, User, UserChanges};
use crate::error::{AppError, AppResult};

/// Key-indexed durable record store for users.
///
/// Implementations enforce email uniqueness themselves and report a
/// violation as [`AppError::DuplicateEmail`].
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn insert(&self, new: NewUser) -> AppResult<User>;
    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>>;
    /// `Ok(None)` when no row has this id.
    async fn update(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>>;
    /// `Ok(false)` when no row has this id.
    async fn delete(&self, id: i64) -> AppResult<bool>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn map_write_err(e: sqlx::Error) -> AppError {
    if let sqlx::Error::Database(db) = &e {
        if db.is_unique_violation() {
            return AppError::DuplicateEmail;
        }
    }
    AppError::Database(e)
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn insert(&self, new: NewUser) -> AppResult<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, full_name, password_hash)
            VALUES ($1, $2, $3)
            RETURNING id, email, full_name, password_hash, created_at
            "#,
        )
        .bind(&new.email)
        .bind(&new.full_name)
        .bind(&new.password_hash)
        .fetch_one(&self.db)
        .await
        .map_err(map_write_err)?;
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, full_name, password_hash, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
               SET email         = COALESCE($2, email),
                   full_name     = COALESCE($3, full_name),
                   password_hash = COALESCE($4, password_hash)
             WHERE id = $1
            RETURNING id, email, full_name, password_hash, created_at
            "#,
        )
        .bind(id)
        .bind(&changes.email)
        .bind(&changes.full_name)
        .bind(&changes.password_hash)
        .fetch_optional(&self.db)
        .await
        .map_err(map_write_err)?;
        Ok(user)
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        let res = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(res.rows_affected() > 0)
    }
}
