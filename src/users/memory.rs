use std::collections::BTreeMap;

use async_trait::async_trait;
use time::OffsetDateTime;
use tokio::sync::RwLock;

use super::{
    repo::UserStore,
    repo_types::{NewUser, User, UserChanges},
};
use crate::error::{AppError, AppResult};

/// In-process store with the same uniqueness rules as the `users` table.
#[derive(Default)]
pub struct MemoryUserStore {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: BTreeMap<i64, User>,
}

impl Inner {
    fn email_taken(&self, email: &str, except: Option<i64>) -> bool {
        self.rows
            .values()
            .any(|u| u.email == email && Some(u.id) != except)
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn insert(&self, new: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner.email_taken(&new.email, None) {
            return Err(AppError::DuplicateEmail);
        }
        inner.next_id += 1;
        let user = User {
            id: inner.next_id,
            email: new.email,
            full_name: new.full_name,
            password_hash: new.password_hash,
            created_at: OffsetDateTime::now_utc(),
        };
        inner.rows.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_id(&self, id: i64) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.rows.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.rows.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, id: i64, changes: UserChanges) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if let Some(email) = &changes.email {
            if inner.email_taken(email, Some(id)) {
                return Err(AppError::DuplicateEmail);
            }
        }
        let Some(user) = inner.rows.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(full_name) = changes.full_name {
            user.full_name = Some(full_name);
        }
        if let Some(hash) = changes.password_hash {
            user.password_hash = hash;
        }
        Ok(Some(user.clone()))
    }

    async fn delete(&self, id: i64) -> AppResult<bool> {
        Ok(self.inner.write().await.rows.remove(&id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: email.into(),
            full_name: None,
            password_hash: "hash".into(),
        }
    }

    #[tokio::test]
    async fn assigns_increasing_ids() {
        let store = MemoryUserStore::default();
        let a = store.insert(new_user("a@x.com")).await.unwrap();
        let b = store.insert(new_user("b@x.com")).await.unwrap();
        assert!(b.id > a.id);
    }

    #[tokio::test]
    async fn rejects_duplicate_email_on_insert_and_update() {
        let store = MemoryUserStore::default();
        store.insert(new_user("a@x.com")).await.unwrap();
        let b = store.insert(new_user("b@x.com")).await.unwrap();

        assert!(matches!(
            store.insert(new_user("a@x.com")).await,
            Err(AppError::DuplicateEmail)
        ));

        let changes = UserChanges {
            email: Some("a@x.com".into()),
            ..Default::default()
        };
        assert!(matches!(
            store.update(b.id, changes).await,
            Err(AppError::DuplicateEmail)
        ));
    }

    #[tokio::test]
    async fn missing_rows_report_none_and_false() {
        let store = MemoryUserStore::default();
        assert!(store.find_by_id(42).await.unwrap().is_none());
        assert!(store
            .update(42, UserChanges::default())
            .await
            .unwrap()
            .is_none());
        assert!(!store.delete(42).await.unwrap());
    }
}
