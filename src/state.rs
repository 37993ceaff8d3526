use std::sync::Arc;

use anyhow::Context;

use crate::auth::jwt::JwtKeys;
use crate::config::AppConfig;
use crate::db;
use crate::users::repo::{PgUserStore, UserStore};
use crate::users::services as directory;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn UserStore>,
    pub config: Arc<AppConfig>,
    pub keys: JwtKeys,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);
        let pool = db::connect(&config.database_url).await?;
        db::migrate(&pool).await?;

        tokio::task::spawn_blocking(directory::prepare_dummy_hash)
            .await
            .context("prepare dummy password hash")?;

        let store = Arc::new(PgUserStore::new(pool)) as Arc<dyn UserStore>;
        Ok(Self::from_parts(store, config))
    }

    pub fn from_parts(store: Arc<dyn UserStore>, config: Arc<AppConfig>) -> Self {
        let keys = JwtKeys::new(&config.jwt);
        Self {
            store,
            config,
            keys,
        }
    }

    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::config::JwtConfig;
        use crate::users::memory::MemoryUserStore;

        let config = Arc::new(AppConfig {
            database_url: "memory".into(),
            jwt: JwtConfig {
                secret: "test".into(),
                algorithm: jsonwebtoken::Algorithm::HS256,
                ttl_minutes: 5,
            },
            host: "127.0.0.1".into(),
            port: 0,
        });
        let store = Arc::new(MemoryUserStore::default()) as Arc<dyn UserStore>;
        Self::from_parts(store, config)
    }
}
