use std::sync::Arc;

use axum::extract::FromRef;
use tracing::warn;

use crate::auth::{
    jwt::JwtKeys,
    repo::{MemoryUserStore, PgUserStore, UserStore},
};
use crate::config::AppConfig;
use crate::db;
use crate::jobs::repo::{JobStore, MemoryJobStore, PgJobStore};

#[derive(Clone)]
pub struct AppState {
    pub keys: JwtKeys,
    pub users: Arc<dyn UserStore>,
    pub jobs: Arc<dyn JobStore>,
}

impl AppState {
    pub async fn init(config: AppConfig) -> anyhow::Result<Self> {
        let Some(url) = config.database_url.clone() else {
            warn!("DATABASE_URL not set; using in-memory stores, data is lost on exit");
            return Ok(Self::in_memory(config));
        };

        let pool = db::connect(&url).await?;
        db::migrate(&pool).await?;

        Ok(Self::from_parts(
            &config,
            Arc::new(PgUserStore::new(pool.clone())) as Arc<dyn UserStore>,
            Arc::new(PgJobStore::new(pool)) as Arc<dyn JobStore>,
        ))
    }

    pub fn from_parts(
        config: &AppConfig,
        users: Arc<dyn UserStore>,
        jobs: Arc<dyn JobStore>,
    ) -> Self {
        Self {
            keys: JwtKeys::from_config(&config.jwt),
            users,
            jobs,
        }
    }

    pub fn in_memory(config: AppConfig) -> Self {
        Self::from_parts(
            &config,
            Arc::new(MemoryUserStore::new()),
            Arc::new(MemoryJobStore::new()),
        )
    }
}

impl FromRef<AppState> for JwtKeys {
    fn from_ref(state: &AppState) -> Self {
        state.keys.clone()
    }
}
