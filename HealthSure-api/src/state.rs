//! Shared application state handed to every handler

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use health_sure_domain::auth::{Authenticator, TokenManager};
use health_sure_domain::cache::{Cache, CacheError};
use health_sure_domain::database::{DatabaseError, DatabasePool};
use health_sure_domain::health::{HealthServiceTrait, SystemHealthService};
use health_sure_domain::notification::{LogMailer, Mailer};
use health_sure_domain::services::{
    HealthRecordService, HealthRecordServiceTrait, UserService, UserServiceConfig, UserServiceTrait,
};
use health_sure_data::repository::{HealthRecordRepository, UserRepository};

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Database initialization failed: {0}")]
    Database(#[from] DatabaseError),

    #[error("Cache initialization failed: {0}")]
    Cache(#[from] CacheError),
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserServiceTrait>,
    pub health_records: Arc<dyn HealthRecordServiceTrait>,
    pub health: Arc<dyn HealthServiceTrait>,
    pub authenticator: Arc<Authenticator>,
    pub environment: String,
}

impl AppState {
    /// Connect the database and cache described by `config` and wire the services
    pub async fn build(config: &AppConfig) -> Result<Self, StartupError> {
        let pool = DatabasePool::connect(&config.database)?;
        info!("Database ready: {}", pool.connection_info());
        let cache = Cache::connect(&config.cache).await?;

        Ok(Self::from_parts(pool, cache, config, Arc::new(LogMailer)))
    }

    /// Wire services over an existing pool, cache and mailer
    pub fn from_parts(
        pool: DatabasePool,
        cache: Cache,
        config: &AppConfig,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let tokens = Arc::new(TokenManager::new(config.tokens.clone()));
        let users = UserRepository::new(pool.clone());

        let user_service = UserService::new(
            users.clone(),
            cache.clone(),
            tokens.clone(),
            mailer,
            UserServiceConfig {
                expose_otp: config.is_development(),
                app_url: config.app_url.clone(),
            },
        );
        let health_records = HealthRecordService::new(
            HealthRecordRepository::new(pool.clone()),
            users.clone(),
            cache.clone(),
        );

        Self {
            users: Arc::new(user_service),
            health_records: Arc::new(health_records),
            health: Arc::new(SystemHealthService::new(pool, cache.clone())),
            authenticator: Arc::new(Authenticator::new(tokens, cache, users)),
            environment: config.environment.clone(),
        }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("health", &self.health)
            .field("authenticator", &self.authenticator)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
