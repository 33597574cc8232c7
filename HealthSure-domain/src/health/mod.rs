//! Domain layer health check functionality
//! This module provides health check services for the application

use std::collections::HashMap;

use async_trait::async_trait;
use tracing::warn;

use health_sure_data::cache::Cache;
use health_sure_data::database::DatabasePool;

/// System health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SystemStatus {
    /// All components are healthy
    Healthy,
    /// Some components are degraded but the system is functional
    Degraded,
    /// System is not functioning properly
    Unhealthy,
}

/// Component health status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Represents a health component with status and optional details
#[derive(Debug, Clone)]
pub struct HealthComponent {
    pub status: ComponentStatus,
    pub details: Option<String>,
}

/// Represents the overall health of the system
#[derive(Debug, Clone)]
pub struct SystemHealth {
    pub status: SystemStatus,
    /// Map of component names to their health status
    pub components: HashMap<String, HealthComponent>,
}

/// Trait for health services
#[async_trait]
pub trait HealthServiceTrait: Send + Sync + std::fmt::Debug {
    /// Get the overall system health
    async fn get_system_health(&self) -> SystemHealth;

    /// Check the status of the database
    /// Returns an error describing the failure if the database does not answer
    async fn check_database_status(&self) -> Result<String, String>;

    /// Check the status of the key/value cache
    async fn check_cache_status(&self) -> Result<String, String>;
}

/// Health checks against the live pool and cache
#[derive(Debug, Clone)]
pub struct SystemHealthService {
    pool: DatabasePool,
    cache: Cache,
}

impl SystemHealthService {
    pub fn new(pool: DatabasePool, cache: Cache) -> Self {
        Self { pool, cache }
    }
}

#[async_trait]
impl HealthServiceTrait for SystemHealthService {
    async fn get_system_health(&self) -> SystemHealth {
        let database = match self.check_database_status().await {
            Ok(info) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(info),
            },
            Err(e) => HealthComponent {
                status: ComponentStatus::Unhealthy,
                details: Some(e),
            },
        };

        // The API keeps serving without a cache, only slower and without revocation checks.
        let cache = match self.check_cache_status().await {
            Ok(info) => HealthComponent {
                status: ComponentStatus::Healthy,
                details: Some(info),
            },
            Err(e) => HealthComponent {
                status: ComponentStatus::Degraded,
                details: Some(e),
            },
        };

        let status = overall_status(&database, &cache);

        SystemHealth {
            status,
            components: vec![("database".to_string(), database), ("cache".to_string(), cache)]
                .into_iter()
                .collect(),
        }
    }

    async fn check_database_status(&self) -> Result<String, String> {
        match self.pool.ping().await {
            Ok(()) => Ok(self.pool.connection_info()),
            Err(e) => {
                warn!("Database health check failed: {}", e);
                Err(format!("Database connection error: {}", e))
            }
        }
    }

    async fn check_cache_status(&self) -> Result<String, String> {
        match self.cache.ping().await {
            Ok(()) => Ok(format!("{} cache reachable", self.cache.backend_name())),
            Err(e) => {
                warn!("Cache health check failed: {}", e);
                Err(format!("Cache connection error: {}", e))
            }
        }
    }
}

fn overall_status(database: &HealthComponent, cache: &HealthComponent) -> SystemStatus {
    if database.status == ComponentStatus::Unhealthy {
        SystemStatus::Unhealthy
    } else if database.status == ComponentStatus::Degraded || cache.status != ComponentStatus::Healthy {
        SystemStatus::Degraded
    } else {
        SystemStatus::Healthy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: ComponentStatus) -> HealthComponent {
        HealthComponent { status, details: None }
    }

    #[tokio::test]
    async fn test_get_system_health_in_memory() {
        let service = SystemHealthService::new(DatabasePool::in_memory().unwrap(), Cache::in_memory());
        let health = service.get_system_health().await;

        assert_eq!(health.status, SystemStatus::Healthy);
        assert!(health.components.contains_key("database"));
        assert!(health.components.contains_key("cache"));
        assert_eq!(health.components["cache"].details.as_deref(), Some("memory cache reachable"));
    }

    #[test]
    fn test_overall_status_rules() {
        use ComponentStatus::*;
        assert_eq!(overall_status(&component(Healthy), &component(Healthy)), SystemStatus::Healthy);
        assert_eq!(overall_status(&component(Healthy), &component(Degraded)), SystemStatus::Degraded);
        assert_eq!(overall_status(&component(Unhealthy), &component(Healthy)), SystemStatus::Unhealthy);
        assert_eq!(overall_status(&component(Unhealthy), &component(Degraded)), SystemStatus::Unhealthy);
    }
}
