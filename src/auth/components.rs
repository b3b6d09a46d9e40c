//! Access-control components for dependency injection
//!
//! The original dashboard reached these services through module-level
//! singletons; here they are constructed explicitly once at process start
//! and handed to whatever needs them. Teardown is simply dropping every
//! clone — tests that want a clean slate between cases call
//! `cache.clear()` instead of rebuilding the bundle.

use std::sync::Arc;
use std::time::Duration;

use crate::auth::evaluator::PermissionEvaluator;
use crate::cache::{CacheConfig, CacheStats, ObjectCache};
use crate::config::AccessConfig;
use crate::services::directory::{DirectoryClient, InMemoryDirectory};

/// Bundle of the authorization core's components
///
/// Cloning shares the underlying cache and directory, so a clone per
/// consumer is the intended usage.
#[derive(Clone)]
pub struct AccessComponents {
    /// External user/persona directory
    pub directory: Arc<dyn DirectoryClient>,
    /// Shared object cache
    pub cache: ObjectCache,
    /// Permission decision point
    pub evaluator: PermissionEvaluator,
}

impl AccessComponents {
    /// Wire the components from configuration and a directory client
    pub fn new(config: &AccessConfig, directory: Arc<dyn DirectoryClient>) -> Self {
        let cache = ObjectCache::new(CacheConfig {
            default_ttl: Duration::from_secs(config.cache.default_ttl_seconds),
            sweep_interval: Duration::from_secs(config.cache.sweep_interval_seconds),
        });

        let evaluator = PermissionEvaluator::new(
            directory.clone(),
            cache.clone(),
            Duration::from_secs(config.permissions.ttl_seconds),
        );

        Self {
            directory,
            cache,
            evaluator,
        }
    }

    /// Wire the components against an in-memory directory
    ///
    /// Returns the concrete directory alongside the bundle so tests and
    /// demo setups can seed and mutate its records.
    pub fn new_in_memory(config: &AccessConfig) -> (Self, Arc<InMemoryDirectory>) {
        let directory = Arc::new(InMemoryDirectory::new());
        (Self::new(config, directory.clone()), directory)
    }

    /// Snapshot cache statistics for monitoring
    pub async fn cache_stats(&self) -> CacheStats {
        self.cache.stats().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::permissions::{Conditions, PermissionLevel};
    use crate::services::directory::RawPermission;

    #[tokio::test]
    async fn test_in_memory_wiring() {
        let (components, directory) = AccessComponents::new_in_memory(&AccessConfig::default());

        directory.put_user("u1", "buyer", "employee").await;
        directory
            .put_persona(
                "buyer",
                vec![RawPermission::Shorthand("inventory".to_string())],
            )
            .await;

        assert!(
            components
                .evaluator
                .has_permission("u1", "inventory", PermissionLevel::Read, &Conditions::new())
                .await
        );

        // The evaluator populated the shared cache
        let stats = components.cache_stats().await;
        assert_eq!(stats.size, 1);
    }

    #[tokio::test]
    async fn test_clones_share_cache() {
        let (components, directory) = AccessComponents::new_in_memory(&AccessConfig::default());
        directory.put_user("u1", "p", "admin").await;
        directory.put_persona("p", vec![]).await;

        let clone = components.clone();
        let _ = clone.evaluator.get_user_permissions("u1").await;

        assert_eq!(components.cache_stats().await.size, 1);
    }
}
