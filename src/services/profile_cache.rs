use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::db::StoreError;
use crate::models::profile::Profile;

/// Where the matchable profiles come from.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn load_profiles(&self) -> Result<Vec<Profile>, StoreError>;
}

struct CachedProfiles {
    profiles: Arc<Vec<Profile>>,
    loaded_at: Instant,
}

/// Time-limited snapshot of the profiles every scan is matched against.
pub struct ProfileCache {
    source: Arc<dyn ProfileSource>,
    ttl: Duration,
    cached: RwLock<Option<CachedProfiles>>,
}

impl ProfileCache {
    pub fn new(source: Arc<dyn ProfileSource>, ttl: Duration) -> Self {
        Self {
            source,
            ttl,
            cached: RwLock::new(None),
        }
    }

    /// Current profiles, reloading from the source when the snapshot expired.
    pub async fn snapshot(&self) -> Result<Arc<Vec<Profile>>, StoreError> {
        if let Some(profiles) = self.fresh(&*self.cached.read().await) {
            return Ok(profiles);
        }

        let mut cached = self.cached.write().await;
        // Another request may have refreshed while we waited for the lock.
        if let Some(profiles) = self.fresh(&cached) {
            return Ok(profiles);
        }

        let profiles = Arc::new(self.source.load_profiles().await?);
        tracing::info!(profiles = profiles.len(), "Profile cache refreshed");
        *cached = Some(CachedProfiles {
            profiles: Arc::clone(&profiles),
            loaded_at: Instant::now(),
        });
        Ok(profiles)
    }

    /// Drop the snapshot so the next scan reloads.
    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }

    fn fresh(&self, cached: &Option<CachedProfiles>) -> Option<Arc<Vec<Profile>>> {
        cached
            .as_ref()
            .filter(|c| c.loaded_at.elapsed() < self.ttl)
            .map(|c| Arc::clone(&c.profiles))
    }
}
