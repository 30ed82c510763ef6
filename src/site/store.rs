use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

use super::schema::SiteConfig;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("config store unavailable: {0}")]
    Unavailable(String),

    #[error("stored config is malformed: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Where site configurations are kept.
///
/// Saves replace the whole record. `load` returns `None` when nothing has
/// been saved yet.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    async fn load(&self) -> Result<Option<SiteConfig>, StoreError>;
    async fn save(&self, config: &SiteConfig) -> Result<(), StoreError>;
}

/// Process-local store. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct InMemoryConfigStore {
    inner: Arc<RwLock<Option<SiteConfig>>>,
}

impl InMemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: SiteConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Some(config))),
        }
    }
}

#[async_trait]
impl ConfigStore for InMemoryConfigStore {
    async fn load(&self) -> Result<Option<SiteConfig>, StoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, config: &SiteConfig) -> Result<(), StoreError> {
        *self.inner.write().await = Some(config.clone());
        Ok(())
    }
}
