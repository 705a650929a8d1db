use crate::domain::ports::{ArtifactStore, StoredArtifact};
use crate::error::AppError;
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Keeps artifacts in process memory; they are served back by the
/// `/passes/{name}` route.
pub struct InMemoryArtifactStore {
    base_url: String,
    objects: RwLock<HashMap<String, StoredArtifact>>,
}

impl InMemoryArtifactStore {
    pub fn new(public_base_url: &str) -> Self {
        Self {
            base_url: public_base_url.trim_end_matches('/').to_string(),
            objects: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn put(&self, name: &str, content_type: &str, data: Vec<u8>) -> Result<String, AppError> {
        self.objects.write().await.insert(
            name.to_string(),
            StoredArtifact { content_type: content_type.to_string(), data },
        );
        Ok(format!("{}/passes/{}", self.base_url, name))
    }

    async fn fetch(&self, name: &str) -> Result<Option<StoredArtifact>, AppError> {
        Ok(self.objects.read().await.get(name).cloned())
    }
}
