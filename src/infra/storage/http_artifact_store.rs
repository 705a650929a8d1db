use crate::config::BlobConfig;
use crate::domain::ports::{ArtifactStore, StoredArtifact};
use crate::error::AppError;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use std::time::Duration;
use tracing::{error, info};

/// Object store reachable over plain HTTP PUT/GET, e.g. a blob container
/// fronted by a gateway that accepts bearer tokens.
pub struct HttpArtifactStore {
    client: Client,
    base_url: String,
    public_url: String,
    token: Option<String>,
    container: String,
}

impl HttpArtifactStore {
    pub fn new(config: &BlobConfig) -> Self {
        let base_url = config.store_url.trim_end_matches('/').to_string();
        let public_url = config
            .public_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .unwrap_or_else(|| base_url.clone());
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            public_url,
            token: config.token.clone(),
            container: config.container.clone(),
        }
    }

    fn object_url(&self, name: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.container, name)
    }

    fn authorize(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }
}

#[async_trait]
impl ArtifactStore for HttpArtifactStore {
    async fn put(&self, name: &str, content_type: &str, data: Vec<u8>) -> Result<String, AppError> {
        let res = self
            .authorize(self.client.put(self.object_url(name)))
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("Artifact upload failed: {}", e)))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            error!("Artifact store rejected upload of {}: {} {}", name, status, text);
            return Err(AppError::Dependency(format!("Artifact store returned {}", status)));
        }

        info!(artifact = name, "Artifact uploaded");
        Ok(format!("{}/{}/{}", self.public_url, self.container, name))
    }

    async fn fetch(&self, name: &str) -> Result<Option<StoredArtifact>, AppError> {
        let res = self
            .authorize(self.client.get(self.object_url(name)))
            .send()
            .await
            .map_err(|e| AppError::Dependency(format!("Artifact download failed: {}", e)))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !res.status().is_success() {
            return Err(AppError::Dependency(format!("Artifact store returned {}", res.status())));
        }

        let content_type = res
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/octet-stream")
            .to_string();
        let data = res
            .bytes()
            .await
            .map_err(|e| AppError::Dependency(format!("Artifact download failed: {}", e)))?
            .to_vec();

        Ok(Some(StoredArtifact { content_type, data }))
    }
}
