use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PhotoError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("API returned error: {0}")]
    ApiError(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

/// Turns a stored photo object key into a time-limited download URL
#[async_trait]
pub trait PhotoResolver: Send + Sync {
    async fn get_download_url(&self, object_key: &str, expiry: Duration) -> Result<String, PhotoError>;
}

/// Appwrite storage resolver.
///
/// Creates a file token that expires after `expiry` and returns the file's
/// view URL carrying that token.
pub struct AppwritePhotoResolver {
    base_url: String,
    api_key: String,
    project_id: String,
    bucket_id: String,
    client: Client,
}

impl AppwritePhotoResolver {
    pub fn new(
        base_url: String,
        api_key: String,
        project_id: String,
        bucket_id: String,
        timeout: Duration,
    ) -> Result<Self, PhotoError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            project_id,
            bucket_id,
            client,
        })
    }
}

#[async_trait]
impl PhotoResolver for AppwritePhotoResolver {
    async fn get_download_url(&self, object_key: &str, expiry: Duration) -> Result<String, PhotoError> {
        let file_id = urlencoding::encode(object_key);
        let url = format!("{}/tokens/buckets/{}/files/{}", self.base_url, self.bucket_id, file_id);

        let expire = chrono::Duration::from_std(expiry)
            .ok()
            .and_then(|d| Utc::now().checked_add_signed(d))
            .ok_or_else(|| PhotoError::ApiError(format!("expiry out of range: {:?}", expiry)))?;

        tracing::debug!("Creating file token for {}", object_key);

        let response = self
            .client
            .post(&url)
            .header("X-Appwrite-Key", &self.api_key)
            .header("X-Appwrite-Project", &self.project_id)
            .json(&serde_json::json!({ "expire": expire.to_rfc3339() }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(PhotoError::ApiError(format!(
                "Failed to create file token: {}",
                response.status()
            )));
        }

        let json: Value = response.json().await?;
        let secret = json
            .get("secret")
            .and_then(|s| s.as_str())
            .ok_or_else(|| PhotoError::InvalidResponse("Missing token secret".into()))?;

        Ok(format!(
            "{}/storage/buckets/{}/files/{}/view?project={}&token={}",
            self.base_url,
            self.bucket_id,
            file_id,
            urlencoding::encode(&self.project_id),
            urlencoding::encode(secret)
        ))
    }
}

/// In-process cache in front of another resolver.
///
/// Entries live for `ttl`, which must stay below the URL expiry handed to
/// the inner resolver so a cached URL is never already expired.
pub struct CachedPhotoResolver {
    inner: Arc<dyn PhotoResolver>,
    cache: moka::future::Cache<String, String>,
}

impl CachedPhotoResolver {
    pub fn new(inner: Arc<dyn PhotoResolver>, capacity: u64, ttl: Duration) -> Self {
        let cache = moka::future::CacheBuilder::new(capacity).time_to_live(ttl).build();
        Self { inner, cache }
    }

    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

#[async_trait]
impl PhotoResolver for CachedPhotoResolver {
    async fn get_download_url(&self, object_key: &str, expiry: Duration) -> Result<String, PhotoError> {
        if let Some(url) = self.cache.get(object_key).await {
            tracing::trace!("Photo URL cache hit: {}", object_key);
            return Ok(url);
        }

        let url = self.inner.get_download_url(object_key, expiry).await?;
        self.cache.insert(object_key.to_string(), url.clone()).await;
        Ok(url)
    }
}

/// Formats `{base_url}/{object_key}`; for development and tests
#[derive(Debug, Clone)]
pub struct StaticPhotoResolver {
    base_url: String,
}

impl StaticPhotoResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl PhotoResolver for StaticPhotoResolver {
    async fn get_download_url(&self, object_key: &str, _expiry: Duration) -> Result<String, PhotoError> {
        Ok(format!("{}/{}", self.base_url, object_key))
    }
}
