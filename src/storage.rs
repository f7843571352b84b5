use async_trait::async_trait;
use log::{error, info, warn};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum BlobStoreError {
    #[error("blob write failed: {0}")]
    Write(String),
}

/// Durable home for photo attachments. Only `store` is exposed: the current
/// endpoint set never reads a photo back, it only records the returned id on
/// the complaint.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn store(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<Uuid, BlobStoreError>;
}

// ---------------- S3 / MinIO backend ----------------

pub struct S3BlobStore {
    bucket: String,
    client: aws_sdk_s3::Client,
    prefix: String,
}

impl S3BlobStore {
    pub async fn new() -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let bucket = std::env::var("S3_BUCKET").unwrap_or_else(|_| "cib-photos".into());
        let endpoint = std::env::var("S3_ENDPOINT")
            .map_err(|_| anyhow::anyhow!("S3_ENDPOINT must be set (MinIO / S3 endpoint)"))?;
        let region = std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into());
        let access = std::env::var("S3_ACCESS_KEY").unwrap_or_default();
        let secret = std::env::var("S3_SECRET_KEY").unwrap_or_default();

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(region))
            .endpoint_url(endpoint);
        if !access.is_empty() && !secret.is_empty() {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // Path-style addressing: MinIO and most local endpoints have no
        // wildcard DNS for virtual-hosted buckets.
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("initialized S3/MinIO client (path-style addressing)");

        Self::ensure_bucket(&client, &bucket).await?;

        Ok(Self {
            bucket,
            client,
            prefix: "photos".into(),
        })
    }

    async fn ensure_bucket(client: &aws_sdk_s3::Client, bucket: &str) -> anyhow::Result<()> {
        if client.head_bucket().bucket(bucket).send().await.is_ok() {
            return Ok(());
        }
        warn!("bucket '{bucket}' not found, attempting create");
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match client.create_bucket().bucket(bucket).send().await {
                Ok(_) => {
                    info!("created bucket '{bucket}' (attempt {attempt})");
                    return Ok(());
                }
                Err(e) if attempt >= 3 => {
                    error!("create_bucket failed for '{bucket}' after {attempt} attempts: {e:?}");
                    return Err(anyhow::anyhow!("failed to ensure bucket '{bucket}': {e}"));
                }
                Err(e) => {
                    warn!("create_bucket attempt {attempt} failed for '{bucket}': {e:?}");
                    tokio::time::sleep(std::time::Duration::from_millis(200 * attempt as u64))
                        .await;
                }
            }
        }
    }

    fn key_for(&self, id: &Uuid) -> String {
        format!("{}/{}", self.prefix, id)
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn store(
        &self,
        bytes: &[u8],
        filename: &str,
        content_type: &str,
    ) -> Result<Uuid, BlobStoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let id = Uuid::new_v4();
        let key = self.key_for(&id);
        let put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(ByteStream::from(bytes.to_vec()))
            .content_type(content_type)
            .metadata("filename", filename);
        if let Err(e) = put.send().await {
            error!(
                "put_object failed key={key} bucket={} err={e:?}",
                self.bucket
            );
            let hint = if e.to_string().contains("AccessDenied") {
                " (check S3_ACCESS_KEY/S3_SECRET_KEY permissions)"
            } else {
                ""
            };
            return Err(BlobStoreError::Write(format!("{e}{hint}")));
        }
        Ok(id)
    }
}

// ---------------- Filesystem backend (dev fallback) ----------------

pub struct FsBlobStore {
    dir: PathBuf,
}

impl FsBlobStore {
    pub fn new() -> Self {
        let mut dir = std::env::var("CIB_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("data"));
        dir.push("photos");
        Self { dir }
    }
}

impl Default for FsBlobStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BlobStore for FsBlobStore {
    async fn store(
        &self,
        bytes: &[u8],
        _filename: &str,
        _content_type: &str,
    ) -> Result<Uuid, BlobStoreError> {
        let id = Uuid::new_v4();
        std::fs::create_dir_all(&self.dir).map_err(|e| BlobStoreError::Write(e.to_string()))?;
        let path = self.dir.join(id.to_string());
        std::fs::write(&path, bytes).map_err(|e| {
            error!("failed to write blob '{}': {e}", path.display());
            BlobStoreError::Write(e.to_string())
        })?;
        Ok(id)
    }
}

/// Factory used by main: S3/MinIO when an endpoint is configured, local
/// filesystem otherwise.
pub async fn build_blob_store() -> Arc<dyn BlobStore> {
    if std::env::var("S3_ENDPOINT").is_ok() {
        match S3BlobStore::new().await {
            Ok(store) => Arc::new(store),
            Err(e) => panic!("Failed to initialize S3 blob store: {e}"),
        }
    } else {
        info!("S3_ENDPOINT not set, storing photos on the local filesystem");
        Arc::new(FsBlobStore::new())
    }
}
