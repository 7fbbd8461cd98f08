use async_trait::async_trait;
use chrono::{DateTime, Utc};
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::S3Config;

pub const DEFAULT_CACHE_CONTROL: &str = "public, max-age=31536000";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("not_found")]
    NotFound,
    #[error("other: {0}")]
    Other(String),
}

/// HTTP-facing metadata stored alongside an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HttpMetadata {
    pub content_type: Option<String>,
    pub cache_control: Option<String>,
}

/// Everything known about a stored object except its bytes.
#[derive(Debug, Clone, Default)]
pub struct ObjectHead {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
    pub http: HttpMetadata,
    /// Free-form user metadata (original name, upload time, category, uploader).
    pub custom: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub etag: Option<String>,
    pub uploaded: Option<DateTime<Utc>>,
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    pub objects: Vec<ObjectSummary>,
    pub truncated: bool,
    /// Opaque continuation token, handed back verbatim on the next call.
    pub cursor: Option<String>,
    pub delimited_prefixes: Vec<String>,
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>, http: HttpMetadata, custom: BTreeMap<String, String>) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<(ObjectHead, Vec<u8>), StoreError>;
    async fn head(&self, key: &str) -> Result<ObjectHead, StoreError>;
    async fn list(&self, prefix: &str, limit: usize, cursor: Option<&str>) -> Result<ObjectListing, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

// ---------------- S3 Implementation (MinIO / R2 compatible) ----------------
pub struct S3ObjectStore {
    bucket: String,
    client: aws_sdk_s3::Client,
}

// S3 user metadata must be ASCII; values are percent-encoded on the way in.
fn encode_custom(custom: BTreeMap<String, String>) -> impl Iterator<Item = (String, String)> {
    custom.into_iter().map(|(k, v)| (k, urlencoding::encode(&v).into_owned()))
}

fn decode_custom(raw: Option<&std::collections::HashMap<String, String>>) -> BTreeMap<String, String> {
    raw.into_iter()
        .flatten()
        .map(|(k, v)| {
            let decoded = urlencoding::decode(v).map(|c| c.into_owned()).unwrap_or_else(|_| v.clone());
            (k.clone(), decoded)
        })
        .collect()
}

fn to_chrono(dt: &aws_sdk_s3::primitives::DateTime) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(dt.secs(), dt.subsec_nanos())
}

impl S3ObjectStore {
    pub async fn new(cfg: &S3Config) -> anyhow::Result<Self> {
        use aws_credential_types::provider::SharedCredentialsProvider;
        use aws_credential_types::Credentials;

        let endpoint = cfg
            .endpoint
            .clone()
            .ok_or_else(|| anyhow::anyhow!("S3_ENDPOINT must be set (S3 / MinIO / R2 endpoint)"))?;

        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new(cfg.region.clone()));
        loader = loader.endpoint_url(endpoint);
        if let (Some(access), Some(secret)) = (cfg.access_key.clone(), cfg.secret_key.clone()) {
            let creds = Credentials::new(access, secret, None, None, "static");
            loader = loader.credentials_provider(SharedCredentialsProvider::new(creds));
        }
        let conf = loader.load().await;
        // Force path-style addressing (required for most MinIO/local endpoints without wildcard DNS)
        let s3_conf = aws_sdk_s3::config::Builder::from(&conf)
            .force_path_style(true)
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_conf);
        info!("Initialized S3 client for bucket '{}' (path-style addressing)", cfg.bucket);

        if let Err(e) = client.head_bucket().bucket(&cfg.bucket).send().await {
            warn!("head_bucket failed for '{}' (will attempt create): {e:?}", cfg.bucket);
            client
                .create_bucket()
                .bucket(&cfg.bucket)
                .send()
                .await
                .map_err(|e| anyhow::anyhow!("failed to ensure bucket '{}': {e}", cfg.bucket))?;
            info!("created bucket '{}'", cfg.bucket);
        }

        Ok(Self { bucket: cfg.bucket.clone(), client })
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(&self, key: &str, bytes: Vec<u8>, http: HttpMetadata, custom: BTreeMap<String, String>) -> Result<(), StoreError> {
        use aws_sdk_s3::primitives::ByteStream;
        let mut put = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from(bytes))
            .set_content_type(http.content_type)
            .set_cache_control(http.cache_control);
        for (k, v) in encode_custom(custom) {
            put = put.metadata(k, v);
        }
        if let Err(e) = put.send().await {
            error!("put_object failed key={key} bucket={} err={:?}", self.bucket, e);
            let hint = if e.to_string().contains("NoSuchBucket") {
                " (bucket missing or not yet propagated)"
            } else if e.to_string().contains("AccessDenied") {
                " (check S3_ACCESS_KEY/S3_SECRET_KEY permissions)"
            } else {
                ""
            };
            return Err(StoreError::Other(format!("{e}{hint}")));
        }
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<(ObjectHead, Vec<u8>), StoreError> {
        let obj = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_no_such_key() => StoreError::NotFound,
                _ => StoreError::Other(e.to_string()),
            })?;
        let head = ObjectHead {
            key: key.to_string(),
            size: obj.content_length().unwrap_or_default().max(0) as u64,
            etag: obj.e_tag().map(str::to_string),
            http: HttpMetadata {
                content_type: obj.content_type().map(str::to_string),
                cache_control: obj.cache_control().map(str::to_string),
            },
            custom: decode_custom(obj.metadata()),
        };
        let data = obj
            .body
            .collect()
            .await
            .map_err(|e| StoreError::Other(e.to_string()))?;
        Ok((head, data.into_bytes().to_vec()))
    }

    async fn head(&self, key: &str) -> Result<ObjectHead, StoreError> {
        let obj = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(se) if se.is_not_found() => StoreError::NotFound,
                _ => StoreError::Other(e.to_string()),
            })?;
        Ok(ObjectHead {
            key: key.to_string(),
            size: obj.content_length().unwrap_or_default().max(0) as u64,
            etag: obj.e_tag().map(str::to_string),
            http: HttpMetadata {
                content_type: obj.content_type().map(str::to_string),
                cache_control: obj.cache_control().map(str::to_string),
            },
            custom: decode_custom(obj.metadata()),
        })
    }

    async fn list(&self, prefix: &str, limit: usize, cursor: Option<&str>) -> Result<ObjectListing, StoreError> {
        let out = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(limit.min(i32::MAX as usize) as i32)
            .set_continuation_token(cursor.map(str::to_string))
            .send()
            .await
            .map_err(|e| {
                error!("list_objects_v2 failed prefix={prefix} bucket={} err={:?}", self.bucket, e);
                StoreError::Other(e.to_string())
            })?;
        let objects = out
            .contents()
            .iter()
            .filter_map(|o| {
                Some(ObjectSummary {
                    key: o.key()?.to_string(),
                    size: o.size().unwrap_or_default().max(0) as u64,
                    etag: o.e_tag().map(str::to_string),
                    uploaded: o.last_modified().and_then(to_chrono),
                    storage_class: o.storage_class().map(|c| c.as_str().to_string()),
                })
            })
            .collect();
        Ok(ObjectListing {
            objects,
            truncated: out.is_truncated().unwrap_or(false),
            cursor: out.next_continuation_token().map(str::to_string),
            delimited_prefixes: out
                .common_prefixes()
                .iter()
                .filter_map(|p| p.prefix().map(str::to_string))
                .collect(),
        })
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                error!("delete_object failed key={key} bucket={} err={:?}", self.bucket, e);
                StoreError::Other(e.to_string())
            })?;
        Ok(())
    }
}

// Factory helper used in main
pub async fn build_object_store(cfg: &S3Config) -> anyhow::Result<Arc<dyn ObjectStore>> {
    let store = S3ObjectStore::new(cfg).await?;
    Ok(Arc::new(store))
}
