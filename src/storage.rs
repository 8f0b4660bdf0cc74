use async_trait::async_trait;
use aws_sdk_s3 as s3;
use s3::presigning::PresigningConfig;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Presigned upload URLs expire after ten minutes.
pub const UPLOAD_URL_TTL: Duration = Duration::from_secs(600);

/// StorageService
///
/// Object storage for module media (figures, clips, handouts). Handlers only ever mint
/// upload URLs; the bytes go straight from the browser to the bucket.
#[async_trait]
pub trait StorageService: Send + Sync {
    /// Creates the bucket if missing. Only called at startup in `Env::Local`.
    async fn ensure_bucket_exists(&self);

    /// A signed PUT URL for `key`, constrained to `content_type`.
    async fn presigned_upload_url(&self, key: &str, content_type: &str)
    -> Result<String, String>;
}

/// S3StorageClient
///
/// aws-sdk-s3 client with path-style addressing, which MinIO and most S3-compatible
/// gateways require.
#[derive(Clone)]
pub struct S3StorageClient {
    client: s3::Client,
    bucket_name: String,
}

impl S3StorageClient {
    pub async fn new(
        endpoint: &str,
        region: &str,
        access_key: &str,
        secret_key: &str,
        bucket: &str,
    ) -> Self {
        let credentials =
            s3::config::Credentials::new(access_key, secret_key, None, None, "static");

        let config = s3::Config::builder()
            .credentials_provider(credentials)
            .endpoint_url(endpoint)
            .region(s3::config::Region::new(region.to_string()))
            .behavior_version_latest()
            .force_path_style(true)
            .build();

        Self {
            client: s3::Client::from_conf(config),
            bucket_name: bucket.to_string(),
        }
    }
}

#[async_trait]
impl StorageService for S3StorageClient {
    async fn ensure_bucket_exists(&self) {
        if let Err(e) = self
            .client
            .create_bucket()
            .bucket(&self.bucket_name)
            .send()
            .await
        {
            // Already-exists responses land here too.
            tracing::debug!("create_bucket for {}: {:?}", self.bucket_name, e);
        }
    }

    async fn presigned_upload_url(
        &self,
        key: &str,
        content_type: &str,
    ) -> Result<String, String> {
        let presigning = PresigningConfig::expires_in(UPLOAD_URL_TTL).map_err(|e| e.to_string())?;

        let presigned_req = self
            .client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .presigned(presigning)
            .await
            .map_err(|e| e.to_string())?;

        Ok(presigned_req.uri().to_string())
    }
}

/// is_allowed_media_type
///
/// Module media is limited to images, MP4 video and PDF handouts.
pub fn is_allowed_media_type(content_type: &str) -> bool {
    let content_type = content_type.trim().to_ascii_lowercase();
    match content_type.split_once('/') {
        Some(("image", subtype)) => !subtype.is_empty() && subtype != "svg+xml",
        _ => matches!(content_type.as_str(), "video/mp4" | "application/pdf"),
    }
}

/// media_key
///
/// Builds `modules/{module_id}/{uuid}.{ext}`. Only the extension of the client filename
/// survives, reduced to lowercase alphanumerics.
pub fn media_key(module_id: Uuid, filename: &str) -> String {
    let extension: String = std::path::Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .take(10)
        .collect::<String>()
        .to_ascii_lowercase();
    let extension = if extension.is_empty() {
        "bin".to_string()
    } else {
        extension
    };
    format!("modules/{}/{}.{}", module_id, Uuid::new_v4(), extension)
}

/// Strips `..`, `.` and empty segments so a key can never escape its prefix.
fn sanitize_key(key: &str) -> String {
    key.split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".." && *segment != ".")
        .collect::<Vec<_>>()
        .join("/")
}

/// MockStorageService
///
/// In-memory stand-in for tests; returns deterministic URLs.
#[derive(Clone, Default)]
pub struct MockStorageService {
    /// When true, every operation fails.
    pub should_fail: bool,
}

impl MockStorageService {
    pub fn new() -> Self {
        Self { should_fail: false }
    }

    pub fn new_failing() -> Self {
        Self { should_fail: true }
    }
}

#[async_trait]
impl StorageService for MockStorageService {
    async fn ensure_bucket_exists(&self) {}

    async fn presigned_upload_url(
        &self,
        key: &str,
        _content_type: &str,
    ) -> Result<String, String> {
        if self.should_fail {
            return Err("Mock Storage Error: Simulation requested".to_string());
        }

        Ok(format!(
            "http://localhost:9000/mock-bucket/{}?signature=fake",
            sanitize_key(key)
        ))
    }
}

pub type StorageState = Arc<dyn StorageService>;
