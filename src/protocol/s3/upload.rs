//! Single-object uploads of local files

use super::client::{ClientFactory, ClientResolver};
use super::config::require_bucket_name;
use super::error::{S3Error, S3Result};
use super::metadata::{FileDescriptor, MetadataBuilder, ObjectMetadata, UploadAttributes};
use async_trait::async_trait;
use aws_sdk_s3::primitives::{ByteStream, DateTime as AwsDateTime};
use aws_sdk_s3::types::{ServerSideEncryption, StorageClass};
use aws_sdk_s3::Client as AwsS3Client;
use std::io;
use std::path::Path;

/// Longest object key S3 accepts, in UTF-8 bytes
pub const MAX_KEY_LENGTH: usize = 1024;

/// Store that accepts one object per call
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Upload the file at `source` as `bucket/key` with `metadata`
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        metadata: &ObjectMetadata,
    ) -> S3Result<()>;
}

#[async_trait]
impl ObjectStore for AwsS3Client {
    async fn put_file(
        &self,
        bucket: &str,
        key: &str,
        source: &Path,
        metadata: &ObjectMetadata,
    ) -> S3Result<()> {
        let body = ByteStream::from_path(source)
            .await
            .map_err(|e| S3Error::Io(io::Error::other(e)))?;
        let content_length = i64::try_from(metadata.content_length).map_err(|_| {
            S3Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                "file too large for a single upload",
            ))
        })?;

        let mut request = self
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .content_type(&metadata.content_type)
            .content_length(content_length);

        if let Some(cache_control) = &metadata.cache_control {
            request = request.cache_control(cache_control);
        }
        if let Some(expires_at) = &metadata.expires_at {
            request = request.expires(AwsDateTime::from_secs(expires_at.timestamp()));
        }
        if let Some(content_encoding) = &metadata.content_encoding {
            request = request.content_encoding(content_encoding);
        }
        if let Some(storage_class) = metadata.storage_class() {
            request = request.storage_class(StorageClass::from(storage_class));
        }
        if let Some(algorithm) = &metadata.encryption_header {
            request = request.server_side_encryption(ServerSideEncryption::from(algorithm.as_str()));
        }
        for (name, value) in metadata.user_metadata.iter() {
            request = request.metadata(name, value);
        }

        request.send().await.map_err(S3Error::from)?;
        Ok(())
    }
}

/// Result of [`FileUpload::invoke`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The source file did not exist; nothing was sent
    Skipped,

    /// The object was stored
    Uploaded {
        /// Bytes sent
        bytes: u64,
    },
}

impl UploadOutcome {
    /// Bytes sent, zero when skipped
    pub fn bytes_transferred(&self) -> u64 {
        match self {
            UploadOutcome::Skipped => 0,
            UploadOutcome::Uploaded { bytes } => *bytes,
        }
    }
}

/// Uploads one local file to a fixed bucket and key
#[derive(Debug, Clone)]
pub struct FileUpload {
    bucket: String,
    key: String,
    metadata: MetadataBuilder,
}

impl FileUpload {
    /// Create an upload, checking that a bucket is named and the key is usable
    pub fn new(
        bucket: impl Into<String>,
        key: impl Into<String>,
        attributes: UploadAttributes,
    ) -> S3Result<Self> {
        let bucket = bucket.into();
        let key = key.into();
        require_bucket_name(&bucket)?;
        validate_key(&key)?;

        Ok(Self {
            bucket,
            key,
            metadata: MetadataBuilder::new(attributes),
        })
    }

    /// Target bucket
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Target key
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Attributes applied to the object
    pub fn attributes(&self) -> &UploadAttributes {
        self.metadata.attributes()
    }

    /// Upload `source`. A missing file is skipped without building a client.
    pub async fn invoke<F>(
        &self,
        resolver: &ClientResolver<F>,
        source: &Path,
    ) -> S3Result<UploadOutcome>
    where
        F: ClientFactory,
        F::Client: ObjectStore,
    {
        if !tokio::fs::try_exists(source).await? {
            tracing::info!(
                path = %source.display(),
                bucket = %self.bucket,
                key = %self.key,
                "source file missing, skipping upload"
            );
            return Ok(UploadOutcome::Skipped);
        }

        let file = FileDescriptor::from_path(source).await?;
        let metadata = self.metadata.build(&file);
        let client = resolver.resolve().await?;

        tracing::debug!(
            bucket = %self.bucket,
            key = %self.key,
            content_type = %metadata.content_type,
            bytes = metadata.content_length,
            "uploading object"
        );
        client
            .put_file(&self.bucket, &self.key, source, &metadata)
            .await?;

        tracing::info!(
            bucket = %self.bucket,
            key = %self.key,
            bytes = metadata.content_length,
            "upload complete"
        );
        Ok(UploadOutcome::Uploaded {
            bytes: metadata.content_length,
        })
    }
}

/// Validate an object key
pub fn validate_key(key: &str) -> S3Result<()> {
    if key.is_empty() {
        return Err(S3Error::InvalidKey("Object key cannot be empty".to_string()));
    }
    if key.len() > MAX_KEY_LENGTH {
        return Err(S3Error::InvalidKey(format!(
            "Object key is {} bytes, limit is {MAX_KEY_LENGTH}",
            key.len()
        )));
    }
    Ok(())
}
