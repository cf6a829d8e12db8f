//! S3 upload support for pipeline items
//!
//! This module builds one AWS SDK client per configuration and uploads local
//! files as single objects. It works with AWS S3 and with S3-compatible
//! services such as MinIO.
//!
//! # Features
//!
//! - Lazily built, memoized client shared by concurrent callers
//! - Static credentials or the default AWS credential chain
//! - Custom endpoints with path-style addressing and signer selection
//! - HTTP proxy with authentication and regex hostname exemptions
//! - Header mapping for user metadata, storage class and SSE
//!
//! # Examples
//!
//! ## Uploading a file
//!
//! ```no_run
//! use item_storage_s3::protocol::s3::{ClientResolver, FileUpload, S3ClientConfig, UploadAttributes};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let resolver = ClientResolver::new(None, S3ClientConfig::new())?;
//!
//!     let attributes = UploadAttributes::new()
//!         .with_storage_class("STANDARD_IA")
//!         .with_metadata("Cache-Control", "max-age=3600");
//!     let upload = FileUpload::new("my-bucket", "builds/app.tar.gz", attributes)?;
//!
//!     let outcome = upload.invoke(&resolver, Path::new("target/app.tar.gz")).await?;
//!     println!("sent {} bytes", outcome.bytes_transferred());
//!     Ok(())
//! }
//! ```
//!
//! ## Using MinIO behind a proxy
//!
//! ```no_run
//! use item_storage_s3::protocol::s3::{
//!     ClientResolver, CredentialPair, ProxyConfig, S3ClientConfigBuilder,
//! };
//! use secrecy::SecretString;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let proxy = ProxyConfig::new("proxy.corp", 3128).with_no_proxy_hosts("localhost")?;
//!     let config = S3ClientConfigBuilder::new()
//!         .endpoint("http://localhost:9000")
//!         .region("us-east-1")
//!         .path_style_access(true)
//!         .proxy(proxy)
//!         .build()?;
//!
//!     let credentials = CredentialPair::new(
//!         "minioadmin",
//!         SecretString::new("minioadmin".to_string().into_boxed_str()),
//!     );
//!     let resolver = ClientResolver::new(Some(credentials), config)?;
//!     let _client = resolver.resolve().await?;
//!     Ok(())
//! }
//! ```

mod client;
mod config;
mod credentials;
mod error;
mod metadata;
mod proxy;
mod types;
mod upload;


pub use client::{Addressing, AwsClientFactory, ClientFactory, ClientPlan, ClientResolver};
pub use config::{require_bucket_name, validate_bucket_name, S3ClientConfig, S3ClientConfigBuilder};
pub use credentials::{CredentialPair, STATIC_PROVIDER_NAME};
pub use error::{S3Error, S3Result, TransportSource};
pub use metadata::{
    build_metadata, format_http_date, parse_http_date, FileDescriptor, MetadataBuilder,
    ObjectMetadata, UploadAttributes, AES256_SERVER_SIDE_ENCRYPTION, EXPIRES_PATTERN,
    SERVER_SIDE_ENCRYPTION_HEADER, STORAGE_CLASS_HEADER, USER_METADATA_PREFIX,
};
pub use proxy::{
    client_overrides, should_use_proxy, NoProxyPattern, ProxyAuth, ProxyConfig, ProxyOverride,
    PROXY_CHECK_HOST,
};
pub use types::{MetadataMap, SignerVersion};
pub use upload::{validate_key, FileUpload, ObjectStore, UploadOutcome, MAX_KEY_LENGTH};
