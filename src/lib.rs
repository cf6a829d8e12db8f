/*!
 * Item storage on S3
 *
 * Uploads build items to AWS S3 or an S3-compatible service:
 * - One lazily built, shared client per configuration
 * - Static or default-chain credentials
 * - Custom endpoints, path-style addressing and signer selection
 * - HTTP proxy with hostname exemptions
 * - Object metadata mapping for caching headers, storage class and SSE
 */

pub mod config;
pub mod logging;
pub mod protocol;

// Re-export commonly used types
pub use config::{AdapterConfig, LogLevel, UploadSettings};
pub use protocol::s3::{
    ClientResolver, CredentialPair, FileUpload, MetadataBuilder, S3ClientConfig, S3Error,
    S3Result, UploadAttributes, UploadOutcome,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
