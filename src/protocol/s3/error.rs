//! Error types for S3 operations

use std::io;
use thiserror::Error;

/// Result type alias for S3 operations
pub type S3Result<T> = Result<T, S3Error>;

/// Boxed error raised by the SDK or its transport, kept as-is
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur while resolving a client or uploading an object
#[derive(Error, Debug)]
pub enum S3Error {
    /// Invalid or unsupported configuration (bad endpoint, signer, pattern...)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Invalid bucket name
    #[error("Invalid bucket name: {0}")]
    InvalidBucketName(String),

    /// Invalid object key
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// Failure raised by the client or its transport
    #[error("Transport error: {0}")]
    Transport(#[source] TransportSource),

    /// Local I/O error while reading the upload source
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl S3Error {
    /// Wrap any SDK-side error without translating it
    pub fn transport<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        S3Error::Transport(Box::new(error))
    }

    /// Whether the error stems from configuration rather than the network
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            S3Error::InvalidConfig(_) | S3Error::InvalidBucketName(_) | S3Error::InvalidKey(_)
        )
    }
}

/// Convert AWS SDK errors to S3Error, keeping the original as the source
impl<E, R> From<aws_sdk_s3::error::SdkError<E, R>> for S3Error
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    fn from(error: aws_sdk_s3::error::SdkError<E, R>) -> Self {
        S3Error::transport(error)
    }
}
