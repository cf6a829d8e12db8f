/*!
 * Configuration types for the S3 item storage adapter
 */

use crate::protocol::s3::{
    require_bucket_name, validate_bucket_name, MetadataMap, S3ClientConfig, S3Result,
    UploadAttributes,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level adapter configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Log level for diagnostic output
    #[serde(default)]
    pub log_level: LogLevel,

    /// Enable verbose logging (shorthand for log_level = debug)
    #[serde(default)]
    pub verbose: bool,

    /// Log file path (None = stdout)
    #[serde(default)]
    pub log_file: Option<PathBuf>,

    /// Client construction settings
    #[serde(default)]
    pub s3: S3ClientConfig,

    /// Upload target and object attributes
    #[serde(default)]
    pub upload: UploadSettings,
}

/// Where uploads go and what they carry
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadSettings {
    /// Destination bucket
    #[serde(default)]
    pub bucket: String,

    /// Storage class, passed through verbatim
    #[serde(default)]
    pub storage_class: Option<String>,

    /// Request S3-managed AES-256 encryption
    #[serde(default)]
    pub server_side_encryption: bool,

    /// User metadata, in file order
    #[serde(default)]
    pub user_metadata: MetadataMap,

    /// Enforce current AWS bucket naming rules instead of only requiring a name
    #[serde(default)]
    pub strict_bucket_names: bool,
}

impl UploadSettings {
    /// Check the bucket name
    pub fn validate(&self) -> S3Result<()> {
        if self.strict_bucket_names {
            validate_bucket_name(&self.bucket)
        } else {
            require_bucket_name(&self.bucket)
        }
    }

    /// Attributes applied to each uploaded object
    pub fn attributes(&self) -> UploadAttributes {
        UploadAttributes {
            storage_class: self.storage_class.clone(),
            server_side_encryption: self.server_side_encryption,
            user_metadata: self.user_metadata.clone(),
        }
    }
}

/// Log level for diagnostic output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only errors
    Error,

    /// Warnings and errors
    Warn,

    /// Info, warnings, and errors
    #[default]
    Info,

    /// Debug and above
    Debug,

    /// All messages including traces
    Trace,
}

impl LogLevel {
    /// Convert to tracing::Level
    pub fn to_tracing_level(&self) -> tracing::Level {
        match self {
            LogLevel::Error => tracing::Level::ERROR,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Trace => tracing::Level::TRACE,
        }
    }
}

impl AdapterConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &PathBuf) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: AdapterConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to a TOML file. Proxy passwords are not written.
    pub fn to_file(&self, path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Validate client and upload settings
    pub fn validate(&self) -> S3Result<()> {
        self.s3.validate()?;
        self.upload.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::s3::{should_use_proxy, SignerVersion, PROXY_CHECK_HOST};
    use secrecy::ExposeSecret;

    const EXAMPLE: &str = r#"
log_level = "debug"
verbose = false

[s3]
region = "eu-west-1"
endpoint = "http://localhost:9000"
signer_version = "AWSS3V4SignerType"
path_style_access = true

[s3.proxy]
host = "proxy.corp"
port = 3128
username = "builder"
password = "hunter2"
no_proxy = ["localhost", "*.corp.example"]

[upload]
bucket = "build-cache"
storage_class = "STANDARD_IA"
server_side_encryption = true

[upload.user_metadata]
Cache-Control = "max-age=60"
team = "infra"
"#;

    #[test]
    fn test_default_config() {
        let config = AdapterConfig::default();
        assert_eq!(config.log_level, LogLevel::Info);
        assert!(!config.verbose);
        assert!(config.log_file.is_none());
        assert!(config.s3.parallel_downloads);
        assert!(config.upload.bucket.is_empty());
    }

    #[test]
    fn test_example_config() {
        let config: AdapterConfig = toml::from_str(EXAMPLE).unwrap();
        assert_eq!(config.log_level, LogLevel::Debug);
        assert_eq!(config.s3.region.as_deref(), Some("eu-west-1"));
        assert_eq!(config.s3.signer_version, Some(SignerVersion::V4));
        assert!(config.s3.path_style_access);
        assert!(config.s3.parallel_downloads);

        let proxy = config.s3.proxy.as_ref().unwrap();
        assert_eq!(proxy.password.as_ref().unwrap().expose_secret(), "hunter2");
        assert!(!should_use_proxy(Some(proxy), "cache.corp.example"));
        assert!(should_use_proxy(Some(proxy), "cachexcorp.example"));
        assert!(should_use_proxy(Some(proxy), PROXY_CHECK_HOST));

        assert_eq!(config.upload.bucket, "build-cache");
        let attributes = config.upload.attributes();
        assert_eq!(attributes.storage_class.as_deref(), Some("STANDARD_IA"));
        assert!(attributes.server_side_encryption);
        assert_eq!(
            attributes.user_metadata.iter().collect::<Vec<_>>(),
            vec![("Cache-Control", "max-age=60"), ("team", "infra")]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_legacy_bucket_name_accepted() {
        let mut config: AdapterConfig = toml::from_str(EXAMPLE).unwrap();
        config.upload.bucket = "My_Legacy_Bucket".to_string();
        assert!(config.validate().is_ok());

        config.upload.bucket = String::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_strict_bucket_names_opt_in() {
        let mut config: AdapterConfig = toml::from_str(
            r#"
[upload]
bucket = "Build_Cache"
strict_bucket_names = true
"#,
        )
        .unwrap();
        assert!(matches!(
            config.validate(),
            Err(crate::protocol::s3::S3Error::InvalidBucketName(_))
        ));

        config.upload.bucket = "build-cache".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_round_trip_drops_password() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("adapter.toml");

        let config: AdapterConfig = toml::from_str(EXAMPLE).unwrap();
        config.to_file(&path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(!written.contains("hunter2"));

        let loaded = AdapterConfig::from_file(&path).unwrap();
        assert_eq!(loaded.upload, config.upload);
        let proxy = loaded.s3.proxy.unwrap();
        assert_eq!(proxy.username.as_deref(), Some("builder"));
        assert!(proxy.password.is_none());
        assert_eq!(proxy.no_proxy_patterns.len(), 2);
    }

    #[test]
    fn test_log_level_conversion() {
        assert_eq!(LogLevel::Error.to_tracing_level(), tracing::Level::ERROR);
        assert_eq!(LogLevel::Trace.to_tracing_level(), tracing::Level::TRACE);
    }
}
