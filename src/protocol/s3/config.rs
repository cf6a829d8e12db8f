//! Configuration types for S3 client construction

use super::error::{S3Error, S3Result};
use super::proxy::ProxyConfig;
use super::types::SignerVersion;
use serde::{Deserialize, Serialize};
use url::Url;

/// S3 client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3ClientConfig {
    /// Custom endpoint URL (for S3-compatible services like MinIO)
    #[serde(default)]
    pub endpoint: Option<String>,

    /// AWS region (e.g., "us-east-1")
    #[serde(default)]
    pub region: Option<String>,

    /// Signer override, applied only together with a custom endpoint
    #[serde(default)]
    pub signer_version: Option<SignerVersion>,

    /// Path-style addressing, applied only together with a custom endpoint
    #[serde(default)]
    pub path_style_access: bool,

    /// Whether callers may download objects in parallel through this client
    #[serde(default = "default_true")]
    pub parallel_downloads: bool,

    /// HTTP proxy for the client transport
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

fn default_true() -> bool {
    true
}

impl S3ClientConfig {
    /// Create a config that relies entirely on default resolution
    pub fn new() -> Self {
        Self {
            endpoint: None,
            region: None,
            signer_version: None,
            path_style_access: false,
            parallel_downloads: true,
            proxy: None,
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> S3Result<()> {
        if let Some(endpoint) = &self.endpoint {
            let url = Url::parse(endpoint).map_err(|e| {
                S3Error::InvalidConfig(format!("Invalid endpoint {endpoint:?}: {e}"))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(S3Error::InvalidConfig(format!(
                    "Endpoint must use http or https: {endpoint}"
                )));
            }
            if url.host_str().is_none() {
                return Err(S3Error::InvalidConfig(format!(
                    "Endpoint has no host: {endpoint}"
                )));
            }
        }

        if let Some(region) = &self.region {
            if region.trim().is_empty() {
                return Err(S3Error::InvalidConfig(
                    "Region cannot be empty when set".to_string(),
                ));
            }
        }

        if let Some(proxy) = &self.proxy {
            proxy.validate()?;
        }

        Ok(())
    }

    /// Check if using custom endpoint (S3-compatible service)
    pub fn is_custom_endpoint(&self) -> bool {
        self.endpoint.is_some()
    }
}

impl Default for S3ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for S3ClientConfig
#[derive(Debug, Default)]
pub struct S3ClientConfigBuilder {
    config: S3ClientConfig,
}

impl S3ClientConfigBuilder {
    /// Start from default resolution
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the AWS region
    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.config.region = Some(region.into());
        self
    }

    /// Set custom endpoint (for MinIO, LocalStack, etc.)
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.endpoint = Some(endpoint.into());
        self
    }

    /// Override the request signer for a custom endpoint
    pub fn signer_version(mut self, signer: SignerVersion) -> Self {
        self.config.signer_version = Some(signer);
        self
    }

    /// Enable path-style addressing
    pub fn path_style_access(mut self, enabled: bool) -> Self {
        self.config.path_style_access = enabled;
        self
    }

    /// Advertise parallel download support
    pub fn parallel_downloads(mut self, supported: bool) -> Self {
        self.config.parallel_downloads = supported;
        self
    }

    /// Route the client through an HTTP proxy
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.config.proxy = Some(proxy);
        self
    }

    /// Build the configuration
    pub fn build(self) -> S3Result<S3ClientConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Check that a bucket name is present.
///
/// S3-compatible services and legacy AWS buckets accept names outside the
/// current AWS rules, so nothing else is enforced here.
pub fn require_bucket_name(name: &str) -> S3Result<()> {
    if name.trim().is_empty() {
        return Err(S3Error::InvalidBucketName(
            "Bucket name cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate S3 bucket name according to current AWS rules
pub fn validate_bucket_name(name: &str) -> S3Result<()> {
    require_bucket_name(name)?;

    if !is_valid_bucket_name(name) {
        return Err(S3Error::InvalidBucketName(format!(
            "Invalid bucket name: {}. Bucket names must be 3-63 characters, \
             lowercase letters, numbers, hyphens, and periods only",
            name
        )));
    }

    Ok(())
}

fn is_valid_bucket_name(name: &str) -> bool {
    let len = name.len();
    if !(3..=63).contains(&len) {
        return false;
    }

    // Must start and end with lowercase letter or number
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return false;
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return false;
    }

    if name.contains("..") {
        return false;
    }

    // Cannot be formatted as IP address
    if name.split('.').count() == 4 && name.split('.').all(|s| s.parse::<u8>().is_ok()) {
        return false;
    }

    !name.starts_with("xn--") && !name.ends_with("-s3alias")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_bucket_names() {
        assert!(validate_bucket_name("my-bucket").is_ok());
        assert!(validate_bucket_name("my.bucket").is_ok());
        assert!(validate_bucket_name("abc").is_ok());
        assert!(validate_bucket_name(&"a".repeat(63)).is_ok());
    }

    #[test]
    fn test_required_bucket_name_accepts_legacy_names() {
        for name in ["My_Legacy_Bucket", "ab", "Build.Cache"] {
            assert!(require_bucket_name(name).is_ok(), "{name} should be accepted");
        }
        assert!(matches!(require_bucket_name(""), Err(S3Error::InvalidBucketName(_))));
        assert!(matches!(require_bucket_name("  "), Err(S3Error::InvalidBucketName(_))));
    }

    #[test]
    fn test_invalid_bucket_names() {
        for name in [
            "",
            "ab",
            "My-Bucket",
            "my_bucket",
            "my..bucket",
            "192.168.1.1",
            "xn--bucket",
            "bucket-s3alias",
            "-bucket",
            "bucket-",
        ] {
            assert!(
                matches!(validate_bucket_name(name), Err(S3Error::InvalidBucketName(_))),
                "{name} should be rejected"
            );
        }
        assert!(validate_bucket_name(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = S3ClientConfig::default();
        assert!(config.validate().is_ok());
        assert!(!config.is_custom_endpoint());
        assert!(config.parallel_downloads);
    }

    #[test]
    fn test_malformed_endpoint_rejected() {
        let result = S3ClientConfigBuilder::new().endpoint("not a url").build();
        assert!(matches!(result, Err(S3Error::InvalidConfig(_))));

        let result = S3ClientConfigBuilder::new()
            .endpoint("ftp://files.example.com")
            .build();
        assert!(matches!(result, Err(S3Error::InvalidConfig(_))));
    }

    #[test]
    fn test_config_builder() {
        let config = S3ClientConfigBuilder::new()
            .endpoint("http://localhost:9000")
            .region("us-east-1")
            .signer_version(SignerVersion::V4)
            .path_style_access(true)
            .parallel_downloads(false)
            .proxy(ProxyConfig::new("proxy.corp", 3128))
            .build()
            .unwrap();

        assert!(config.is_custom_endpoint());
        assert_eq!(config.region.as_deref(), Some("us-east-1"));
        assert_eq!(config.signer_version, Some(SignerVersion::V4));
        assert!(config.path_style_access);
        assert!(!config.parallel_downloads);
        assert_eq!(config.proxy.as_ref().map(|p| p.port), Some(3128));
    }

    #[test]
    fn test_invalid_proxy_rejected() {
        let result = S3ClientConfigBuilder::new()
            .proxy(ProxyConfig::new("", 3128))
            .build();
        assert!(result.is_err());

        let result = S3ClientConfigBuilder::new()
            .proxy(ProxyConfig::new("proxy.corp", 0))
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_from_toml() {
        let config: S3ClientConfig = toml::from_str(
            r#"
            endpoint = "http://localhost:9000"
            signer_version = "AWSS3V4SignerType"
            path_style_access = true
            "#,
        )
        .unwrap();
        assert_eq!(config.signer_version, Some(SignerVersion::V4));
        assert!(config.path_style_access);
        assert!(config.parallel_downloads);
        assert!(config.proxy.is_none());

        let bad: Result<S3ClientConfig, _> = toml::from_str(r#"signer_version = "Quantum""#);
        assert!(bad.is_err());
    }
}
