//! Proxy settings and the per-hostname bypass policy

use super::error::{S3Error, S3Result};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Hostname the bypass decision is evaluated against.
///
/// Virtual-hosted buckets and custom endpoints resolve to other hosts; their
/// traffic still follows the decision made for this one.
pub const PROXY_CHECK_HOST: &str = "s3.amazonaws.com";

/// A hostname exemption that must match the whole hostname.
///
/// In configuration files a plain string is a host glob (`*.corp.example`)
/// and `{ regex = "..." }` is a regular expression.
#[derive(Clone)]
pub struct NoProxyPattern {
    source: PatternSource,
    regex: Regex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
enum PatternSource {
    Glob(String),
    Regex { regex: String },
}

impl NoProxyPattern {
    /// Compile a regular expression; it must cover the entire hostname to match
    pub fn regex(pattern: &str) -> S3Result<Self> {
        Self::compile(
            PatternSource::Regex {
                regex: pattern.to_string(),
            },
            pattern,
        )
    }

    /// Build from a host glob such as `*.corp.example`: `*` matches any run
    /// of characters and everything else is literal
    pub fn host_glob(glob: &str) -> S3Result<Self> {
        let glob = glob.trim();
        let pattern = glob
            .split('*')
            .map(regex::escape)
            .collect::<Vec<_>>()
            .join(".*");
        Self::compile(PatternSource::Glob(glob.to_string()), &pattern)
    }

    fn compile(source: PatternSource, pattern: &str) -> S3Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| {
            S3Error::InvalidConfig(format!("Invalid no-proxy pattern {pattern:?}: {e}"))
        })?;
        Ok(Self { source, regex })
    }

    /// Whether this pattern exempts `hostname`
    pub fn matches(&self, hostname: &str) -> bool {
        self.regex.is_match(hostname)
    }

    /// The pattern as written
    pub fn as_str(&self) -> &str {
        match &self.source {
            PatternSource::Glob(glob) => glob,
            PatternSource::Regex { regex } => regex,
        }
    }

    /// Whether the pattern was written as a host glob
    pub fn is_glob(&self) -> bool {
        matches!(self.source, PatternSource::Glob(_))
    }
}

impl Serialize for NoProxyPattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.source.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NoProxyPattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let pattern = match PatternSource::deserialize(deserializer)? {
            PatternSource::Glob(glob) => Self::host_glob(&glob),
            PatternSource::Regex { regex } => Self::regex(&regex),
        };
        pattern.map_err(serde::de::Error::custom)
    }
}

impl fmt::Debug for NoProxyPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NoProxyPattern").field(&self.source).finish()
    }
}

impl PartialEq for NoProxyPattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
    }
}

/// HTTP proxy used by the client transport
#[derive(Debug, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy hostname
    pub host: String,

    /// Proxy port
    pub port: u16,

    /// Username for proxy authentication
    #[serde(default)]
    pub username: Option<String>,

    /// Password for proxy authentication, never written back out
    #[serde(default, skip_serializing, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,

    /// Hostnames that bypass the proxy
    #[serde(default, rename = "no_proxy")]
    pub no_proxy_patterns: Vec<NoProxyPattern>,
}

impl ProxyConfig {
    /// Create a proxy without authentication or exemptions
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
            no_proxy_patterns: Vec::new(),
        }
    }

    /// Set proxy credentials
    pub fn with_credentials(mut self, username: impl Into<String>, password: SecretString) -> Self {
        self.username = Some(username.into());
        self.password = Some(password);
        self
    }

    /// Add a hostname exemption
    pub fn with_no_proxy(mut self, pattern: NoProxyPattern) -> Self {
        self.no_proxy_patterns.push(pattern);
        self
    }

    /// Parse newline- or comma-separated host globs, as proxy settings
    /// screens usually collect them
    pub fn with_no_proxy_hosts(mut self, hosts: &str) -> S3Result<Self> {
        for glob in hosts
            .split(|c: char| c == '\n' || c == ',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            self.no_proxy_patterns.push(NoProxyPattern::host_glob(glob)?);
        }
        Ok(self)
    }

    /// Validate the proxy settings
    pub fn validate(&self) -> S3Result<()> {
        if self.host.trim().is_empty() {
            return Err(S3Error::InvalidConfig(
                "Proxy host cannot be empty".to_string(),
            ));
        }
        if self.port == 0 {
            return Err(S3Error::InvalidConfig(
                "Proxy port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Clone for ProxyConfig {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.as_ref().map(copy_secret),
            no_proxy_patterns: self.no_proxy_patterns.clone(),
        }
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().to_owned().into_boxed_str())
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|p| SecretString::new(p.into_boxed_str())))
}

/// Whether traffic to `hostname` should go through `proxy`
pub fn should_use_proxy(proxy: Option<&ProxyConfig>, hostname: &str) -> bool {
    match proxy {
        None => false,
        Some(proxy) => !proxy
            .no_proxy_patterns
            .iter()
            .any(|pattern| pattern.matches(hostname)),
    }
}

/// Proxy settings applied to a client under construction
#[derive(Debug)]
pub struct ProxyOverride {
    /// Proxy hostname
    pub host: String,

    /// Proxy port
    pub port: u16,

    /// Present only when a username is configured
    pub auth: Option<ProxyAuth>,
}

impl ProxyOverride {
    /// Proxy URI handed to the HTTP client
    pub fn uri(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("http://[{}]:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// Proxy credentials revealed for the duration of a client build
#[derive(Debug)]
pub struct ProxyAuth {
    /// Proxy username
    pub username: String,

    /// Proxy password
    pub password: SecretString,
}

/// Resolve the proxy settings a new client should carry, if any
pub fn client_overrides(proxy: Option<&ProxyConfig>) -> Option<ProxyOverride> {
    let proxy = proxy?;
    if !should_use_proxy(Some(proxy), PROXY_CHECK_HOST) {
        tracing::debug!(host = PROXY_CHECK_HOST, "host exempted from proxy");
        return None;
    }

    let auth = proxy.username.as_ref().map(|username| ProxyAuth {
        username: username.clone(),
        password: proxy
            .password
            .as_ref()
            .map(copy_secret)
            .unwrap_or_else(|| SecretString::new(String::new().into_boxed_str())),
    });

    Some(ProxyOverride {
        host: proxy.host.clone(),
        port: proxy.port,
        auth,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn proxy() -> ProxyConfig {
        ProxyConfig::new("proxy.corp", 3128)
    }

    #[test]
    fn test_no_proxy_configured() {
        assert!(!should_use_proxy(None, PROXY_CHECK_HOST));
        assert!(client_overrides(None).is_none());
    }

    #[test]
    fn test_proxy_without_exemptions() {
        assert!(should_use_proxy(Some(&proxy()), PROXY_CHECK_HOST));
    }

    #[test]
    fn test_exemption_requires_whole_match() {
        let config = proxy().with_no_proxy(NoProxyPattern::regex("amazonaws").unwrap());
        // Substring only: still proxied
        assert!(should_use_proxy(Some(&config), PROXY_CHECK_HOST));

        let config = proxy().with_no_proxy(NoProxyPattern::regex(r".*\.amazonaws\.com").unwrap());
        assert!(!should_use_proxy(Some(&config), PROXY_CHECK_HOST));
    }

    #[test]
    fn test_alternation_is_anchored() {
        let pattern = NoProxyPattern::regex("localhost|s3").unwrap();
        assert!(pattern.matches("localhost"));
        assert!(pattern.matches("s3"));
        assert!(!pattern.matches(PROXY_CHECK_HOST));
    }

    #[test]
    fn test_host_glob() {
        let pattern = NoProxyPattern::host_glob("*.amazonaws.com").unwrap();
        assert!(pattern.matches("s3.amazonaws.com"));
        assert!(!pattern.matches("s3xamazonawsxcom"));
        assert!(!pattern.matches("amazonaws.com.evil"));
    }

    #[test]
    fn test_no_proxy_hosts_list() {
        let config = proxy()
            .with_no_proxy_hosts("localhost,\n *.internal \n\n")
            .unwrap();
        assert_eq!(config.no_proxy_patterns.len(), 2);
        assert!(!should_use_proxy(Some(&config), "cache.internal"));
        assert!(should_use_proxy(Some(&config), PROXY_CHECK_HOST));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = NoProxyPattern::regex("(unclosed").unwrap_err();
        assert!(matches!(err, S3Error::InvalidConfig(_)));
    }

    #[test]
    fn test_overrides_without_username() {
        let overrides = client_overrides(Some(&proxy())).unwrap();
        assert_eq!(overrides.host, "proxy.corp");
        assert_eq!(overrides.port, 3128);
        assert!(overrides.auth.is_none());
        assert_eq!(overrides.uri(), "http://proxy.corp:3128");
    }

    #[test]
    fn test_ipv6_proxy_uri_is_bracketed() {
        let overrides = client_overrides(Some(&ProxyConfig::new("::1", 3128))).unwrap();
        assert_eq!(overrides.uri(), "http://[::1]:3128");

        let overrides = client_overrides(Some(&ProxyConfig::new("[fd00::5]", 8080))).unwrap();
        assert_eq!(overrides.uri(), "http://[fd00::5]:8080");
        assert!(overrides.uri().parse::<url::Url>().is_ok());
    }

    #[test]
    fn test_overrides_with_credentials() {
        let config = proxy().with_credentials(
            "builder",
            SecretString::new("hunter2".to_string().into_boxed_str()),
        );
        let overrides = client_overrides(Some(&config)).unwrap();
        let auth = overrides.auth.unwrap();
        assert_eq!(auth.username, "builder");
        assert_eq!(auth.password.expose_secret(), "hunter2");
    }

    #[test]
    fn test_password_ignored_without_username() {
        let mut config = proxy();
        config.password = Some(SecretString::new("orphan".to_string().into_boxed_str()));
        let overrides = client_overrides(Some(&config)).unwrap();
        assert!(overrides.auth.is_none());
    }

    #[test]
    fn test_exempted_host_yields_no_overrides() {
        let config = proxy().with_no_proxy_hosts("s3.amazonaws.com").unwrap();
        assert!(client_overrides(Some(&config)).is_none());
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = proxy().with_credentials(
            "builder",
            SecretString::new("hunter2".to_string().into_boxed_str()),
        );
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("builder"));
    }

    #[test]
    fn test_deserialize_proxy() {
        let config: ProxyConfig = toml::from_str(
            r#"
            host = "proxy.corp"
            port = 8080
            username = "builder"
            password = "s3cret"
            no_proxy = ["localhost", "*.internal"]
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.password.as_ref().unwrap().expose_secret(), "s3cret");
        assert!(!should_use_proxy(Some(&config), "blob.internal"));
        assert!(!should_use_proxy(Some(&config), "localhost"));
        assert!(should_use_proxy(Some(&config), "blobxinternal"));

        let written = toml::to_string(&config).unwrap();
        assert!(!written.contains("s3cret"));
    }

    #[test]
    fn test_deserialize_glob_and_regex_entries() {
        let config: ProxyConfig = toml::from_str(
            r#"
            host = "proxy.corp"
            port = 3128
            no_proxy = ["*.corp.example", { regex = "s3[.-].*\\.amazonaws\\.com" }]
            "#,
        )
        .unwrap();
        assert!(config.no_proxy_patterns[0].is_glob());
        assert!(!config.no_proxy_patterns[1].is_glob());
        assert!(!should_use_proxy(Some(&config), "cache.corp.example"));
        assert!(!should_use_proxy(Some(&config), PROXY_CHECK_HOST));

        let written = toml::to_string(&config).unwrap();
        let reread: ProxyConfig = toml::from_str(&written).unwrap();
        assert_eq!(reread.no_proxy_patterns, config.no_proxy_patterns);
    }

    #[test]
    fn test_glob_escapes_regex_metacharacters() {
        let pattern = NoProxyPattern::host_glob("build+cache?.corp").unwrap();
        assert!(pattern.matches("build+cache?.corp"));
        assert!(!pattern.matches("buildcache.corp"));
        assert_eq!(pattern.as_str(), "build+cache?.corp");
    }
}
