//! Type definitions for S3 client construction and uploads

use super::error::{S3Error, S3Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Request-signing behavior requested for a custom endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum SignerVersion {
    /// AWS Signature Version 4 (the SDK default)
    V4,

    /// Legacy Signature Version 2, recognised but not buildable
    V2,

    /// Send requests unsigned
    Unsigned,
}

impl SignerVersion {
    /// Canonical name, as used by the Java SDK signer override
    pub fn as_str(&self) -> &'static str {
        match self {
            SignerVersion::V4 => "AWSS3V4SignerType",
            SignerVersion::V2 => "S3SignerType",
            SignerVersion::Unsigned => "NoOpSignerType",
        }
    }
}

impl FromStr for SignerVersion {
    type Err = S3Error;

    fn from_str(s: &str) -> S3Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "awss3v4signertype" | "aws4signertype" | "v4" | "s3v4" | "sigv4" => {
                Ok(SignerVersion::V4)
            }
            "s3signertype" | "v2" | "sigv2" => Ok(SignerVersion::V2),
            "noopsignertype" | "none" | "unsigned" => Ok(SignerVersion::Unsigned),
            other => Err(S3Error::InvalidConfig(format!(
                "Unknown signer version: {other}"
            ))),
        }
    }
}

impl TryFrom<String> for SignerVersion {
    type Error = S3Error;

    fn try_from(value: String) -> S3Result<Self> {
        value.parse()
    }
}

impl From<SignerVersion> for String {
    fn from(value: SignerVersion) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for SignerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Insertion-ordered string map with case-insensitive keys.
///
/// Re-inserting a key that differs only in case replaces the entry in place,
/// taking the new key spelling and value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataMap {
    entries: IndexMap<String, (String, String)>,
}

impl MetadataMap {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a pair, returning the previous value for the folded key
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        self.entries
            .insert(key.to_lowercase(), (key, value.into()))
            .map(|(_, previous)| previous)
    }

    /// Look a value up, ignoring key case
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&key.to_lowercase())
            .map(|(_, value)| value.as_str())
    }

    /// Whether a key is present, ignoring case
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&key.to_lowercase())
    }

    /// Iterate pairs in insertion order with their stored key spelling
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for MetadataMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = MetadataMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl<K, V> Extend<(K, V)> for MetadataMap
where
    K: Into<String>,
    V: Into<String>,
{
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl Serialize for MetadataMap {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}

impl<'de> Deserialize<'de> for MetadataMap {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = IndexMap::<String, String>::deserialize(deserializer)?;
        Ok(raw.into_iter().collect())
    }
}
