//! Object metadata for single-object uploads
//!
//! [`MetadataBuilder`] maps a local file and caller-supplied attributes onto
//! the HTTP and S3 headers sent with a `PutObject` request. Building never
//! fails: unknown keys become user metadata, and an `expires` value that is
//! not an HTTP date is stored as user metadata too.

use super::error::S3Result;
use super::types::MetadataMap;
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc, Weekday};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::SystemTime;

/// Header carrying the storage class
pub const STORAGE_CLASS_HEADER: &str = "x-amz-storage-class";

/// Header carrying the server-side encryption algorithm
pub const SERVER_SIDE_ENCRYPTION_HEADER: &str = "x-amz-server-side-encryption";

/// Algorithm token for S3-managed AES-256 encryption
pub const AES256_SERVER_SIDE_ENCRYPTION: &str = "AES256";

/// Prefix for user-defined metadata headers
pub const USER_METADATA_PREFIX: &str = "x-amz-meta-";

/// Format accepted for `expires` values
pub const EXPIRES_PATTERN: &str = "EEE, dd MMM yyyy HH:mm:ss z";

/// Caller-supplied upload attributes
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadAttributes {
    /// Storage class, passed through verbatim
    #[serde(default)]
    pub storage_class: Option<String>,

    /// Request S3-managed AES-256 encryption
    #[serde(default)]
    pub server_side_encryption: bool,

    /// User metadata, in caller order
    #[serde(default)]
    pub user_metadata: MetadataMap,
}

impl UploadAttributes {
    /// Attributes with no storage class, encryption or metadata
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage class
    pub fn with_storage_class(mut self, storage_class: impl Into<String>) -> Self {
        self.storage_class = Some(storage_class.into());
        self
    }

    /// Enable or disable server-side encryption
    pub fn with_server_side_encryption(mut self, enabled: bool) -> Self {
        self.server_side_encryption = enabled;
        self
    }

    /// Append a user metadata pair
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.user_metadata.insert(key, value);
        self
    }
}

/// Name, size and modification time of the file being uploaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    /// File name, used for the content type lookup
    pub name: String,

    /// Size in bytes
    pub size_bytes: u64,

    /// Last modification time
    pub last_modified: SystemTime,
}

impl FileDescriptor {
    /// Describe a file without touching the filesystem
    pub fn new(name: impl Into<String>, size_bytes: u64, last_modified: SystemTime) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            last_modified,
        }
    }

    /// Describe the file at `path`
    pub async fn from_path(path: &Path) -> S3Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            name,
            size_bytes: metadata.len(),
            last_modified: metadata.modified()?,
        })
    }
}

/// Headers and metadata sent with one object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMetadata {
    /// Content-Type
    pub content_type: String,

    /// Content-Length
    pub content_length: u64,

    /// Local modification time of the source
    pub last_modified: SystemTime,

    /// Cache-Control
    pub cache_control: Option<String>,

    /// Expires
    pub expires_at: Option<DateTime<Utc>>,

    /// Content-Encoding
    pub content_encoding: Option<String>,

    /// Storage class header as (name, value)
    pub storage_class_header: Option<(String, String)>,

    /// Server-side encryption algorithm
    pub encryption_header: Option<String>,

    /// User-defined metadata
    pub user_metadata: MetadataMap,
}

impl ObjectMetadata {
    /// Storage class value, if one was requested
    pub fn storage_class(&self) -> Option<&str> {
        self.storage_class_header
            .as_ref()
            .map(|(_, value)| value.as_str())
    }

    /// Render the request headers
    pub fn http_headers(&self) -> Vec<(String, String)> {
        let mut headers = vec![
            ("Content-Type".to_string(), self.content_type.clone()),
            ("Content-Length".to_string(), self.content_length.to_string()),
        ];

        if let Some(cache_control) = &self.cache_control {
            headers.push(("Cache-Control".to_string(), cache_control.clone()));
        }
        if let Some(expires_at) = &self.expires_at {
            headers.push(("Expires".to_string(), format_http_date(expires_at)));
        }
        if let Some(content_encoding) = &self.content_encoding {
            headers.push(("Content-Encoding".to_string(), content_encoding.clone()));
        }
        if let Some((name, value)) = &self.storage_class_header {
            headers.push((name.clone(), value.clone()));
        }
        if let Some(algorithm) = &self.encryption_header {
            headers.push((SERVER_SIDE_ENCRYPTION_HEADER.to_string(), algorithm.clone()));
        }
        for (key, value) in self.user_metadata.iter() {
            headers.push((format!("{USER_METADATA_PREFIX}{key}"), value.to_string()));
        }

        headers
    }
}

/// Builds [`ObjectMetadata`] from a fixed set of upload attributes
#[derive(Debug, Clone, Default)]
pub struct MetadataBuilder {
    attributes: UploadAttributes,
}

impl MetadataBuilder {
    /// Create a builder for `attributes`
    pub fn new(attributes: UploadAttributes) -> Self {
        Self { attributes }
    }

    /// The attributes applied to every build
    pub fn attributes(&self) -> &UploadAttributes {
        &self.attributes
    }

    /// Metadata for `file`
    pub fn build(&self, file: &FileDescriptor) -> ObjectMetadata {
        build_metadata(file, &self.attributes)
    }
}

/// Map a file and its upload attributes onto object metadata
pub fn build_metadata(file: &FileDescriptor, attributes: &UploadAttributes) -> ObjectMetadata {
    let mut metadata = ObjectMetadata {
        content_type: mime_guess::from_path(&file.name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
        content_length: file.size_bytes,
        last_modified: file.last_modified,
        cache_control: None,
        expires_at: None,
        content_encoding: None,
        storage_class_header: None,
        encryption_header: None,
        user_metadata: MetadataMap::new(),
    };

    if let Some(storage_class) = attributes.storage_class.as_deref() {
        if !storage_class.is_empty() {
            metadata.storage_class_header =
                Some((STORAGE_CLASS_HEADER.to_string(), storage_class.to_string()));
        }
    }

    if attributes.server_side_encryption {
        metadata.encryption_header = Some(AES256_SERVER_SIDE_ENCRYPTION.to_string());
    }

    for (key, value) in attributes.user_metadata.iter() {
        match key.to_lowercase().as_str() {
            "cache-control" => metadata.cache_control = Some(value.to_string()),
            "expires" => match parse_http_date(value) {
                Some(expires_at) => metadata.expires_at = Some(expires_at),
                None => {
                    tracing::debug!(
                        key,
                        value,
                        pattern = EXPIRES_PATTERN,
                        "expires value is not an HTTP date, keeping it as user metadata"
                    );
                    metadata.user_metadata.insert(key, value);
                }
            },
            "content-encoding" => metadata.content_encoding = Some(value.to_string()),
            "content-type" => {
                // Also kept as user metadata
                metadata.content_type = value.to_string();
                metadata.user_metadata.insert(key, value);
            }
            _ => {
                metadata.user_metadata.insert(key, value);
            }
        }
    }

    metadata
}

/// Parse `EEE, dd MMM yyyy HH:mm:ss z`, e.g. `Wed, 21 Oct 2015 07:28:00 GMT`.
///
/// Only a leading date is read: text after the zone (`GMT; max-age=0`) is ignored.
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    let (weekday, rest) = value.trim_start().split_once(',')?;
    weekday.trim().parse::<Weekday>().ok()?;

    let (naive, remainder) =
        NaiveDateTime::parse_and_remainder(rest.trim_start(), "%d %b %Y %H:%M:%S").ok()?;
    if !remainder.starts_with(char::is_whitespace) {
        return None;
    }
    let remainder = remainder.trim_start();
    let zone_len = remainder
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | ':')))
        .unwrap_or(remainder.len());
    let offset = zone_offset(&remainder[..zone_len])?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Format an instant as an RFC 7231 HTTP date
pub fn format_http_date(instant: &DateTime<Utc>) -> String {
    instant.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// Offset for a zone designator: GMT/UTC, North American abbreviations,
/// `GMT+hh:mm` or `+hhmm`
fn zone_offset(zone: &str) -> Option<FixedOffset> {
    let hours = |h: i32| FixedOffset::east_opt(h * 3600);
    match zone.to_ascii_uppercase().as_str() {
        "GMT" | "UTC" | "UT" | "Z" => hours(0),
        "EST" => hours(-5),
        "EDT" => hours(-4),
        "CST" => hours(-6),
        "CDT" => hours(-5),
        "MST" => hours(-7),
        "MDT" => hours(-6),
        "PST" => hours(-8),
        "PDT" => hours(-7),
        other => numeric_offset(other.strip_prefix("GMT").unwrap_or(other)),
    }
}

fn numeric_offset(zone: &str) -> Option<FixedOffset> {
    let sign = match zone.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let digits = &zone[1..];
    let (hours, minutes) = match digits.split_once(':') {
        Some(parts) => parts,
        None if digits.len() == 4 => digits.split_at(2),
        None if (1..=2).contains(&digits.len()) => (digits, "0"),
        None => return None,
    };

    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 23 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}
