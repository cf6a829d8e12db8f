//! Static access keys handed over by the host

use aws_sdk_s3::config::Credentials;
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Provider name recorded on credentials built from a [`CredentialPair`]
pub const STATIC_PROVIDER_NAME: &str = "item-storage-static";

/// Access key pair, held in memory only
pub struct CredentialPair {
    access_key: String,
    secret_key: SecretString,
}

impl CredentialPair {
    /// Create a pair from an access key ID and a secret access key
    pub fn new(access_key: impl Into<String>, secret_key: SecretString) -> Self {
        Self {
            access_key: access_key.into(),
            secret_key,
        }
    }

    /// Access key ID
    pub fn access_key_id(&self) -> &str {
        &self.access_key
    }

    /// Secret access key
    pub fn secret_access_key(&self) -> &SecretString {
        &self.secret_key
    }

    /// Static SDK credentials for this pair
    pub(crate) fn to_credentials(&self) -> Credentials {
        Credentials::new(
            &self.access_key,
            self.secret_key.expose_secret(),
            None,
            None,
            STATIC_PROVIDER_NAME,
        )
    }
}

impl fmt::Debug for CredentialPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPair")
            .field("access_key", &self.access_key)
            .field("secret_key", &"** redacted **")
            .finish()
    }
}
