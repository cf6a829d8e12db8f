//! Lazily built, memoized S3 client

use super::config::S3ClientConfig;
use super::credentials::CredentialPair;
use super::error::{S3Error, S3Result};
use super::proxy::{self, ProxyOverride};
use super::types::SignerVersion;
use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::BehaviorVersion;
use aws_sdk_s3::config::{Credentials, Region, SharedHttpClient};
use aws_sdk_s3::Client as AwsS3Client;
use aws_smithy_http_client::proxy::ProxyConfig as TransportProxy;
use aws_smithy_http_client::tls;
use aws_smithy_http_client::Builder as HttpClientBuilder;
use aws_smithy_http_client::Connector;
use secrecy::ExposeSecret;
use std::fmt;
use std::sync::{Arc, OnceLock};
use tokio::sync::Mutex;

/// How the client locates the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Addressing {
    /// Explicit endpoint, with region, addressing style and signer overrides
    Custom {
        endpoint: String,
        region: Option<String>,
        path_style: bool,
        signer: Option<SignerVersion>,
    },

    /// Standard AWS endpoint for a fixed region
    Regional { region: String },

    /// Endpoint and region discovered from the environment
    Default,
}

/// Everything needed to build one client.
///
/// A plan is consumed by [`ClientFactory::build`]; revealed proxy secrets
/// live no longer than the build call.
#[derive(Debug)]
pub struct ClientPlan {
    /// Static credentials; `None` defers to the default provider chain
    pub credentials: Option<Credentials>,

    /// Endpoint and region selection
    pub addressing: Addressing,

    /// Proxy applied to the transport
    pub proxy: Option<ProxyOverride>,
}

impl ClientPlan {
    /// Derive the plan for `config`
    pub fn new(config: &S3ClientConfig, credentials: Option<Credentials>) -> Self {
        let addressing = match (&config.endpoint, &config.region) {
            (Some(endpoint), region) => Addressing::Custom {
                endpoint: endpoint.clone(),
                region: region.clone(),
                path_style: config.path_style_access,
                signer: config.signer_version,
            },
            (None, Some(region)) => Addressing::Regional {
                region: region.clone(),
            },
            (None, None) => Addressing::Default,
        };

        Self {
            credentials,
            addressing,
            proxy: proxy::client_overrides(config.proxy.as_ref()),
        }
    }

    /// Region the plan pins, if any
    pub fn region(&self) -> Option<&str> {
        match &self.addressing {
            Addressing::Custom {
                region: Some(region),
                ..
            }
            | Addressing::Regional { region } => Some(region.as_str()),
            _ => None,
        }
    }

    /// Signer override, only meaningful with a custom endpoint
    pub fn signer(&self) -> Option<SignerVersion> {
        match &self.addressing {
            Addressing::Custom { signer, .. } => *signer,
            _ => None,
        }
    }
}

/// Turns a [`ClientPlan`] into a usable client
#[async_trait]
pub trait ClientFactory: Send + Sync {
    /// Client handle produced by this factory
    type Client: Send + Sync + 'static;

    /// Build a client. Errors are returned as raised, without retries.
    async fn build(&self, plan: ClientPlan) -> S3Result<Self::Client>;
}

/// Builds `aws_sdk_s3::Client` instances
#[derive(Debug, Clone, Copy, Default)]
pub struct AwsClientFactory;

#[async_trait]
impl ClientFactory for AwsClientFactory {
    type Client = AwsS3Client;

    async fn build(&self, plan: ClientPlan) -> S3Result<AwsS3Client> {
        let signer = plan.signer();
        if signer == Some(SignerVersion::V2) {
            return Err(S3Error::InvalidConfig(
                "Signature Version 2 is not supported; use AWSS3V4SignerType".to_string(),
            ));
        }

        let mut aws_config_loader = aws_config::defaults(BehaviorVersion::latest());

        let region_provider = match plan.region() {
            Some(region) => RegionProviderChain::first_try(Region::new(region.to_string())),
            None => RegionProviderChain::default_provider(),
        };
        aws_config_loader = aws_config_loader.region(region_provider);

        if signer == Some(SignerVersion::Unsigned) {
            aws_config_loader = aws_config_loader.no_credentials();
        } else if let Some(credentials) = plan.credentials {
            aws_config_loader = aws_config_loader.credentials_provider(credentials);
        }

        aws_config_loader = aws_config_loader.http_client(http_client(plan.proxy)?);

        let aws_config = aws_config_loader.load().await;
        let mut s3_config_builder = aws_sdk_s3::config::Builder::from(&aws_config);

        if let Addressing::Custom {
            endpoint,
            path_style,
            ..
        } = plan.addressing
        {
            s3_config_builder = s3_config_builder
                .endpoint_url(endpoint)
                .force_path_style(path_style);
        }

        Ok(AwsS3Client::from_conf(s3_config_builder.build()))
    }
}

/// Transport proxy settings for an override
fn transport_proxy(proxy: Option<&ProxyOverride>) -> S3Result<TransportProxy> {
    let Some(proxy) = proxy else {
        // Ignore proxy environment variables when no proxy applies
        return Ok(TransportProxy::disabled());
    };

    let uri = proxy.uri();
    let mut proxy_config = TransportProxy::all(uri.as_str())
        .map_err(|e| S3Error::InvalidConfig(format!("Invalid proxy {uri}: {e}")))?;
    if let Some(auth) = &proxy.auth {
        proxy_config = proxy_config.with_basic_auth(
            auth.username.clone(),
            auth.password.expose_secret().to_string(),
        );
    }
    Ok(proxy_config)
}

/// HTTPS transport, proxied when an override is present
fn http_client(proxy: Option<ProxyOverride>) -> S3Result<SharedHttpClient> {
    let proxy_config = transport_proxy(proxy.as_ref())?;

    Ok(
        HttpClientBuilder::new().build_with_connector_fn(move |settings, runtime_components| {
            let mut connector = Connector::builder()
                .proxy_config(proxy_config.clone())
                .tls_provider(tls::Provider::Rustls(
                    tls::rustls_provider::CryptoMode::Ring,
                ));
            connector.set_connector_settings(settings.cloned());
            if let Some(components) = runtime_components {
                connector.set_sleep_impl(components.sleep_impl());
            }
            connector.build()
        }),
    )
}

/// Resolves and memoizes one configured client.
///
/// The first [`resolve`](Self::resolve) builds the client; every later or
/// concurrent caller receives the same handle. A failed build is not cached.
pub struct ClientResolver<F: ClientFactory = AwsClientFactory> {
    config: S3ClientConfig,
    credential_pair: Option<CredentialPair>,
    credentials: OnceLock<Option<Credentials>>,
    client: Mutex<Option<Arc<F::Client>>>,
    factory: F,
}

impl ClientResolver<AwsClientFactory> {
    /// Create a resolver backed by the AWS SDK
    ///
    /// # Example
    ///
    /// ```no_run
    /// use item_storage_s3::protocol::s3::{ClientResolver, S3ClientConfigBuilder};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let config = S3ClientConfigBuilder::new().region("eu-west-1").build()?;
    ///     let resolver = ClientResolver::new(None, config)?;
    ///     let client = resolver.resolve().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn new(credentials: Option<CredentialPair>, config: S3ClientConfig) -> S3Result<Self> {
        Self::with_factory(credentials, config, AwsClientFactory)
    }
}

impl<F: ClientFactory> ClientResolver<F> {
    /// Create a resolver that builds clients with `factory`
    pub fn with_factory(
        credentials: Option<CredentialPair>,
        config: S3ClientConfig,
        factory: F,
    ) -> S3Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            credential_pair: credentials,
            credentials: OnceLock::new(),
            client: Mutex::new(None),
            factory,
        })
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &S3ClientConfig {
        &self.config
    }

    /// The factory used to build the client
    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Whether callers may fetch objects through this client in parallel
    pub fn supports_parallel_downloads(&self) -> bool {
        self.config.parallel_downloads
    }

    /// Static credentials derived from the configured key pair
    pub fn credentials(&self) -> Option<Credentials> {
        self.credentials
            .get_or_init(|| {
                self.credential_pair
                    .as_ref()
                    .map(CredentialPair::to_credentials)
            })
            .clone()
    }

    /// Get the client, building it on first use
    pub async fn resolve(&self) -> S3Result<Arc<F::Client>> {
        let mut slot = self.client.lock().await;
        if let Some(client) = slot.as_ref() {
            return Ok(Arc::clone(client));
        }

        let plan = ClientPlan::new(&self.config, self.credentials());
        tracing::info!(
            endpoint = ?self.config.endpoint,
            region = ?plan.region(),
            static_credentials = plan.credentials.is_some(),
            proxied = plan.proxy.is_some(),
            "building S3 client"
        );

        let client = Arc::new(self.factory.build(plan).await?);
        *slot = Some(Arc::clone(&client));
        Ok(client)
    }
}

impl<F: ClientFactory> fmt::Debug for ClientResolver<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientResolver")
            .field("config", &self.config)
            .field("credentials", &self.credential_pair)
            .finish_non_exhaustive()
    }
}
