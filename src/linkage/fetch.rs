//! Fetching the well-known DID configuration resource.

use async_trait::async_trait;
use gas_sponsor_types::timestamp::epoch_millis;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Path of the DID configuration resource, relative to a domain origin.
pub const DID_CONFIGURATION_PATH: &str = ".well-known/did-configuration.json";

#[derive(Debug, thiserror::Error)]
pub enum LinkageFetchError {
    #[error("Failed to build configuration URL for {domain}: {source}")]
    UrlParse {
        domain: Url,
        #[source]
        source: url::ParseError,
    },
    #[error("HTTP error fetching {url}: {source}")]
    Http {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
    #[error("Unexpected HTTP status {status} fetching {url}")]
    HttpStatus {
        url: Url,
        status: reqwest::StatusCode,
    },
    #[error("Configuration at {url} is not JSON: {source}")]
    Json {
        url: Url,
        #[source]
        source: reqwest::Error,
    },
}

/// `<domain>.well-known/did-configuration.json?ts=<epoch-ms>`.
///
/// The timestamp defeats intermediate caches, so every validation sees the current file.
pub fn configuration_url(domain: &Url) -> Result<Url, LinkageFetchError> {
    let mut url = domain
        .join(DID_CONFIGURATION_PATH)
        .map_err(|source| LinkageFetchError::UrlParse {
            domain: domain.clone(),
            source,
        })?;
    url.query_pairs_mut()
        .append_pair("ts", &epoch_millis().to_string());
    Ok(url)
}

/// Retrieves a DID configuration resource as raw JSON.
#[async_trait]
pub trait ConfigurationFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<Value, LinkageFetchError>;
}

#[async_trait]
impl<T: ConfigurationFetcher + ?Sized> ConfigurationFetcher for Arc<T> {
    async fn fetch(&self, url: &Url) -> Result<Value, LinkageFetchError> {
        self.as_ref().fetch(url).await
    }
}

/// Fetches over HTTP(S) with `reqwest`. Nothing is cached.
#[derive(Clone, Debug, Default)]
pub struct HttpConfigurationFetcher {
    client: Client,
    timeout: Option<Duration>,
}

impl HttpConfigurationFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let mut this = self.clone();
        this.timeout = Some(timeout);
        this
    }
}

#[async_trait]
impl ConfigurationFetcher for HttpConfigurationFetcher {
    async fn fetch(&self, url: &Url) -> Result<Value, LinkageFetchError> {
        let mut req = self.client.get(url.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let response = req.send().await.map_err(|source| LinkageFetchError::Http {
            url: url.clone(),
            source,
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(LinkageFetchError::HttpStatus {
                url: url.clone(),
                status,
            });
        }
        response.json().await.map_err(|source| LinkageFetchError::Json {
            url: url.clone(),
            source,
        })
    }
}
