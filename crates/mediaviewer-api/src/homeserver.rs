//! Homeserver base URL resolution.
//!
//! Resolution order, first match wins:
//!
//! 1. forced default URL
//! 2. URL already carried by the request
//! 3. configured default URL
//! 4. per-domain override (also seeds the cache)
//! 5. cached `.well-known` result younger than 24 hours
//! 6. live `GET https://<domain>/.well-known/matrix/client`
//!
//! Concurrent misses for the same domain are not deduplicated; both
//! requests fetch and the later write wins.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use reqwest::StatusCode;
use thiserror::Error;
use tracing::{debug, info};

use mediaviewer_types::api::WellKnownResponse;
use mediaviewer_types::metadata::HomeserverTarget;

pub const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const OVERRIDE_ENV_PREFIX: &str = "BMV_HOMESERVER_OVERRIDE_";

#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("no homeserver domain to resolve")]
    MissingDomain,
    #[error("failed to make .well-known request: {0}")]
    Request(#[source] reqwest::Error),
    #[error("invalid .well-known response: HTTP {0}")]
    Status(u16),
    #[error("invalid .well-known response: body is not JSON")]
    NotJson,
    #[error("invalid .well-known response: missing homeserver base URL")]
    MissingBaseUrl,
}

// -- Cache --

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedHomeserver {
    pub base_url: String,
    pub fetched_at: DateTime<Utc>,
}

/// Discovered base URLs per domain. One lock guards the whole map and is
/// only held for lookups and inserts, never across a network call.
#[derive(Debug)]
pub struct WellKnownCache {
    entries: Mutex<HashMap<String, CachedHomeserver>>,
    ttl: TimeDelta,
}

impl Default for WellKnownCache {
    fn default() -> Self {
        Self::new()
    }
}

impl WellKnownCache {
    pub fn new() -> Self {
        Self::with_ttl(TimeDelta::hours(24))
    }

    pub fn with_ttl(ttl: TimeDelta) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Base URL for `domain` if it was fetched less than the TTL before `now`.
    pub fn get(&self, domain: &str, now: DateTime<Utc>) -> Option<String> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(domain)
            .filter(|entry| now < entry.fetched_at + self.ttl)
            .map(|entry| entry.base_url.clone())
    }

    pub fn insert(&self, domain: &str, base_url: String, fetched_at: DateTime<Utc>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(
            domain.to_string(),
            CachedHomeserver {
                base_url,
                fetched_at,
            },
        );
    }

    /// Raw entry regardless of age.
    pub fn entry(&self, domain: &str) -> Option<CachedHomeserver> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(domain).cloned()
    }
}

// -- Overrides --

/// Where per-domain base URL overrides come from.
#[derive(Debug, Clone, Default)]
pub enum OverrideSource {
    /// `BMV_HOMESERVER_OVERRIDE_<DOMAIN>`, see [`override_env_var`].
    #[default]
    Environment,
    /// Fixed domain → URL map.
    Static(HashMap<String, String>),
}

impl OverrideSource {
    pub fn lookup(&self, domain: &str) -> Option<String> {
        match self {
            Self::Environment => std::env::var(override_env_var(domain))
                .ok()
                .filter(|url| !url.is_empty()),
            Self::Static(map) => map.get(domain).cloned(),
        }
    }
}

/// `example.org` → `BMV_HOMESERVER_OVERRIDE_EXAMPLE_ORG`
pub fn override_env_var(domain: &str) -> String {
    format!(
        "{}{}",
        OVERRIDE_ENV_PREFIX,
        domain.to_uppercase().replace('.', "_")
    )
}

// -- Resolver --

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    pub default_url: Option<String>,
    pub force_default: bool,
    pub overrides: OverrideSource,
    /// Scheme used for discovery requests. Always `https` outside tests.
    pub scheme: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            default_url: None,
            force_default: false,
            overrides: OverrideSource::Environment,
            scheme: "https".into(),
        }
    }
}

pub struct HomeserverResolver {
    config: ResolverConfig,
    cache: Arc<WellKnownCache>,
    client: reqwest::Client,
}

impl HomeserverResolver {
    pub fn new(config: ResolverConfig, cache: Arc<WellKnownCache>) -> Result<Self, ResolveError> {
        let client = reqwest::Client::builder()
            .timeout(DISCOVERY_TIMEOUT)
            .build()
            .map_err(ResolveError::Request)?;
        Ok(Self {
            config,
            cache,
            client,
        })
    }

    pub fn cache(&self) -> &WellKnownCache {
        &self.cache
    }

    /// Base URL to use for `target`.
    ///
    /// Dropping the returned future abandons any in-flight discovery request.
    pub async fn resolve<T>(&self, target: &T) -> Result<String, ResolveError>
    where
        T: HomeserverTarget + ?Sized,
    {
        if let (true, Some(url)) = (self.config.force_default, &self.config.default_url) {
            return Ok(url.clone());
        }
        if let Some(url) = target.homeserver_url() {
            return Ok(url.to_string());
        }
        if let Some(url) = &self.config.default_url {
            return Ok(url.clone());
        }

        let domain = target
            .homeserver_domain()
            .ok_or(ResolveError::MissingDomain)?;
        self.resolve_domain(domain).await
    }

    /// Override, cache, then live discovery for a single domain.
    pub async fn resolve_domain(&self, domain: &str) -> Result<String, ResolveError> {
        if let Some(url) = self.config.overrides.lookup(domain) {
            debug!("Using configured homeserver override {} for {}", url, domain);
            self.cache.insert(domain, url.clone(), Utc::now());
            return Ok(url);
        }

        if let Some(url) = self.cache.get(domain, Utc::now()) {
            return Ok(url);
        }

        let url = self.discover(domain).await?;
        self.cache.insert(domain, url.clone(), Utc::now());
        info!("Discovered homeserver {} for {}", url, domain);
        Ok(url)
    }

    async fn discover(&self, domain: &str) -> Result<String, ResolveError> {
        let url = format!(
            "{}://{}/.well-known/matrix/client",
            self.config.scheme, domain
        );

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(ResolveError::Request)?;
        if resp.status() != StatusCode::OK {
            return Err(ResolveError::Status(resp.status().as_u16()));
        }

        let body = resp.bytes().await.map_err(ResolveError::Request)?;
        let well_known: WellKnownResponse =
            serde_json::from_slice(&body).map_err(|_| ResolveError::NotJson)?;
        if well_known.homeserver.base_url.is_empty() {
            return Err(ResolveError::MissingBaseUrl);
        }
        Ok(well_known.homeserver.base_url)
    }
}
