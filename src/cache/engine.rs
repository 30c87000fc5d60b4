use super::error::{CacheError, FetchError};
use super::lifecycle::AssetManifest;
use super::network::Network;
use super::request::{Request, RequestKey, Response};
use super::storage::CacheStorage;
use futures::future;
use reqwest::Method;
use std::fmt;
use tokio::task::JoinHandle;
use url::{Origin, Url};

/// Version tag of one cache generation, e.g. `clearskies-v1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Generation(String);

impl Generation {
    pub fn new(prefix: &str, version: &str) -> Self {
        Self(format!("{prefix}-{version}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Non-GET: straight to the network, never cached.
    Passthrough,
    /// Same-origin GET.
    StaleWhileRevalidate,
    /// Cross-origin GET.
    NetworkFirst,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseSource {
    Cache,
    Network,
}

#[derive(Debug)]
pub struct Fetched {
    pub response: Response,
    pub source: ResponseSource,
    /// Background revalidation or cache write started for this request.
    /// Dropping the handle does not cancel the task.
    pub background: Option<JoinHandle<()>>,
}

#[derive(Clone)]
pub struct CacheStrategyEngine<S, N> {
    storage: S,
    network: N,
    generation: Generation,
    origin: Origin,
}

impl<S, N> CacheStrategyEngine<S, N>
where
    S: CacheStorage,
    N: Network,
{
    pub fn new(storage: S, network: N, generation: Generation, scope: &Url) -> Self {
        Self {
            storage,
            network,
            generation,
            origin: scope.origin(),
        }
    }

    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn network(&self) -> &N {
        &self.network
    }

    pub fn strategy_for(&self, request: &Request) -> Strategy {
        if request.method != Method::GET {
            Strategy::Passthrough
        } else if request.url.origin() == self.origin {
            Strategy::StaleWhileRevalidate
        } else {
            Strategy::NetworkFirst
        }
    }

    pub async fn handle_fetch(&self, request: Request) -> Result<Fetched, FetchError> {
        match self.strategy_for(&request) {
            Strategy::Passthrough => {
                let response = self.network.fetch(&request).await?;
                Ok(Fetched {
                    response,
                    source: ResponseSource::Network,
                    background: None,
                })
            }
            Strategy::StaleWhileRevalidate => self.stale_while_revalidate(request).await,
            Strategy::NetworkFirst => self.network_first(request).await,
        }
    }

    async fn stale_while_revalidate(&self, request: Request) -> Result<Fetched, FetchError> {
        let key = request.key();
        if let Some(cached) = self.cached(&key).await {
            let background = self.spawn_revalidation(request);
            return Ok(Fetched {
                response: cached,
                source: ResponseSource::Cache,
                background: Some(background),
            });
        }

        match self.network.fetch(&request).await {
            Ok(response) => {
                let background = self.spawn_store(key, response.clone());
                Ok(Fetched {
                    response,
                    source: ResponseSource::Network,
                    background: Some(background),
                })
            }
            Err(source) => Err(FetchError::Unavailable { key, source }),
        }
    }

    async fn network_first(&self, request: Request) -> Result<Fetched, FetchError> {
        let key = request.key();
        match self.network.fetch(&request).await {
            Ok(response) => {
                let background = self.spawn_store(key, response.clone());
                Ok(Fetched {
                    response,
                    source: ResponseSource::Network,
                    background: Some(background),
                })
            }
            Err(source) => {
                tracing::debug!(key = %key, error = %source, "network failed; trying cache");
                match self.cached(&key).await {
                    Some(cached) => Ok(Fetched {
                        response: cached,
                        source: ResponseSource::Cache,
                        background: None,
                    }),
                    None => Err(FetchError::Unavailable { key, source }),
                }
            }
        }
    }

    /// A failing store reads as a miss.
    async fn cached(&self, key: &RequestKey) -> Option<Response> {
        match self.storage.lookup(key).await {
            Ok(hit) => hit,
            Err(err) => {
                tracing::warn!(key = %key, error = %err, "cache lookup failed");
                None
            }
        }
    }

    fn spawn_revalidation(&self, request: Request) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            match engine.network.fetch(&request).await {
                Ok(response) => engine.store(request.key(), response).await,
                Err(err) => {
                    tracing::debug!(url = %request.url, error = %err, "revalidation failed; keeping cached copy");
                }
            }
        })
    }

    fn spawn_store(&self, key: RequestKey, response: Response) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.store(key, response).await })
    }

    /// Writes into this engine's generation unless it has been evicted.
    async fn store(&self, key: RequestKey, response: Response) {
        match self
            .storage
            .put(self.generation.as_str(), key.clone(), response)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(key = %key, generation = %self.generation, "generation evicted; dropping cache write");
            }
            Err(err) => {
                tracing::warn!(key = %key, generation = %self.generation, error = %err, "cache write failed");
            }
        }
    }

    /// Fetches every manifest asset and stores them under the current
    /// generation. Nothing is stored unless every asset answered 2xx.
    pub async fn precache(&self, manifest: &AssetManifest) -> Result<usize, CacheError> {
        let fetches = manifest.urls().iter().map(|url| {
            let request = Request::get(url.clone());
            async move {
                let response = self.network.fetch(&request).await.map_err(|source| {
                    CacheError::Precache {
                        url: url.to_string(),
                        source,
                    }
                })?;
                if !response.ok() {
                    return Err(CacheError::PrecacheStatus {
                        url: url.to_string(),
                        status: response.status,
                    });
                }
                Ok::<_, CacheError>((request.key(), response))
            }
        });
        let entries = future::try_join_all(fetches).await?;
        let count = entries.len();
        self.storage
            .put_all(self.generation.as_str(), entries)
            .await?;
        Ok(count)
    }

    /// Deletes every generation other than the current one, whole.
    pub async fn evict_stale_generations(&self) -> Result<Vec<String>, CacheError> {
        let mut deleted = Vec::new();
        for name in self.storage.keys().await? {
            if name == self.generation.as_str() {
                continue;
            }
            if self.storage.delete(&name).await? {
                deleted.push(name);
            }
        }
        Ok(deleted)
    }
}
