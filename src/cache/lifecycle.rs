use super::engine::{CacheStrategyEngine, Fetched, ResponseSource};
use super::error::{CacheError, FetchError};
use super::network::Network;
use super::request::Request;
use super::storage::CacheStorage;
use url::Url;

/// Page assets pre-warmed at install, resolved against the site scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    urls: Vec<Url>,
}

impl AssetManifest {
    pub fn resolve<I, T>(scope: &Url, entries: I) -> Result<Self, url::ParseError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let mut urls: Vec<Url> = Vec::new();
        for entry in entries {
            let url = scope.join(entry.as_ref().trim())?;
            if !urls.contains(&url) {
                urls.push(url);
            }
        }
        Ok(Self { urls })
    }

    pub fn urls(&self) -> &[Url] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerPhase {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    Redundant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub generation: String,
    pub cached: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
    pub generation: String,
    pub deleted: Vec<String>,
    pub claimed_clients: bool,
}

/// Install/activate lifecycle around a [`CacheStrategyEngine`].
///
/// Install skips the waiting phase, and activation claims open pages at
/// once, so a new generation takes over without a reload. Until the worker
/// is activated it controls no pages and fetches go straight to the
/// network.
pub struct ShellWorker<S, N> {
    engine: CacheStrategyEngine<S, N>,
    manifest: AssetManifest,
    phase: WorkerPhase,
    controls_clients: bool,
}

impl<S, N> ShellWorker<S, N>
where
    S: CacheStorage,
    N: Network,
{
    pub fn new(engine: CacheStrategyEngine<S, N>, manifest: AssetManifest) -> Self {
        Self {
            engine,
            manifest,
            phase: WorkerPhase::Parsed,
            controls_clients: false,
        }
    }

    pub fn phase(&self) -> WorkerPhase {
        self.phase
    }

    pub fn controls_clients(&self) -> bool {
        self.controls_clients
    }

    pub fn engine(&self) -> &CacheStrategyEngine<S, N> {
        &self.engine
    }

    pub async fn install(&mut self) -> Result<InstallReport, CacheError> {
        if self.phase != WorkerPhase::Parsed {
            return Err(CacheError::InvalidPhase {
                action: "install",
                phase: self.phase,
            });
        }

        self.phase = WorkerPhase::Installing;
        match self.engine.precache(&self.manifest).await {
            Ok(cached) => {
                self.phase = WorkerPhase::Installed;
                let generation = self.engine.generation().to_string();
                tracing::info!(%generation, cached, "shell cache installed");
                Ok(InstallReport { generation, cached })
            }
            Err(err) => {
                self.phase = WorkerPhase::Redundant;
                tracing::warn!(generation = %self.engine.generation(), error = %err, "shell cache install failed");
                Err(err)
            }
        }
    }

    pub async fn activate(&mut self) -> Result<ActivationReport, CacheError> {
        if self.phase != WorkerPhase::Installed {
            return Err(CacheError::InvalidPhase {
                action: "activate",
                phase: self.phase,
            });
        }

        self.phase = WorkerPhase::Activating;
        let deleted = match self.engine.evict_stale_generations().await {
            Ok(deleted) => deleted,
            Err(err) => {
                self.phase = WorkerPhase::Installed;
                return Err(err);
            }
        };
        self.phase = WorkerPhase::Activated;
        self.controls_clients = true;

        let generation = self.engine.generation().to_string();
        tracing::info!(%generation, deleted = ?deleted, "shell cache activated");
        Ok(ActivationReport {
            generation,
            deleted,
            claimed_clients: self.controls_clients,
        })
    }

    pub async fn handle_fetch(&self, request: Request) -> Result<Fetched, FetchError> {
        if !self.controls_clients {
            let response = self.engine.network().fetch(&request).await?;
            return Ok(Fetched {
                response,
                source: ResponseSource::Network,
                background: None,
            });
        }
        self.engine.handle_fetch(request).await
    }
}
