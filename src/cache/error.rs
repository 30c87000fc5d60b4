use super::lifecycle::WorkerPhase;
use super::request::RequestKey;
use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("network unreachable for {0}")]
    Unreachable(String),
}

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache store lock poisoned")]
    Poisoned,
    #[error("pre-cache fetch of {url} failed: {source}")]
    Precache {
        url: String,
        #[source]
        source: NetworkError,
    },
    #[error("pre-cache fetch of {url} returned {status}")]
    PrecacheStatus { url: String, status: StatusCode },
    #[error("cannot {action} while worker is {phase:?}")]
    InvalidPhase {
        action: &'static str,
        phase: WorkerPhase,
    },
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{key} unavailable: network failed and no cached copy exists")]
    Unavailable {
        key: RequestKey,
        #[source]
        source: NetworkError,
    },
    #[error(transparent)]
    Network(#[from] NetworkError),
}
