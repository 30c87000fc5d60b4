//! Offline shell cache: per-request strategy selection and the versioned
//! install/activate lifecycle for the dashboard's page assets.

mod engine;
mod error;
mod lifecycle;
mod network;
mod request;
mod storage;

#[cfg(test)]
mod tests;

pub use engine::{CacheStrategyEngine, Fetched, Generation, ResponseSource, Strategy};
pub use error::{CacheError, FetchError, NetworkError};
pub use lifecycle::{ActivationReport, AssetManifest, InstallReport, ShellWorker, WorkerPhase};
pub use network::{HttpNetwork, Network};
pub use request::{Request, RequestKey, Response};
pub use storage::{CacheStorage, MemoryCacheStorage};
