use super::error::CacheError;
use super::request::{RequestKey, Response};
use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::{Arc, Mutex};

/// Named-cache store shared by every request handler and lifecycle phase.
///
/// Each name is one cache generation. Single-entry writes are atomic;
/// `put_all` is atomic as a whole. A deleted generation is never recreated
/// by `put`; only `put_all` opens a generation again.
pub trait CacheStorage: Clone + Send + Sync + 'static {
    /// Generation names in creation order.
    fn keys(&self) -> impl Future<Output = Result<Vec<String>, CacheError>> + Send;

    /// Drops a whole generation. Returns whether it existed.
    fn delete(&self, generation: &str) -> impl Future<Output = Result<bool, CacheError>> + Send;

    /// Returns `false` when `generation` was deleted and the write was dropped.
    fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: Response,
    ) -> impl Future<Output = Result<bool, CacheError>> + Send;

    fn put_all(
        &self,
        generation: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> impl Future<Output = Result<(), CacheError>> + Send;

    /// Looks `key` up across every generation, oldest first.
    fn lookup(
        &self,
        key: &RequestKey,
    ) -> impl Future<Output = Result<Option<Response>, CacheError>> + Send;
}

#[derive(Default)]
struct Generations {
    named: Vec<(String, HashMap<RequestKey, Response>)>,
    deleted: HashSet<String>,
}

impl Generations {
    fn open(&mut self, generation: &str) -> &mut HashMap<RequestKey, Response> {
        self.deleted.remove(generation);
        let index = match self.named.iter().position(|(name, _)| name == generation) {
            Some(index) => index,
            None => {
                self.named.push((generation.to_string(), HashMap::new()));
                self.named.len() - 1
            }
        };
        &mut self.named[index].1
    }
}

#[derive(Clone, Default)]
pub struct MemoryCacheStorage {
    generations: Arc<Mutex<Generations>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entry_count(&self, generation: &str) -> usize {
        self.generations
            .lock()
            .ok()
            .and_then(|guard| {
                guard
                    .named
                    .iter()
                    .find(|(name, _)| name == generation)
                    .map(|(_, entries)| entries.len())
            })
            .unwrap_or(0)
    }
}

impl CacheStorage for MemoryCacheStorage {
    async fn keys(&self) -> Result<Vec<String>, CacheError> {
        let guard = self.generations.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(guard.named.iter().map(|(name, _)| name.clone()).collect())
    }

    async fn delete(&self, generation: &str) -> Result<bool, CacheError> {
        let mut guard = self.generations.lock().map_err(|_| CacheError::Poisoned)?;
        let before = guard.named.len();
        guard.named.retain(|(name, _)| name != generation);
        let existed = guard.named.len() != before;
        if existed {
            guard.deleted.insert(generation.to_string());
        }
        Ok(existed)
    }

    async fn put(
        &self,
        generation: &str,
        key: RequestKey,
        response: Response,
    ) -> Result<bool, CacheError> {
        let mut guard = self.generations.lock().map_err(|_| CacheError::Poisoned)?;
        if guard.deleted.contains(generation) {
            return Ok(false);
        }
        guard.open(generation).insert(key, response);
        Ok(true)
    }

    async fn put_all(
        &self,
        generation: &str,
        entries: Vec<(RequestKey, Response)>,
    ) -> Result<(), CacheError> {
        let mut guard = self.generations.lock().map_err(|_| CacheError::Poisoned)?;
        guard.open(generation).extend(entries);
        Ok(())
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<Response>, CacheError> {
        let guard = self.generations.lock().map_err(|_| CacheError::Poisoned)?;
        Ok(guard
            .named
            .iter()
            .find_map(|(_, entries)| entries.get(key))
            .cloned())
    }
}
