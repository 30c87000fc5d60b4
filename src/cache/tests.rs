use super::*;
use reqwest::{Method, StatusCode};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use url::Url;

const SCOPE: &str = "https://dash.example.org/app/";
const MANIFEST: [&str; 4] = ["./", "./index.html", "./dashboard.html", "./pwa.js"];

/// Scripted network: serves bodies by URL, 404 for anything unknown.
/// Queued gates hold back the next calls, one gate per call; the body is
/// read when the call starts.
#[derive(Clone, Default)]
struct FakeNetwork {
    bodies: Arc<Mutex<HashMap<String, String>>>,
    offline: Arc<AtomicBool>,
    calls: Arc<AtomicUsize>,
    gates: Arc<Mutex<VecDeque<Arc<Notify>>>>,
}

impl FakeNetwork {
    fn serving(entries: &[(&str, &str)]) -> Self {
        let network = Self::default();
        for (url, body) in entries {
            network.set_body(url, body);
        }
        network
    }

    fn set_body(&self, url: &str, body: &str) {
        self.bodies
            .lock()
            .expect("bodies")
            .insert(url.to_string(), body.to_string());
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hold_next_call(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().expect("gates").push_back(gate.clone());
        gate
    }

    /// Lets spawned tasks run until `count` calls have started.
    async fn wait_for_calls(&self, count: usize) {
        while self.calls() < count {
            tokio::task::yield_now().await;
        }
    }
}

impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response, NetworkError> {
        let offline = self.offline.load(Ordering::SeqCst);
        let body = self
            .bodies
            .lock()
            .expect("bodies")
            .get(request.url.as_str())
            .cloned();
        let gate = self.gates.lock().expect("gates").pop_front();
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = gate {
            gate.notified().await;
        }
        if offline {
            return Err(NetworkError::Unreachable(request.url.to_string()));
        }
        Ok(match body {
            Some(body) => Response::new(StatusCode::OK, body),
            None => Response::new(StatusCode::NOT_FOUND, "missing"),
        })
    }
}

fn url(raw: &str) -> Url {
    Url::parse(raw).expect("url")
}

fn page(path: &str) -> Url {
    url(SCOPE).join(path).expect("join")
}

fn engine(
    storage: &MemoryCacheStorage,
    network: &FakeNetwork,
    version: &str,
) -> CacheStrategyEngine<MemoryCacheStorage, FakeNetwork> {
    CacheStrategyEngine::new(
        storage.clone(),
        network.clone(),
        Generation::new("clearskies", version),
        &url(SCOPE),
    )
}

fn manifest() -> AssetManifest {
    AssetManifest::resolve(&url(SCOPE), MANIFEST).expect("manifest")
}

fn site_network() -> FakeNetwork {
    FakeNetwork::serving(&[
        ("https://dash.example.org/app/", "root"),
        ("https://dash.example.org/app/index.html", "index"),
        ("https://dash.example.org/app/dashboard.html", "dashboard"),
        ("https://dash.example.org/app/pwa.js", "pwa"),
    ])
}

async fn settle(fetched: &mut Fetched) {
    if let Some(handle) = fetched.background.take() {
        handle.await.expect("background task");
    }
}

#[test]
fn selects_strategy_by_method_and_origin() {
    let storage = MemoryCacheStorage::new();
    let network = FakeNetwork::default();
    let engine = engine(&storage, &network, "v1");

    assert_eq!(
        engine.strategy_for(&Request::get(page("index.html"))),
        Strategy::StaleWhileRevalidate
    );
    assert_eq!(
        engine.strategy_for(&Request::get(url("https://cdn.example.net/apexcharts.js"))),
        Strategy::NetworkFirst
    );
    assert_eq!(
        engine.strategy_for(&Request::get(url("http://dash.example.org/app/index.html"))),
        Strategy::NetworkFirst
    );
    assert_eq!(
        engine.strategy_for(&Request::new(Method::POST, page("index.html"))),
        Strategy::Passthrough
    );
}

#[tokio::test]
async fn install_then_serves_manifest_offline() {
    let storage = MemoryCacheStorage::new();
    let network = site_network();
    let mut worker = ShellWorker::new(engine(&storage, &network, "v1"), manifest());

    let report = worker.install().await.expect("install");
    assert_eq!(report.generation, "clearskies-v1");
    assert_eq!(report.cached, 4);
    assert_eq!(worker.phase(), WorkerPhase::Installed);

    worker.activate().await.expect("activate");
    network.set_offline(true);

    for asset in manifest().urls() {
        let fetched = worker
            .handle_fetch(Request::get(asset.clone()))
            .await
            .expect("served offline");
        assert_eq!(fetched.source, ResponseSource::Cache);
    }
}

#[tokio::test]
async fn install_is_all_or_nothing() {
    let storage = MemoryCacheStorage::new();
    let network = FakeNetwork::serving(&[
        ("https://dash.example.org/app/", "root"),
        ("https://dash.example.org/app/index.html", "index"),
    ]);
    let mut worker = ShellWorker::new(engine(&storage, &network, "v1"), manifest());

    let err = worker.install().await.expect_err("missing asset");
    assert!(matches!(err, CacheError::PrecacheStatus { status, .. } if status == StatusCode::NOT_FOUND));
    assert_eq!(worker.phase(), WorkerPhase::Redundant);
    assert_eq!(storage.entry_count("clearskies-v1"), 0);

    let err = worker.activate().await.expect_err("redundant worker");
    assert!(matches!(err, CacheError::InvalidPhase { action: "activate", .. }));
}

#[tokio::test]
async fn install_fails_when_network_is_down() {
    let storage = MemoryCacheStorage::new();
    let network = site_network();
    network.set_offline(true);
    let mut worker = ShellWorker::new(engine(&storage, &network, "v1"), manifest());

    let err = worker.install().await.expect_err("offline");
    assert!(matches!(err, CacheError::Precache { .. }));
    assert!(storage.keys().await.expect("keys").is_empty());
}

#[tokio::test]
async fn activation_evicts_prior_generations() {
    let storage = MemoryCacheStorage::new();
    let network = site_network();

    let mut v1 = ShellWorker::new(engine(&storage, &network, "v1"), manifest());
    v1.install().await.expect("install v1");
    v1.activate().await.expect("activate v1");
    let mut extra = v1
        .handle_fetch(Request::get(page("features.html")))
        .await
        .expect("fetch");
    settle(&mut extra).await;
    assert_eq!(storage.entry_count("clearskies-v1"), 5);

    network.set_body("https://dash.example.org/app/index.html", "index v2");
    let mut v2 = ShellWorker::new(engine(&storage, &network, "v2"), manifest());
    v2.install().await.expect("install v2");
    let report = v2.activate().await.expect("activate v2");
    assert_eq!(report.deleted, vec!["clearskies-v1".to_string()]);
    assert!(report.claimed_clients);
    assert_eq!(
        storage.keys().await.expect("keys"),
        vec!["clearskies-v2".to_string()]
    );

    network.set_offline(true);
    let err = v2
        .handle_fetch(Request::get(page("features.html")))
        .await
        .expect_err("v1-only entry is gone");
    assert!(matches!(err, FetchError::Unavailable { .. }));

    let fetched = v2
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("v2 entry");
    assert_eq!(fetched.response.body, "index v2");
}

#[tokio::test]
async fn lifecycle_steps_run_in_order() {
    let storage = MemoryCacheStorage::new();
    let network = site_network();
    let mut worker = ShellWorker::new(engine(&storage, &network, "v1"), manifest());

    let err = worker.activate().await.expect_err("not installed");
    assert!(matches!(err, CacheError::InvalidPhase { action: "activate", phase: WorkerPhase::Parsed }));

    worker.install().await.expect("install");
    let err = worker.install().await.expect_err("already installed");
    assert!(matches!(err, CacheError::InvalidPhase { action: "install", .. }));
}

#[tokio::test]
async fn uncontrolled_pages_bypass_cache() {
    let storage = MemoryCacheStorage::new();
    let network = site_network();
    let mut worker = ShellWorker::new(engine(&storage, &network, "v1"), manifest());
    worker.install().await.expect("install");
    assert!(!worker.controls_clients());

    let fetched = worker
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("fetch");
    assert_eq!(fetched.source, ResponseSource::Network);
    assert!(fetched.background.is_none());
}

#[tokio::test]
async fn stale_while_revalidate_serves_cache_then_refreshes() {
    let storage = MemoryCacheStorage::new();
    let network = FakeNetwork::serving(&[("https://dash.example.org/app/index.html", "v1 body")]);
    let engine = engine(&storage, &network, "v1");

    let mut first = engine
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("miss goes to network");
    assert_eq!(first.source, ResponseSource::Network);
    settle(&mut first).await;

    network.set_body("https://dash.example.org/app/index.html", "v2 body");
    let mut second = engine
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("hit");
    assert_eq!(second.source, ResponseSource::Cache);
    assert_eq!(second.response.body, "v1 body");
    settle(&mut second).await;

    let mut third = engine
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("hit");
    assert_eq!(third.response.body, "v2 body");
    settle(&mut third).await;
    assert_eq!(network.calls(), 3);
}

#[tokio::test]
async fn stale_response_does_not_wait_for_network() {
    let storage = MemoryCacheStorage::new();
    let network = FakeNetwork::serving(&[("https://dash.example.org/app/index.html", "fresh")]);
    let gate = network.hold_next_call();
    let engine = engine(&storage, &network, "v1");
    storage
        .put(
            "clearskies-v1",
            Request::get(page("index.html")).key(),
            Response::new(StatusCode::OK, "stale"),
        )
        .await
        .expect("seed");

    let mut fetched = engine
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("hit");
    assert_eq!(fetched.response.body, "stale");

    gate.notify_one();
    settle(&mut fetched).await;
    let cached = storage
        .lookup(&Request::get(page("index.html")).key())
        .await
        .expect("lookup")
        .expect("entry");
    assert_eq!(cached.body, "fresh");
}

#[tokio::test]
async fn revalidation_failure_keeps_cached_copy() {
    let storage = MemoryCacheStorage::new();
    let network = FakeNetwork::serving(&[("https://dash.example.org/app/pwa.js", "script")]);
    let engine = engine(&storage, &network, "v1");

    let mut first = engine
        .handle_fetch(Request::get(page("pwa.js")))
        .await
        .expect("fetch");
    settle(&mut first).await;

    network.set_offline(true);
    let mut second = engine
        .handle_fetch(Request::get(page("pwa.js")))
        .await
        .expect("served from cache");
    settle(&mut second).await;
    assert_eq!(second.response.body, "script");
    assert_eq!(storage.entry_count("clearskies-v1"), 1);
}

#[tokio::test]
async fn same_origin_miss_with_network_down_fails() {
    let storage = MemoryCacheStorage::new();
    let network = FakeNetwork::default();
    network.set_offline(true);
    let engine = engine(&storage, &network, "v1");

    let err = engine
        .handle_fetch(Request::get(page("contact.html")))
        .await
        .expect_err("nothing to serve");
    let FetchError::Unavailable { key, .. } = &err else {
        panic!("unexpected error {err:?}");
    };
    assert_eq!(key.url(), "https://dash.example.org/app/contact.html");
}

#[tokio::test]
async fn network_first_prefers_network_and_falls_back() {
    let storage = MemoryCacheStorage::new();
    let cdn = "https://cdn.example.net/apexcharts.js";
    let network = FakeNetwork::serving(&[(cdn, "charts 1")]);
    let engine = engine(&storage, &network, "v1");

    let mut first = engine.handle_fetch(Request::get(url(cdn))).await.expect("fetch");
    assert_eq!(first.source, ResponseSource::Network);
    settle(&mut first).await;

    network.set_body(cdn, "charts 2");
    let mut second = engine.handle_fetch(Request::get(url(cdn))).await.expect("fetch");
    assert_eq!(second.source, ResponseSource::Network);
    assert_eq!(second.response.body, "charts 2");
    settle(&mut second).await;

    network.set_offline(true);
    let third = engine.handle_fetch(Request::get(url(cdn))).await.expect("fallback");
    assert_eq!(third.source, ResponseSource::Cache);
    assert_eq!(third.response.body, "charts 2");

    let err = engine
        .handle_fetch(Request::get(url("https://cdn.example.net/other.js")))
        .await
        .expect_err("no fallback");
    assert!(matches!(err, FetchError::Unavailable { .. }));
}

#[tokio::test]
async fn error_statuses_are_cached_like_any_response() {
    let storage = MemoryCacheStorage::new();
    let network = FakeNetwork::default();
    let engine = engine(&storage, &network, "v1");

    let mut fetched = engine
        .handle_fetch(Request::get(url("https://cdn.example.net/gone.js")))
        .await
        .expect("404 is still a response");
    assert_eq!(fetched.response.status, StatusCode::NOT_FOUND);
    settle(&mut fetched).await;
    assert_eq!(storage.entry_count("clearskies-v1"), 1);
}

#[tokio::test]
async fn non_get_requests_are_never_cached() {
    let storage = MemoryCacheStorage::new();
    let network = site_network();
    let engine = engine(&storage, &network, "v1");

    let fetched = engine
        .handle_fetch(Request::new(Method::POST, page("index.html")))
        .await
        .expect("passthrough");
    assert_eq!(fetched.source, ResponseSource::Network);
    assert!(fetched.background.is_none());
    assert!(storage.keys().await.expect("keys").is_empty());

    network.set_offline(true);
    let err = engine
        .handle_fetch(Request::new(Method::POST, page("index.html")))
        .await
        .expect_err("no cache fallback");
    assert!(matches!(err, FetchError::Network(_)));
}

#[tokio::test]
async fn late_write_from_evicted_generation_is_dropped() {
    let storage = MemoryCacheStorage::new();
    let network = site_network();
    network.set_body("https://dash.example.org/app/features.html", "features");

    let mut v1 = ShellWorker::new(engine(&storage, &network, "v1"), manifest());
    v1.install().await.expect("install v1");
    v1.activate().await.expect("activate v1");
    let mut miss = v1
        .handle_fetch(Request::get(page("features.html")))
        .await
        .expect("fetch");
    settle(&mut miss).await;

    let gate = network.hold_next_call();
    let calls_before = network.calls();
    let mut revalidating = v1
        .handle_fetch(Request::get(page("features.html")))
        .await
        .expect("hit");
    assert_eq!(revalidating.source, ResponseSource::Cache);
    network.wait_for_calls(calls_before + 1).await;

    let mut v2 = ShellWorker::new(engine(&storage, &network, "v2"), manifest());
    v2.install().await.expect("install v2");
    v2.activate().await.expect("activate v2");

    gate.notify_one();
    settle(&mut revalidating).await;
    assert_eq!(
        storage.keys().await.expect("keys"),
        vec!["clearskies-v2".to_string()]
    );
    assert_eq!(storage.entry_count("clearskies-v1"), 0);

    network.set_offline(true);
    let err = v2
        .handle_fetch(Request::get(page("features.html")))
        .await
        .expect_err("v1 entry stays evicted");
    assert!(matches!(err, FetchError::Unavailable { .. }));
}

#[tokio::test]
async fn overlapping_revalidations_keep_the_last_write() {
    let storage = MemoryCacheStorage::new();
    let index = "https://dash.example.org/app/index.html";
    let network = FakeNetwork::serving(&[(index, "body a")]);
    let engine = engine(&storage, &network, "v1");
    storage
        .put(
            "clearskies-v1",
            Request::get(page("index.html")).key(),
            Response::new(StatusCode::OK, "seed"),
        )
        .await
        .expect("seed");

    let gate_a = network.hold_next_call();
    let gate_b = network.hold_next_call();

    let mut first = engine
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("hit");
    network.wait_for_calls(1).await;

    network.set_body(index, "body b");
    let mut second = engine
        .handle_fetch(Request::get(page("index.html")))
        .await
        .expect("hit");
    network.wait_for_calls(2).await;

    gate_b.notify_one();
    settle(&mut second).await;
    gate_a.notify_one();
    settle(&mut first).await;

    let cached = storage
        .lookup(&Request::get(page("index.html")).key())
        .await
        .expect("lookup")
        .expect("entry");
    assert_eq!(cached.body, "body a");
    assert_eq!(storage.entry_count("clearskies-v1"), 1);
}
