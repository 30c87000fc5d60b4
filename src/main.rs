use anyhow::Result;
use chrono::Utc;
use clearskies_dashboard::cache::{
    CacheStrategyEngine, HttpNetwork, MemoryCacheStorage, Request, ShellWorker,
};
use clearskies_dashboard::config::Config;
use clearskies_dashboard::dashboard::Dashboard;
use clearskies_dashboard::mqtt::{self, SharedDashboard};
use clearskies_dashboard::reachability;
use clearskies_dashboard::sink::TracingSink;
use futures::future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,clearskies_dashboard=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "clearskies-dashboard"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return String::new();
    }
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

/// Installs and activates the offline shell for the configured site, then
/// loads the scope root through it once.
async fn warm_shell_cache(config: &Config) -> Result<()> {
    let (Some(scope), Some(manifest)) = (config.site_url.clone(), config.asset_manifest()?) else {
        tracing::info!("DASHBOARD_SITE_URL not set; shell cache disabled");
        return Ok(());
    };

    let network = HttpNetwork::new(config.fetch_timeout())?;
    let engine = CacheStrategyEngine::new(
        MemoryCacheStorage::new(),
        network,
        config.generation(),
        &scope,
    );
    let mut worker = ShellWorker::new(engine, manifest);
    let installed = worker.install().await?;
    let activated = worker.activate().await?;
    tracing::info!(
        generation = %activated.generation,
        cached = installed.cached,
        evicted = activated.deleted.len(),
        "shell cache ready"
    );

    let fetched = worker.handle_fetch(Request::get(scope.clone())).await?;
    tracing::info!(
        url = %scope,
        status = %fetched.response.status,
        source = ?fetched.source,
        "shell root served"
    );
    if let Some(handle) = fetched.background {
        if let Err(err) = handle.await {
            tracing::warn!(error=%err, "shell revalidation task failed");
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;

    let dashboard: SharedDashboard<TracingSink> = Arc::new(Mutex::new(Dashboard::new(
        TracingSink,
        config.dashboard_settings(),
    )));

    let shell_handle = {
        let config_clone = config.clone();
        tokio::spawn(async move {
            if let Err(err) = warm_shell_cache(&config_clone).await {
                tracing::error!(error=%err, "shell cache setup failed");
            }
        })
    };

    let mqtt_handle = if config.mqtt_host.is_some() {
        let config_clone = config.clone();
        let dashboard_clone = dashboard.clone();
        Some(tokio::spawn(async move {
            mqtt::run_listener(config_clone, dashboard_clone).await
        }))
    } else {
        tracing::error!("DASHBOARD_MQTT_HOST not set; realtime backend unavailable");
        dashboard
            .lock()
            .await
            .on_backend_unavailable("Realtime backend not configured");
        None
    };

    let reachability_handle = match config.site_url.clone() {
        Some(target) => {
            let network = HttpNetwork::new(config.fetch_timeout())?;
            let interval = config.reachability_interval();
            let dashboard = dashboard.clone();
            Some(tokio::spawn(async move {
                reachability::run_monitor(network, target, interval, dashboard).await
            }))
        }
        None => None,
    };

    let liveness_handle = {
        let dashboard = dashboard.clone();
        let interval = config.liveness_poll_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                dashboard.lock().await.refresh_liveness(Utc::now());
            }
        })
    };

    tokio::select! {
        _ = async {
            if let Some(handle) = mqtt_handle {
                match handle.await {
                    Ok(Err(err)) => tracing::error!(error=%err, "MQTT listener exited"),
                    Err(err) => tracing::warn!(error=%err, "MQTT task failed"),
                    Ok(Ok(())) => {}
                }
            } else {
                future::pending::<()>().await;
            }
        } => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }

    liveness_handle.abort();
    shell_handle.abort();
    if let Some(handle) = reachability_handle {
        handle.abort();
    }

    Ok(())
}
