use crate::cache::{AssetManifest, Generation};
use crate::dashboard::{DashboardSettings, DEFAULT_AQI_WINDOW, DEFAULT_CLIMATE_WINDOW};
use crate::liveness::DEFAULT_OFFLINE_THRESHOLD_SECONDS;
use anyhow::{Context, Result};
use chrono::Duration as ChronoDuration;
use dotenvy::dotenv;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_ASSET_MANIFEST: &[&str] = &[
    "./",
    "./index.html",
    "./dashboard.html",
    "./features.html",
    "./how-it-works.html",
    "./contact.html",
    "./manifest.json",
    "./icons/logo.svg",
    "./pwa.js",
];

#[derive(Clone, Debug)]
pub struct Config {
    pub mqtt_host: Option<String>,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_topic_prefix: String,
    pub mqtt_keepalive_secs: u64,
    pub mqtt_client_id: String,
    pub offline_threshold_seconds: u64,
    pub liveness_poll_interval_ms: u64,
    pub aqi_window: usize,
    pub climate_window: usize,
    pub device_label: String,
    pub site_url: Option<Url>,
    pub asset_manifest: Vec<String>,
    pub cache_prefix: String,
    pub cache_version: String,
    pub fetch_timeout_secs: u64,
    pub reachability_interval_secs: u64,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let mqtt_host = non_empty_var("DASHBOARD_MQTT_HOST");
        let mqtt_port = parsed_var("DASHBOARD_MQTT_PORT").unwrap_or(1883);
        let mqtt_username = non_empty_var("DASHBOARD_MQTT_USERNAME");
        let mqtt_password = non_empty_var("DASHBOARD_MQTT_PASSWORD");
        let mqtt_topic_prefix =
            non_empty_var("DASHBOARD_MQTT_TOPIC_PREFIX").unwrap_or_else(|| "clearskies".to_string());
        let mqtt_keepalive_secs = parsed_var("DASHBOARD_MQTT_KEEPALIVE_SECS").unwrap_or(30);
        let mqtt_client_id = non_empty_var("DASHBOARD_MQTT_CLIENT_ID")
            .unwrap_or_else(|| format!("clearskies-dashboard-{}", std::process::id()));

        let offline_threshold_seconds = parsed_var("DASHBOARD_OFFLINE_THRESHOLD_SECONDS")
            .unwrap_or(DEFAULT_OFFLINE_THRESHOLD_SECONDS as u64);
        let liveness_poll_interval_ms =
            parsed_var("DASHBOARD_LIVENESS_POLL_INTERVAL_MS").unwrap_or(1000);
        let aqi_window = parsed_var("DASHBOARD_AQI_WINDOW")
            .filter(|v| *v != 0)
            .unwrap_or(DEFAULT_AQI_WINDOW);
        let climate_window = parsed_var("DASHBOARD_CLIMATE_WINDOW")
            .filter(|v| *v != 0)
            .unwrap_or(DEFAULT_CLIMATE_WINDOW);
        let device_label =
            non_empty_var("DASHBOARD_DEVICE_LABEL").unwrap_or_else(|| "ESP32".to_string());

        let site_url = non_empty_var("DASHBOARD_SITE_URL")
            .map(|raw| parse_site_url(&raw))
            .transpose()?;
        let asset_manifest = non_empty_var("DASHBOARD_ASSET_MANIFEST")
            .map(|raw| parse_asset_list(&raw))
            .unwrap_or_else(|| DEFAULT_ASSET_MANIFEST.iter().map(|s| s.to_string()).collect());
        let cache_prefix =
            non_empty_var("DASHBOARD_CACHE_PREFIX").unwrap_or_else(|| "clearskies".to_string());
        let cache_version =
            non_empty_var("DASHBOARD_CACHE_VERSION").unwrap_or_else(|| "v1".to_string());
        let fetch_timeout_secs = parsed_var("DASHBOARD_FETCH_TIMEOUT_SECS").unwrap_or(10);
        let reachability_interval_secs =
            parsed_var("DASHBOARD_REACHABILITY_INTERVAL_SECS").unwrap_or(30);
        let otlp_endpoint = non_empty_var("OTEL_EXPORTER_OTLP_ENDPOINT");

        Ok(Self {
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_topic_prefix,
            mqtt_keepalive_secs,
            mqtt_client_id,
            offline_threshold_seconds,
            liveness_poll_interval_ms,
            aqi_window,
            climate_window,
            device_label,
            site_url,
            asset_manifest,
            cache_prefix,
            cache_version,
            fetch_timeout_secs,
            reachability_interval_secs,
            otlp_endpoint,
        })
    }

    pub fn mqtt_keepalive(&self) -> Duration {
        Duration::from_secs(self.mqtt_keepalive_secs)
    }

    pub fn liveness_poll_interval(&self) -> Duration {
        Duration::from_millis(self.liveness_poll_interval_ms.max(1))
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs.max(1))
    }

    pub fn reachability_interval(&self) -> Duration {
        Duration::from_secs(self.reachability_interval_secs.max(1))
    }

    pub fn dashboard_settings(&self) -> DashboardSettings {
        DashboardSettings {
            offline_threshold: threshold_duration(self.offline_threshold_seconds),
            aqi_window: self.aqi_window,
            climate_window: self.climate_window,
            device_label: self.device_label.clone(),
        }
    }

    pub fn generation(&self) -> Generation {
        Generation::new(&self.cache_prefix, &self.cache_version)
    }

    /// Asset manifest resolved against the site scope, if one is configured.
    pub fn asset_manifest(&self) -> Result<Option<AssetManifest>> {
        let Some(scope) = self.site_url.as_ref() else {
            return Ok(None);
        };
        let manifest = AssetManifest::resolve(scope, &self.asset_manifest)
            .with_context(|| format!("invalid asset manifest entry for scope {scope}"))?;
        Ok(Some(manifest))
    }
}

/// Largest second count `chrono` represents as a duration.
const MAX_DURATION_SECONDS: u64 = (i64::MAX / 1000) as u64;

fn threshold_duration(seconds: u64) -> ChronoDuration {
    ChronoDuration::seconds(seconds.min(MAX_DURATION_SECONDS) as i64)
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parsed_var<T: FromStr>(key: &str) -> Option<T> {
    non_empty_var(key).and_then(|v| v.parse::<T>().ok())
}

/// The scope is treated as a directory so relative assets resolve under it.
fn parse_site_url(raw: &str) -> Result<Url> {
    let mut url = Url::parse(raw).with_context(|| format!("DASHBOARD_SITE_URL is not a URL: {raw}"))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_asset_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
