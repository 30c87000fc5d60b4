pub mod aqi;
pub mod cache;
pub mod coerce;
pub mod config;
pub mod connection;
pub mod dashboard;
pub mod format;
pub mod liveness;
pub mod mqtt;
pub mod reachability;
pub mod series;
pub mod sink;
pub mod telemetry;
