use crate::cache::{Network, Request};
use crate::connection::LinkSignal;
use crate::mqtt::SharedDashboard;
use crate::sink::DisplaySink;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use url::Url;

/// Edge detector for the host's own connectivity. Only transitions are
/// reported, so a steady link never overwrites the backend badge.
#[derive(Debug, Default, Clone)]
pub struct ReachabilityMonitor {
    online: Option<bool>,
}

impl ReachabilityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, online: bool) -> Option<LinkSignal> {
        if self.online == Some(online) {
            return None;
        }
        self.online = Some(online);
        Some(LinkSignal::Browser(online))
    }

    pub fn online(&self) -> Option<bool> {
        self.online
    }
}

/// One connectivity sample: any HTTP answer counts as reachable, only a
/// transport failure as offline.
pub async fn probe<N: Network>(network: &N, target: &Url) -> bool {
    match network.fetch(&Request::get(target.clone())).await {
        Ok(response) => {
            tracing::trace!(url = %target, status = %response.status, "reachability sample");
            true
        }
        Err(err) => {
            tracing::debug!(url = %target, error = %err, "reachability sample failed");
            false
        }
    }
}

pub async fn run_monitor<N, S>(network: N, target: Url, interval: Duration, dashboard: SharedDashboard<S>)
where
    N: Network,
    S: DisplaySink + Send + 'static,
{
    let mut monitor = ReachabilityMonitor::new();
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        ticker.tick().await;
        let online = probe(&network, &target).await;
        if let Some(signal) = monitor.observe(online) {
            tracing::info!(online, url = %target, "host connectivity changed");
            dashboard.lock().await.on_link(signal);
        }
    }
}
