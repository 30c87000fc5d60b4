use crate::config::Config;
use crate::connection::LinkSignal;
use crate::dashboard::Dashboard;
use crate::sink::DisplaySink;
use crate::telemetry::{decode_payload, TelemetryEvent, Topic};
use anyhow::{anyhow, Result};
use chrono::Utc;
use rumqttc::{AsyncClient, Event, Incoming, MqttOptions, QoS};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::time::{sleep, Duration};

pub type SharedDashboard<S> = Arc<Mutex<Dashboard<S>>>;

/// Decodes a publish on one of the dashboard topics. Topics outside the
/// prefix yield `Ok(None)`.
pub fn route_publish(prefix: &str, topic: &str, payload: &mut [u8]) -> Result<Option<TelemetryEvent>> {
    let Some(topic) = Topic::parse(prefix, topic) else {
        return Ok(None);
    };
    decode_payload(topic, payload).map(Some)
}

pub async fn run_listener<S>(config: Config, dashboard: SharedDashboard<S>) -> Result<()>
where
    S: DisplaySink + Send + 'static,
{
    let host = config
        .mqtt_host
        .clone()
        .ok_or_else(|| anyhow!("DASHBOARD_MQTT_HOST is not set"))?;
    let filters: Vec<String> = Topic::ALL
        .iter()
        .map(|topic| topic.filter(&config.mqtt_topic_prefix))
        .collect();

    loop {
        let mut mqttoptions =
            MqttOptions::new(config.mqtt_client_id.clone(), host.clone(), config.mqtt_port);
        mqttoptions.set_keep_alive(config.mqtt_keepalive());
        if let Some(username) = &config.mqtt_username {
            mqttoptions.set_credentials(
                username.clone(),
                config.mqtt_password.clone().unwrap_or_default(),
            );
        }

        let (client, mut eventloop) = AsyncClient::new(mqttoptions, 32);

        let mut subscribed = true;
        for filter in &filters {
            if let Err(err) = client.subscribe(filter.clone(), QoS::AtLeastOnce).await {
                tracing::warn!(error=%err, topic=%filter, "failed to subscribe to MQTT; retrying");
                subscribed = false;
                break;
            }
            tracing::info!(topic=%filter, "subscribed to dashboard feed");
        }
        if !subscribed {
            dashboard.lock().await.on_link(LinkSignal::Backend(false));
            sleep(Duration::from_secs(2)).await;
            continue;
        }

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Incoming::ConnAck(_))) => {
                    tracing::info!(host=%host, port=config.mqtt_port, "connected to MQTT broker");
                    dashboard.lock().await.on_link(LinkSignal::Backend(true));
                }
                Ok(Event::Incoming(Incoming::Publish(publish))) => {
                    let received_at = Utc::now();
                    let mut payload = publish.payload.to_vec();
                    match route_publish(&config.mqtt_topic_prefix, &publish.topic, &mut payload) {
                        Ok(Some(event)) => {
                            log_samples(&event, received_at);
                            dashboard.lock().await.handle_event(event, received_at);
                        }
                        Ok(None) => {}
                        Err(err) => {
                            tracing::warn!(error=%err, topic=%publish.topic, "failed to decode MQTT payload")
                        }
                    }
                }
                Ok(_) => {}
                Err(err) => {
                    dashboard.lock().await.on_link(LinkSignal::Backend(false));
                    tracing::warn!(error=%err, "MQTT connection dropped; reconnecting");
                    break;
                }
            }
        }

        sleep(Duration::from_secs(1)).await;
    }
}

fn log_samples(event: &TelemetryEvent, received_at: chrono::DateTime<Utc>) {
    let samples = match event {
        TelemetryEvent::Environment(Some(reading)) => reading.samples(received_at),
        TelemetryEvent::Solar(Some(reading)) => reading.samples(received_at),
        TelemetryEvent::Status(status) => {
            tracing::debug!(
                last_seen = ?status.as_ref().and_then(|s| s.last_seen),
                restart_count = ?status.as_ref().and_then(|s| s.restart_count),
                "device status"
            );
            return;
        }
        _ => return,
    };
    for sample in samples {
        tracing::debug!(metric = ?sample.metric, value = ?sample.value, "telemetry sample");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routes_environment_publish() {
        let mut payload = br#"{"air_quality": 42, "temperature": "21.5", "humidity": 40}"#.to_vec();
        let event = route_publish("clearskies", "clearskies/environment", &mut payload)
            .expect("decode")
            .expect("event");
        match event {
            TelemetryEvent::Environment(Some(reading)) => {
                assert_eq!(reading.air_quality, Some(42.0));
                assert_eq!(reading.temperature, Some(21.5));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn ignores_foreign_topics() {
        let mut payload = b"{}".to_vec();
        let event = route_publish("clearskies", "othersite/environment", &mut payload).expect("decode");
        assert!(event.is_none());
    }

    #[test]
    fn surfaces_malformed_payloads() {
        let mut payload = b"{not json".to_vec();
        assert!(route_publish("clearskies", "clearskies/status", &mut payload).is_err());
    }
}
