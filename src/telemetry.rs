use crate::coerce::{to_integer, to_number};
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Topic {
    Status,
    Environment,
    Solar,
}

impl Topic {
    pub const ALL: [Topic; 3] = [Topic::Status, Topic::Environment, Topic::Solar];

    pub fn suffix(self) -> &'static str {
        match self {
            Topic::Status => "status",
            Topic::Environment => "environment",
            Topic::Solar => "solar",
        }
    }

    pub fn filter(self, prefix: &str) -> String {
        format!("{}/{}", prefix.trim_end_matches('/'), self.suffix())
    }

    pub fn parse(prefix: &str, topic: &str) -> Option<Self> {
        let rest = topic.strip_prefix(prefix.trim_end_matches('/'))?;
        let rest = rest.strip_prefix('/')?;
        Topic::ALL.into_iter().find(|candidate| candidate.suffix() == rest)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    AirQuality,
    Temperature,
    Humidity,
    ServoAngle,
    BatteryVoltage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: Metric,
    pub value: Option<f64>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeviceStatus {
    pub last_seen: Option<DateTime<Utc>>,
    pub restart_count: Option<i64>,
}

impl DeviceStatus {
    /// An epoch of zero is treated the same as a missing field.
    pub fn from_value(value: &Value) -> Self {
        let last_seen = to_integer(value.get("last_seen"))
            .filter(|secs| *secs != 0)
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        let restart_count = to_integer(value.get("restart_count"));
        Self {
            last_seen,
            restart_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnvironmentReading {
    pub air_quality: Option<f64>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
}

impl EnvironmentReading {
    pub fn from_value(value: &Value) -> Self {
        Self {
            air_quality: to_number(value.get("air_quality")),
            temperature: to_number(value.get("temperature")),
            humidity: to_number(value.get("humidity")),
        }
    }

    pub fn samples(&self, received_at: DateTime<Utc>) -> Vec<Sample> {
        [
            (Metric::AirQuality, self.air_quality),
            (Metric::Temperature, self.temperature),
            (Metric::Humidity, self.humidity),
        ]
        .into_iter()
        .map(|(metric, value)| Sample {
            metric,
            value,
            received_at,
        })
        .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SolarReading {
    pub servo_angle: Option<f64>,
    pub battery_voltage: Option<f64>,
}

impl SolarReading {
    pub fn from_value(value: &Value) -> Self {
        Self {
            servo_angle: to_number(value.get("servo_angle")),
            battery_voltage: to_number(value.get("battery_voltage")),
        }
    }

    pub fn samples(&self, received_at: DateTime<Utc>) -> Vec<Sample> {
        [
            (Metric::ServoAngle, self.servo_angle),
            (Metric::BatteryVoltage, self.battery_voltage),
        ]
        .into_iter()
        .map(|(metric, value)| Sample {
            metric,
            value,
            received_at,
        })
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TelemetryEvent {
    Status(Option<DeviceStatus>),
    Environment(Option<EnvironmentReading>),
    Solar(Option<SolarReading>),
}

/// Decodes a pushed payload for `topic`.
///
/// An empty payload or JSON `null` is a cleared node and decodes to `None`
/// for that topic. Any other JSON value decodes field by field, so a scalar
/// payload yields a reading with every field absent.
pub fn decode_payload(topic: Topic, payload: &mut [u8]) -> anyhow::Result<TelemetryEvent> {
    let value = if payload.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        simd_json::serde::from_slice::<Value>(payload)?
    };

    let event = match (topic, value.is_null()) {
        (Topic::Status, true) => TelemetryEvent::Status(None),
        (Topic::Status, false) => TelemetryEvent::Status(Some(DeviceStatus::from_value(&value))),
        (Topic::Environment, true) => TelemetryEvent::Environment(None),
        (Topic::Environment, false) => {
            TelemetryEvent::Environment(Some(EnvironmentReading::from_value(&value)))
        }
        (Topic::Solar, true) => TelemetryEvent::Solar(None),
        (Topic::Solar, false) => TelemetryEvent::Solar(Some(SolarReading::from_value(&value))),
    };
    Ok(event)
}
