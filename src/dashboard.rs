use crate::aqi::{AqiLevel, CompactAqiBadge, Tone, WAITING_TIP};
use crate::connection::{ConnectionAggregator, ConnectionDisplay, LinkSignal, LinkState};
use crate::format::{format_last_updated, format_reading, PLACEHOLDER};
use crate::liveness::{Liveness, LivenessClassifier, DEFAULT_OFFLINE_THRESHOLD_SECONDS};
use crate::series::{AbsentPolicy, RollingSeries};
use crate::sink::{Badge, Chart, DisplaySink, Element, Gauge};
use crate::telemetry::{DeviceStatus, EnvironmentReading, SolarReading, TelemetryEvent};
use chrono::{DateTime, Duration as ChronoDuration, Local, TimeZone, Utc};
use std::fmt::Display;

pub const DEFAULT_AQI_WINDOW: usize = 6;
pub const DEFAULT_CLIMATE_WINDOW: usize = 7;

#[derive(Debug, Clone)]
pub struct DashboardSettings {
    pub offline_threshold: ChronoDuration,
    pub aqi_window: usize,
    pub climate_window: usize,
    pub device_label: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            offline_threshold: ChronoDuration::seconds(DEFAULT_OFFLINE_THRESHOLD_SECONDS),
            aqi_window: DEFAULT_AQI_WINDOW,
            climate_window: DEFAULT_CLIMATE_WINDOW,
            device_label: "ESP32".to_string(),
        }
    }
}

/// Application state behind the dashboard page.
///
/// Owns the chart series, the connection badge state and the sink it
/// renders into. Each handler runs to completion and writes the full
/// result to the sink.
pub struct Dashboard<S, Tz: TimeZone = Local> {
    sink: S,
    tz: Tz,
    device_label: String,
    classifier: LivenessClassifier,
    aqi_trend: RollingSeries,
    temperature: RollingSeries,
    humidity: RollingSeries,
    connection: ConnectionAggregator,
    last_status: Option<DeviceStatus>,
    last_liveness: Option<Liveness>,
}

impl<S: DisplaySink> Dashboard<S, Local> {
    pub fn new(sink: S, settings: DashboardSettings) -> Self {
        Self::with_timezone(sink, settings, Local)
    }
}

impl<S, Tz> Dashboard<S, Tz>
where
    S: DisplaySink,
    Tz: TimeZone,
    Tz::Offset: Display,
{
    pub fn with_timezone(sink: S, settings: DashboardSettings, tz: Tz) -> Self {
        Self {
            sink,
            tz,
            device_label: settings.device_label,
            classifier: LivenessClassifier::new(settings.offline_threshold),
            aqi_trend: RollingSeries::new("AQI", settings.aqi_window, AbsentPolicy::Skip),
            temperature: RollingSeries::new(
                "Temperature",
                settings.climate_window,
                AbsentPolicy::RepeatLast,
            ),
            humidity: RollingSeries::new(
                "Humidity",
                settings.climate_window,
                AbsentPolicy::RepeatLast,
            ),
            connection: ConnectionAggregator::new(),
            last_status: None,
            last_liveness: None,
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn connection(&self) -> &ConnectionAggregator {
        &self.connection
    }

    pub fn last_liveness(&self) -> Option<&Liveness> {
        self.last_liveness.as_ref()
    }

    pub fn aqi_trend(&self) -> &RollingSeries {
        &self.aqi_trend
    }

    pub fn handle_event(&mut self, event: TelemetryEvent, now: DateTime<Utc>) {
        match event {
            TelemetryEvent::Status(status) => {
                self.on_status(status, now);
            }
            TelemetryEvent::Environment(reading) => self.on_environment(reading, now),
            TelemetryEvent::Solar(reading) => self.on_solar(reading),
        }
    }

    pub fn on_status(&mut self, status: Option<DeviceStatus>, now: DateTime<Utc>) -> Liveness {
        let liveness = self.classifier.classify(status.as_ref(), now, &self.tz);

        if liveness.detail.is_some() {
            if let Some(count) = status.as_ref().and_then(|status| status.restart_count) {
                self.sink.set_text(Element::RestartCount, &count.to_string());
            }
        }

        self.render_liveness(&liveness);
        self.last_status = status;
        self.last_liveness = Some(liveness.clone());
        liveness
    }

    /// Re-classifies the last pushed status against `now`, rendering only
    /// when the result differs from what is on screen.
    pub fn refresh_liveness(&mut self, now: DateTime<Utc>) -> Option<Liveness> {
        let status = self.last_status.as_ref()?;
        let liveness = self.classifier.classify(Some(status), now, &self.tz);
        if self.last_liveness.as_ref() == Some(&liveness) {
            return None;
        }
        self.render_liveness(&liveness);
        self.last_liveness = Some(liveness.clone());
        Some(liveness)
    }

    fn render_liveness(&mut self, liveness: &Liveness) {
        let tone = if liveness.is_online() {
            Tone::Green
        } else {
            Tone::Red
        };
        let mut badge = Badge::new(liveness.label(&self.device_label), tone);
        badge.title = liveness.detail.clone();
        self.sink.set_badge(Element::DeviceStatus, &badge);
    }

    pub fn on_environment(&mut self, reading: Option<EnvironmentReading>, now: DateTime<Utc>) {
        let Some(reading) = reading else {
            return;
        };

        self.sink
            .set_text(Element::AqiValue, &format_reading(reading.air_quality));
        self.sink
            .set_text(Element::Temperature, &format_reading(reading.temperature));
        self.sink
            .set_text(Element::Humidity, &format_reading(reading.humidity));

        self.render_aqi_badge(reading.air_quality);
        self.render_health(reading.air_quality);

        if let Some(aqi) = reading.air_quality {
            self.sink.set_gauge(Gauge::Aqi, aqi);
        }
        if let Some(humidity) = reading.humidity {
            self.sink.set_gauge(Gauge::Humidity, humidity);
        }

        if self.aqi_trend.push(reading.air_quality) {
            self.sink
                .render_chart(Chart::AqiTrend, &[self.aqi_trend.snapshot()]);
        }
        self.temperature.push(reading.temperature);
        self.humidity.push(reading.humidity);
        self.sink.render_chart(
            Chart::TemperatureHumidity,
            &[self.temperature.snapshot(), self.humidity.snapshot()],
        );

        self.sink
            .set_text(Element::CurrentTime, &format_last_updated(now, &self.tz));
    }

    fn render_aqi_badge(&mut self, aqi: Option<f64>) {
        let badge = match aqi.map(CompactAqiBadge::classify) {
            Some(level) => Badge::new(level.text(), level.tone()),
            None => Badge::new(PLACEHOLDER, Tone::Neutral),
        };
        self.sink.set_badge(Element::AqiBadge, &badge);
    }

    fn render_health(&mut self, aqi: Option<f64>) {
        match aqi.map(AqiLevel::classify) {
            Some(level) => {
                self.sink.set_text(Element::AqiCategory, level.category());
                self.sink
                    .set_badge(Element::HealthBadge, &Badge::new(level.badge(), level.tone()));
                self.sink.set_tips(Element::HealthTips, &level.tips());
            }
            None => {
                self.sink.set_text(Element::AqiCategory, PLACEHOLDER);
                self.sink
                    .set_badge(Element::HealthBadge, &Badge::new(PLACEHOLDER, Tone::Neutral));
                self.sink.set_tips(Element::HealthTips, &[WAITING_TIP]);
            }
        }
    }

    pub fn on_solar(&mut self, reading: Option<SolarReading>) {
        let Some(reading) = reading else {
            return;
        };
        self.sink
            .set_text(Element::ServoAngle, &format_reading(reading.servo_angle));
        self.sink.set_text(
            Element::BatteryVoltage,
            &format_reading(reading.battery_voltage),
        );
    }

    pub fn on_link(&mut self, signal: LinkSignal) -> ConnectionDisplay {
        let display = self.connection.apply(signal);
        self.render_connection(&display);
        display
    }

    pub fn on_backend_unavailable(&mut self, reason: &str) -> ConnectionDisplay {
        let display = self.connection.backend_unavailable(reason);
        self.render_connection(&display);
        display
    }

    fn render_connection(&mut self, display: &ConnectionDisplay) {
        let tone = match display.state {
            LinkState::Online => Tone::Green,
            LinkState::Offline => Tone::Red,
        };
        let badge = Badge::new(display.state.label(), tone).with_title(display.reason.clone());
        self.sink.set_badge(Element::ConnectionStatus, &badge);
    }
}
