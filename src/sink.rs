use crate::aqi::Tone;
use crate::series::SeriesSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Element {
    DeviceStatus,
    ConnectionStatus,
    RestartCount,
    AqiValue,
    AqiBadge,
    AqiCategory,
    HealthBadge,
    HealthTips,
    Temperature,
    Humidity,
    ServoAngle,
    BatteryVoltage,
    CurrentTime,
}

impl Element {
    /// Page element id the value is written to.
    pub fn id(self) -> &'static str {
        match self {
            Element::DeviceStatus => "esp32-status",
            Element::ConnectionStatus => "connection-status",
            Element::RestartCount => "restartText",
            Element::AqiValue => "aqiText",
            Element::AqiBadge => "aqiBadge",
            Element::AqiCategory => "aqiCategory",
            Element::HealthBadge => "healthBadge",
            Element::HealthTips => "healthTips",
            Element::Temperature => "tempText",
            Element::Humidity => "humidityText",
            Element::ServoAngle => "servoText",
            Element::BatteryVoltage => "batteryText",
            Element::CurrentTime => "current-time",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Gauge {
    Aqi,
    Humidity,
}

impl Gauge {
    pub fn id(self) -> &'static str {
        match self {
            Gauge::Aqi => "aqiGauge",
            Gauge::Humidity => "humidityGauge",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Chart {
    AqiTrend,
    TemperatureHumidity,
}

impl Chart {
    pub fn id(self) -> &'static str {
        match self {
            Chart::AqiTrend => "aqiTrendChart",
            Chart::TemperatureHumidity => "tempHumidityChart",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    pub text: String,
    pub tone: Tone,
    /// Hover text; `None` clears it.
    pub title: Option<String>,
}

impl Badge {
    pub fn new(text: impl Into<String>, tone: Tone) -> Self {
        Self {
            text: text.into(),
            tone,
            title: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// Write-only display surface. Implementations render what they are given
/// and never hand state back to the dashboard.
pub trait DisplaySink {
    fn set_text(&mut self, element: Element, text: &str);
    fn set_badge(&mut self, element: Element, badge: &Badge);
    fn set_tips(&mut self, element: Element, tips: &[&str]);
    fn set_gauge(&mut self, gauge: Gauge, value: f64);
    fn render_chart(&mut self, chart: Chart, series: &[SeriesSnapshot]);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementView {
    Text(String),
    Badge(Badge),
    Tips(Vec<String>),
}

/// Serializable picture of everything written to the page so far.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub elements: BTreeMap<&'static str, ElementView>,
    pub gauges: BTreeMap<&'static str, f64>,
    pub charts: BTreeMap<&'static str, Vec<SeriesSnapshot>>,
}

impl DashboardSnapshot {
    pub fn text(&self, element: Element) -> Option<&str> {
        match self.elements.get(element.id())? {
            ElementView::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn badge(&self, element: Element) -> Option<&Badge> {
        match self.elements.get(element.id())? {
            ElementView::Badge(badge) => Some(badge),
            _ => None,
        }
    }

    pub fn tips(&self, element: Element) -> Option<&[String]> {
        match self.elements.get(element.id())? {
            ElementView::Tips(tips) => Some(tips),
            _ => None,
        }
    }

    pub fn chart(&self, chart: Chart) -> Option<&[SeriesSnapshot]> {
        self.charts.get(chart.id()).map(Vec::as_slice)
    }
}

#[derive(Debug, Default)]
pub struct SnapshotSink {
    snapshot: DashboardSnapshot,
    writes: u64,
}

impl SnapshotSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> &DashboardSnapshot {
        &self.snapshot
    }

    pub fn writes(&self) -> u64 {
        self.writes
    }
}

impl DisplaySink for SnapshotSink {
    fn set_text(&mut self, element: Element, text: &str) {
        self.writes += 1;
        self.snapshot
            .elements
            .insert(element.id(), ElementView::Text(text.to_string()));
    }

    fn set_badge(&mut self, element: Element, badge: &Badge) {
        self.writes += 1;
        self.snapshot
            .elements
            .insert(element.id(), ElementView::Badge(badge.clone()));
    }

    fn set_tips(&mut self, element: Element, tips: &[&str]) {
        self.writes += 1;
        let tips = tips.iter().map(|tip| tip.to_string()).collect();
        self.snapshot
            .elements
            .insert(element.id(), ElementView::Tips(tips));
    }

    fn set_gauge(&mut self, gauge: Gauge, value: f64) {
        self.writes += 1;
        self.snapshot.gauges.insert(gauge.id(), value);
    }

    fn render_chart(&mut self, chart: Chart, series: &[SeriesSnapshot]) {
        self.writes += 1;
        self.snapshot.charts.insert(chart.id(), series.to_vec());
    }
}

/// Emits every display write as a structured log event.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DisplaySink for TracingSink {
    fn set_text(&mut self, element: Element, text: &str) {
        tracing::info!(element = element.id(), text, "display text");
    }

    fn set_badge(&mut self, element: Element, badge: &Badge) {
        tracing::info!(
            element = element.id(),
            text = %badge.text,
            tone = ?badge.tone,
            title = badge.title.as_deref().unwrap_or(""),
            "display badge"
        );
    }

    fn set_tips(&mut self, element: Element, tips: &[&str]) {
        tracing::debug!(element = element.id(), tips = ?tips, "display tips");
    }

    fn set_gauge(&mut self, gauge: Gauge, value: f64) {
        tracing::debug!(gauge = gauge.id(), value, "display gauge");
    }

    fn render_chart(&mut self, chart: Chart, series: &[SeriesSnapshot]) {
        for snapshot in series {
            tracing::debug!(
                chart = chart.id(),
                series = snapshot.name,
                points = snapshot.data.len(),
                latest = ?snapshot.data.last(),
                "chart series"
            );
        }
    }
}
