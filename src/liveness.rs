use crate::format::{format_duration, format_last_seen};
use crate::telemetry::DeviceStatus;
use chrono::{DateTime, Duration as ChronoDuration, TimeZone, Utc};
use std::fmt::Display;

pub const DEFAULT_OFFLINE_THRESHOLD_SECONDS: i64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessState {
    NoData,
    Online,
    Offline { elapsed_seconds: u64, duration: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Liveness {
    pub state: LivenessState,
    /// Absolute last-seen time in the viewer's zone; `None` without a timestamp.
    pub detail: Option<String>,
}

impl Liveness {
    pub fn is_online(&self) -> bool {
        matches!(self.state, LivenessState::Online)
    }

    pub fn label(&self, device: &str) -> String {
        match &self.state {
            LivenessState::NoData => format!("{device}: OFFLINE (NO DATA)"),
            LivenessState::Online => format!("{device}: ONLINE"),
            LivenessState::Offline { duration, .. } => format!("{device}: OFFLINE ({duration})"),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct LivenessClassifier {
    threshold: ChronoDuration,
}

impl Default for LivenessClassifier {
    fn default() -> Self {
        Self::new(ChronoDuration::seconds(DEFAULT_OFFLINE_THRESHOLD_SECONDS))
    }
}

impl LivenessClassifier {
    pub fn new(threshold: ChronoDuration) -> Self {
        Self {
            threshold: threshold.max(ChronoDuration::zero()),
        }
    }

    pub fn threshold(&self) -> ChronoDuration {
        self.threshold
    }

    /// Classifies a status push against `now`.
    ///
    /// A last-seen time in the future counts as online; the elapsed time is
    /// never assumed to be monotonic across pushes.
    pub fn classify<Tz>(&self, status: Option<&DeviceStatus>, now: DateTime<Utc>, tz: &Tz) -> Liveness
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let Some(last_seen) = status.and_then(|status| status.last_seen) else {
            return Liveness {
                state: LivenessState::NoData,
                detail: None,
            };
        };

        // Whole epoch seconds on both sides; sub-second parts of `now` are dropped.
        let elapsed = now.timestamp().saturating_sub(last_seen.timestamp());
        let state = if elapsed <= self.threshold.num_seconds() {
            LivenessState::Online
        } else {
            let elapsed_seconds = elapsed.max(0) as u64;
            LivenessState::Offline {
                elapsed_seconds,
                duration: format_duration(elapsed_seconds),
            }
        };

        Liveness {
            state,
            detail: Some(format_last_seen(last_seen, tz)),
        }
    }
}
