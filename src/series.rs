use serde::Serialize;
use std::collections::VecDeque;

/// What to append when a sample arrives without a usable value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbsentPolicy {
    /// Leave the series untouched.
    Skip,
    /// Repeat the newest value, or 0 for an empty series.
    RepeatLast,
}

/// Bounded FIFO of the most recent samples for one metric.
///
/// The buffer owns the series; chart sinks only ever receive full
/// snapshots and keep no series state of their own.
#[derive(Debug, Clone)]
pub struct RollingSeries {
    name: &'static str,
    window: usize,
    policy: AbsentPolicy,
    values: VecDeque<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSnapshot {
    pub name: &'static str,
    pub data: Vec<f64>,
}

impl RollingSeries {
    pub fn new(name: &'static str, window: usize, policy: AbsentPolicy) -> Self {
        let window = window.max(1);
        Self {
            name,
            window,
            policy,
            values: VecDeque::with_capacity(window),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    /// Appends a sample, evicting the oldest values past the window.
    /// Returns whether the series changed.
    pub fn push(&mut self, value: Option<f64>) -> bool {
        let value = match (value.filter(|v| v.is_finite()), self.policy) {
            (Some(value), _) => value,
            (None, AbsentPolicy::Skip) => return false,
            (None, AbsentPolicy::RepeatLast) => self.latest().unwrap_or(0.0),
        };

        while self.values.len() >= self.window {
            self.values.pop_front();
        }
        self.values.push_back(value);
        true
    }

    pub fn snapshot(&self) -> SeriesSnapshot {
        SeriesSnapshot {
            name: self.name,
            data: self.values.iter().copied().collect(),
        }
    }
}

/// Functional form of [`RollingSeries::push`] for callers holding a plain slice.
pub fn append(series: &[f64], value: f64, window: usize) -> Vec<f64> {
    let keep = window.max(1) - 1;
    let start = series.len().saturating_sub(keep);
    let mut next = Vec::with_capacity(keep + 1);
    next.extend_from_slice(&series[start..]);
    next.push(value);
    next
}
