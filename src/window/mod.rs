//! Sliding Window - time-bounded statistics over one channel
//!
//! Every engine builds its conditions on top of [`SlidingWindow`]. The window
//! keeps `(timestamp, value)` pairs inside the half-open interval
//! `(now - duration, now]`, pruning from the oldest end *before* the new
//! sample is appended, so a statistic read right after `update()` never
//! sees stale data.
//!
//! ## Coverage
//!
//! Aggregates (mean, max, min, rms) are available as soon as the buffer holds
//! a value; amplitude needs two. `difference` only reports once the channel's
//! history is strictly longer than the window, i.e. the first sample ever fed
//! in is older than `now - duration`. [`SlidingWindow::covered_statistic`]
//! applies the same gate to an aggregate for callers that must not act on a
//! partially filled window.
//!
//! ## Usage
//!
//! ```ignore
//! let mut window = SlidingWindow::new(0.5);
//! window.update(0.0, 50.0);
//! window.update(0.5, 150.0);
//! assert_eq!(window.statistic(Statistic::Mean), Some(150.0));
//! assert_eq!(window.covered_statistic(Statistic::Mean), None);
//! window.update(1.0, 150.0);
//! assert_eq!(window.covered_statistic(Statistic::Mean), Some(150.0));
//! ```

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;
use tracing::warn;

// ============================================================================
// Statistic Kinds
// ============================================================================

/// Statistic computed over a window (or taken from the current sample).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Statistic {
    Mean,
    Max,
    Min,
    /// Root mean square
    Rms,
    /// Current value, no history
    Instant,
    /// Current value minus the oldest value still in the window
    Difference,
}

impl Statistic {
    /// Parse a statistic name, accepting the usual aliases.
    ///
    /// Unknown names fall back to [`Statistic::Mean`] with a warning; they
    /// never fail configuration loading.
    pub fn parse(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" | "avg" => Statistic::Mean,
            "max" | "maximum" => Statistic::Max,
            "min" | "minimum" => Statistic::Min,
            "rms" | "rootmeansquare" => Statistic::Rms,
            "instant" | "instantaneous" => Statistic::Instant,
            "difference" | "diff" => Statistic::Difference,
            other => {
                warn!(statistic = %other, "Unknown statistic kind, falling back to mean");
                Statistic::Mean
            }
        }
    }

    /// Whether this statistic needs a buffered window.
    pub fn is_windowed(&self) -> bool {
        !matches!(self, Statistic::Instant)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Statistic::Mean => "mean",
            Statistic::Max => "max",
            Statistic::Min => "min",
            Statistic::Rms => "rms",
            Statistic::Instant => "instant",
            Statistic::Difference => "difference",
        }
    }
}

impl std::fmt::Display for Statistic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Sliding Window
// ============================================================================

/// Bounded, time-windowed buffer over a single numeric channel.
#[derive(Debug, Clone)]
pub struct SlidingWindow {
    duration: f64,
    buffer: VecDeque<(f64, f64)>, // (timestamp, value)
    first_seen: Option<f64>,
}

impl SlidingWindow {
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            buffer: VecDeque::new(),
            first_seen: None,
        }
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Append a sample, first dropping every entry with `t <= timestamp - duration`.
    pub fn update(&mut self, timestamp: f64, value: f64) {
        let cutoff = timestamp - self.duration;
        while self.buffer.front().is_some_and(|&(ts, _)| ts <= cutoff) {
            self.buffer.pop_front();
        }
        self.buffer.push_back((timestamp, value));
        if self.first_seen.is_none() {
            self.first_seen = Some(timestamp);
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Buffered timestamps, oldest first.
    pub fn timestamps(&self) -> impl Iterator<Item = f64> + '_ {
        self.buffer.iter().map(|&(ts, _)| ts)
    }

    pub fn oldest(&self) -> Option<(f64, f64)> {
        self.buffer.front().copied()
    }

    pub fn latest(&self) -> Option<(f64, f64)> {
        self.buffer.back().copied()
    }

    /// True once the channel history is strictly longer than the window.
    pub fn is_covered(&self) -> bool {
        match (self.first_seen, self.buffer.back()) {
            (Some(first), Some(&(now, _))) => first < now - self.duration,
            _ => false,
        }
    }

    /// Compute `kind` over the buffered values.
    ///
    /// `Instant` returns the most recent value, `Difference` defers to
    /// [`SlidingWindow::difference`]. Aggregates are `None` only when empty.
    pub fn statistic(&self, kind: Statistic) -> Option<f64> {
        if kind == Statistic::Instant {
            return self.latest().map(|(_, v)| v);
        }
        if kind == Statistic::Difference {
            return self.difference();
        }
        if self.is_empty() {
            return None;
        }

        let values = self.buffer.iter().map(|&(_, v)| v);
        let result = match kind {
            Statistic::Mean => Statistics::mean(values),
            Statistic::Max => Statistics::max(values),
            Statistic::Min => Statistics::min(values),
            Statistic::Rms => Statistics::quadratic_mean(values),
            Statistic::Instant | Statistic::Difference => return None,
        };
        Some(result)
    }

    /// Like [`SlidingWindow::statistic`], but `None` until the window is covered.
    pub fn covered_statistic(&self, kind: Statistic) -> Option<f64> {
        if kind.is_windowed() && !self.is_covered() {
            return None;
        }
        self.statistic(kind)
    }

    /// `max - min` over the window; needs at least two points.
    pub fn amplitude(&self) -> Option<f64> {
        if self.len() < 2 {
            return None;
        }
        let max = Statistics::max(self.buffer.iter().map(|&(_, v)| v));
        let min = Statistics::min(self.buffer.iter().map(|&(_, v)| v));
        Some(max - min)
    }

    /// Current value minus the oldest buffered value.
    pub fn difference(&self) -> Option<f64> {
        if !self.is_covered() {
            return None;
        }
        let (_, oldest) = self.oldest()?;
        let (_, current) = self.latest()?;
        Some(current - oldest)
    }
}
