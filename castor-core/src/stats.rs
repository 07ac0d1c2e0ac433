//! Pipeline telemetry: per-stage timings and payload throughput.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

// ── StageTimings ─────────────────────────────────────────────────

/// Durations of the three sender stages for the most recent cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTimings {
    /// Time spent reading the display.
    pub capture: Duration,
    /// Time spent computing the XOR delta.
    pub diff: Duration,
    /// Time spent compressing the delta.
    pub compress: Duration,
}

impl StageTimings {
    /// Total pipeline time for the cycle.
    pub fn total(&self) -> Duration {
        self.capture + self.diff + self.compress
    }
}

// ── ThroughputMeter ──────────────────────────────────────────────

/// Rolling-window meter over delivered payloads.
///
/// Records `(timestamp, bytes)` per payload and derives compressed
/// throughput and frame rate over the most recent `window` duration.
pub struct ThroughputMeter {
    samples: VecDeque<(Instant, u64)>,
    window: Duration,
    total_bytes: u64,
}

impl ThroughputMeter {
    /// Create a meter with a 1-second rolling window.
    pub fn new() -> Self {
        Self::with_window(Duration::from_secs(1))
    }

    /// Create a meter with a custom window duration.
    pub fn with_window(window: Duration) -> Self {
        Self {
            samples: VecDeque::with_capacity(256),
            window,
            total_bytes: 0,
        }
    }

    /// Record that a payload of `bytes` was delivered now.
    pub fn record(&mut self, bytes: u64) {
        self.record_at(Instant::now(), bytes);
    }

    /// Record with an explicit timestamp (useful for testing).
    pub fn record_at(&mut self, when: Instant, bytes: u64) {
        self.samples.push_back((when, bytes));
        self.total_bytes += bytes;
        self.evict(when);
    }

    /// Compressed payload throughput in bytes/second over the window.
    pub fn bytes_per_sec(&self) -> u64 {
        let secs = match self.span() {
            Some(span) => span.as_secs_f64(),
            None => return 0,
        };
        (self.total_bytes as f64 / secs) as u64
    }

    /// Delivered frames per second over the window.
    pub fn frames_per_sec(&self) -> f64 {
        match self.span() {
            Some(span) => self.samples.len() as f64 / span.as_secs_f64(),
            None => 0.0,
        }
    }

    /// Number of samples currently in the window.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    // ── Internal ─────────────────────────────────────────────────

    /// Elapsed time covered by the samples, floored at 1 ms so a
    /// single sample does not divide by zero.
    fn span(&self) -> Option<Duration> {
        let (first, _) = self.samples.front()?;
        let (last, _) = self.samples.back()?;
        let d = last.duration_since(*first);
        Some(if d.is_zero() {
            Duration::from_millis(1)
        } else {
            d
        })
    }

    fn evict(&mut self, now: Instant) {
        while let Some(&(ts, bytes)) = self.samples.front() {
            if now.duration_since(ts) > self.window {
                self.samples.pop_front();
                self.total_bytes = self.total_bytes.saturating_sub(bytes);
            } else {
                break;
            }
        }
    }
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────────
