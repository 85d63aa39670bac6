//! Tempo helpers. Strudel measures tempo in cycles per second (cps); prompts
//! also quote cycles per minute (cpm).

use std::collections::VecDeque;
use std::time::{Duration, Instant};

pub const MIN_CPS: f64 = 0.1;
pub const MAX_CPS: f64 = 8.0;
pub const DEFAULT_TAP_WINDOW: usize = 6;
pub const DEFAULT_TAP_TIMEOUT: Duration = Duration::from_millis(2000);

/// Clamp `cps` into `[min, max]`; `None` for non-finite input.
pub fn clamp_tempo(cps: f64, min: f64, max: f64) -> Option<f64> {
    cps.is_finite().then(|| cps.max(min).min(max))
}

pub fn cps_to_cpm(cps: f64) -> Option<f64> {
    cps.is_finite().then(|| cps * 60.0)
}

/// Round to three decimals and print without trailing zeros (`1.5`, `90`).
pub fn format_tempo_value(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    let rounded = (value * 1000.0).round() / 1000.0;
    // Avoid printing "-0"
    let rounded = if rounded == 0.0 { 0.0 } else { rounded };
    Some(rounded.to_string())
}

/// Tap-tempo estimator over a sliding window of taps.
#[derive(Debug, Clone)]
pub struct TapTempo {
    taps: VecDeque<Instant>,
    window: usize,
    timeout: Duration,
}

impl Default for TapTempo {
    fn default() -> Self {
        Self::new(DEFAULT_TAP_WINDOW, DEFAULT_TAP_TIMEOUT)
    }
}

impl TapTempo {
    pub fn new(window: usize, timeout: Duration) -> Self {
        let window = window.max(2);
        Self {
            taps: VecDeque::with_capacity(window),
            window,
            timeout,
        }
    }

    /// Record a tap and return the estimated cps once two taps are in the window.
    ///
    /// A gap longer than the timeout starts a new measurement.
    pub fn register_tap(&mut self, at: Instant) -> Option<f64> {
        if let Some(last) = self.taps.back() {
            if at.saturating_duration_since(*last) > self.timeout {
                self.taps.clear();
            }
        }
        self.taps.push_back(at);
        while self.taps.len() > self.window {
            self.taps.pop_front();
        }
        if self.taps.len() < 2 {
            return None;
        }

        let first = self.taps.front()?;
        let last = self.taps.back()?;
        let span_ms = last.saturating_duration_since(*first).as_secs_f64() * 1000.0;
        let average_ms = span_ms / (self.taps.len() - 1) as f64;
        if !average_ms.is_finite() || average_ms <= 0.0 {
            return None;
        }
        Some(1000.0 / average_ms)
    }

    pub fn reset(&mut self) {
        self.taps.clear();
    }

    pub fn count(&self) -> usize {
        self.taps.len()
    }
}
