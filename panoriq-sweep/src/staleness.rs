use std::time::{Duration, SystemTime};

use log::trace;

use crate::config::LagFilterConfig;

/// Drops frames that arrive noticeably later than the pipeline's usual delay.
///
/// The receiver clock is not synchronized with ours, so the absolute one-way
/// delay of a frame is unknowable. The smallest delay observed during the
/// session is used instead as an estimate of the fixed pipeline latency, and a
/// frame is stale when its delay exceeds that estimate by more than the
/// configured lag.
#[derive(Debug, Clone)]
pub struct StalenessFilter {
    enabled: bool,
    max_lag: Duration,
    /// Signed, in microseconds: a skewed receiver clock can put captures in our future
    min_observed_delay_us: Option<i64>,
}

impl StalenessFilter {
    pub fn new(config: &LagFilterConfig) -> Self {
        Self {
            enabled: config.enabled,
            max_lag: Duration::from_millis(config.max_lag_ms),
            min_observed_delay_us: None,
        }
    }

    /// Apply new settings. The delay estimate is kept unless the filter was just enabled.
    pub fn configure(&mut self, config: &LagFilterConfig) {
        if config.enabled && !self.enabled {
            self.reset();
        }
        self.enabled = config.enabled;
        self.max_lag = Duration::from_millis(config.max_lag_ms);
    }

    /// Forget the delay estimate. Called whenever a new acquisition session starts.
    pub fn reset(&mut self) {
        self.min_observed_delay_us = None;
    }

    pub fn min_observed_delay_us(&self) -> Option<i64> {
        self.min_observed_delay_us
    }

    /// Returns true if a frame captured at `capture_time` and received at `now` is fresh.
    pub fn accept(&mut self, capture_time: SystemTime, now: SystemTime) -> bool {
        if !self.enabled {
            return true;
        }

        let observed = signed_delay_us(capture_time, now);
        let min_delay = match self.min_observed_delay_us {
            None => {
                self.min_observed_delay_us = Some(observed);
                return true;
            }
            Some(min_delay) if observed < min_delay => {
                self.min_observed_delay_us = Some(observed);
                observed
            }
            Some(min_delay) => min_delay,
        };

        let excess = observed.saturating_sub(min_delay);
        let max_lag = i64::try_from(self.max_lag.as_micros()).unwrap_or(i64::MAX);
        if excess > max_lag {
            trace!("Frame is {excess} us behind the best observed delay, dropping");
            return false;
        }
        true
    }
}

/// `now - then` in microseconds, negative if `then` is in the future.
fn signed_delay_us(then: SystemTime, now: SystemTime) -> i64 {
    match now.duration_since(then) {
        Ok(delay) => i64::try_from(delay.as_micros()).unwrap_or(i64::MAX),
        Err(err) => i64::try_from(err.duration().as_micros())
            .map(|ahead| -ahead)
            .unwrap_or(i64::MIN),
    }
}
