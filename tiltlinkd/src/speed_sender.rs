//! Rate-limited speed publisher for the device display

use std::time::Duration;
use tiltlink_core::protocol::format_speed;
use tiltlink_core::{SpeedConfig, MAX_SPEED_KMH};

use crate::bridge::LineSink;

/// Convert a velocity magnitude in m/s to a display value in km/h.
///
/// Rounding is half-to-even; truncation drops the fraction.
pub fn speed_kmh(speed_mps: f32, round_to_nearest: bool) -> i32 {
    let kmh = speed_mps * 3.6;
    let whole = if round_to_nearest {
        kmh.round_ties_even()
    } else {
        kmh.trunc()
    };
    (whole as i32).clamp(0, MAX_SPEED_KMH)
}

/// Sends `SPD:<n>` at most once per send interval
#[derive(Debug, Clone)]
pub struct SpeedPublisher {
    config: SpeedConfig,
    elapsed: Duration,
    last_sent: Option<i32>,
}

impl SpeedPublisher {
    pub fn new(config: SpeedConfig) -> Self {
        Self {
            config,
            elapsed: Duration::ZERO,
            last_sent: None,
        }
    }

    /// Last value handed to the sink, if any
    pub fn last_sent(&self) -> Option<i32> {
        self.last_sent
    }

    /// Advance by `dt` and send the current speed when due.
    ///
    /// Returns the value sent. Nothing happens, and no time accrues, while
    /// the sink reports the connection closed.
    pub async fn update<S: LineSink + ?Sized>(
        &mut self,
        sink: &S,
        speed_mps: f32,
        dt: Duration,
    ) -> Option<i32> {
        if !sink.is_connection_open() {
            return None;
        }

        self.elapsed += dt;
        if self.elapsed < self.config.send_interval() {
            return None;
        }
        self.elapsed = Duration::ZERO;

        let kmh = speed_kmh(speed_mps, self.config.round_to_nearest);
        if self.config.only_when_changed && self.last_sent == Some(kmh) {
            return None;
        }

        // Recorded even if the write fails
        sink.send_line(&format_speed(kmh)).await;
        self.last_sent = Some(kmh);
        Some(kmh)
    }
}
