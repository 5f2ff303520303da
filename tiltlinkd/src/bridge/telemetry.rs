//! Telemetry slots shared between the reader task and the tick loop
//!
//! One atomic per field, last write wins. The tick loop samples each field
//! independently and tolerates values from slightly different instants.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use tiltlink_core::{TelemetryLine, TelemetrySample};

/// `f32` stored as its bit pattern
#[derive(Debug, Default)]
struct AtomicF32(AtomicU32);

impl AtomicF32 {
    fn load(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn store(&self, value: f32) {
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }
}

/// Latest value of every inbound field
#[derive(Debug, Default)]
pub struct TelemetryFields {
    roll_deg: AtomicF32,
    button: AtomicBool,
    aux_button: AtomicBool,
    throttle: AtomicF32,
}

impl TelemetryFields {
    /// Publish one classified line into its slot.
    pub fn apply(&self, line: TelemetryLine) {
        match line {
            TelemetryLine::Button(pressed) => self.button.store(pressed, Ordering::Relaxed),
            TelemetryLine::AuxButton(pressed) => self.aux_button.store(pressed, Ordering::Relaxed),
            TelemetryLine::Throttle(value) => self.throttle.store(value),
            TelemetryLine::Roll(deg) => self.roll_deg.store(deg),
        }
    }

    /// Copy every slot.
    pub fn sample(&self) -> TelemetrySample {
        TelemetrySample {
            roll_deg: self.roll_deg.load(),
            button: self.button.load(Ordering::Relaxed),
            aux_button: self.aux_button.load(Ordering::Relaxed),
            throttle: self.throttle.load(),
        }
    }
}
