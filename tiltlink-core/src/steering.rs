//! Steering math and change detection
//!
//! [`SteeringFilter`] turns one raw telemetry sample per tick into the
//! published outputs and the change events raised for them. It owns all
//! derived state and is driven from a single context.

use crate::config::SteeringConfig;

/// Raw field values copied out of the shared telemetry slots
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TelemetrySample {
    pub roll_deg: f32,
    pub button: bool,
    pub aux_button: bool,
    pub throttle: f32,
}

/// Change notification raised by a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    SteerChanged(f32),
    ButtonChanged(bool),
    AuxButtonChanged(bool),
    ThrottleChanged(f32),
}

/// Published outputs, readable by the host after each tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SteeringOutputs {
    /// Last raw roll angle copied from the reader
    pub roll_deg_raw: f32,
    /// Roll angle after the first smoothing stage
    pub roll_deg_filtered: f32,
    /// Published steer, -1..1
    pub steer: f32,
    pub button_pressed: bool,
    pub aux_button_pressed: bool,
    /// Published throttle, 0..1
    pub throttle: f32,
}

/// Unity-style lerp: `t` is clamped to [0, 1].
#[inline]
pub fn lerp(from: f32, to: f32, t: f32) -> f32 {
    from + (to - from) * t.clamp(0.0, 1.0)
}

/// Single-precision "close enough" comparison used for change detection.
///
/// Relative tolerance is `1e-6` of the larger magnitude. The absolute floor
/// is `8 * f32::EPSILON` (about `9.5e-7`), much coarser than a subnormal-scale
/// epsilon: near zero, values that differ only by filter rounding compare
/// equal and raise no event.
#[inline]
pub fn approximately(a: f32, b: f32) -> bool {
    (b - a).abs() < (1e-6 * a.abs().max(b.abs())).max(f32::EPSILON * 8.0)
}

/// Collapse angles inside the dead-zone to exactly zero.
#[inline]
pub fn apply_dead_zone(deg: f32, dead_zone_deg: f32) -> f32 {
    if deg.abs() < dead_zone_deg {
        0.0
    } else {
        deg
    }
}

/// Map an angle from `[min_deg, max_deg]` onto `[-1, 1]`.
///
/// The domain is not clamped: angles outside the range extrapolate past
/// ±1. A degenerate range maps everything to 0.
#[inline]
pub fn remap_to_unit(deg: f32, min_deg: f32, max_deg: f32) -> f32 {
    let span = max_deg - min_deg;
    if span == 0.0 {
        return 0.0;
    }
    let t = (deg - min_deg) / span;
    -1.0 + 2.0 * t
}

/// Steer for an (already smoothed) angle, before output smoothing.
pub fn steer_for_angle(deg: f32, config: &SteeringConfig) -> f32 {
    let deg = apply_dead_zone(deg, config.dead_zone_deg);
    let mut steer = remap_to_unit(deg, config.input_min_deg, config.input_max_deg)
        * config.sensitivity;
    if config.invert {
        steer = -steer;
    }
    steer.clamp(-1.0, 1.0)
}

/// Per-tick filter owning every derived output
#[derive(Debug, Clone)]
pub struct SteeringFilter {
    config: SteeringConfig,
    outputs: SteeringOutputs,
    /// Steer before output smoothing, from the last tick
    steer_normalized: f32,
    /// Output-smoothing accumulator
    steer_smoothed: f32,
}

impl SteeringFilter {
    pub fn new(config: SteeringConfig) -> Self {
        Self {
            config,
            outputs: SteeringOutputs::default(),
            steer_normalized: 0.0,
            steer_smoothed: 0.0,
        }
    }

    pub fn config(&self) -> &SteeringConfig {
        &self.config
    }

    pub fn outputs(&self) -> &SteeringOutputs {
        &self.outputs
    }

    /// Steer computed this tick before output smoothing
    pub fn steer_normalized(&self) -> f32 {
        self.steer_normalized
    }

    /// Advance one tick.
    ///
    /// Events come back in fixed order: steer, button, aux button, throttle.
    /// Values equal to the published ones (within tolerance) raise nothing.
    pub fn update(&mut self, sample: TelemetrySample) -> Vec<InputEvent> {
        let mut events = Vec::new();
        let blend = 1.0 - self.config.smoothing;

        self.outputs.roll_deg_raw = sample.roll_deg;
        self.outputs.roll_deg_filtered =
            lerp(self.outputs.roll_deg_filtered, sample.roll_deg, blend);

        self.steer_normalized = steer_for_angle(self.outputs.roll_deg_filtered, &self.config);
        self.steer_smoothed = lerp(self.steer_smoothed, self.steer_normalized, blend);

        if !approximately(self.steer_smoothed, self.outputs.steer) {
            self.outputs.steer = self.steer_smoothed;
            events.push(InputEvent::SteerChanged(self.outputs.steer));
        }

        if sample.button != self.outputs.button_pressed {
            self.outputs.button_pressed = sample.button;
            events.push(InputEvent::ButtonChanged(sample.button));
        }
        if sample.aux_button != self.outputs.aux_button_pressed {
            self.outputs.aux_button_pressed = sample.aux_button;
            events.push(InputEvent::AuxButtonChanged(sample.aux_button));
        }

        if !approximately(sample.throttle, self.outputs.throttle) {
            self.outputs.throttle = sample.throttle;
            events.push(InputEvent::ThrottleChanged(sample.throttle));
        }

        events
    }
}
