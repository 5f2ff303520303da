//! Downstream actuation binders
//!
//! These map the published steering outputs onto host capabilities. The host
//! implements [`DriveInput`] and [`IgnitionSink`] for whatever type receives
//! the values; the binders never inspect that type.

use crate::steering::SteeringOutputs;

/// Brake values above this zero the throttle
pub const BRAKE_PRECEDENCE_THRESHOLD: f32 = 0.05;

/// Host capability receiving drive inputs
pub trait DriveInput {
    fn set_steer(&mut self, steer: f32);
    fn set_throttle(&mut self, throttle: f32);
    fn set_brake(&mut self, brake: f32);
    /// Defaults to a no-op for hosts without a reverse gear input
    fn set_reverse(&mut self, _reverse: bool) {}
}

/// Drive values produced for one tick
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    pub steer: f32,
    pub throttle: f32,
    pub brake: f32,
}

/// Maps outputs to steer/throttle/brake, primary button = brake
#[derive(Debug, Clone)]
pub struct DriveBinder {
    pub invert_steer: bool,
    /// Multiplier applied after the dead-zone
    pub steer_gain: f32,
    /// Steer magnitudes below this collapse to 0
    pub steer_dead_zone: f32,
}

impl Default for DriveBinder {
    fn default() -> Self {
        Self {
            invert_steer: false,
            steer_gain: 1.0,
            steer_dead_zone: 0.0,
        }
    }
}

impl DriveBinder {
    pub fn command(&self, outputs: &SteeringOutputs) -> DriveCommand {
        let mut steer = outputs.steer;
        if self.invert_steer {
            steer = -steer;
        }
        if steer.abs() < self.steer_dead_zone {
            steer = 0.0;
        }
        let steer = (steer * self.steer_gain).clamp(-1.0, 1.0);

        let brake = if outputs.button_pressed { 1.0 } else { 0.0 };
        let throttle = if brake > BRAKE_PRECEDENCE_THRESHOLD {
            0.0
        } else {
            outputs.throttle.clamp(0.0, 1.0)
        };

        DriveCommand {
            steer,
            throttle,
            brake,
        }
    }

    /// Compute the command and push it into the host.
    pub fn apply<D: DriveInput + ?Sized>(&self, outputs: &SteeringOutputs, host: &mut D) {
        let cmd = self.command(outputs);
        host.set_steer(cmd.steer);
        host.set_throttle(cmd.throttle);
        host.set_brake(cmd.brake);
        host.set_reverse(false);
    }
}

/// Ignition levels for hosts with a multi-position key
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnitionLevel {
    Off = 0,
    Acc = 1,
    On = 2,
    Start = 3,
}

/// How a host represents its ignition input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnitionRepr {
    /// A single on/off starter switch
    Switch,
    /// A key with [`IgnitionLevel`] positions
    Level,
}

/// Host capability receiving ignition commands
pub trait IgnitionSink {
    fn repr(&self) -> IgnitionRepr;
    /// Called only for [`IgnitionRepr::Switch`] sinks
    fn set_switch(&mut self, on: bool);
    /// Called only for [`IgnitionRepr::Level`] sinks
    fn set_level(&mut self, level: IgnitionLevel);
}

/// Length of the starter pulse for switch sinks, in seconds
const SWITCH_PULSE_SECS: f32 = 0.02;

/// Ignition binder settings
#[derive(Debug, Clone)]
pub struct IgnitionConfig {
    /// Level sent on a press
    pub press_level: IgnitionLevel,
    /// How long `press_level` is held
    pub start_hold_secs: f32,
    /// Level restored after the pulse
    pub after_start_level: IgnitionLevel,
    /// The button must stay released this long before presses count
    pub arm_when_released_secs: f32,
    /// Drive the sink to Off when the binder is created
    pub force_off_on_create: bool,
}

impl Default for IgnitionConfig {
    fn default() -> Self {
        Self {
            press_level: IgnitionLevel::Start,
            start_hold_secs: 0.25,
            after_start_level: IgnitionLevel::On,
            arm_when_released_secs: 0.3,
            force_off_on_create: true,
        }
    }
}

/// Turns auxiliary button presses into ignition pulses.
///
/// Presses are ignored until the button has been seen released for
/// `arm_when_released_secs`, so a button held at startup never cranks the
/// engine.
#[derive(Debug)]
pub struct IgnitionBinder<S: IgnitionSink> {
    sink: S,
    config: IgnitionConfig,
    prev_button: bool,
    pulse_remaining: f32,
    armed: bool,
    released_for: f32,
}

impl<S: IgnitionSink> IgnitionBinder<S> {
    pub fn new(mut sink: S, config: IgnitionConfig) -> Self {
        if config.force_off_on_create {
            match sink.repr() {
                IgnitionRepr::Switch => sink.set_switch(false),
                IgnitionRepr::Level => sink.set_level(IgnitionLevel::Off),
            }
        }
        Self {
            sink,
            config,
            prev_button: false,
            pulse_remaining: 0.0,
            armed: false,
            released_for: 0.0,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Advance by `dt` seconds with the current auxiliary button state.
    pub fn update(&mut self, button: bool, dt: f32) {
        if !self.armed {
            if button {
                self.released_for = 0.0;
            } else {
                self.released_for += dt;
                if self.released_for >= self.config.arm_when_released_secs {
                    self.armed = true;
                }
            }
        }

        if self.armed && button && !self.prev_button {
            match self.sink.repr() {
                IgnitionRepr::Switch => {
                    self.sink.set_switch(true);
                    self.pulse_remaining = SWITCH_PULSE_SECS;
                }
                IgnitionRepr::Level => {
                    self.sink.set_level(self.config.press_level);
                    self.pulse_remaining = self.config.start_hold_secs.max(0.0);
                }
            }
        }

        if self.pulse_remaining > 0.0 {
            self.pulse_remaining -= dt;
            if self.pulse_remaining <= 0.0 {
                self.rest();
            }
        }

        if !button && self.prev_button && self.pulse_remaining <= 0.0 {
            self.rest();
        }

        self.prev_button = button;
    }

    fn rest(&mut self) {
        match self.sink.repr() {
            IgnitionRepr::Switch => self.sink.set_switch(false),
            IgnitionRepr::Level => self.sink.set_level(self.config.after_start_level),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingDrive {
        steer: f32,
        throttle: f32,
        brake: f32,
    }

    impl DriveInput for RecordingDrive {
        fn set_steer(&mut self, steer: f32) {
            self.steer = steer;
        }
        fn set_throttle(&mut self, throttle: f32) {
            self.throttle = throttle;
        }
        fn set_brake(&mut self, brake: f32) {
            self.brake = brake;
        }
    }

    struct RecordingIgnition {
        repr: IgnitionRepr,
        switches: Vec<bool>,
        levels: Vec<IgnitionLevel>,
    }

    impl RecordingIgnition {
        fn new(repr: IgnitionRepr) -> Self {
            Self {
                repr,
                switches: Vec::new(),
                levels: Vec::new(),
            }
        }
    }

    impl IgnitionSink for RecordingIgnition {
        fn repr(&self) -> IgnitionRepr {
            self.repr
        }
        fn set_switch(&mut self, on: bool) {
            self.switches.push(on);
        }
        fn set_level(&mut self, level: IgnitionLevel) {
            self.levels.push(level);
        }
    }

    #[test]
    fn test_brake_zeroes_throttle() {
        let outputs = SteeringOutputs {
            steer: 0.5,
            throttle: 0.8,
            button_pressed: true,
            ..Default::default()
        };

        let mut host = RecordingDrive::default();
        DriveBinder::default().apply(&outputs, &mut host);

        assert_eq!(host.steer, 0.5);
        assert_eq!(host.throttle, 0.0);
        assert_eq!(host.brake, 1.0);
    }

    #[test]
    fn test_drive_gain_dead_zone_and_inversion() {
        let binder = DriveBinder {
            invert_steer: true,
            steer_gain: 2.0,
            steer_dead_zone: 0.1,
        };

        let small = SteeringOutputs {
            steer: 0.05,
            ..Default::default()
        };
        assert_eq!(binder.command(&small).steer, 0.0);

        let large = SteeringOutputs {
            steer: 0.75,
            throttle: 0.3,
            ..Default::default()
        };
        let cmd = binder.command(&large);
        assert_eq!(cmd.steer, -1.0);
        assert_eq!(cmd.throttle, 0.3);
        assert_eq!(cmd.brake, 0.0);
    }

    #[test]
    fn test_ignition_forces_off_on_create() {
        let binder = IgnitionBinder::new(
            RecordingIgnition::new(IgnitionRepr::Level),
            IgnitionConfig::default(),
        );
        assert_eq!(binder.sink().levels, vec![IgnitionLevel::Off]);
        assert!(!binder.is_armed());
    }

    #[test]
    fn test_ignition_ignores_button_held_at_startup() {
        let mut binder = IgnitionBinder::new(
            RecordingIgnition::new(IgnitionRepr::Level),
            IgnitionConfig::default(),
        );

        for _ in 0..20 {
            binder.update(true, 0.1);
        }
        assert!(!binder.is_armed());
        assert_eq!(binder.sink().levels, vec![IgnitionLevel::Off]);
    }

    #[test]
    fn test_ignition_level_pulse() {
        let mut binder = IgnitionBinder::new(
            RecordingIgnition::new(IgnitionRepr::Level),
            IgnitionConfig::default(),
        );

        // Arm: released for at least 0.3 s
        for _ in 0..4 {
            binder.update(false, 0.1);
        }
        assert!(binder.is_armed());

        // Press and hold past the start pulse
        binder.update(true, 0.1);
        assert_eq!(binder.sink().levels.last(), Some(&IgnitionLevel::Start));
        binder.update(true, 0.1);
        binder.update(true, 0.1);
        assert_eq!(binder.sink().levels.last(), Some(&IgnitionLevel::On));

        assert_eq!(
            binder.sink().levels,
            vec![IgnitionLevel::Off, IgnitionLevel::Start, IgnitionLevel::On]
        );
    }

    #[test]
    fn test_ignition_switch_pulse() {
        let mut binder = IgnitionBinder::new(
            RecordingIgnition::new(IgnitionRepr::Switch),
            IgnitionConfig::default(),
        );
        for _ in 0..4 {
            binder.update(false, 0.1);
        }

        binder.update(true, 0.016);
        binder.update(true, 0.016);
        binder.update(false, 0.016);

        assert_eq!(binder.sink().switches, vec![false, true, false, false]);
        assert!(binder.sink().levels.is_empty());
    }
}
