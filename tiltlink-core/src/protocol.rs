//! Line-oriented ASCII wire protocol
//!
//! Device to host:
//! - `BTN:0` / `BTN:1` - primary button
//! - `BTN2:0` / `BTN2:1` - auxiliary button
//! - `THR:<float>` - throttle, 0.0 to 1.0
//! - `<float>` - raw tilt angle in degrees
//!
//! Host to device:
//! - `SPD:<int>` - current speed (0-999) for the device display
//!
//! Tags are matched case-insensitively. Lines that match no tag and do not
//! parse as a number are dropped without touching any field.

/// Primary button tag
pub const BUTTON_TAG: &str = "BTN:";
/// Auxiliary button tag
pub const AUX_BUTTON_TAG: &str = "BTN2:";
/// Throttle tag
pub const THROTTLE_TAG: &str = "THR:";
/// Outbound speed tag
pub const SPEED_TAG: &str = "SPD:";

/// Highest speed the device display accepts
pub const MAX_SPEED_KMH: i32 = 999;

/// A classified inbound line
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TelemetryLine {
    /// Primary button state
    Button(bool),
    /// Auxiliary button state
    AuxButton(bool),
    /// Throttle, already clamped to [0, 1]
    Throttle(f32),
    /// Raw roll angle in degrees
    Roll(f32),
}

impl TelemetryLine {
    /// Classify a line received from the device.
    ///
    /// The line is trimmed first. Returns `None` for empty, unknown or
    /// malformed lines.
    pub fn parse(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        if starts_with_tag(line, BUTTON_TAG) {
            return Some(TelemetryLine::Button(line.ends_with('1')));
        }
        if starts_with_tag(line, AUX_BUTTON_TAG) {
            return Some(TelemetryLine::AuxButton(line.ends_with('1')));
        }
        if starts_with_tag(line, THROTTLE_TAG) {
            return parse_number(&line[THROTTLE_TAG.len()..])
                .map(|thr| TelemetryLine::Throttle(thr.clamp(0.0, 1.0)));
        }

        parse_number(line).map(TelemetryLine::Roll)
    }
}

/// Whether a line looks like it came from a TiltLink device.
///
/// Used while probing: a known tag is enough, the payload is not checked.
pub fn is_recognized(line: &str) -> bool {
    let line = line.trim();
    [BUTTON_TAG, AUX_BUTTON_TAG, THROTTLE_TAG]
        .iter()
        .any(|tag| starts_with_tag(line, tag))
        || parse_number(line).is_some()
}

/// Format the outbound speed line, clamping to the displayable range.
pub fn format_speed(kmh: i32) -> String {
    format!("{}{}", SPEED_TAG, kmh.clamp(0, MAX_SPEED_KMH))
}

fn starts_with_tag(line: &str, tag: &str) -> bool {
    line.get(..tag.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(tag))
}

/// Parse a finite decimal number, tolerating surrounding whitespace.
fn parse_number(text: &str) -> Option<f32> {
    text.trim().parse::<f32>().ok().filter(|v| v.is_finite())
}
