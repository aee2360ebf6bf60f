//! Conversions between the canonical units used by callers and the
//! units the lamp speaks on the wire.

pub const KELVIN_MIN: u16 = 2700;
pub const KELVIN_MAX: u16 = 4000;

pub const HUE_MAX: u16 = 360;
pub const SATURATION_MAX: u8 = 100;

/// Canonical brightness 0-255 to wire percent 0-100, rounded.
pub fn brightness_to_percent(brightness: u8) -> u8 {
    ((brightness as u32 * 100 + 127) / 255) as u8
}

/// Wire percent 0-100 back to canonical brightness 0-255, rounded.
pub fn percent_to_brightness(percent: u8) -> u8 {
    let percent = percent.min(100) as u32;
    ((percent * 255 + 50) / 100) as u8
}

/// Hue in degrees (0-360) to the 16-bit wire unit.
pub fn hue_to_wire(degrees: u16) -> u16 {
    let degrees = degrees.min(HUE_MAX) as u32;
    ((degrees * 65535 + 180) / 360) as u16
}

/// 16-bit wire unit back to degrees.
pub fn wire_to_hue(wire: u16) -> u16 {
    ((wire as u32 * 360 + 32767) / 65535) as u16
}

/// Saturation percent (0-100) to the 8-bit wire unit.
pub fn saturation_to_wire(percent: u8) -> u8 {
    let percent = percent.min(SATURATION_MAX) as u32;
    ((percent * 255 + 50) / 100) as u8
}

/// 8-bit wire unit back to saturation percent.
pub fn wire_to_saturation(wire: u8) -> u8 {
    ((wire as u32 * 100 + 127) / 255) as u8
}

/// Relative brightness delta as signed 8-bit two's-complement,
/// clamped to the firmware's [-100, 100] domain.
pub fn delta_to_wire(delta: i8) -> u8 {
    delta.clamp(-100, 100) as u8
}

/// Color temperature is sent unscaled, clamped to the lamp's range.
pub fn clamp_kelvin(kelvin: u16) -> u16 {
    kelvin.clamp(KELVIN_MIN, KELVIN_MAX)
}
