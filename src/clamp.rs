//! Saturating conversions from `f64` to the narrow integer sample types.
//!
//! Out-of-range values pin to the destination bounds. NaN pins to the
//! minimum for signed destinations and to the maximum for unsigned ones,
//! so the two directions stay distinguishable in the written data.

pub fn clamp_to_i8(value: f64) -> i8 {
    if value > i8::MAX as f64 {
        i8::MAX
    } else if value < i8::MIN as f64 || value.is_nan() {
        i8::MIN
    } else {
        value as i8
    }
}

pub fn clamp_to_i16(value: f64) -> i16 {
    if value > i16::MAX as f64 {
        i16::MAX
    } else if value < i16::MIN as f64 || value.is_nan() {
        i16::MIN
    } else {
        value as i16
    }
}

pub fn clamp_to_i32(value: f64) -> i32 {
    if value > i32::MAX as f64 {
        i32::MAX
    } else if value < i32::MIN as f64 || value.is_nan() {
        i32::MIN
    } else {
        value as i32
    }
}

pub fn clamp_to_u8(value: f64) -> u8 {
    if value < 0.0 {
        0
    } else if value > u8::MAX as f64 || value.is_nan() {
        u8::MAX
    } else {
        value as u8
    }
}

pub fn clamp_to_u16(value: f64) -> u16 {
    if value < 0.0 {
        0
    } else if value > u16::MAX as f64 || value.is_nan() {
        u16::MAX
    } else {
        value as u16
    }
}

pub fn clamp_to_u32(value: f64) -> u32 {
    if value < 0.0 {
        0
    } else if value > u32::MAX as f64 || value.is_nan() {
        u32::MAX
    } else {
        value as u32
    }
}

pub fn clamp_to_f32(value: f64) -> f32 {
    if value > f32::MAX as f64 {
        f32::MAX
    } else if value < f32::MIN as f64 {
        f32::MIN
    } else {
        value as f32
    }
}
