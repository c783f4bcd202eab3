use serde_json::{json, Value};

use crate::light::gamut::XyPoint;
use crate::util::error::ValueError;

/// Number of native hue steps in a full turn of the color wheel.
const HUE_STEPS: f64 = 65536.0;
const MAX_LEVEL: f64 = 255.0;

/// A single-field change to a light's state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightStateUpdate {
    /// Native hue, 0..=65535.
    Hue(u16),
    /// Native saturation, 0..=255.
    Saturation(u8),
    /// Native brightness, 0..=255.
    Brightness(u8),
    Xy(XyPoint),
}

impl LightStateUpdate {
    pub fn field(&self) -> &'static str {
        match self {
            LightStateUpdate::Hue(_) => "hue",
            LightStateUpdate::Saturation(_) => "sat",
            LightStateUpdate::Brightness(_) => "bri",
            LightStateUpdate::Xy(_) => "xy",
        }
    }

    /// Request body for `PUT lights/<id>/state`. Every update also switches the light on.
    pub fn to_body(&self) -> Value {
        let value = match *self {
            LightStateUpdate::Hue(hue) => json!(hue),
            LightStateUpdate::Saturation(sat) => json!(sat),
            LightStateUpdate::Brightness(bri) => json!(bri),
            LightStateUpdate::Xy(point) => json!([point.x, point.y]),
        };
        let mut body = serde_json::Map::new();
        body.insert(self.field().to_string(), value);
        body.insert("on".to_string(), Value::Bool(true));
        Value::Object(body)
    }
}

/// Converts degrees (0..=360) to the hub's native hue.
///
/// 360 wraps to 0. Values just below 360 saturate at 65535 instead of wrapping, which keeps
/// the mapping monotonic over [0, 360).
pub fn hue_from_degrees(degrees: f64) -> Result<u16, ValueError> {
    if !(0.0..=360.0).contains(&degrees) {
        return Err(ValueError::Hue(degrees));
    }
    let steps = (degrees.rem_euclid(360.0) * HUE_STEPS / 360.0).round();
    Ok(steps.min(HUE_STEPS - 1.0) as u16)
}

/// Converts a fraction (0.0..=1.0) to a native saturation or brightness level.
///
/// Halves round away from zero, so 0.5 maps to 128.
pub fn level_from_fraction(fraction: f64) -> Result<u8, ValueError> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(ValueError::Fraction(fraction));
    }
    Ok((fraction * MAX_LEVEL).round() as u8)
}

/// Accepts a native 0..=255 level as given.
pub fn level_from_raw(level: i64) -> Result<u8, ValueError> {
    u8::try_from(level).map_err(|_| ValueError::Level(level))
}
