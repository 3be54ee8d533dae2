use fixed::types::I64F64;
use serde::{Deserialize, Serialize};

/// Page size in PDF points. Origin bottom-left, Y up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    #[serde(alias = "W")]
    pub width: f64,
    #[serde(alias = "H")]
    pub height: f64,
}

impl PageGeometry {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn letter() -> Self {
        // 8.5in x 11in at 72pt/in.
        Self::new(612.0, 792.0)
    }

    pub fn a4() -> Self {
        Self::new(595.28, 841.89)
    }

    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Placement as fractions of the page, origin top-left, Y down.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRect {
    pub x_norm: f64,
    pub y_norm: f64,
    pub w_norm: f64,
    pub h_norm: f64,
}

impl NormalizedRect {
    pub fn new(x_norm: f64, y_norm: f64, w_norm: f64, h_norm: f64) -> Self {
        Self {
            x_norm,
            y_norm,
            w_norm,
            h_norm,
        }
    }

    pub fn as_array(&self) -> [f64; 4] {
        [self.x_norm, self.y_norm, self.w_norm, self.h_norm]
    }

    /// Reason the rect cannot be rendered, if any. Off-page values are allowed.
    pub fn validation_error(&self) -> Option<String> {
        let all_finite = self.as_array().iter().all(|v| v.is_finite());
        if !all_finite {
            return Some(format!("rect has non-finite component: {:?}", self.as_array()));
        }
        if self.w_norm <= 0.0 || self.h_norm <= 0.0 {
            return Some(format!(
                "rect must have positive width and height (w={}, h={})",
                self.w_norm, self.h_norm
            ));
        }
        None
    }
}

/// Absolute rectangle in page units, lower-left corner at (x, y).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl PageRect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }
}

/// Formats a coordinate for a content stream. Values are quantized to
/// thousandths through `I64F64` so the same input always yields the same text.
/// Magnitudes too large for milli precision in an `i64` are written whole.
pub(crate) fn fmt_num(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let milli = I64F64::checked_from_num(value)
        .and_then(|fixed| fixed.checked_mul_int(1000))
        .and_then(|scaled| scaled.checked_round())
        .map(|rounded| rounded.to_num::<i64>());
    match milli {
        Some(milli) => format_milli(milli),
        None => format!("{:.0}", value),
    }
}

fn format_milli(milli: i64) -> String {
    if milli == 0 {
        return "0".to_string();
    }
    let sign = if milli < 0 { "-" } else { "" };
    let abs = milli.abs();
    let int_part = abs / 1000;
    let frac_part = abs % 1000;
    if frac_part == 0 {
        format!("{}{}", sign, int_part)
    } else {
        let mut s = format!("{}{}.{:03}", sign, int_part, frac_part);
        while s.ends_with('0') {
            s.pop();
        }
        s
    }
}

pub(crate) fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}
