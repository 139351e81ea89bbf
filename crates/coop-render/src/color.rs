//! Color mapping
//!
//! Fixtures sit at evenly spaced points along the slider range. Fixture `k`
//! out of `N` is centred on `k * MAX_POS / (N - 1)`. A channel's glow is the
//! difference of two clamped linear ramps: one rising across the interval to
//! the left of the fixture and one rising across the interval to its right.
//! As the position sweeps past, the glow cross-fades linearly between
//! neighbouring fixtures instead of jumping.

use coop_protocol::MAX_POS;
use serde::{Deserialize, Serialize};

/// 8-bit RGB triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    /// Create a color from its components
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Grey of the given level
    pub const fn grey(level: u8) -> Self {
        Self::new(level, level, level)
    }

    /// Build from a channel-indexed triple
    pub fn from_array(values: [u8; 3]) -> Self {
        Self::new(values[0], values[1], values[2])
    }

    /// Whether all components are equal
    pub fn is_achromatic(&self) -> bool {
        self.r == self.g && self.g == self.b
    }
}

/// Output brightness bounds, 0-255
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brightness {
    pub min: u8,
    pub max: u8,
}

impl Default for Brightness {
    fn default() -> Self {
        Self { min: 0, max: 255 }
    }
}

/// Linear map of `n` from `[start, stop]` onto `[0, 1]`, clamped
fn ramp(n: f32, start: f32, stop: f32) -> f32 {
    ((n - start) / (stop - start)).clamp(0.0, 1.0)
}

/// Intensity of one channel on the fixture at `slot` out of `count`
///
/// `position` is the channel's smoothed slider position. A lone fixture has
/// no neighbours to fade into and always shows full brightness.
pub fn channel_intensity(position: f32, slot: usize, count: usize, bounds: Brightness) -> u8 {
    let min = bounds.min as f32;
    let max = bounds.max as f32;

    if count < 2 {
        return bounds.max;
    }

    let interval = MAX_POS as f32 / (count - 1) as f32;
    let k = slot as f32;

    let rising = ramp(position, interval * (k - 1.0), interval * k) * max;
    let falling = ramp(position, interval * k, interval * (k + 1.0)) * max;

    (rising - falling).clamp(min, max.max(min)).floor() as u8
}

/// Clamp the HSL saturation of a color to `ceiling`
///
/// The fixtures are meant to read as near-white glows; limiting saturation
/// keeps a single dominant channel from rendering as a pure primary.
/// Achromatic colors pass through unchanged.
pub fn limit_saturation(color: Rgb, ceiling: f32) -> Rgb {
    let r = color.r as f32 / 255.0;
    let g = color.g as f32 / 255.0;
    let b = color.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;

    if max == min {
        return color;
    }

    let d = max - min;
    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    let mut h = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };
    h /= 6.0;

    let s = s.clamp(0.0, ceiling.max(0.0));
    let (r, g, b) = hsl_to_rgb(h, s, l);

    Rgb::new(to_byte(r), to_byte(g), to_byte(b))
}

/// HSL saturation of a color in `[0, 1]`
pub fn saturation(color: Rgb) -> f32 {
    let r = color.r as f32 / 255.0;
    let g = color.g as f32 / 255.0;
    let b = color.b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == min {
        return 0.0;
    }

    let l = (max + min) / 2.0;
    let d = max - min;
    if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    }
}

fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }

    let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
    let p = 2.0 * l - q;

    (
        hue_to_rgb(p, q, h + 1.0 / 3.0),
        hue_to_rgb(p, q, h),
        hue_to_rgb(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_rgb(p: f32, q: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn to_byte(v: f32) -> u8 {
    (v * 255.0).floor().clamp(0.0, 255.0) as u8
}
