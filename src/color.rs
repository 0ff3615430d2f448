use palette::LinSrgb;

/// Color temperature of an unshifted strip.
pub const NEUTRAL_KELVIN: f32 = 6600.0;
/// Color temperature at full nightshift.
pub const WARMEST_KELVIN: f32 = 1900.0;

/// Clamps to [0,1]. NaN maps to zero.
pub fn clamp01(x: f32) -> f32 {
    x.max(0.0).min(1.0)
}

/// Cube-law approximation of the strip's ~2.8 gamma curve.
pub fn gamma(x: f32) -> f32 {
    x * x * x
}

pub fn lin_scale(x: f32, min_in: f32, max_in: f32, min_out: f32, max_out: f32) -> f32 {
    if max_in == min_in {
        return min_out;
    }
    ((x - min_in) / (max_in - min_in)) * (max_out - min_out) + min_out
}

/// HSL to RGB with the chroma/hue-sector formula.
///
/// `hue` is in degrees and wrapped into [0,360), saturation and lightness
/// are clamped to [0,1].
pub fn hsl_to_rgb(hue: f32, saturation: f32, lightness: f32) -> LinSrgb {
    let mut hue = hue.rem_euclid(360.0);
    if hue >= 360.0 {
        hue = 0.0;
    }
    let saturation = clamp01(saturation);
    let lightness = clamp01(lightness);

    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let sector = hue / 60.0;
    let x = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
    let m = lightness - 0.5 * chroma;

    let (r, g, b) = match sector as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    LinSrgb::new(r + m, g + m, b + m)
}

/// Black-body color of `kelvin`, per channel in [0,1].
///
/// Tanner Helland's logarithmic/power-law fit, valid from 1000K to 40000K.
pub fn color_temperature(kelvin: f32) -> [f32; 3] {
    let temp = (kelvin / 100.0).clamp(10.0, 400.0);

    let red = if temp <= 66.0 {
        255.0
    } else {
        329.698_73 * (temp - 60.0).powf(-0.133_204_76)
    };

    let green = if temp <= 66.0 {
        99.470_8 * temp.ln() - 161.119_57
    } else {
        288.122_17 * (temp - 60.0).powf(-0.075_514_85)
    };

    let blue = if temp >= 66.0 {
        255.0
    } else if temp <= 19.0 {
        0.0
    } else {
        138.517_73 * (temp - 10.0).ln() - 305.044_8
    };

    [red, green, blue].map(|c| clamp01(c / 255.0))
}

/// Per-channel multiplier that warms the output as `nightshift` goes from 0
/// to 1. Relative to the neutral temperature, so zero nightshift is an exact
/// identity.
pub fn nightshift_multiplier(nightshift: f32) -> [f32; 3] {
    let nightshift = clamp01(nightshift);
    if nightshift == 0.0 {
        return [1.0; 3];
    }

    let kelvin = NEUTRAL_KELVIN - nightshift * (NEUTRAL_KELVIN - WARMEST_KELVIN);
    let neutral = color_temperature(NEUTRAL_KELVIN);
    let shifted = color_temperature(kelvin);
    [0, 1, 2].map(|c| {
        if neutral[c] > 0.0 {
            clamp01(shifted[c] / neutral[c])
        } else {
            0.0
        }
    })
}
