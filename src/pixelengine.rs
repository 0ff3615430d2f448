//! Per-LED color state, blending and conversion to the APA102 wire format.
//!
//! Colors are kept as unclamped floats. Clamping, nightshift, gamma, global
//! brightness and the power ceiling are applied only when the wire bytes are
//! prepared, so the stored state is never altered by them.

use palette::LinSrgb;

use crate::color;

pub const SUPPLY_VOLTS: f32 = 5.0;

const START_FRAME_LEN: usize = 4;
const LED_FRAME_LEN: usize = 4;
/// Marker bits plus the maximum device brightness of 31.
const LED_HEADER: u8 = 0xE0 | 0x1F;

/// How a new color is combined with the one already stored at a pixel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    Set,
    /// Alpha blend towards the new color.
    Add,
    /// Adds `alpha * color` without renormalizing. May exceed 1.
    Accumulate,
    /// `Add` with the absolute difference to the stored color.
    Difference,
    /// `Add` with the product of new and stored color.
    Multiply,
    /// `1 - new * stored`, per channel. Ignores alpha.
    Screen,
}

/// Empirical current draw of the strip.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CurrentModel {
    /// Amperes drawn by one fully lit color channel.
    pub amps_per_channel: f32,
    /// Amperes drawn by one LED at full white.
    pub max_amps_per_led: f32,
}

impl Default for CurrentModel {
    fn default() -> Self {
        CurrentModel {
            amps_per_channel: 0.02,
            max_amps_per_led: 0.06,
        }
    }
}

pub struct PixelEngine {
    pixels: Vec<LinSrgb>,
    /// Gamma-corrected channels of the last serialization, RGB order.
    shaped: Vec<f32>,
    wire: Vec<u8>,
    current: CurrentModel,
    global_brightness: f32,
    nightshift: f32,
    power_limit_watts: Option<f32>,
    measured_amps: f32,
    power_suppressed: bool,
}

impl PixelEngine {
    pub fn new(led_count: usize, current: CurrentModel) -> PixelEngine {
        assert!(led_count > 0, "a pixel engine needs at least one LED");

        let trailer_len = led_count / 16 + 1;
        let mut wire = vec![0u8; START_FRAME_LEN + LED_FRAME_LEN * led_count + trailer_len];
        for frame in wire[START_FRAME_LEN..]
            .chunks_exact_mut(LED_FRAME_LEN)
            .take(led_count)
        {
            frame[0] = LED_HEADER;
        }
        let trailer_start = wire.len() - trailer_len;
        wire[trailer_start..].fill(0xFF);

        PixelEngine {
            pixels: vec![LinSrgb::new(0.0, 0.0, 0.0); led_count],
            shaped: vec![0.0; 3 * led_count],
            wire,
            current,
            global_brightness: 1.0,
            nightshift: 0.0,
            power_limit_watts: None,
            measured_amps: 0.0,
            power_suppressed: false,
        }
    }

    pub fn led_count(&self) -> usize {
        self.pixels.len()
    }

    pub fn pixel(&self, index: usize) -> LinSrgb {
        self.pixels[index]
    }

    pub fn clear(&mut self) {
        self.pixels.fill(LinSrgb::new(0.0, 0.0, 0.0));
    }

    pub fn fill(&mut self, r: f32, g: f32, b: f32) {
        for i in 0..self.pixels.len() {
            self.set_pixel(i, r, g, b);
        }
    }

    pub fn set_pixel(&mut self, index: usize, r: f32, g: f32, b: f32) {
        self.blend_pixel(index, r, g, b, 1.0, BlendMode::Set);
    }

    /// Combines `(r, g, b)` with the stored color at `index`.
    ///
    /// Panics if `index` is not below `led_count()`.
    pub fn blend_pixel(&mut self, index: usize, r: f32, g: f32, b: f32, alpha: f32, mode: BlendMode) {
        assert!(
            index < self.pixels.len(),
            "pixel index {index} out of range for {} LEDs",
            self.pixels.len()
        );

        let old = self.pixels[index];
        let blended = match mode {
            BlendMode::Set => LinSrgb::new(r, g, b),
            BlendMode::Add => {
                let keep = 1.0 - alpha;
                LinSrgb::new(
                    alpha * r + keep * old.red,
                    alpha * g + keep * old.green,
                    alpha * b + keep * old.blue,
                )
            }
            BlendMode::Accumulate => LinSrgb::new(
                old.red + alpha * r,
                old.green + alpha * g,
                old.blue + alpha * b,
            ),
            BlendMode::Difference => {
                return self.blend_pixel(
                    index,
                    (r - old.red).abs(),
                    (g - old.green).abs(),
                    (b - old.blue).abs(),
                    alpha,
                    BlendMode::Add,
                );
            }
            BlendMode::Multiply => {
                return self.blend_pixel(
                    index,
                    old.red * r,
                    old.green * g,
                    old.blue * b,
                    alpha,
                    BlendMode::Add,
                );
            }
            BlendMode::Screen => LinSrgb::new(
                1.0 - r * old.red,
                1.0 - g * old.green,
                1.0 - b * old.blue,
            ),
        };
        self.pixels[index] = blended;
    }

    pub fn set_pixel_hsl(&mut self, index: usize, hue: f32, saturation: f32, lightness: f32) {
        self.blend_pixel_hsl(index, hue, saturation, lightness, 1.0, BlendMode::Set);
    }

    pub fn blend_pixel_hsl(
        &mut self,
        index: usize,
        hue: f32,
        saturation: f32,
        lightness: f32,
        alpha: f32,
        mode: BlendMode,
    ) {
        let rgb = color::hsl_to_rgb(hue, saturation, lightness);
        self.blend_pixel(index, rgb.red, rgb.green, rgb.blue, alpha, mode);
    }

    /// Multiplies every channel by `factor`, e.g. `exp(-dt / tau)` for decay.
    pub fn apply_gain(&mut self, factor: f32) {
        for pixel in &mut self.pixels {
            *pixel = LinSrgb::new(pixel.red * factor, pixel.green * factor, pixel.blue * factor);
        }
    }

    pub fn set_global_brightness(&mut self, brightness: f32) {
        self.global_brightness = color::clamp01(brightness);
    }

    pub fn global_brightness(&self) -> f32 {
        self.global_brightness
    }

    /// `None`, negative or NaN means unlimited.
    pub fn set_power_limit(&mut self, watts: Option<f32>) {
        self.power_limit_watts = watts.filter(|w| *w >= 0.0);
    }

    pub fn power_limit(&self) -> Option<f32> {
        self.power_limit_watts
    }

    pub fn set_nightshift(&mut self, nightshift: f32) {
        self.nightshift = color::clamp01(nightshift);
    }

    pub fn nightshift(&self) -> f32 {
        self.nightshift
    }

    /// Serializes the current state into APA102 frames: a zero start frame,
    /// one `[header, blue, green, red]` group per LED and `led_count / 16 + 1`
    /// trailing `0xFF` bytes.
    ///
    /// Also refreshes the current estimate. If it exceeds the power limit, the
    /// output is written at the reduced brightness that meets the limit exactly
    /// and power suppression is reported as engaged.
    pub fn prepare_wire_bytes(&mut self) -> &[u8] {
        let shift = color::nightshift_multiplier(self.nightshift);

        let mut channel_sum = 0.0f32;
        for (pixel, shaped) in self.pixels.iter().zip(self.shaped.chunks_exact_mut(3)) {
            let raw = [pixel.red, pixel.green, pixel.blue];
            for c in 0..3 {
                shaped[c] = color::gamma(color::clamp01(raw[c]) * shift[c]);
                channel_sum += shaped[c];
            }
        }

        let amps_at_full = self.current.amps_per_channel * channel_sum;
        let nominal_amps = self.global_brightness * amps_at_full;
        let brightness = match self.power_limit_watts {
            Some(watts) if nominal_amps > watts / SUPPLY_VOLTS => {
                self.power_suppressed = true;
                (watts / SUPPLY_VOLTS) / amps_at_full
            }
            _ => {
                self.power_suppressed = false;
                self.global_brightness
            }
        };
        self.measured_amps = brightness * amps_at_full;

        let scale = 255.0 * brightness;
        for (frame, shaped) in self.wire[START_FRAME_LEN..]
            .chunks_exact_mut(LED_FRAME_LEN)
            .zip(self.shaped.chunks_exact(3))
        {
            frame[1] = (shaped[2] * scale) as u8;
            frame[2] = (shaped[1] * scale) as u8;
            frame[3] = (shaped[0] * scale) as u8;
        }

        &self.wire
    }

    /// Current measured by the last `prepare_wire_bytes()`.
    pub fn current_amps(&self) -> f32 {
        self.measured_amps
    }

    pub fn current_watts(&self) -> f32 {
        SUPPLY_VOLTS * self.measured_amps
    }

    pub fn max_amps(&self) -> f32 {
        self.pixels.len() as f32 * self.current.max_amps_per_led
    }

    pub fn max_watts(&self) -> f32 {
        SUPPLY_VOLTS * self.max_amps()
    }

    pub fn is_power_suppression_engaged(&self) -> bool {
        self.power_suppressed
    }
}
