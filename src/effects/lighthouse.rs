use std::f64::consts::TAU;

use crate::effects::Effect;
use crate::pixelengine::{BlendMode, PixelEngine};

/// (frequency in Hz, hue in degrees, blend alpha) of each beam.
const BEAMS: [(f64, f32, f32); 3] = [(1.0 / 300.0, 0.0, 1.0), (-1.0 / 60.0, 60.0, 0.5), (1.0 / 10.0, 210.0, 0.333)];

/// Three slow beams of different hue and speed, layered per LED. Each LED's
/// phase offset repeats every 11 LEDs.
pub struct Lighthouse {
    t: f64,
    saturation: f32,
}

impl Lighthouse {
    pub fn new() -> Lighthouse {
        Lighthouse {
            t: 0.0,
            saturation: 0.67,
        }
    }
}

impl Effect for Lighthouse {
    fn process(&mut self, dt: f64, pixels: &mut PixelEngine) {
        self.t += dt;

        for i in 0..pixels.led_count() {
            let offset = TAU / ((i % 11) + 1) as f64;
            for (layer, (freq, hue, alpha)) in BEAMS.iter().enumerate() {
                let lightness = ((TAU * freq * self.t + offset).sin() as f32).max(0.0);
                let mode = if layer == 0 { BlendMode::Set } else { BlendMode::Add };
                pixels.blend_pixel_hsl(i, *hue, self.saturation, lightness, *alpha, mode);
            }
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.saturation = value;
        }
    }

    fn parameter(&self, index: usize) -> f32 {
        match index {
            0 => self.saturation,
            _ => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "Lighthouse"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::tests::nearly_equal;
    use crate::pixelengine::CurrentModel;

    #[test]
    fn zero_saturation_is_grey() {
        let mut pixels = PixelEngine::new(12, CurrentModel::default());
        let mut lighthouse = Lighthouse::new();
        lighthouse.set_parameter(0, 0.0);
        lighthouse.process(3.7, &mut pixels);
        for i in 0..12 {
            let p = pixels.pixel(i);
            assert!(nearly_equal(p.red, p.green, 1e-6) && nearly_equal(p.green, p.blue, 1e-6));
        }
    }

    #[test]
    fn pattern_repeats_every_eleven_leds() {
        let mut pixels = PixelEngine::new(30, CurrentModel::default());
        let mut lighthouse = Lighthouse::new();
        lighthouse.process(12.5, &mut pixels);
        assert_eq!(pixels.pixel(2), pixels.pixel(13));
        assert_eq!(pixels.pixel(5), pixels.pixel(27));
    }
}
