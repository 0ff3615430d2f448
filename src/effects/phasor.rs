use std::f64::consts::TAU;

use crate::effects::Effect;
use crate::pixelengine::PixelEngine;

const MIN_FREQ_HZ: f64 = 1.0 / 120.0;
const MAX_FREQ_RANGE_HZ: f64 = 2.0;

/// Dim half of each swing.
const LOW_COLOR: (f32, f32, f32) = (0.0, 0.75, 1.0);
/// Bright half of each swing.
const HIGH_COLOR: (f32, f32, f32) = (0.6, 0.2, 0.8);

/// One sine phasor per LED. Frequencies rise linearly along the strip, so the
/// pattern slowly drifts in and out of alignment.
pub struct Phasor {
    phases: Vec<f64>,
    max_freq: f32,
}

impl Phasor {
    pub fn new(pixels: &PixelEngine) -> Phasor {
        Phasor {
            phases: vec![0.0; pixels.led_count()],
            max_freq: 0.25,
        }
    }

    fn frequency(&self, index: usize) -> f64 {
        let f_max = (self.max_freq as f64 * MAX_FREQ_RANGE_HZ).max(MIN_FREQ_HZ);
        let position = index as f64 / self.phases.len() as f64;
        (f_max - MIN_FREQ_HZ) * position + MIN_FREQ_HZ
    }
}

impl Effect for Phasor {
    fn process(&mut self, dt: f64, pixels: &mut PixelEngine) {
        for i in 0..self.phases.len() {
            // Integrate the phase so parameter changes do not make it jump
            self.phases[i] = (self.phases[i] + self.frequency(i) * dt).fract();

            let y = (TAU * self.phases[i]).sin().abs() as f32;
            let (r, g, b) = if y < 0.5 { LOW_COLOR } else { HIGH_COLOR };
            pixels.set_pixel(i, r * y, g * y, b * y);
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.max_freq = value;
        }
    }

    fn parameter(&self, index: usize) -> f32 {
        match index {
            0 => self.max_freq,
            _ => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "Phasor"
    }
}
