use std::f32::consts::TAU;

use rand::Rng;

use crate::effects::Effect;
use crate::pixelengine::PixelEngine;

const MIN_FREQ_HZ: f32 = 0.45;
const MAX_FREQ_HZ: f32 = 1.1;
/// Frequency drift per second at full coupling, in Hz/s.
const MAX_NUDGE_RATE: f32 = 12.0;

const GLOW: (f32, f32, f32) = (1.0, 0.75, 0.1);

/// A row of flashing oscillators, each chasing the phase of its right-hand
/// neighbour. Both ends run at a fixed 1 Hz and act as pacemakers, so the
/// row gradually falls into step.
pub struct Firefly {
    phases: Vec<f32>,
    frequencies: Vec<f32>,
    coupling: f32,
}

impl Firefly {
    pub fn new(pixels: &PixelEngine) -> Firefly {
        let count = pixels.led_count();
        let mut rng = rand::thread_rng();

        let mut phases: Vec<f32> = (0..count).map(|_| rng.gen()).collect();
        let mut frequencies: Vec<f32> = (0..count).map(|_| rng.gen_range(0.5..1.0)).collect();
        for end in [0, count - 1] {
            phases[end] = 0.0;
            frequencies[end] = 1.0;
        }

        Firefly {
            phases,
            frequencies,
            coupling: 0.5,
        }
    }

    /// Signed phase lead of `ahead` over `behind`, wrapped to [-0.5, 0.5].
    fn phase_lead(ahead: f32, behind: f32) -> f32 {
        let diff = (ahead - behind).fract();
        if diff > 0.5 {
            diff - 1.0
        } else if diff < -0.5 {
            diff + 1.0
        } else {
            diff
        }
    }

    fn brightness(phase: f32) -> f32 {
        (TAU * phase).cos().max(0.0).powi(9)
    }
}

impl Effect for Firefly {
    fn process(&mut self, dt: f64, pixels: &mut PixelEngine) {
        let dt = dt as f32;
        let count = self.phases.len();
        let nudge = self.coupling * MAX_NUDGE_RATE * dt;

        for i in 1..count.saturating_sub(1) {
            let lead = Firefly::phase_lead(self.phases[i + 1], self.phases[i]);
            let f = if lead >= 0.0 {
                self.frequencies[i] + nudge
            } else {
                self.frequencies[i] - nudge
            };
            self.frequencies[i] = f.clamp(MIN_FREQ_HZ, MAX_FREQ_HZ);
        }

        for i in 0..count {
            self.phases[i] = (self.phases[i] + self.frequencies[i] * dt).fract();
            let s = Firefly::brightness(self.phases[i]);
            pixels.set_pixel(i, GLOW.0 * s, GLOW.1 * s, GLOW.2 * s);
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.coupling = value;
        }
    }

    fn parameter(&self, index: usize) -> f32 {
        match index {
            0 => self.coupling,
            _ => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "Firefly"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::tests::nearly_equal;
    use crate::pixelengine::CurrentModel;

    #[test]
    fn phase_lead_wraps() {
        assert!(nearly_equal(Firefly::phase_lead(0.1, 0.9), 0.2, 1e-6));
        assert!(nearly_equal(Firefly::phase_lead(0.9, 0.1), -0.2, 1e-6));
        assert!(nearly_equal(Firefly::phase_lead(0.3, 0.1), 0.2, 1e-6));
    }

    #[test]
    fn flashes_only_near_phase_zero() {
        assert_eq!(Firefly::brightness(0.0), 1.0);
        assert_eq!(Firefly::brightness(0.5), 0.0);
        assert!(Firefly::brightness(0.1) < 0.2);
    }

    #[test]
    fn frequencies_hold_still_without_elapsed_time() {
        let mut pixels = PixelEngine::new(12, CurrentModel::default());
        let mut firefly = Firefly::new(&pixels);
        firefly.set_parameter(0, 1.0);
        let before = firefly.frequencies.clone();
        firefly.process(0.0, &mut pixels);
        assert_eq!(firefly.frequencies, before);
    }

    #[test]
    fn frequency_drift_scales_with_dt() {
        let mut pixels = PixelEngine::new(12, CurrentModel::default());
        let mut firefly = Firefly::new(&pixels);
        for dt in [1.0 / 120.0, 1.0 / 30.0] {
            let before = firefly.frequencies.clone();
            firefly.process(dt, &mut pixels);
            let limit = firefly.coupling * MAX_NUDGE_RATE * dt as f32 + 1e-6;
            for (old, new) in before.iter().zip(&firefly.frequencies) {
                assert!((new - old).abs() <= limit, "{old} -> {new} in {dt} s");
            }
        }
    }

    #[test]
    fn frequencies_stay_in_range() {
        let mut pixels = PixelEngine::new(20, CurrentModel::default());
        let mut firefly = Firefly::new(&pixels);
        firefly.set_parameter(0, 1.0);
        for _ in 0..300 {
            firefly.process(1.0 / 60.0, &mut pixels);
        }
        assert_eq!(firefly.frequencies[0], 1.0);
        assert_eq!(firefly.frequencies[19], 1.0);
        for f in &firefly.frequencies[1..19] {
            assert!((MIN_FREQ_HZ..=MAX_FREQ_HZ).contains(f));
        }
    }
}
