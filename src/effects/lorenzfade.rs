use std::f64::consts::TAU;

use rand::Rng;

use crate::color::lin_scale;
use crate::effects::Effect;
use crate::pixelengine::{BlendMode, PixelEngine};

/// Longest Euler step; longer frames are split up to keep the system stable.
const MAX_STEP: f64 = 0.005;
const FADE_TAU: f32 = 1.0;
const LIGHTNESS: f32 = 0.5;
const MAX_HUE_SPREAD: f32 = 180.0;

/// Lorenz system integrated with forward Euler, tracking the range each
/// coordinate and velocity has covered so far.
struct Lorenz {
    sigma: f64,
    rho: f64,
    beta: f64,
    pos: [f64; 3],
    vel: [f64; 3],
    min_pos: [f64; 3],
    max_pos: [f64; 3],
    max_vel: [f64; 3],
    max_speed: f64,
}

impl Lorenz {
    fn new(pos: [f64; 3]) -> Lorenz {
        Lorenz {
            sigma: 10.0,
            rho: 28.0,
            beta: 8.0 / 3.0,
            pos,
            vel: [0.0; 3],
            min_pos: pos,
            max_pos: pos,
            max_vel: [0.0; 3],
            max_speed: 0.0,
        }
    }

    fn step(&mut self, dt: f64) {
        let [x, y, z] = self.pos;
        self.vel = [self.sigma * (y - x), x * (self.rho - z) - y, x * y - self.beta * z];

        for c in 0..3 {
            self.pos[c] += self.vel[c] * dt;
            self.min_pos[c] = self.min_pos[c].min(self.pos[c]);
            self.max_pos[c] = self.max_pos[c].max(self.pos[c]);
            self.max_vel[c] = self.max_vel[c].max(self.vel[c].abs());
        }
        self.max_speed = self.max_speed.max(self.speed());
    }

    fn speed(&self) -> f64 {
        self.vel.iter().map(|v| v * v).sum::<f64>().sqrt()
    }
}

/// Follows a slowly detuned Lorenz attractor: each coordinate picks a LED,
/// which is blended towards a color set by the trajectory's speed.
pub struct LorenzFade {
    t: f64,
    lorenz: Lorenz,
    saturation: f32,
    hue_spread: f32,
}

impl LorenzFade {
    pub fn new() -> LorenzFade {
        let mut rng = rand::thread_rng();
        let start: [f64; 3] = [rng.gen(), rng.gen(), rng.gen()];
        let norm = start.iter().map(|c| c * c).sum::<f64>().sqrt().max(f64::EPSILON);

        LorenzFade {
            t: 0.0,
            lorenz: Lorenz::new(start.map(|c| c / norm)),
            saturation: rng.gen_range(0.2..0.8),
            hue_spread: 150.0 / MAX_HUE_SPREAD,
        }
    }

    fn detune(&mut self) {
        let t = self.t;
        let osc = |period_minutes: f64| (TAU * t / (period_minutes * 60.0)).sin();
        self.lorenz.sigma = lin_scale(osc(10.0) as f32, -1.0, 1.0, 5.0, 15.0) as f64;
        self.lorenz.rho = lin_scale(osc(2.5) as f32, -1.0, 1.0, 24.0, 36.0) as f64;
        self.lorenz.beta = lin_scale(osc(14.0) as f32, -1.0, 1.0, 2.0, 3.33) as f64;
    }
}

impl Effect for LorenzFade {
    fn process(&mut self, dt: f64, pixels: &mut PixelEngine) {
        self.t += dt;
        self.detune();

        let steps = (dt / MAX_STEP).ceil() as usize;
        for _ in 0..steps {
            self.lorenz.step(dt / steps as f64);
        }

        pixels.apply_gain((-(dt as f32) / FADE_TAU).exp());

        let last = (pixels.led_count() - 1) as f32;
        let hue = lin_scale(self.lorenz.speed() as f32, 0.0, self.lorenz.max_speed as f32, 0.0, 360.0);
        let spread = self.hue_spread * MAX_HUE_SPREAD;
        let alpha = (30.0 * dt as f32).min(1.0);

        for (c, hue_offset) in [0.0, spread, -spread].into_iter().enumerate() {
            let lorenz = &self.lorenz;
            let index = lin_scale(lorenz.pos[c] as f32, lorenz.min_pos[c] as f32, lorenz.max_pos[c] as f32, 0.0, last);
            let lightness = lin_scale(
                lorenz.vel[c].abs() as f32,
                0.0,
                lorenz.max_vel[c] as f32,
                0.05,
                LIGHTNESS,
            );
            pixels.blend_pixel_hsl(
                index.round().clamp(0.0, last) as usize,
                hue + hue_offset,
                self.saturation,
                lightness,
                alpha,
                BlendMode::Add,
            );
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.hue_spread = value;
        }
    }

    fn parameter(&self, index: usize) -> f32 {
        match index {
            0 => self.hue_spread,
            _ => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "Lorenz Fade"
    }
}
