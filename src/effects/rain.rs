use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::color::lin_scale;
use crate::effects::Effect;
use crate::pixelengine::{BlendMode, PixelEngine};

const LEDS_PER_METRE: f32 = 30.0;
const GRAVITY: f32 = 9.8;
/// Mean time between two drops, in seconds.
const MEAN_DROP_INTERVAL: f32 = 0.15;
const MAX_LAUNCH_SPEED: f32 = 5.0;
const MAX_DROPS: usize = 64;
/// Time constant of the trail fade, in seconds.
const TRAIL_TAU: f32 = 0.1;

struct Raindrop {
    born: f32,
    launch_speed: f32,
}

/// Drops tossed up from the top of the strip that fall back down under
/// gravity, leaving a fading trail.
pub struct Rain {
    rng: StdRng,
    t: f32,
    next_drop: f32,
    gravity: f32,
    drops: Vec<Raindrop>,
    min_speed: f32,
    max_speed: f32,
}

impl Rain {
    pub fn new() -> Rain {
        Rain::with_rng(StdRng::from_entropy())
    }

    fn with_rng(mut rng: StdRng) -> Rain {
        let next_drop = exponential(&mut rng, MEAN_DROP_INTERVAL);
        Rain {
            rng,
            t: 0.0,
            next_drop,
            gravity: 3.1 / (2.0 * GRAVITY),
            drops: Vec::new(),
            min_speed: f32::INFINITY,
            max_speed: f32::NEG_INFINITY,
        }
    }

    fn acceleration(&self) -> f32 {
        -(2.0 * GRAVITY * self.gravity).max(0.5)
    }
}

/// Exponentially distributed interval with the given mean.
fn exponential(rng: &mut StdRng, mean: f32) -> f32 {
    let u: f32 = rng.gen();
    -mean * (1.0 - u).ln()
}

impl Effect for Rain {
    fn process(&mut self, dt: f64, pixels: &mut PixelEngine) {
        let dt = dt as f32;
        self.t += dt;

        if self.t >= self.next_drop {
            if self.drops.len() < MAX_DROPS {
                self.drops.push(Raindrop {
                    born: self.t,
                    launch_speed: self.rng.gen_range(0.0..MAX_LAUNCH_SPEED),
                });
            }
            self.next_drop = self.t + exponential(&mut self.rng, MEAN_DROP_INTERVAL);
        }

        pixels.apply_gain((-dt / TRAIL_TAU).exp());

        let led_count = pixels.led_count();
        let top = led_count as f32 / LEDS_PER_METRE;
        let accel = self.acceleration();

        for drop in &self.drops {
            let age = self.t - drop.born;
            let position = (accel * age * age + drop.launch_speed * age + top) * LEDS_PER_METRE;

            let speed = (2.0 * accel * age + drop.launch_speed).abs();
            self.min_speed = self.min_speed.min(speed);
            self.max_speed = self.max_speed.max(speed);

            let lower = position.floor();
            if lower < 0.0 || lower + 1.0 >= led_count as f32 {
                continue;
            }
            let frac = position - lower;
            let hue = lin_scale(speed, self.min_speed, self.max_speed, 180.0, 240.0);
            let lightness = lin_scale(speed, self.min_speed, self.max_speed, 0.0, 0.8);

            let alpha = 100.0 * dt;
            let lower = lower as usize;
            pixels.blend_pixel_hsl(lower, hue, 1.0, lightness, alpha * (1.0 - frac), BlendMode::Accumulate);
            pixels.blend_pixel_hsl(lower + 1, hue, 1.0, lightness, alpha * frac, BlendMode::Accumulate);
        }

        // A fast drop launched early can outlast a slow one launched later
        let t = self.t;
        self.drops.retain(|drop| {
            let age = t - drop.born;
            accel * age * age + drop.launch_speed * age + top > 0.0
        });
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        if index == 0 {
            self.gravity = value;
        }
    }

    fn parameter(&self, index: usize) -> f32 {
        match index {
            0 => self.gravity,
            _ => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "Rain"
    }
}
