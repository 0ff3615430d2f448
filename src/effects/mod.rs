pub mod firefly;
pub mod lighthouse;
pub mod lorenzfade;
pub mod phasor;
pub mod rain;
pub mod staticcolor;

use crate::pixelengine::PixelEngine;

/// An animation drawing into the pixel engine once per frame.
pub trait Effect {
    /// Advances the animation by `dt` seconds and draws the result.
    fn process(&mut self, dt: f64, pixels: &mut PixelEngine);

    /// `value` is normalized to [0,1]. Unknown indices are ignored.
    fn set_parameter(&mut self, _index: usize, _value: f32) {}

    fn parameter(&self, _index: usize) -> f32 {
        0.0
    }

    fn name(&self) -> &'static str;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EffectKind {
    Phasor,
    Lighthouse,
    Rain,
    LorenzFade,
    Firefly,
    StaticColor,
}

impl EffectKind {
    pub const ROTATION: [EffectKind; 6] = [
        EffectKind::Phasor,
        EffectKind::Lighthouse,
        EffectKind::Rain,
        EffectKind::LorenzFade,
        EffectKind::Firefly,
        EffectKind::StaticColor,
    ];

    pub fn next(self) -> EffectKind {
        match self {
            EffectKind::Phasor => EffectKind::Lighthouse,
            EffectKind::Lighthouse => EffectKind::Rain,
            EffectKind::Rain => EffectKind::LorenzFade,
            EffectKind::LorenzFade => EffectKind::Firefly,
            EffectKind::Firefly => EffectKind::StaticColor,
            EffectKind::StaticColor => EffectKind::Phasor,
        }
    }

    pub fn create(self, pixels: &PixelEngine) -> Box<dyn Effect> {
        match self {
            EffectKind::Phasor => Box::new(phasor::Phasor::new(pixels)),
            EffectKind::Lighthouse => Box::new(lighthouse::Lighthouse::new()),
            EffectKind::Rain => Box::new(rain::Rain::new()),
            EffectKind::LorenzFade => Box::new(lorenzfade::LorenzFade::new()),
            EffectKind::Firefly => Box::new(firefly::Firefly::new(pixels)),
            EffectKind::StaticColor => Box::new(staticcolor::StaticColor::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pixelengine::CurrentModel;

    #[test]
    fn rotation_visits_every_effect_and_wraps() {
        let mut kind = EffectKind::ROTATION[0];
        for expected in EffectKind::ROTATION.iter().cycle().skip(1).take(12) {
            kind = kind.next();
            assert_eq!(kind, *expected);
        }
        assert_eq!(EffectKind::StaticColor.next(), EffectKind::Phasor);
    }

    #[test]
    fn every_effect_renders_finite_colors() {
        for led_count in [1, 2, 30] {
            let mut pixels = PixelEngine::new(led_count, CurrentModel::default());
            for kind in EffectKind::ROTATION {
                pixels.clear();
                let mut effect = kind.create(&pixels);
                assert!(!effect.name().is_empty());
                for frame in 0..600 {
                    // Include a zero dt, as seen right after switching effects
                    let dt = if frame == 0 { 0.0 } else { 1.0 / 60.0 };
                    effect.process(dt, &mut pixels);
                }
                for i in 0..led_count {
                    let p = pixels.pixel(i);
                    assert!(
                        p.red.is_finite() && p.green.is_finite() && p.blue.is_finite(),
                        "{} produced {:?} at {} of {}",
                        effect.name(),
                        p,
                        i,
                        led_count
                    );
                }
            }
        }
    }

    #[test]
    fn parameters_round_trip_through_every_effect() {
        let pixels = PixelEngine::new(8, CurrentModel::default());
        for kind in EffectKind::ROTATION {
            let mut effect = kind.create(&pixels);
            effect.set_parameter(0, 0.3);
            effect.set_parameter(99, 0.9);
            let value = effect.parameter(0);
            assert!((0.0..=1.0).contains(&value), "{} reports {}", effect.name(), value);
            assert_eq!(effect.parameter(99), 0.0);
        }
    }
}
