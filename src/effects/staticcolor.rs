use crate::effects::Effect;
use crate::pixelengine::PixelEngine;

/// A constant HSL fill. Parameters 0, 1 and 2 are hue, saturation and
/// lightness. Defaults to white.
pub struct StaticColor {
    hue: f32,
    saturation: f32,
    lightness: f32,
}

impl StaticColor {
    pub fn new() -> StaticColor {
        StaticColor {
            hue: 0.0,
            saturation: 0.0,
            lightness: 1.0,
        }
    }
}

impl Effect for StaticColor {
    fn process(&mut self, _dt: f64, pixels: &mut PixelEngine) {
        for i in 0..pixels.led_count() {
            pixels.set_pixel_hsl(i, 360.0 * self.hue, self.saturation, self.lightness);
        }
    }

    fn set_parameter(&mut self, index: usize, value: f32) {
        match index {
            0 => self.hue = value,
            1 => self.saturation = value,
            2 => self.lightness = value,
            _ => {}
        }
    }

    fn parameter(&self, index: usize) -> f32 {
        match index {
            0 => self.hue,
            1 => self.saturation,
            2 => self.lightness,
            _ => 0.0,
        }
    }

    fn name(&self) -> &'static str {
        "Static Color"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::tests::nearly_equal;
    use crate::pixelengine::CurrentModel;

    #[test]
    fn defaults_to_white() {
        let mut pixels = PixelEngine::new(4, CurrentModel::default());
        StaticColor::new().process(0.0, &mut pixels);
        for i in 0..4 {
            let p = pixels.pixel(i);
            assert_eq!((p.red, p.green, p.blue), (1.0, 1.0, 1.0));
        }
    }

    #[test]
    fn parameters_select_the_color() {
        let mut pixels = PixelEngine::new(3, CurrentModel::default());
        let mut effect = StaticColor::new();
        effect.set_parameter(0, 1.0 / 3.0);
        effect.set_parameter(1, 1.0);
        effect.set_parameter(2, 0.5);
        effect.process(0.016, &mut pixels);

        let p = pixels.pixel(2);
        assert!(nearly_equal(p.red, 0.0, 1e-5));
        assert!(nearly_equal(p.green, 1.0, 1e-5));
        assert!(nearly_equal(p.blue, 0.0, 1e-5));
        assert!(nearly_equal(effect.parameter(0), 1.0 / 3.0, 1e-7));
    }
}
