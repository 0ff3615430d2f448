use std::fmt;

/// Snapshot of the render loop for the periodic status line.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Telemetry {
    pub fps: f32,
    pub frames: u64,
    pub underruns: u32,
    pub amps: f32,
    pub watts: f32,
    pub max_watts: f32,
    pub energy_wh: f64,
    pub brightness: f32,
    pub suppressed: bool,
    pub nightshift: f32,
    pub effect: &'static str,
    pub parameter: f32,
}

impl Telemetry {
    pub fn percent_of_max(&self) -> f32 {
        if self.max_watts > 0.0 {
            100.0 * self.watts / self.max_watts
        } else {
            0.0
        }
    }
}

impl fmt::Display for Telemetry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "| {:5.1} fps | frame {:8} | {:3} late | {:5.2} A {:6.1} W {:5.1}% | {:8.3} Wh | bright {:4.2}{} | night {:4.2} | {} p0 {:4.2} |",
            self.fps,
            self.frames,
            self.underruns,
            self.amps,
            self.watts,
            self.percent_of_max(),
            self.energy_wh,
            self.brightness,
            if self.suppressed { " limited" } else { "" },
            self.nightshift,
            self.effect,
            self.parameter,
        )
    }
}
