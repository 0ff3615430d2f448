/// A control message for the render loop.
#[derive(Clone, Debug, PartialEq)]
pub enum ControlCommand {
    NextEffect,
    /// Global brightness in [0,1].
    SetBrightness(f32),
    /// Nightshift in [0,1].
    SetNightshift(f32),
    /// Power ceiling in watts, `None` for unlimited.
    SetPowerLimit(Option<f32>),
    /// Effect parameter `index`, value in [0,1].
    SetParameter { index: usize, value: f32 },
}

impl ControlCommand {
    /// Negative or non-finite watts lift the limit.
    pub fn power_limit(watts: f32) -> ControlCommand {
        if watts.is_finite() && watts >= 0.0 {
            ControlCommand::SetPowerLimit(Some(watts))
        } else {
            ControlCommand::SetPowerLimit(None)
        }
    }
}
