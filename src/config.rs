use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use config_file::FromConfigFile;
use serde::Deserialize;

use crate::color;
use crate::pixelengine::CurrentModel;

/// Smallest pipe that still holds one minimal record.
const MIN_PIPE_CAPACITY: usize = 16;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub led_count: usize,
    /// Target frame rate. Zero or below renders as fast as possible.
    pub fps: f32,
    pub brightness: f32,
    /// Negative means unlimited.
    pub power_limit_watts: Option<f32>,
    pub nightshift: f32,
    pub listen_addr: SocketAddr,
    /// Bytes reserved for control messages in flight.
    pub pipe_capacity: usize,
    pub spi_clock_hz: u32,
    /// BCM number of the advance button.
    pub button_pin: u8,
    pub telemetry_interval_ms: u64,
    pub amps_per_channel: f32,
    pub max_amps_per_led: f32,
}

impl Default for Config {
    fn default() -> Self {
        let current = CurrentModel::default();
        Config {
            led_count: 0,
            fps: 60.0,
            brightness: 1.0,
            power_limit_watts: None,
            nightshift: 0.0,
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 2018)),
            pipe_capacity: 4096,
            spi_clock_hz: 2_000_000,
            button_pin: 2,
            telemetry_interval_ms: 500,
            amps_per_channel: current.amps_per_channel,
            max_amps_per_led: current.max_amps_per_led,
        }
    }
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, String> {
        match Config::from_config_file(path) {
            Ok(config) => Ok(config),
            Err(error) => Err(format!("Cannot read {}: {}", path.display(), error)),
        }
    }

    /// Rejects settings the render loop cannot run with and clamps the rest
    /// into range.
    pub fn validate(mut self) -> Result<Self, String> {
        if self.led_count == 0 {
            return Err("LED count must be greater than zero".to_string());
        }
        if self.pipe_capacity < MIN_PIPE_CAPACITY {
            return Err(format!(
                "Pipe capacity must be at least {} bytes, got {}",
                MIN_PIPE_CAPACITY, self.pipe_capacity
            ));
        }
        if !(self.amps_per_channel >= 0.0 && self.max_amps_per_led >= 0.0) {
            return Err("Current constants must not be negative".to_string());
        }
        if self.fps.is_nan() {
            self.fps = 0.0;
        }

        self.brightness = color::clamp01(self.brightness);
        self.nightshift = color::clamp01(self.nightshift);
        self.power_limit_watts = self.power_limit_watts.filter(|w| *w >= 0.0);
        Ok(self)
    }

    pub fn current_model(&self) -> CurrentModel {
        CurrentModel {
            amps_per_channel: self.amps_per_channel,
            max_amps_per_led: self.max_amps_per_led,
        }
    }

    pub fn telemetry_interval(&self) -> Duration {
        Duration::from_millis(self.telemetry_interval_ms.max(1))
    }
}
