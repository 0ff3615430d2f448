use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use anyhow::{anyhow, Context};
use clap::Parser;

use lightpipe::config::Config;
use lightpipe::hardware::{self, DigitalInput, Transport};
use lightpipe::lightpipe::pipe;
use lightpipe::osc::OscReceiver;
use lightpipe::scheduler::Scheduler;

#[derive(Parser)]
#[command(about = "Drives an APA102 LED strip, controlled over OSC")]
struct Cli {
    /// Number of LEDs on the strip
    #[arg(value_name = "LED_COUNT")]
    led_count: Option<usize>,

    /// Target frame rate, zero or below for unbounded
    #[arg(short, long, allow_negative_numbers = true)]
    fps: Option<f32>,

    /// Initial global brightness in [0,1]
    #[arg(short, long)]
    brightness: Option<f32>,

    /// Power ceiling in watts, negative for unlimited
    #[arg(short = 'w', long, allow_negative_numbers = true)]
    max_watts: Option<f32>,

    /// Initial nightshift in [0,1]
    #[arg(short, long)]
    nightshift: Option<f32>,

    /// Address to receive OSC control messages on
    #[arg(short, long, value_name = "ADDR")]
    listen: Option<SocketAddr>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn load_config(args: &Cli) -> Result<Config, String> {
    let mut config = match args.config.as_deref() {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    if let Some(led_count) = args.led_count {
        config.led_count = led_count;
    }
    if let Some(fps) = args.fps {
        config.fps = fps;
    }
    if let Some(brightness) = args.brightness {
        config.brightness = brightness;
    }
    if let Some(max_watts) = args.max_watts {
        config.power_limit_watts = Some(max_watts);
    }
    if let Some(nightshift) = args.nightshift {
        config.nightshift = nightshift;
    }
    if let Some(listen) = args.listen {
        config.listen_addr = listen;
    }

    config.validate()
}

#[cfg(feature = "pi")]
fn open_hardware(config: &Config) -> Result<(impl Transport, impl DigitalInput), String> {
    let transport = hardware::SpiTransport::new(config.spi_clock_hz)?;
    let button = hardware::GpioButton::new(config.button_pin)?;
    Ok((transport, button))
}

#[cfg(not(feature = "pi"))]
fn open_hardware(_config: &Config) -> Result<(impl Transport, impl DigitalInput), String> {
    log::warn!("Built without the pi feature, frames are discarded");
    Ok((hardware::NullTransport, hardware::NoButton))
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();
    let config = load_config(&args).map_err(|msg| anyhow!(msg))?;
    log::debug!("{:?}", config);

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::Relaxed))
            .context("Cannot install signal handler")?;
    }

    let (transport, button) =
        open_hardware(&config).map_err(|msg| anyhow!("Cannot set up hardware: {}", msg))?;

    let osc_receiver = OscReceiver::new(config.listen_addr)
        .map_err(|msg| anyhow!("Cannot set up OSC on {}: {}", config.listen_addr, msg))?;
    log::info!("Listening for OSC on {}", config.listen_addr);

    let (producer, consumer) = pipe(config.pipe_capacity);
    let mut scheduler = Scheduler::new(&config, consumer, transport, button, Arc::clone(&shutdown));

    let osc_thread = {
        let shutdown = Arc::clone(&shutdown);
        thread::Builder::new()
            .name("OSC".to_string())
            .spawn(move || osc_receiver.run(producer, &shutdown))
            .context("Failed to create thread")?
    };

    scheduler.run();

    // The receiver may still be writing into the pipe until it has seen the flag
    shutdown.store(true, Ordering::Relaxed);
    if osc_thread.join().is_err() {
        log::error!("OSC thread panicked");
    }
    drop(scheduler);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_defaults() {
        let args = Cli::parse_from(["lightpipe", "144", "--fps", "30", "--max-watts", "-1", "-b", "0.5"]);
        let config = load_config(&args).unwrap();
        assert_eq!(config.led_count, 144);
        assert_eq!(config.fps, 30.0);
        assert_eq!(config.brightness, 0.5);
        assert_eq!(config.power_limit_watts, None);
        assert_eq!(config.listen_addr, "0.0.0.0:2018".parse().unwrap());
    }

    #[test]
    fn led_count_is_required() {
        let args = Cli::parse_from(["lightpipe"]);
        assert!(load_config(&args).is_err());
    }

    #[test]
    fn clap_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
