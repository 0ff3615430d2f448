use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::color;
use crate::command::ControlCommand;
use crate::config::Config;
use crate::effects::{Effect, EffectKind};
use crate::hardware::{DigitalInput, Transport};
use crate::intervaltimer::{Cadence, IntervalTimer};
use crate::lightpipe::Consumer;
use crate::osc;
use crate::pixelengine::PixelEngine;
use crate::telemetry::Telemetry;

/// The render loop. Owns the engine, the active effect and the read end of
/// the control pipe; nothing here is shared with other threads except the
/// shutdown flag.
///
/// Fields drop in declaration order, so the pipe is released before the
/// transport is closed.
pub struct Scheduler<T: Transport, B: DigitalInput> {
    consumer: Consumer,
    effect: Box<dyn Effect>,
    effect_kind: EffectKind,
    engine: PixelEngine,
    button: B,
    timer: IntervalTimer,
    telemetry_cadence: Cadence,
    shutdown: Arc<AtomicBool>,
    button_was_high: bool,
    advance_requested: bool,
    dt: f64,
    frames: u64,
    frames_since_report: u32,
    underruns: u32,
    last_report: Instant,
    energy_joules: f64,
    transport: T,
}

impl<T: Transport, B: DigitalInput> Scheduler<T, B> {
    pub fn new(config: &Config, consumer: Consumer, transport: T, button: B, shutdown: Arc<AtomicBool>) -> Self {
        let mut engine = PixelEngine::new(config.led_count, config.current_model());
        engine.set_global_brightness(config.brightness);
        engine.set_power_limit(config.power_limit_watts);
        engine.set_nightshift(config.nightshift);

        let effect_kind = EffectKind::ROTATION[0];
        let effect = effect_kind.create(&engine);

        Scheduler {
            consumer,
            effect,
            effect_kind,
            engine,
            button,
            timer: IntervalTimer::new(config.fps),
            telemetry_cadence: Cadence::new(config.telemetry_interval()),
            shutdown,
            button_was_high: true,
            advance_requested: false,
            dt: 0.0,
            frames: 0,
            frames_since_report: 0,
            underruns: 0,
            last_report: Instant::now(),
            energy_joules: 0.0,
            transport,
        }
    }

    /// Renders frames until shutdown is requested, then blanks the strip.
    pub fn run(&mut self) {
        log::info!(
            "Rendering {} LEDs, starting with {}",
            self.engine.led_count(),
            self.effect.name()
        );

        self.timer.start_frame();
        while !self.shutdown.load(Ordering::Relaxed) {
            self.frame();
        }

        self.blackout();
        log::info!("Render loop stopped after {} frames", self.frames);
    }

    /// Renders one frame. Time is measured from the end of the previous
    /// frame's pacing, so telemetry output is included in the next frame.
    pub fn frame(&mut self) {
        self.poll_button();
        self.drain_commands();

        if self.advance_requested {
            self.advance_effect();
        }

        self.effect.process(self.dt, &mut self.engine);
        self.send_frame();

        let pacing = self.timer.finish_frame();
        self.dt = pacing.dt;
        if pacing.underrun {
            self.underruns += 1;
            log::debug!("Frame {} overran: {:.1} ms", self.frames, pacing.dt * 1000.0);
        }
        self.energy_joules += self.engine.current_watts() as f64 * pacing.dt;
        self.frames += 1;
        self.frames_since_report += 1;

        let now = Instant::now();
        if self.telemetry_cadence.due(now) {
            println!("{}", self.telemetry(now));
            self.frames_since_report = 0;
            self.underruns = 0;
            self.last_report = now;
        }
    }

    pub fn apply_command(&mut self, command: ControlCommand) {
        log::debug!("Applying {:?}", command);
        match command {
            ControlCommand::NextEffect => self.advance_requested = true,
            ControlCommand::SetBrightness(brightness) => self.engine.set_global_brightness(brightness),
            ControlCommand::SetNightshift(nightshift) => self.engine.set_nightshift(nightshift),
            ControlCommand::SetPowerLimit(watts) => self.engine.set_power_limit(watts),
            ControlCommand::SetParameter { index, value } => {
                self.effect.set_parameter(index, color::clamp01(value))
            }
        }
    }

    pub fn telemetry(&self, now: Instant) -> Telemetry {
        let elapsed = now.duration_since(self.last_report).as_secs_f32();
        Telemetry {
            fps: if elapsed > 0.0 {
                self.frames_since_report as f32 / elapsed
            } else {
                0.0
            },
            frames: self.frames,
            underruns: self.underruns,
            amps: self.engine.current_amps(),
            watts: self.engine.current_watts(),
            max_watts: self.engine.max_watts(),
            energy_wh: self.energy_joules / 3600.0,
            brightness: self.engine.global_brightness(),
            suppressed: self.engine.is_power_suppression_engaged(),
            nightshift: self.engine.nightshift(),
            effect: self.effect.name(),
            parameter: self.effect.parameter(0),
        }
    }

    pub fn engine(&self) -> &PixelEngine {
        &self.engine
    }

    pub fn effect_kind(&self) -> EffectKind {
        self.effect_kind
    }

    fn poll_button(&mut self) {
        let high = self.button.is_high();
        if self.button_was_high && !high {
            log::debug!("Button pressed");
            self.advance_requested = true;
        }
        self.button_was_high = high;
    }

    fn drain_commands(&mut self) {
        while let Some(record) = self.consumer.peek_read() {
            let commands = osc::decode_commands(record);
            self.consumer.consume();

            match commands {
                Ok(commands) => {
                    for command in commands {
                        self.apply_command(command);
                    }
                }
                Err(msg) => log::warn!("{}", msg),
            }
        }
    }

    fn advance_effect(&mut self) {
        self.advance_requested = false;
        self.engine.clear();
        self.effect_kind = self.effect_kind.next();
        self.effect = self.effect_kind.create(&self.engine);
        self.dt = 0.0;
        log::info!("Switched to {}", self.effect.name());
    }

    fn send_frame(&mut self) {
        let bytes = self.engine.prepare_wire_bytes();
        if let Err(msg) = self.transport.write(bytes) {
            log::warn!("Dropping frame: {}", msg);
        }
    }

    fn blackout(&mut self) {
        self.engine.clear();
        self.send_frame();
    }
}
