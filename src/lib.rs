//! Renders animations onto an APA102 LED strip, controlled over OSC.

pub mod color;
pub mod command;
pub mod config;
pub mod effects;
pub mod hardware;
pub mod intervaltimer;
pub mod lightpipe;
pub mod osc;
pub mod pixelengine;
pub mod scheduler;
pub mod telemetry;
