#[cfg(feature = "pi")]
use rppal::{
    gpio::{Gpio, InputPin},
    spi::{Bus, Mode, SlaveSelect, Spi},
};

/// Sink for serialized strip frames.
pub trait Transport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), String>;
}

/// A single digital input line, idle high.
pub trait DigitalInput {
    fn is_high(&mut self) -> bool;
}

/// Discards frames. Used when no strip is attached.
pub struct NullTransport;

impl Transport for NullTransport {
    fn write(&mut self, _bytes: &[u8]) -> Result<(), String> {
        Ok(())
    }
}

/// An input that is never pressed.
pub struct NoButton;

impl DigitalInput for NoButton {
    fn is_high(&mut self) -> bool {
        true
    }
}

/// spidev refuses transfers larger than its default buffer.
#[cfg(feature = "pi")]
const SPI_CHUNK_SIZE: usize = 4096;

#[cfg(feature = "pi")]
pub struct SpiTransport {
    spi: Spi,
}

#[cfg(feature = "pi")]
impl SpiTransport {
    pub fn new(clock_hz: u32) -> Result<Self, String> {
        match Spi::new(Bus::Spi0, SlaveSelect::Ss0, clock_hz, Mode::Mode0) {
            Ok(spi) => Ok(SpiTransport { spi }),
            Err(error) => Err(format!("Cannot open SPI0: {}", error)),
        }
    }
}

#[cfg(feature = "pi")]
impl Transport for SpiTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), String> {
        for chunk in bytes.chunks(SPI_CHUNK_SIZE) {
            let written = self.spi.write(chunk).map_err(|error| error.to_string())?;
            if written != chunk.len() {
                return Err(format!("Short SPI write: {} of {} bytes", written, chunk.len()));
            }
        }
        Ok(())
    }
}

#[cfg(feature = "pi")]
pub struct GpioButton {
    pin: InputPin,
}

#[cfg(feature = "pi")]
impl GpioButton {
    pub fn new(bcm_pin: u8) -> Result<Self, String> {
        let gpio = Gpio::new().map_err(|error| format!("Cannot open GPIO: {}", error))?;
        let pin = match gpio.get(bcm_pin) {
            Ok(pin) => pin.into_input_pullup(),
            Err(error) => return Err(format!("Cannot claim GPIO {}: {}", bcm_pin, error)),
        };
        Ok(GpioButton { pin })
    }
}

#[cfg(feature = "pi")]
impl DigitalInput for GpioButton {
    fn is_high(&mut self) -> bool {
        self.pin.is_high()
    }
}


#[cfg(test)]
mod tests {
    use super::mock::{RecordingTransport, ScriptedInput};
    use super::*;

    #[test]
    fn null_devices_are_inert() {
        assert!(NullTransport.write(&[0, 1, 2]).is_ok());
        assert!(NoButton.is_high());
    }

    #[test]
    fn recording_transport_shares_its_log() {
        let recorder = RecordingTransport::default();
        let mut handle = recorder.clone();
        handle.write(&[1, 2]).unwrap();
        handle.write(&[3]).unwrap();
        assert_eq!(recorder.frame_count(), 2);
        assert_eq!(recorder.last_frame(), Some(vec![3]));
        assert!(RecordingTransport::failing().write(&[0]).is_err());
    }

    #[test]
    fn scripted_input_holds_last_level() {
        let mut input = ScriptedInput::new(&[true, false]);
        assert!(input.is_high());
        assert!(!input.is_high());
        assert!(!input.is_high());
        assert!(ScriptedInput::new(&[]).is_high());
    }
}
