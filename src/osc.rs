use std::{
    io::ErrorKind,
    net::{SocketAddr, UdpSocket},
    sync::atomic::{AtomicBool, Ordering},
    time::Duration,
};

use rosc::{decoder, OscMessage, OscPacket, OscType};

use crate::command::ControlCommand;
use crate::lightpipe::Producer;

/// Upper bound on how long the receive loop waits before rechecking shutdown.
const RECV_TIMEOUT: Duration = Duration::from_millis(200);

/// Receives control datagrams and forwards the raw bytes to the render thread.
pub struct OscReceiver {
    sock: UdpSocket,
}

impl OscReceiver {
    pub fn new(listen_addr: SocketAddr) -> Result<Self, String> {
        let sock = match UdpSocket::bind(listen_addr) {
            Ok(sock) => sock,
            Err(error) => return Err(error.to_string()),
        };
        if let Err(error) = sock.set_read_timeout(Some(RECV_TIMEOUT)) {
            return Err(error.to_string());
        }

        Ok(OscReceiver { sock })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, String> {
        self.sock.local_addr().map_err(|error| error.to_string())
    }

    /// Runs until `shutdown` is set. Datagrams that do not fit into the pipe
    /// are dropped, receive errors are ignored.
    pub fn run(&self, mut pipe: Producer, shutdown: &AtomicBool) {
        let mut buf = [0u8; decoder::MTU];

        while !shutdown.load(Ordering::Relaxed) {
            match self.sock.recv_from(&mut buf) {
                Ok((0, _)) => {}
                Ok((size, addr)) => {
                    log::debug!("Received packet with size {} from: {}", size, addr);
                    if !pipe.push(&buf[..size]) {
                        log::warn!("Control pipe full, dropping {} byte packet from {}", size, addr);
                    }
                }
                Err(error) if matches!(error.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {}
                Err(error) => log::debug!("Error receiving from socket: {}", error),
            }
        }

        log::debug!("OSC receiver stopped");
    }
}

/// Decodes one datagram into the commands it carries. Bundles are flattened
/// in order. Messages with unknown addresses or bad arguments are skipped.
pub fn decode_commands(bytes: &[u8]) -> Result<Vec<ControlCommand>, String> {
    let packet = match decoder::decode(bytes) {
        Ok(packet) => packet,
        Err(error) => return Err(format!("Cannot decode OSC packet: {:?}", error)),
    };

    let mut commands = Vec::new();
    collect_commands(&packet, &mut commands);
    Ok(commands)
}

fn collect_commands(packet: &OscPacket, commands: &mut Vec<ControlCommand>) {
    match packet {
        OscPacket::Message(msg) => match command_from_message(msg) {
            Ok(Some(command)) => commands.push(command),
            Ok(None) => log::debug!("Ignoring OSC address {} {:?}", msg.addr, msg.args),
            Err(msg) => log::warn!("{}", msg),
        },
        OscPacket::Bundle(bundle) => {
            for packet in &bundle.content {
                collect_commands(packet, commands);
            }
        }
    }
}

fn command_from_message(msg: &OscMessage) -> Result<Option<ControlCommand>, String> {
    let command = match msg.addr.as_str() {
        "/next" => ControlCommand::NextEffect,
        "/brightness" | "/global" => ControlCommand::SetBrightness(handle_float_message(msg)?),
        "/nightshift" => ControlCommand::SetNightshift(handle_float_message(msg)?),
        "/watts" => ControlCommand::power_limit(handle_float_message(msg)?),
        addr => {
            let Some(index) = addr.strip_prefix("/param/") else {
                return Ok(None);
            };
            let index = match index.parse::<usize>() {
                Ok(index) => index,
                Err(_) => return Err(format!("{} Invalid parameter index", addr)),
            };
            ControlCommand::SetParameter {
                index,
                value: handle_float_message(msg)?,
            }
        }
    };
    Ok(Some(command))
}

fn extract_float_argument(msg: &OscMessage, arg: &OscType) -> Result<f32, String> {
    match arg {
        OscType::Float(value) => Ok(*value),
        OscType::Double(value) => Ok(*value as f32),
        OscType::Int(value) => Ok(*value as f32),
        OscType::Long(value) => Ok(*value as f32),
        _ => Err(format!(
            "{} Unexpected OSC parameter type: {:?}",
            msg.addr, arg
        )),
    }
}

fn handle_float_message(msg: &OscMessage) -> Result<f32, String> {
    match msg.args.first() {
        Some(arg) => extract_float_argument(msg, arg),
        None => Err(format!("{} Missing OSC parameter: float", msg.addr)),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    use rosc::{encoder, OscBundle, OscTime};

    use super::*;
    use crate::lightpipe;

    fn encode(addr: &str, args: Vec<OscType>) -> Vec<u8> {
        encoder::encode(&OscPacket::Message(OscMessage {
            addr: addr.to_string(),
            args,
        }))
        .unwrap()
    }

    #[test]
    fn decodes_the_control_vocabulary() {
        assert_eq!(decode_commands(&encode("/next", vec![])).unwrap(), vec![ControlCommand::NextEffect]);
        assert_eq!(
            decode_commands(&encode("/brightness", vec![OscType::Float(0.25)])).unwrap(),
            vec![ControlCommand::SetBrightness(0.25)]
        );
        assert_eq!(
            decode_commands(&encode("/global", vec![OscType::Double(0.5)])).unwrap(),
            vec![ControlCommand::SetBrightness(0.5)]
        );
        assert_eq!(
            decode_commands(&encode("/nightshift", vec![OscType::Float(1.0)])).unwrap(),
            vec![ControlCommand::SetNightshift(1.0)]
        );
        assert_eq!(
            decode_commands(&encode("/watts", vec![OscType::Int(40)])).unwrap(),
            vec![ControlCommand::SetPowerLimit(Some(40.0))]
        );
        assert_eq!(
            decode_commands(&encode("/watts", vec![OscType::Float(-1.0)])).unwrap(),
            vec![ControlCommand::SetPowerLimit(None)]
        );
        assert_eq!(
            decode_commands(&encode("/param/2", vec![OscType::Float(0.75)])).unwrap(),
            vec![ControlCommand::SetParameter { index: 2, value: 0.75 }]
        );
    }

    #[test]
    fn skips_unknown_and_malformed_messages() {
        assert!(decode_commands(&encode("/unknown", vec![OscType::Float(1.0)])).unwrap().is_empty());
        assert!(decode_commands(&encode("/brightness", vec![])).unwrap().is_empty());
        assert!(decode_commands(&encode("/nightshift", vec![OscType::String("warm".to_string())]))
            .unwrap()
            .is_empty());
        assert!(decode_commands(&encode("/param/x", vec![OscType::Float(0.5)])).unwrap().is_empty());
    }

    #[test]
    fn rejects_garbage() {
        assert!(decode_commands(&[0xde, 0xad, 0xbe, 0xef, 0x01]).is_err());
    }

    #[test]
    fn flattens_bundles_in_order() {
        let bundle = OscPacket::Bundle(OscBundle {
            timetag: OscTime {
                seconds: 0,
                fractional: 1,
            },
            content: vec![
                OscPacket::Message(OscMessage {
                    addr: "/nightshift".to_string(),
                    args: vec![OscType::Float(0.5)],
                }),
                OscPacket::Message(OscMessage {
                    addr: "/next".to_string(),
                    args: vec![],
                }),
            ],
        });
        let bytes = encoder::encode(&bundle).unwrap();
        assert_eq!(
            decode_commands(&bytes).unwrap(),
            vec![ControlCommand::SetNightshift(0.5), ControlCommand::NextEffect]
        );
    }

    #[test]
    fn receiver_forwards_datagrams_into_the_pipe() {
        let receiver = OscReceiver::new("127.0.0.1:0".parse().unwrap()).unwrap();
        let addr = receiver.local_addr().unwrap();
        let (producer, mut consumer) = lightpipe::pipe(1024);
        let shutdown = Arc::new(AtomicBool::new(false));

        let handle = {
            let shutdown = Arc::clone(&shutdown);
            thread::spawn(move || receiver.run(producer, &shutdown))
        };

        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let packet = encode("/param/0", vec![OscType::Float(0.5)]);
        sender.send_to(&packet, addr).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while consumer.has_data() == 0 && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(consumer.peek_read().unwrap(), &packet[..]);
        consumer.consume();

        shutdown.store(true, Ordering::Relaxed);
        handle.join().unwrap();
    }
}
