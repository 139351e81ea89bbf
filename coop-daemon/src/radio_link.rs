//! Serial link to the radio module
//!
//! The radio module bridges the controllers' wireless network onto a serial
//! port as newline-terminated text payloads. Inbound payloads are handed to
//! the coordinator unparsed; outbound payloads come from the coordinator's
//! radio queue.

use std::time::Duration;

use coop_mux::{CoordinatorError, CoordinatorHandle};
use coop_protocol::{FrameDecoder, ParseError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio_serial::{SerialPortBuilderExt, SerialStream};
use tracing::{debug, info, warn};

/// Errors that end the link
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("serial I/O error on {port}: {source}")]
    Io {
        port: String,
        source: std::io::Error,
    },

    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: tokio_serial::Error,
    },

    #[error(transparent)]
    Coordinator(#[from] CoordinatorError),
}

/// Log the serial ports present on this machine
pub fn log_available_ports() {
    match serialport::available_ports() {
        Ok(ports) if ports.is_empty() => warn!("No serial ports found"),
        Ok(ports) => {
            for port in ports {
                info!("Available serial port: {} ({:?})", port.port_name, port.port_type);
            }
        }
        Err(e) => warn!("Failed to enumerate serial ports: {}", e),
    }
}

/// Byte stream to the radio module
pub struct RadioLink<S> {
    port_name: String,
    stream: S,
    decoder: FrameDecoder,
    buffer: Vec<u8>,
}

impl RadioLink<SerialStream> {
    /// Open the serial port the radio module is attached to
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, LinkError> {
        let stream = tokio_serial::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open_native_async()
            .map_err(|source| LinkError::Open {
                port: port_name.to_string(),
                source,
            })?;

        info!("Opened radio link on {} at {} baud", port_name, baud_rate);
        Ok(Self::new(port_name, stream))
    }
}

impl<S> RadioLink<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wrap an already open stream
    pub fn new(port_name: &str, stream: S) -> Self {
        Self {
            port_name: port_name.to_string(),
            stream,
            decoder: FrameDecoder::new(),
            buffer: vec![0u8; 1024],
        }
    }

    fn io_error(&self, source: std::io::Error) -> LinkError {
        LinkError::Io {
            port: self.port_name.clone(),
            source,
        }
    }

    /// Write one payload, newline terminated
    pub async fn write_payload(&mut self, payload: &str) -> Result<(), LinkError> {
        let mut line = Vec::with_capacity(payload.len() + 1);
        line.extend_from_slice(payload.as_bytes());
        line.push(b'\n');

        if let Err(e) = self.stream.write_all(&line).await {
            return Err(self.io_error(e));
        }
        if let Err(e) = self.stream.flush().await {
            return Err(self.io_error(e));
        }

        debug!("Radio TX {}", payload);
        Ok(())
    }

    /// Forward every complete inbound payload to the coordinator
    async fn forward_inbound(&mut self, handle: &CoordinatorHandle) -> Result<(), LinkError> {
        while let Some((text, result)) = self.decoder.next_frame() {
            // Other parse errors are counted by the coordinator
            if let Err(ParseError::InvalidUtf8) = result {
                warn!("Dropping non-UTF-8 payload on {}: {:?}", self.port_name, text);
                continue;
            }

            debug!("Radio RX {}", text);
            handle.radio_payload(text).await?;
        }
        Ok(())
    }

    /// Pump bytes both ways until the port closes or the coordinator stops
    pub async fn run(
        mut self,
        handle: CoordinatorHandle,
        mut outbound_rx: mpsc::Receiver<String>,
    ) -> Result<(), LinkError> {
        info!("Starting radio link on {}", self.port_name);

        loop {
            tokio::select! {
                payload = outbound_rx.recv() => {
                    let Some(payload) = payload else {
                        info!("Radio queue closed, stopping link on {}", self.port_name);
                        break;
                    };
                    self.write_payload(&payload).await?;
                }

                result = self.stream.read(&mut self.buffer) => {
                    match result {
                        Ok(0) => {
                            info!("Radio link on {} closed", self.port_name);
                            break;
                        }
                        Ok(n) => {
                            self.decoder.push_bytes(&self.buffer[..n]);
                            self.forward_inbound(&handle).await?;
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::TimedOut => {}
                        Err(e) => return Err(self.io_error(e)),
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coop_mux::CoordinatorCommand;

    fn handle() -> (CoordinatorHandle, mpsc::Receiver<CoordinatorCommand>) {
        let (tx, rx) = mpsc::channel(16);
        (CoordinatorHandle::new(tx), rx)
    }

    async fn next_payload(rx: &mut mpsc::Receiver<CoordinatorCommand>) -> String {
        match rx.recv().await {
            Some(CoordinatorCommand::RadioPayload { payload }) => payload,
            other => panic!("expected a radio payload, got {:?}", other.is_some()),
        }
    }

    #[tokio::test]
    async fn test_inbound_payloads_forwarded() {
        let (radio, mut module) = tokio::io::duplex(256);
        let (handle, mut cmd_rx) = handle();
        let (_out_tx, out_rx) = mpsc::channel(4);

        let link = RadioLink::new("test", radio);
        let task = tokio::spawn(link.run(handle, out_rx));

        module.write_all(b"CON|C59|0|120\n\nFINAL|C").await.unwrap();
        module.write_all(b"59|1|130\n").await.unwrap();

        assert_eq!(next_payload(&mut cmd_rx).await, "CON|C59|0|120");
        assert_eq!(next_payload(&mut cmd_rx).await, "FINAL|C59|1|130");

        drop(module);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_malformed_payload_still_forwarded() {
        let (radio, mut module) = tokio::io::duplex(256);
        let (handle, mut cmd_rx) = handle();
        let (_out_tx, out_rx) = mpsc::channel(4);

        let task = tokio::spawn(RadioLink::new("test", radio).run(handle, out_rx));

        module.write_all(b"garbage\nSTR|DD3||44\n").await.unwrap();

        assert_eq!(next_payload(&mut cmd_rx).await, "garbage");
        assert_eq!(next_payload(&mut cmd_rx).await, "STR|DD3||44");

        drop(module);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_outbound_payloads_newline_terminated() {
        let (radio, mut module) = tokio::io::duplex(256);
        let (handle, _cmd_rx) = handle();
        let (out_tx, out_rx) = mpsc::channel(4);

        let task = tokio::spawn(RadioLink::new("test", radio).run(handle, out_rx));

        out_tx.send("CON|COORD|250".to_string()).await.unwrap();
        drop(out_tx);
        task.await.unwrap().unwrap();

        let mut received = Vec::new();
        module.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"CON|COORD|250\n");
    }

    #[tokio::test]
    async fn test_stopped_coordinator_ends_link() {
        let (radio, mut module) = tokio::io::duplex(256);
        let (handle, cmd_rx) = handle();
        let (_out_tx, out_rx) = mpsc::channel(4);
        drop(cmd_rx);

        let task = tokio::spawn(RadioLink::new("test", radio).run(handle, out_rx));
        module.write_all(b"CON|C59|0|1\n").await.unwrap();

        assert!(matches!(
            task.await.unwrap(),
            Err(LinkError::Coordinator(CoordinatorError::Stopped))
        ));
    }
}
