//! Serial driver for low-level hardware communication
//!
//! Opens ports through `tokio-serial` and exposes them as a pair of line
//! reader/writer halves that can be used from different tasks.

use async_trait::async_trait;
use std::time::Duration;
use tiltlink_core::{Result, TiltLinkError};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::time::timeout;
use tokio_serial::{SerialPort, SerialPortBuilderExt};
use tracing::{debug, error, warn};

use crate::transport::{
    decode_ascii, encode_ascii, LineReader, LineWriter, LinkSettings, PortOpener, ReadOutcome,
    SerialLink,
};

/// Serial driver backed by the operating system's serial ports
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialDriver;

impl SerialDriver {
    pub fn new() -> Self {
        Self
    }
}

impl PortOpener for SerialDriver {
    fn available_ports(&self) -> Result<Vec<String>> {
        let ports = tokio_serial::available_ports().map_err(|e| {
            error!("Failed to enumerate serial ports: {}", e);
            TiltLinkError::Serial(format!("Failed to enumerate ports: {}", e))
        })?;

        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, port_name: &str, settings: &LinkSettings) -> Result<SerialLink> {
        debug!(
            "Opening serial port: {} ({} baud, DTR={}, RTS={})",
            port_name, settings.baud_rate, settings.handshake.dtr, settings.handshake.rts
        );

        let mut port = tokio_serial::new(port_name, settings.baud_rate)
            .timeout(settings.read_timeout)
            .data_bits(tokio_serial::DataBits::Eight)
            .parity(tokio_serial::Parity::None)
            .stop_bits(tokio_serial::StopBits::One)
            .flow_control(tokio_serial::FlowControl::None)
            .open_native_async()
            .map_err(|e| TiltLinkError::Serial(format!("Failed to open serial port: {}", e)))?;

        port.write_data_terminal_ready(settings.handshake.dtr)
            .map_err(|e| TiltLinkError::Serial(format!("Failed to set DTR: {}", e)))?;
        port.write_request_to_send(settings.handshake.rts)
            .map_err(|e| TiltLinkError::Serial(format!("Failed to set RTS: {}", e)))?;

        debug!("Serial port opened successfully");

        let (read_half, write_half) = tokio::io::split(port);

        Ok(SerialLink {
            port_name: port_name.to_string(),
            reader: Box::new(SerialLineReader::new(read_half, settings.read_timeout)),
            writer: Box::new(SerialLineWriter::new(
                write_half,
                &settings.newline,
                settings.write_timeout,
            )),
        })
    }
}

/// Longest line accepted from the device, excluding the terminator
const MAX_LINE_BYTES: usize = 256;

/// Line reader over any async byte stream
///
/// Bytes of a partially received line survive a read timeout and are
/// completed by the next call. A line that grows past `MAX_LINE_BYTES` is
/// dropped up to and including its terminator.
pub struct SerialLineReader<R> {
    inner: BufReader<R>,
    pending: Vec<u8>,
    discarding: bool,
    read_timeout: Duration,
}

impl<R: AsyncRead + Unpin + Send> SerialLineReader<R> {
    pub fn new(inner: R, read_timeout: Duration) -> Self {
        Self {
            inner: BufReader::new(inner),
            pending: Vec::new(),
            discarding: false,
            read_timeout,
        }
    }

    fn take_line(&mut self) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        if bytes.last() == Some(&b'\n') {
            bytes.pop();
        }
        decode_ascii(&bytes)
    }
}

#[async_trait]
impl<R: AsyncRead + Unpin + Send> LineReader for SerialLineReader<R> {
    async fn read_line(&mut self) -> Result<ReadOutcome> {
        let room = (MAX_LINE_BYTES + 1).saturating_sub(self.pending.len()) as u64;
        let result = timeout(
            self.read_timeout,
            (&mut self.inner)
                .take(room)
                .read_until(b'\n', &mut self.pending),
        )
        .await;

        match result {
            Err(_) => Ok(ReadOutcome::Timeout),
            Ok(Ok(0)) => {
                // EOF indicates device disconnection (USB unplugged, link dropped)
                warn!("Serial port returned EOF - device may have been disconnected");
                Err(TiltLinkError::DeviceDisconnected(
                    "Serial port returned EOF".to_string(),
                ))
            }
            Ok(Ok(_)) if self.pending.last() == Some(&b'\n') => {
                if self.discarding {
                    self.discarding = false;
                    self.pending.clear();
                    return Ok(ReadOutcome::Timeout);
                }
                Ok(ReadOutcome::Line(self.take_line()))
            }
            Ok(Ok(_)) => {
                // Hit the length cap, or EOF mid-line (reported by the next call)
                if self.pending.len() > MAX_LINE_BYTES {
                    if !self.discarding {
                        warn!("Discarding line longer than {} bytes", MAX_LINE_BYTES);
                    }
                    self.discarding = true;
                    self.pending.clear();
                }
                Ok(ReadOutcome::Timeout)
            }
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::TimedOut => Ok(ReadOutcome::Timeout),
            Ok(Err(e)) => Err(TiltLinkError::Serial(format!("Read error: {}", e))),
        }
    }
}

/// Line writer over any async byte sink
pub struct SerialLineWriter<W> {
    inner: W,
    newline: String,
    write_timeout: Duration,
}

impl<W: AsyncWrite + Unpin + Send> SerialLineWriter<W> {
    pub fn new(inner: W, newline: &str, write_timeout: Duration) -> Self {
        Self {
            inner,
            newline: newline.to_string(),
            write_timeout,
        }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> LineWriter for SerialLineWriter<W> {
    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut payload = encode_ascii(line);
        payload.extend_from_slice(self.newline.as_bytes());

        timeout(self.write_timeout, self.inner.write_all(&payload))
            .await
            .map_err(|_| TiltLinkError::Timeout("Write operation timed out".to_string()))?
            .map_err(|e| TiltLinkError::Serial(format!("Write failed: {}", e)))?;

        // Flush to ensure data is sent
        timeout(self.write_timeout, self.inner.flush())
            .await
            .map_err(|_| TiltLinkError::Timeout("Flush operation timed out".to_string()))?
            .map_err(|e| TiltLinkError::Serial(format!("Flush failed: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: Duration = Duration::from_millis(50);

    #[tokio::test]
    async fn test_reads_complete_lines() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut reader = SerialLineReader::new(host, SHORT);

        device.write_all(b"BTN:1\r\n12.5\n").await.unwrap();

        assert_eq!(
            reader.read_line().await.unwrap(),
            ReadOutcome::Line("BTN:1\r".to_string())
        );
        assert_eq!(
            reader.read_line().await.unwrap(),
            ReadOutcome::Line("12.5".to_string())
        );
    }

    #[tokio::test]
    async fn test_timeout_keeps_partial_line() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut reader = SerialLineReader::new(host, SHORT);

        device.write_all(b"THR:0.").await.unwrap();
        assert_eq!(reader.read_line().await.unwrap(), ReadOutcome::Timeout);

        device.write_all(b"75\n").await.unwrap();
        assert_eq!(
            reader.read_line().await.unwrap(),
            ReadOutcome::Line("THR:0.75".to_string())
        );
    }

    #[tokio::test]
    async fn test_overlong_line_is_dropped() {
        let (mut device, host) = tokio::io::duplex(1024);
        let mut reader = SerialLineReader::new(host, SHORT);

        let mut junk = vec![b'x'; 300];
        junk.extend_from_slice(b"\n12.5\n");
        device.write_all(&junk).await.unwrap();

        assert_eq!(reader.read_line().await.unwrap(), ReadOutcome::Timeout);
        assert!(reader.pending.len() <= MAX_LINE_BYTES);
        // The tail of the dropped line is not mistaken for a line of its own
        assert_eq!(reader.read_line().await.unwrap(), ReadOutcome::Timeout);
        assert_eq!(
            reader.read_line().await.unwrap(),
            ReadOutcome::Line("12.5".to_string())
        );
    }

    #[tokio::test]
    async fn test_line_at_length_cap_is_kept() {
        let (mut device, host) = tokio::io::duplex(1024);
        let mut reader = SerialLineReader::new(host, SHORT);

        let mut line = vec![b'7'; MAX_LINE_BYTES];
        line.push(b'\n');
        device.write_all(&line).await.unwrap();

        assert_eq!(
            reader.read_line().await.unwrap(),
            ReadOutcome::Line("7".repeat(MAX_LINE_BYTES))
        );
    }

    #[tokio::test]
    async fn test_eof_is_disconnect() {
        let (device, host) = tokio::io::duplex(64);
        let mut reader = SerialLineReader::new(host, SHORT);
        drop(device);

        let err = reader.read_line().await.unwrap_err();
        assert!(matches!(err, TiltLinkError::DeviceDisconnected(_)));
    }

    #[tokio::test]
    async fn test_non_ascii_bytes_are_replaced() {
        let (mut device, host) = tokio::io::duplex(64);
        let mut reader = SerialLineReader::new(host, SHORT);

        device.write_all(&[b'4', 0xC2, 0xB0, b'\n']).await.unwrap();
        assert_eq!(
            reader.read_line().await.unwrap(),
            ReadOutcome::Line("4??".to_string())
        );
    }

    #[tokio::test]
    async fn test_writer_appends_newline() {
        let (host, mut device) = tokio::io::duplex(64);
        let mut writer = SerialLineWriter::new(host, "\n", SHORT);

        writer.write_line("SPD:42").await.unwrap();

        let mut buf = [0u8; 7];
        device.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"SPD:42\n");
    }

    #[tokio::test]
    async fn test_writer_reports_closed_peer() {
        let (host, device) = tokio::io::duplex(64);
        let mut writer = SerialLineWriter::new(host, "\n", SHORT);
        drop(device);

        assert!(writer.write_line("SPD:1").await.is_err());
    }

    #[test]
    fn test_available_ports_does_not_panic() {
        // Result depends on the machine; only check the call is safe
        let _ = SerialDriver::new().available_ports();
    }
}
