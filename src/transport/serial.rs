use std::io;
use std::time::{Duration, Instant};

use log::{info, trace};

use crate::error::{GnssError, Result};

use super::ModemTransport;

/// Default serial port settings for the modem's AT port.
const DATA_BITS: serialport::DataBits = serialport::DataBits::Eight;
const STOP_BITS: serialport::StopBits = serialport::StopBits::One;
const PARITY: serialport::Parity = serialport::Parity::None;

/// Command used to read the modem model identity.
const MODEL_QUERY: &str = "AT+CGMM";

/// A modem AT transport backed by a native serial port.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
    model: Option<String>,
}

impl SerialTransport {
    /// Open a serial port with 8N1 settings at the given baud rate.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .data_bits(DATA_BITS)
            .stop_bits(STOP_BITS)
            .parity(PARITY)
            .timeout(Duration::from_millis(500))
            .open()
            .map_err(GnssError::Serial)?;

        info!("opened {} at {} baud", port_name, baud_rate);
        Ok(Self { port, model: None })
    }

    /// Query the modem model with `AT+CGMM` and cache the identity.
    ///
    /// Returns `None` when the modem did not answer with a usable line;
    /// callers should retry later rather than treat this as a failure.
    pub fn read_model(&mut self) -> Result<Option<String>> {
        let text = self.issue(MODEL_QUERY, Duration::from_secs(2))?;
        self.model = text
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty() && *line != "OK")
            .map(str::to_string);
        Ok(self.model.clone())
    }

    /// Write one command and accumulate the response until a terminator
    /// line or the deadline.
    fn issue(&mut self, command: &str, timeout: Duration) -> Result<String> {
        io::Write::write_all(&mut self.port, command.as_bytes())?;
        io::Write::write_all(&mut self.port, b"\r")?;
        io::Write::flush(&mut self.port)?;

        let deadline = Instant::now() + timeout;
        let mut text = String::new();
        let mut buf = [0u8; 256];

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            let _ = self
                .port
                .set_timeout(remaining.min(Duration::from_millis(100)));

            match io::Read::read(&mut self.port, &mut buf) {
                Ok(n) if n > 0 => {
                    text.push_str(&String::from_utf8_lossy(&buf[..n]));
                    if response_complete(&text) {
                        break;
                    }
                }
                Ok(_) => {}
                Err(e) if e.kind() == io::ErrorKind::TimedOut => {}
                Err(e) => return Err(GnssError::Io(e)),
            }
        }

        if text.is_empty() {
            return Err(GnssError::Timeout);
        }

        let body = strip_echo(&text, command);
        trace!("RX: {body:?}");
        Ok(body)
    }
}

impl ModemTransport for SerialTransport {
    fn command(&mut self, command: &str, timeout: Duration) -> Result<String> {
        trace!("TX: {command}");
        self.issue(command, timeout)
    }

    fn model(&self) -> Option<String> {
        self.model.clone()
    }
}

/// Whether the accumulated text contains a response terminator line.
fn response_complete(text: &str) -> bool {
    text.lines()
        .map(str::trim)
        .any(|line| line == "OK" || line == "ERROR" || line.starts_with("+CME ERROR:"))
}

/// Drop empty lines and the command echo, and normalize line endings.
fn strip_echo(text: &str, command: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && *line != command)
        .collect::<Vec<_>>()
        .join("\n")
}
