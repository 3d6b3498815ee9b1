use std::time::Duration;

use crate::error::Result;

#[cfg(feature = "serial")]
pub mod serial;

/// A textual AT command channel to the modem.
///
/// The transport is synchronous-with-timeout; the acquisition worker is the
/// only caller while an acquisition is in flight.
pub trait ModemTransport: Send {
    /// Issue a command and return the raw response text, which may span
    /// several lines. An empty or partial response is the parser's problem,
    /// not the transport's.
    fn command(&mut self, command: &str, timeout: Duration) -> Result<String>;

    /// The modem model identity cached by the lower transport, if it has
    /// been read yet.
    fn model(&self) -> Option<String>;
}

/// Polled power and connectivity state.
pub trait StatusProvider: Send + Sync {
    /// Whether the modem is powered on.
    fn modem_on(&self) -> bool;

    /// Whether the cloud connection is up.
    fn cloud_connected(&self) -> bool;
}

/// Cloud event publisher.
pub trait CloudPublish: Send {
    /// Publish an event with a bounded-size text payload. Returns whether
    /// the publish call itself succeeded, not whether it was delivered.
    fn publish(&mut self, event: &str, payload: &str) -> bool;
}

/// GPIO access for the antenna power pin.
pub trait Gpio: Send {
    /// Configure a pin as a digital output.
    fn configure_output(&mut self, pin: u16);

    /// Drive a pin high or low.
    fn write(&mut self, pin: u16, high: bool);
}
