use thiserror::Error;

pub type Result<T> = std::result::Result<T, GnssError>;

#[derive(Debug, Error)]
pub enum GnssError {
    #[cfg(feature = "serial")]
    #[error("serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("timeout waiting for modem response")]
    Timeout,
}
