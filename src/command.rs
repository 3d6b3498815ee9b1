use std::borrow::Cow;
use std::time::Duration;

/// AT command strings for the Quectel GNSS receiver.
pub mod at {
    /// Enable the GNSS receiver.
    pub const GNSS_START: &str = "AT+QGPS=1";
    /// Disable the GNSS receiver (frees the radio for cellular data).
    pub const GNSS_STOP: &str = "AT+QGPSEND";
    /// Query the current position fix in decimal-degree format.
    pub const FIX_QUERY: &str = "AT+QGPSLOC=2";
    /// Query the estimated position error (BG95 family only).
    pub const ACCURACY_QUERY: &str = "AT+QGPSCFG=\"estimation_error\"";
    /// Enable extended accuracy (EPE) reporting (BG95 family only).
    pub const ENABLE_ACCURACY: &str = "AT+QGPSCFG=\"nmea_epe\",1";
    /// Prefix for the constellation configuration command; the numeric
    /// config code is appended.
    pub const CONSTELLATION_PREFIX: &str = "AT+QGPSCFG=\"gnssconfig\",";
}

/// How long to wait for a fix/accuracy query response.
const QUERY_TIMEOUT: Duration = Duration::from_millis(1000);
/// How long to wait for configuration and mode-switch commands.
const CONFIG_TIMEOUT: Duration = Duration::from_secs(10);

/// A command to send to the modem's GNSS engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Enable GNSS mode.
    GnssStart,
    /// Disable GNSS mode.
    GnssStop,
    /// Query the current fix report.
    QueryFix,
    /// Query the accuracy (estimation error) report.
    QueryAccuracy,
    /// Enable extended accuracy reporting.
    EnableAccuracy,
    /// Select a constellation configuration by its vendor config code.
    SetConstellation(u8),
}

impl Command {
    /// The AT command text, without the trailing CR.
    pub fn to_at(&self) -> Cow<'static, str> {
        match self {
            Command::GnssStart => Cow::Borrowed(at::GNSS_START),
            Command::GnssStop => Cow::Borrowed(at::GNSS_STOP),
            Command::QueryFix => Cow::Borrowed(at::FIX_QUERY),
            Command::QueryAccuracy => Cow::Borrowed(at::ACCURACY_QUERY),
            Command::EnableAccuracy => Cow::Borrowed(at::ENABLE_ACCURACY),
            Command::SetConstellation(code) => {
                Cow::Owned(format!("{}{}", at::CONSTELLATION_PREFIX, code))
            }
        }
    }

    /// Response timeout for this command.
    ///
    /// The fix and accuracy queries are polled once per second, so they get
    /// a short timeout; mode and configuration commands get the modem's
    /// generous default.
    pub fn timeout(&self) -> Duration {
        match self {
            Command::QueryFix | Command::QueryAccuracy => QUERY_TIMEOUT,
            _ => CONFIG_TIMEOUT,
        }
    }
}
