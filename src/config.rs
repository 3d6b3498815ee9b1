use std::time::Duration;

/// GNSS constellation selection.
///
/// The receiver runs GPS plus at most one secondary system; combinations are
/// not composable, each variant maps to exactly one vendor config code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constellation {
    /// GPS only.
    GpsOnly,
    /// GPS and GLONASS.
    GpsGlonass,
    /// GPS and BeiDou.
    GpsBeidou,
    /// GPS and Galileo.
    GpsGalileo,
    /// GPS and QZSS (not supported on the EG91).
    GpsQzss,
}

/// Configuration for the location engine, passed to [`begin`].
///
/// [`begin`]: crate::engine::GnssEngine::begin
#[derive(Debug, Clone)]
pub struct LocationConfig {
    /// Constellation selection applied when GNSS mode is enabled.
    pub constellation: Constellation,
    /// GPIO pin driving the active antenna power rail, if any.
    pub antenna_pin: Option<u16>,
    /// HDOP threshold for a stable position fix (0–100).
    pub hdop_threshold: f32,
    /// Horizontal accuracy threshold in meters, where supported.
    pub hacc_threshold: f32,
    /// Maximum amount of time to wait for a position fix.
    pub max_fix_time: Duration,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            constellation: Constellation::GpsOnly,
            antenna_pin: None,
            hdop_threshold: 100.0,
            hacc_threshold: 50.0,
            max_fix_time: Duration::from_secs(90),
        }
    }
}

impl LocationConfig {
    /// Set the constellation selection.
    pub fn constellation(mut self, constellation: Constellation) -> Self {
        self.constellation = constellation;
        self
    }

    /// Enable antenna power control on the given pin.
    pub fn antenna_pin(mut self, pin: u16) -> Self {
        self.antenna_pin = Some(pin);
        self
    }

    /// Set the HDOP threshold for a stable fix, clamped to 0–100.
    pub fn hdop_threshold(mut self, hdop: f32) -> Self {
        self.hdop_threshold = hdop.clamp(0.0, 100.0);
        self
    }

    /// Set the horizontal accuracy threshold in meters for a stable fix.
    pub fn hacc_threshold(mut self, hacc: f32) -> Self {
        self.hacc_threshold = hacc;
        self
    }

    /// Set the maximum amount of time to wait for a position fix.
    pub fn max_fix_time(mut self, max: Duration) -> Self {
        self.max_fix_time = max;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LocationConfig::default();
        assert_eq!(config.constellation, Constellation::GpsOnly);
        assert_eq!(config.antenna_pin, None);
        assert_eq!(config.hdop_threshold, 100.0);
        assert_eq!(config.hacc_threshold, 50.0);
        assert_eq!(config.max_fix_time, Duration::from_secs(90));
    }

    #[test]
    fn test_hdop_threshold_clamped() {
        assert_eq!(LocationConfig::default().hdop_threshold(250.0).hdop_threshold, 100.0);
        assert_eq!(LocationConfig::default().hdop_threshold(-3.0).hdop_threshold, 0.0);
        assert_eq!(LocationConfig::default().hdop_threshold(2.5).hdop_threshold, 2.5);
    }

    #[test]
    fn test_builder_chain() {
        let config = LocationConfig::default()
            .constellation(Constellation::GpsGalileo)
            .antenna_pin(8)
            .max_fix_time(Duration::from_secs(30));
        assert_eq!(config.constellation, Constellation::GpsGalileo);
        assert_eq!(config.antenna_pin, Some(8));
        assert_eq!(config.max_fix_time, Duration::from_secs(30));
    }
}
