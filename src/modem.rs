use log::{trace, warn};

use crate::command::Command;
use crate::config::Constellation;
use crate::transport::ModemTransport;

/// A supported modem hardware generation.
///
/// The generation determines the available GNSS features and the vendor
/// config codes for constellation selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemModel {
    /// BG95-M5 or BG95-S5.
    Bg95,
    /// EG91-EX or EG91-NAX.
    Eg91,
}

impl ModemModel {
    /// Map a modem identity string to a known model.
    pub fn from_identity(identity: &str) -> Option<Self> {
        match identity {
            "BG95-M5" | "BG95-S5" => Some(ModemModel::Bg95),
            "EG91-EX" | "EG91-NAX" => Some(ModemModel::Eg91),
            _ => None,
        }
    }

    /// Whether the modem reports estimated position error (accuracy) data.
    pub fn supports_accuracy(self) -> bool {
        match self {
            ModemModel::Bg95 => true,
            ModemModel::Eg91 => false,
        }
    }

    /// Whether GNSS and cellular data can really run at the same time.
    ///
    /// The BG95 shares radio components between GNSS and cellular; a long
    /// acquisition can block the cellular modem long enough to drop the
    /// connection. The EG91 runs both independently.
    pub fn concurrent_gnss_and_cellular(self) -> bool {
        match self {
            ModemModel::Bg95 => false,
            ModemModel::Eg91 => true,
        }
    }

    /// Vendor config code for a constellation selection, or `None` when the
    /// combination is not supported on this model.
    pub fn constellation_code(self, constellation: Constellation) -> Option<u8> {
        match self {
            ModemModel::Bg95 => match constellation {
                // The BG95 has no GPS-only config; GPS+GLONASS is the closest.
                Constellation::GpsOnly | Constellation::GpsGlonass => Some(1),
                Constellation::GpsBeidou => Some(2),
                Constellation::GpsGalileo => Some(3),
                Constellation::GpsQzss => Some(4),
            },
            ModemModel::Eg91 => match constellation {
                Constellation::GpsOnly => Some(0),
                Constellation::GpsGlonass => Some(4),
                Constellation::GpsBeidou => Some(7),
                Constellation::GpsGalileo => Some(6),
                Constellation::GpsQzss => None,
            },
        }
    }
}

/// Detection state for the attached modem.
///
/// Detected once per power cycle and cached; `Unsupported` is permanent until
/// the next power cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModemCapability {
    /// Identity not read yet, typically because the modem is off or the
    /// lower transport has not cached it.
    #[default]
    Unknown,
    /// The attached modem is not a supported GNSS variant.
    Unsupported,
    /// A known, supported modem generation.
    Supported(ModemModel),
}

impl ModemCapability {
    /// The detected model, if any.
    pub fn model(self) -> Option<ModemModel> {
        match self {
            ModemCapability::Supported(model) => Some(model),
            _ => None,
        }
    }

    pub fn is_supported(self) -> bool {
        matches!(self, ModemCapability::Supported(_))
    }
}

/// Apply the constellation selection for the given model.
///
/// Unsupported (model, constellation) pairs are reported rather than falling
/// through silently.
pub(crate) fn apply_constellation(
    modem: &mut dyn ModemTransport,
    model: ModemModel,
    constellation: Constellation,
) {
    match model.constellation_code(constellation) {
        Some(code) => {
            trace!("set constellation config {code}");
            let command = Command::SetConstellation(code);
            if let Err(e) = modem.command(&command.to_at(), command.timeout()) {
                warn!("constellation config failed: {e}");
            }
        }
        None => {
            warn!("constellation {constellation:?} not supported on {model:?}");
        }
    }
}
