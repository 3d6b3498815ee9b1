//! GNSS location acquisition through a Quectel cellular modem.
//!
//! Drives the built-in GNSS receiver of Quectel BG95 and EG91 modems over
//! their textual AT command channel: session start/stop, constellation
//! selection, a polled fix loop with a stabilization policy, and a compact
//! JSON location payload for cloud publishing.
//!
//! The caller provides the platform seams as trait objects: an AT transport
//! ([`transport::ModemTransport`]), power and connectivity status
//! ([`transport::StatusProvider`]), an event publisher
//! ([`transport::CloudPublish`]), and GPIO for the active antenna rail
//! ([`transport::Gpio`]). A ready-made serial transport is available behind
//! the `serial` feature.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use quectel_gnss::{Constellation, GnssEngine, LocationConfig, LocationResult};
//! # use quectel_gnss::transport::{CloudPublish, Gpio, ModemTransport, StatusProvider};
//! # fn wire() -> (Box<dyn ModemTransport>, Box<dyn Gpio>, Arc<dyn StatusProvider>, Box<dyn CloudPublish>) { unimplemented!() }
//!
//! let (modem, gpio, status, cloud) = wire();
//! let engine = GnssEngine::new(modem, gpio, status, cloud);
//! engine.begin(
//!     LocationConfig::default()
//!         .constellation(Constellation::GpsGlonass)
//!         .hdop_threshold(10.0)
//!         .max_fix_time(Duration::from_secs(120)),
//! );
//!
//! let (result, point) = engine.get_location(true);
//! if result == LocationResult::Fixed {
//!     println!("{}", point.to_string_simple());
//! }
//! ```

pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod modem;
pub mod payload;
pub mod point;
pub mod response;
pub mod transport;

mod worker;

pub use config::{Constellation, LocationConfig};
pub use engine::{GnssEngine, LocationResult};
pub use error::{GnssError, Result};
pub use modem::{ModemCapability, ModemModel};
pub use point::LocationPoint;
pub use worker::LocationDoneCallback;
