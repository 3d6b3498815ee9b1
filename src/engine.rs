//! The public location engine facade.
//!
//! One `GnssEngine` instance owns the worker thread and the collaborator
//! handles. Construct it once at the composition root and share it by
//! reference; there is no global singleton.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{info, trace};
use serde_json::{Map, Value, json};

use crate::config::LocationConfig;
use crate::modem::{self, ModemCapability, ModemModel};
use crate::payload::{EVENT_NAME, build_publish};
use crate::point::LocationPoint;
use crate::transport::{CloudPublish, Gpio, ModemTransport, StatusProvider};
use crate::worker::{AcquireRequest, LocationDoneCallback, Worker, WorkerCommand};

/// Poll cadence of the fix query loop, and the worker's idle wait.
const POLL_PERIOD: Duration = Duration::from_millis(1000);
/// Settling time after asserting antenna power.
const ANTENNA_SETTLE: Duration = Duration::from_millis(100);

/// Outcome of an acquisition request or status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationResult {
    /// GNSS is not available, typically because the modem is off.
    Unavailable,
    /// GNSS is not supported on this modem.
    Unsupported,
    /// No acquisition is pending or in progress.
    Idle,
    /// An acquisition is in progress.
    Acquiring,
    /// A previous acquisition is still in progress.
    Pending,
    /// A position has been acquired and fixed.
    Fixed,
    /// No stable fix within the configured window.
    TimedOut,
}

/// Last completed acquisition, written only by the worker.
pub(crate) struct LastFix {
    pub(crate) point: LocationPoint,
    pub(crate) result: LocationResult,
}

/// State shared between the facade and the worker thread.
pub(crate) struct Shared {
    /// In-flight flag; at most one acquisition at a time.
    pub(crate) acquiring: AtomicBool,
    pub(crate) capability: Mutex<ModemCapability>,
    pub(crate) config: Mutex<LocationConfig>,
    pub(crate) last: Mutex<LastFix>,
}

/// GNSS location engine driving the cellular modem's built-in receiver.
pub struct GnssEngine {
    shared: Arc<Shared>,
    modem: Arc<Mutex<Box<dyn ModemTransport>>>,
    gpio: Arc<Mutex<Box<dyn Gpio>>>,
    status: Arc<dyn StatusProvider>,
    cloud: Mutex<Box<dyn CloudPublish>>,
    cmd_tx: SyncSender<WorkerCommand>,
    resp_rx: Mutex<Receiver<LocationResult>>,
    req_id: AtomicU32,
    poll_period: Duration,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl GnssEngine {
    /// Create the engine and start its worker thread.
    pub fn new(
        modem: Box<dyn ModemTransport>,
        gpio: Box<dyn Gpio>,
        status: Arc<dyn StatusProvider>,
        cloud: Box<dyn CloudPublish>,
    ) -> Self {
        Self::with_timing(modem, gpio, status, cloud, POLL_PERIOD, ANTENNA_SETTLE)
    }

    pub(crate) fn with_timing(
        modem: Box<dyn ModemTransport>,
        gpio: Box<dyn Gpio>,
        status: Arc<dyn StatusProvider>,
        cloud: Box<dyn CloudPublish>,
        poll_period: Duration,
        settle_delay: Duration,
    ) -> Self {
        let shared = Arc::new(Shared {
            acquiring: AtomicBool::new(false),
            capability: Mutex::new(ModemCapability::Unknown),
            config: Mutex::new(LocationConfig::default()),
            last: Mutex::new(LastFix {
                point: LocationPoint::default(),
                result: LocationResult::Unavailable,
            }),
        });
        let modem = Arc::new(Mutex::new(modem));
        let gpio = Arc::new(Mutex::new(gpio));

        let (cmd_tx, cmd_rx) = mpsc::sync_channel(1);
        let (resp_tx, resp_rx) = mpsc::sync_channel(1);

        let worker = Worker::new(
            Arc::clone(&modem),
            Arc::clone(&gpio),
            Arc::clone(&status),
            Arc::clone(&shared),
            cmd_rx,
            resp_tx,
            poll_period,
            settle_delay,
        );
        let handle = thread::Builder::new()
            .name("gnss-worker".into())
            .spawn(move || worker.run())
            .expect("failed to spawn gnss worker thread");

        Self {
            shared,
            modem,
            gpio,
            status,
            cloud: Mutex::new(cloud),
            cmd_tx,
            resp_rx: Mutex::new(resp_rx),
            req_id: AtomicU32::new(1),
            poll_period,
            worker: Mutex::new(Some(handle)),
        }
    }

    /// One-time setup: store the configuration, configure the antenna pin,
    /// and, if the modem is already up and identifiable, detect the modem
    /// and apply the constellation selection right away.
    pub fn begin(&self, config: LocationConfig) {
        info!("beginning location engine");

        if let Some(pin) = config.antenna_pin {
            info!("configuring antenna pin {pin}");
            self.gpio.lock().unwrap().configure_output(pin);
        }
        let constellation = config.constellation;
        *self.shared.config.lock().unwrap() = config;

        if self.status.modem_on() {
            info!("detecting modem type");
            if let Some(model) = self.detect_capability().model() {
                let mut modem = self.modem.lock().unwrap();
                modem::apply_constellation(modem.as_mut(), model, constellation);
            }
        }
    }

    /// Get a GNSS position, synchronously.
    ///
    /// Blocks the calling thread up to the configured maximum fix time plus
    /// one poll interval. When `publish` is set and a fix was obtained while
    /// the cloud is connected, the result is published as a `loc` event.
    pub fn get_location(&self, publish: bool) -> (LocationResult, LocationPoint) {
        if let Some(result) = self.pre_check() {
            return (result, LocationPoint::default());
        }

        trace!("starting synchronous acquisition");
        let request = AcquireRequest {
            respond: true,
            callback: None,
        };
        let max_fix_time = self.shared.config.lock().unwrap().max_fix_time;
        let result = {
            let rx = self.resp_rx.lock().unwrap();
            // A previous sync caller that gave up waiting leaves the worker's
            // late completion queued; drop it before enqueueing this request.
            while rx.try_recv().is_ok() {}

            if self.cmd_tx.try_send(WorkerCommand::Acquire(request)).is_err() {
                // A full command queue means another caller got in first.
                return (LocationResult::Pending, LocationPoint::default());
            }
            rx.recv_timeout(max_fix_time + self.poll_period)
                .unwrap_or(LocationResult::Idle)
        };
        let point = self.shared.last.lock().unwrap().point.clone();

        if publish && result == LocationResult::Fixed && self.status.cloud_connected() {
            info!("publishing loc event");
            let payload = build_publish(&point, self.req_id.load(Ordering::SeqCst));
            if self.cloud.lock().unwrap().publish(EVENT_NAME, &payload) {
                self.req_id.fetch_add(1, Ordering::SeqCst);
            }
        }

        (result, point)
    }

    /// Get a GNSS position, asynchronously.
    ///
    /// Returns [`LocationResult::Acquiring`] immediately; the callback fires
    /// later from the worker thread. Results are not published implicitly;
    /// use [`publish_location_event`] from the callback if needed.
    ///
    /// [`publish_location_event`]: GnssEngine::publish_location_event
    pub fn get_location_async(
        &self,
        callback: impl FnOnce(LocationResult, &LocationPoint) + Send + 'static,
    ) -> LocationResult {
        if let Some(result) = self.pre_check() {
            return result;
        }

        trace!("starting asynchronous acquisition");
        let request = AcquireRequest {
            respond: false,
            callback: Some(Box::new(callback) as LocationDoneCallback),
        };
        if self.cmd_tx.try_send(WorkerCommand::Acquire(request)).is_err() {
            return LocationResult::Pending;
        }
        LocationResult::Acquiring
    }

    /// Current acquisition state: [`LocationResult::Acquiring`] or
    /// [`LocationResult::Idle`]. Lock-free.
    pub fn get_status(&self) -> LocationResult {
        if self.shared.acquiring.load(Ordering::SeqCst) {
            LocationResult::Acquiring
        } else {
            LocationResult::Idle
        }
    }

    /// Publish the given location, or the last acquired one, as a `loc`
    /// event. Returns whether the publish call succeeded.
    pub fn publish_location_event(&self, point: Option<&LocationPoint>) -> bool {
        let owned;
        let point = match point {
            Some(point) => point,
            None => {
                owned = self.shared.last.lock().unwrap().point.clone();
                &owned
            }
        };

        if !self.status.cloud_connected() {
            return false;
        }

        info!("publishing loc event");
        let payload = build_publish(point, self.req_id.fetch_add(1, Ordering::SeqCst));
        self.cloud.lock().unwrap().publish(EVENT_NAME, &payload)
    }

    /// The full location event as a JSON value, for the given location or
    /// the last acquired one.
    pub fn location_event_value(&self, point: Option<&LocationPoint>) -> Value {
        let owned;
        let point = match point {
            Some(point) => point,
            None => {
                owned = self.shared.last.lock().unwrap().point.clone();
                &owned
            }
        };

        let mut obj = Map::new();
        obj.insert("cmd".into(), json!("loc"));
        if point.system_time != 0 {
            obj.insert("time".into(), json!(point.system_time));
        }
        obj.insert("loc".into(), point.to_value());
        obj.insert(
            "req_id".into(),
            json!(self.req_id.fetch_add(1, Ordering::SeqCst)),
        );
        Value::Object(obj)
    }

    /// Run an acquisition on behalf of an external fusion orchestrator and
    /// populate `loc_data` with the location JSON before returning.
    ///
    /// Blocks the calling thread until the acquisition completes. When the
    /// engine rejects the request (modem off, unsupported, busy), `loc_data`
    /// is filled from the last-known location instead.
    pub fn enrich_event(&self, _event_data: &mut Value, loc_data: &mut Value) {
        trace!("enrich_event starting");

        let (tx, rx) = mpsc::sync_channel(1);
        let result = self.get_location_async(move |_, point| {
            let _ = tx.try_send(point.to_value());
        });

        if result != LocationResult::Acquiring {
            *loc_data = self.shared.last.lock().unwrap().point.to_value();
            return;
        }
        if let Ok(value) = rx.recv() {
            *loc_data = value;
        }
        trace!("enrich_event complete");
    }

    /// The location from the previous acquisition. Valid only when its
    /// `fix` member is set; zeroed after any error.
    pub fn last_location_point(&self) -> LocationPoint {
        self.shared.last.lock().unwrap().point.clone()
    }

    /// The result of the previous acquisition.
    pub fn last_result(&self) -> LocationResult {
        self.shared.last.lock().unwrap().result
    }

    /// Whether the previous acquisition got a valid fix.
    pub fn has_fix(&self) -> bool {
        self.last_result() == LocationResult::Fixed
    }

    /// Whether GNSS and cellular data can really run at the same time on
    /// the detected modem.
    pub fn concurrent_gnss_and_cellular_supported(&self) -> bool {
        self.shared
            .capability
            .lock()
            .unwrap()
            .model()
            .is_some_and(ModemModel::concurrent_gnss_and_cellular)
    }

    /// Read the cached capability, detecting it first if possible.
    fn detect_capability(&self) -> ModemCapability {
        let mut capability = self.shared.capability.lock().unwrap();
        if *capability == ModemCapability::Unknown && self.status.modem_on() {
            match self.modem.lock().unwrap().model() {
                None => trace!("modem identity not cached yet"),
                Some(identity) => match ModemModel::from_identity(&identity) {
                    Some(model) => {
                        trace!("detected {model:?}");
                        *capability = ModemCapability::Supported(model);
                    }
                    None => {
                        trace!("modem {identity:?} not supported");
                        *capability = ModemCapability::Unsupported;
                    }
                },
            }
        }
        *capability
    }

    /// Gate checked before every acquisition attempt; short-circuits
    /// without touching the worker.
    fn pre_check(&self) -> Option<LocationResult> {
        if !self.status.modem_on() {
            trace!("modem is not on");
            self.shared.last.lock().unwrap().result = LocationResult::Unavailable;
            return Some(LocationResult::Unavailable);
        }

        if !self.detect_capability().is_supported() {
            trace!("modem is not supported");
            self.shared.last.lock().unwrap().result = LocationResult::Unsupported;
            return Some(LocationResult::Unsupported);
        }

        if self.shared.acquiring.load(Ordering::SeqCst) {
            trace!("acquisition is already underway");
            self.shared.last.lock().unwrap().result = LocationResult::Pending;
            return Some(LocationResult::Pending);
        }

        None
    }
}

impl Drop for GnssEngine {
    fn drop(&mut self) {
        // A busy worker cannot take the exit command; it is left to wind
        // down on its own when the command channel disconnects.
        if self.cmd_tx.try_send(WorkerCommand::Exit).is_ok() {
            if let Some(handle) = self.worker.lock().unwrap().take() {
                let _ = handle.join();
            }
        }
    }
}
