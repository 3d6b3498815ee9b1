//! The acquisition worker thread.
//!
//! A single long-lived loop owns all hardware command issuance: antenna
//! power, GNSS mode transitions, the 1 Hz fix poll, and the stabilization
//! policy. Callers hand it work through a depth-1 command channel and get
//! completions back through a depth-1 response channel or a callback.

use std::sync::atomic::Ordering;
use std::sync::mpsc::{Receiver, RecvTimeoutError, SyncSender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use chrono::Utc;
use log::{debug, info, trace, warn};

use crate::command::Command;
use crate::config::LocationConfig;
use crate::engine::{LocationResult, Shared};
use crate::modem::{self, ModemModel};
use crate::point::LocationPoint;
use crate::response::{FixOutcome, parse_accuracy_report, parse_fix_response};
use crate::transport::{Gpio, ModemTransport, StatusProvider};

/// Completion handler for asynchronous acquisitions. Runs on the worker
/// thread; must be short and non-blocking.
pub type LocationDoneCallback = Box<dyn FnOnce(LocationResult, &LocationPoint) + Send>;

/// Number of consecutive qualifying fixes required before acceptance.
const REQUIRED_SETTLING_COUNT: u32 = 2;

/// A request handed to the worker over the command channel.
pub(crate) struct AcquireRequest {
    /// Deliver the result over the response queue (synchronous caller).
    pub respond: bool,
    /// Deliver the result through a callback (asynchronous caller).
    pub callback: Option<LocationDoneCallback>,
}

pub(crate) enum WorkerCommand {
    Acquire(AcquireRequest),
    Exit,
}

/// Consecutive qualifying-fix counter behind the stabilization policy.
///
/// A single good fix is not sufficient; it has to be corroborated by the
/// next poll. Any non-qualifying report in between restarts the count.
pub(crate) struct FixSettling {
    required: u32,
    count: u32,
}

impl FixSettling {
    pub(crate) fn new(required: u32) -> Self {
        Self { required, count: 0 }
    }

    /// Record one report; returns true once enough consecutive reports
    /// qualify.
    pub(crate) fn observe(&mut self, qualifies: bool) -> bool {
        if qualifies {
            self.count += 1;
        } else {
            self.count = 0;
        }
        self.count >= self.required
    }

    pub(crate) fn reset(&mut self) {
        self.count = 0;
    }
}

pub(crate) struct Worker {
    modem: Arc<Mutex<Box<dyn ModemTransport>>>,
    gpio: Arc<Mutex<Box<dyn Gpio>>>,
    status: Arc<dyn StatusProvider>,
    shared: Arc<Shared>,
    cmd_rx: Receiver<WorkerCommand>,
    resp_tx: SyncSender<LocationResult>,
    poll_period: Duration,
    settle_delay: Duration,
    /// Whether the receiver was left running after the previous attempt.
    gnss_started: bool,
    ttff_ms: u64,
}

impl Worker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        modem: Arc<Mutex<Box<dyn ModemTransport>>>,
        gpio: Arc<Mutex<Box<dyn Gpio>>>,
        status: Arc<dyn StatusProvider>,
        shared: Arc<Shared>,
        cmd_rx: Receiver<WorkerCommand>,
        resp_tx: SyncSender<LocationResult>,
        poll_period: Duration,
        settle_delay: Duration,
    ) -> Self {
        Self {
            modem,
            gpio,
            status,
            shared,
            cmd_rx,
            resp_tx,
            poll_period,
            settle_delay,
            gnss_started: false,
            ttff_ms: 0,
        }
    }

    /// Run the worker loop until an exit command or channel disconnect.
    pub(crate) fn run(mut self) {
        loop {
            match self.cmd_rx.recv_timeout(self.poll_period) {
                Ok(WorkerCommand::Acquire(request)) => self.acquire(request),
                Ok(WorkerCommand::Exit) => break,
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!("worker loop exiting");
    }

    /// Perform one acquisition attempt and deliver its completion.
    fn acquire(&mut self, request: AcquireRequest) {
        self.shared.acquiring.store(true, Ordering::SeqCst);

        let config = self.shared.config.lock().unwrap().clone();
        let model = self.shared.capability.lock().unwrap().model();

        let mut point = LocationPoint::default();
        let result = match model {
            Some(model) => self.run_acquisition(&config, model, &mut point),
            // Pre-checks keep undetected modems away from the worker; if one
            // slips through, fail the same way the facade would.
            None => LocationResult::Unsupported,
        };

        {
            let mut last = self.shared.last.lock().unwrap();
            last.point = point.clone();
            last.result = result;
        }
        self.shared.acquiring.store(false, Ordering::SeqCst);

        if request.respond {
            trace!("sending synchronous completion");
            let _ = self.resp_tx.try_send(result);
        } else if let Some(callback) = request.callback {
            trace!("sending asynchronous completion");
            callback(result, &point);
        }
    }

    fn run_acquisition(
        &mut self,
        config: &LocationConfig,
        model: ModemModel,
        point: &mut LocationPoint,
    ) -> LocationResult {
        if !self.gnss_started {
            if let Some(pin) = config.antenna_pin {
                trace!("antenna power on, pin {pin}");
                self.gpio.lock().unwrap().write(pin, true);
                thread::sleep(self.settle_delay);
            }

            info!("starting GNSS session");
            self.command(&Command::GnssStart);
            if model.supports_accuracy() {
                self.command(&Command::EnableAccuracy);
            }
            {
                let mut modem = self.modem.lock().unwrap();
                modem::apply_constellation(modem.as_mut(), model, config.constellation);
            }
            self.gnss_started = true;
            self.ttff_ms = 0;
        }

        let mut settling = FixSettling::new(REQUIRED_SETTLING_COUNT);
        let mut result = LocationResult::TimedOut;
        let mut power;
        let start = Instant::now();

        loop {
            power = self.status.modem_on();
            if !power {
                debug!("modem powered off mid-poll");
                break;
            }
            if start.elapsed() >= config.max_fix_time {
                break;
            }

            match self.fix_query() {
                Some(FixOutcome::Report(report)) => {
                    point.apply_report(&report);
                    point.system_time = Utc::now().timestamp();
                    if self.ttff_ms == 0 {
                        self.ttff_ms = start.elapsed().as_millis() as u64;
                        info!("time to first fix {} ms", self.ttff_ms);
                    }
                    if model.supports_accuracy() {
                        self.accuracy_query(point);
                    }

                    let qualifies = point.horizontal_dop <= config.hdop_threshold
                        && (point.horizontal_accuracy <= 0.0
                            || point.horizontal_accuracy <= config.hacc_threshold);
                    if settling.observe(qualifies) {
                        result = LocationResult::Fixed;
                        break;
                    }
                }
                Some(FixOutcome::NoFix) => {
                    debug!("no fix yet");
                    point.fix = false;
                    settling.reset();
                }
                Some(FixOutcome::SessionState(code)) => {
                    warn!("unexpected GNSS session state: {code:?}");
                    settling.reset();
                }
                Some(FixOutcome::NoMatch) => {
                    debug!("no recognizable fix report yet");
                    settling.reset();
                }
                None => {
                    settling.reset();
                }
            }

            thread::sleep(self.poll_period);
        }

        if !model.concurrent_gnss_and_cellular() {
            info!("stopping GNSS session to resume cellular data");
            self.command(&Command::GnssStop);
            if let Some(pin) = config.antenna_pin {
                trace!("antenna power off, pin {pin}");
                self.gpio.lock().unwrap().write(pin, false);
            }
            self.gnss_started = false;
        }

        if !power && result != LocationResult::Fixed {
            result = LocationResult::Unavailable;
        }

        if self.ttff_ms != 0 {
            point.time_to_first_fix = self.ttff_ms as f32 / 1000.0;
        }
        result
    }

    /// Issue one fix query and classify the response.
    fn fix_query(&mut self) -> Option<FixOutcome> {
        let command = Command::QueryFix;
        let text = match self
            .modem
            .lock()
            .unwrap()
            .command(&command.to_at(), command.timeout())
        {
            Ok(text) => text,
            Err(e) => {
                debug!("fix query failed: {e}");
                return None;
            }
        };
        trace!("fix response: {text:?}");
        Some(parse_fix_response(&text))
    }

    /// Issue an accuracy query and merge the result into the point.
    fn accuracy_query(&mut self, point: &mut LocationPoint) {
        let command = Command::QueryAccuracy;
        match self
            .modem
            .lock()
            .unwrap()
            .command(&command.to_at(), command.timeout())
        {
            Ok(text) => {
                if let Some(report) = parse_accuracy_report(&text) {
                    point.horizontal_accuracy = report.horizontal;
                    point.vertical_accuracy = report.vertical;
                }
            }
            Err(e) => debug!("accuracy query failed: {e}"),
        }
    }

    /// Issue a fire-and-forget mode/config command.
    fn command(&mut self, command: &Command) {
        let at = command.to_at();
        trace!("TX: {at}");
        if let Err(e) = self
            .modem
            .lock()
            .unwrap()
            .command(&at, command.timeout())
        {
            warn!("{at} failed: {e}");
        }
    }
}
