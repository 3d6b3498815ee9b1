//! Parsing of the textual responses the modem produces during acquisition.
//!
//! Three shapes show up on the wire: a `+QGPSLOC:` fix report, a
//! `+QGPSCFG: "estimation_error"` accuracy report, and a `+CME ERROR:` line
//! with a numeric code. Anything else is "no match", which is routine while
//! the receiver has not produced a report yet and is never treated as an
//! error.

use chrono::NaiveDate;

/// Response prefix of a fix report.
const FIX_PREFIX: &str = "+QGPSLOC:";
/// Response prefix of an accuracy report.
const ACCURACY_PREFIX: &str = "+QGPSCFG:";
/// Accuracy report sub-field tag.
const ACCURACY_TAG: &str = "\"estimation_error\",";
/// Response prefix of a modem error line.
const CME_PREFIX: &str = "+CME ERROR:";

/// Modem error classes reported as CME errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmeError {
    /// No error marker on the line; proceed to parse it as a report.
    None,
    /// GNSS session is ongoing (504).
    SessionOngoing,
    /// GNSS session not active (505).
    SessionNotActive,
    /// Operational timeout (506).
    OperationTimeout,
    /// No fix yet (516); the expected steady state while acquiring.
    NoFix,
    /// GNSS is working (522).
    GnssWorking,
    /// Generic unknown error (549).
    Unknown,
    /// A CME code outside the whitelist.
    Undefined,
}

/// Outcome of classifying and parsing one fix-query response.
#[derive(Debug, Clone, PartialEq)]
pub enum FixOutcome {
    /// A full fix report was parsed.
    Report(FixReport),
    /// The modem explicitly reported no fix yet.
    NoFix,
    /// Another session-state error code; the GNSS session state machine is
    /// out of sync with ours.
    SessionState(CmeError),
    /// Neither an error line nor a recognizable report, yet.
    NoMatch,
}

/// A parsed `+QGPSLOC:` fix report.
///
/// Raw fields as reported by the modem; use [`epoch_time`], [`speed_mps`]
/// and [`heading`] for the derived values.
///
/// [`epoch_time`]: FixReport::epoch_time
/// [`speed_mps`]: FixReport::speed_mps
/// [`heading`]: FixReport::heading
#[derive(Debug, Clone, PartialEq)]
pub struct FixReport {
    /// UTC hour (0–23).
    pub hour: u32,
    /// UTC minute (0–59).
    pub minute: u32,
    /// UTC second (0–59).
    pub second: u32,
    /// Latitude in signed decimal degrees.
    pub latitude: f64,
    /// Longitude in signed decimal degrees.
    pub longitude: f64,
    /// Horizontal dilution of precision.
    pub hdop: f32,
    /// Altitude in meters.
    pub altitude: f32,
    /// Fix flag as reported (0 = no fix).
    pub fix: u32,
    /// Course over ground, whole degrees part.
    pub cog_degrees: u32,
    /// Course over ground, minutes part.
    pub cog_minutes: u32,
    /// Speed over ground in km/h.
    pub speed_kmph: f32,
    /// Speed over ground in knots.
    pub speed_knots: f32,
    /// UTC day of month (1–31).
    pub day: u32,
    /// UTC month (1–12).
    pub month: u32,
    /// UTC year from 2000 (two digits).
    pub year: u32,
    /// Satellites in use.
    pub nsat: u32,
}

impl FixReport {
    /// Epoch timestamp from the report's date and time-of-day fields.
    ///
    /// The two-digit year is interpreted as 2000+yy. Returns 0 when the
    /// fields do not form a valid date.
    pub fn epoch_time(&self) -> i64 {
        NaiveDate::from_ymd_opt(2000 + self.year as i32, self.month, self.day)
            .and_then(|d| d.and_hms_opt(self.hour, self.minute, self.second))
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0)
    }

    /// Speed over ground converted to meters per second.
    pub fn speed_mps(&self) -> f32 {
        self.speed_kmph / 3.6
    }

    /// Course over ground combined into a single value in degrees.
    pub fn heading(&self) -> f32 {
        self.cog_degrees as f32 + self.cog_minutes as f32 / 60.0
    }
}

/// A parsed `"estimation_error"` accuracy report.
#[derive(Debug, Clone, PartialEq)]
pub struct AccuracyReport {
    /// Horizontal accuracy in meters.
    pub horizontal: f32,
    /// Vertical accuracy in meters.
    pub vertical: f32,
    /// Speed accuracy in meters per second.
    pub speed: f32,
    /// Heading accuracy in degrees.
    pub heading: f32,
}

/// Find the first line carrying the given prefix and return the remainder.
///
/// Tolerates leading whitespace before the prefix and multi-line response
/// bodies.
fn find_line<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    text.lines()
        .map(str::trim_start)
        .find_map(|line| line.strip_prefix(prefix))
}

/// Decode a modem error line into a [`CmeError`].
///
/// Returns [`CmeError::None`] when the text carries no error marker at all
/// (a valid fix report falls in this bucket), which callers must read as
/// "not an error, parse it as a report".
pub fn parse_cme_error(text: &str) -> CmeError {
    let Some(rest) = find_line(text, CME_PREFIX) else {
        return CmeError::None;
    };
    let Ok(code) = rest.trim().parse::<u32>() else {
        return CmeError::None;
    };

    match code {
        504 => CmeError::SessionOngoing,
        505 => CmeError::SessionNotActive,
        506 => CmeError::OperationTimeout,
        516 => CmeError::NoFix,
        522 => CmeError::GnssWorking,
        549 => CmeError::Unknown,
        _ => CmeError::Undefined,
    }
}

/// Parse a `+QGPSLOC:` fix report.
///
/// The line format is:
/// `<UTC hhmmss.hh>,<lat (-)dd.ddddd>,<lon (-)ddd.ddddd>,<HDOP>,<altitude>,<fix>,<COG ddd.mm>,<spkm>,<spkn>,<date ddmmyy>,<nsat>`
///
/// Returns `None` if the text does not fit the expected shape. This happens
/// routinely while the receiver has no report yet.
pub fn parse_fix_report(text: &str) -> Option<FixReport> {
    let rest = find_line(text, FIX_PREFIX)?;
    let fields: Vec<&str> = rest.trim().split(',').collect();
    if fields.len() != 11 {
        return None;
    }

    // UTC time of day: hhmmss with optional hundredths after the dot.
    let (hms, _) = fields[0].split_once('.').unwrap_or((fields[0], ""));
    if hms.len() != 6 || !hms.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let hour = hms[0..2].parse().ok()?;
    let minute = hms[2..4].parse().ok()?;
    let second = hms[4..6].parse().ok()?;

    let latitude = fields[1].trim().parse().ok()?;
    let longitude = fields[2].trim().parse().ok()?;
    let hdop = fields[3].trim().parse().ok()?;
    let altitude = fields[4].trim().parse().ok()?;
    let fix = fields[5].trim().parse().ok()?;

    // Course over ground as a (degrees, minutes) pair: ddd.mm
    let (cog_deg, cog_min) = fields[6].trim().split_once('.').unwrap_or((fields[6], "0"));
    let cog_degrees = cog_deg.parse().ok()?;
    let cog_minutes = cog_min.parse().ok()?;

    let speed_kmph = fields[7].trim().parse().ok()?;
    let speed_knots = fields[8].trim().parse().ok()?;

    // Date: ddmmyy
    let date = fields[9].trim();
    if date.len() != 6 || !date.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let day = date[0..2].parse().ok()?;
    let month = date[2..4].parse().ok()?;
    let year = date[4..6].parse().ok()?;

    let nsat = fields[10].trim().parse().ok()?;

    Some(FixReport {
        hour,
        minute,
        second,
        latitude,
        longitude,
        hdop,
        altitude,
        fix,
        cog_degrees,
        cog_minutes,
        speed_kmph,
        speed_knots,
        day,
        month,
        year,
        nsat,
    })
}

/// Parse an `"estimation_error"` accuracy report: four floats for
/// horizontal, vertical, speed, and heading accuracy.
pub fn parse_accuracy_report(text: &str) -> Option<AccuracyReport> {
    let rest = find_line(text, ACCURACY_PREFIX)?;
    let rest = rest.trim_start().strip_prefix(ACCURACY_TAG)?;
    let fields: Vec<&str> = rest.trim().split(',').collect();
    if fields.len() != 4 {
        return None;
    }

    Some(AccuracyReport {
        horizontal: fields[0].trim().parse().ok()?,
        vertical: fields[1].trim().parse().ok()?,
        speed: fields[2].trim().parse().ok()?,
        heading: fields[3].trim().parse().ok()?,
    })
}

/// Classify one fix-query response.
///
/// A reported `+CME ERROR: 516` (no fix) and a line that matches nothing are
/// both legitimate "not yet" outcomes; other error codes mean the GNSS
/// session state machine is out of sync. A line with no error marker falls
/// through to fix-report parsing.
pub fn parse_fix_response(text: &str) -> FixOutcome {
    match parse_cme_error(text) {
        CmeError::NoFix => return FixOutcome::NoFix,
        CmeError::None => {}
        other => return FixOutcome::SessionState(other),
    }

    match parse_fix_report(text) {
        Some(report) => FixOutcome::Report(report),
        None => FixOutcome::NoMatch,
    }
}
