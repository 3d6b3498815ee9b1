use serde_json::{Map, Value, json};

use crate::response::FixReport;

/// A single acquired position and its quality estimates.
///
/// When `fix` is false, every other field is invalid and must not be
/// interpreted. Accuracy fields use a zero/negative sentinel for "absent";
/// they are only populated on modems that report estimated position error.
#[derive(Debug, Clone, Default)]
pub struct LocationPoint {
    /// Whether the receiver is locked onto a position.
    pub fix: bool,
    /// Epoch timestamp from the modem clock.
    pub epoch_time: i64,
    /// Local epoch timestamp at capture.
    pub system_time: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f32,
    /// Speed in meters per second.
    pub speed: f32,
    /// Heading in degrees.
    pub heading: f32,
    /// Horizontal dilution of precision.
    pub horizontal_dop: f32,
    /// Horizontal accuracy in meters; non-positive means absent.
    pub horizontal_accuracy: f32,
    /// Vertical accuracy in meters; non-positive means absent.
    pub vertical_accuracy: f32,
    /// Time-to-first-fix in seconds.
    pub time_to_first_fix: f32,
    /// Satellites in use.
    pub sats_in_use: u32,
}

impl LocationPoint {
    /// Merge one parsed fix report into this point.
    ///
    /// Accuracy and time-to-first-fix arrive separately and are left alone.
    pub fn apply_report(&mut self, report: &FixReport) {
        self.fix = report.fix != 0;
        self.epoch_time = report.epoch_time();
        self.latitude = report.latitude;
        self.longitude = report.longitude;
        self.altitude = report.altitude;
        self.speed = report.speed_mps();
        self.heading = report.heading();
        self.horizontal_dop = report.hdop;
        self.sats_in_use = report.nsat;
    }

    /// A simple readable rendition of the common fields.
    pub fn to_string_simple(&self) -> String {
        format!(
            "lat={:.5}, lon={:.5}, alt={:.1} m, speed={:.1} m/s, heading={:.1} deg, ttff={:.2}",
            self.latitude,
            self.longitude,
            self.altitude,
            self.speed,
            self.heading,
            self.time_to_first_fix
        )
    }

    /// Convert this point to a JSON value.
    ///
    /// Unlocked points reduce to `{"lck": 0}`; accuracy fields are included
    /// only when positive, matching the publish payload contract.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::new();
        if !self.fix {
            obj.insert("lck".into(), json!(0));
            return Value::Object(obj);
        }

        obj.insert("lck".into(), json!(1));
        obj.insert("time".into(), json!(self.epoch_time));
        obj.insert("lat".into(), json!(self.latitude));
        obj.insert("lon".into(), json!(self.longitude));
        obj.insert("alt".into(), json!(self.altitude));
        obj.insert("hd".into(), json!(self.heading));
        obj.insert("spd".into(), json!(self.speed));
        obj.insert("hdop".into(), json!(self.horizontal_dop));
        if self.horizontal_accuracy > 0.0 {
            obj.insert("h_acc".into(), json!(self.horizontal_accuracy));
        }
        if self.vertical_accuracy > 0.0 {
            obj.insert("v_acc".into(), json!(self.vertical_accuracy));
        }
        obj.insert("nsat".into(), json!(self.sats_in_use));
        obj.insert("ttff".into(), json!(self.time_to_first_fix));
        Value::Object(obj)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::parse_fix_report;

    fn locked_point() -> LocationPoint {
        LocationPoint {
            fix: true,
            epoch_time: 1724232624,
            system_time: 1724232630,
            latitude: 37.422408,
            longitude: -122.084066,
            altitude: 12.5,
            speed: 1.0,
            heading: 45.5,
            horizontal_dop: 1.2,
            horizontal_accuracy: 15.0,
            vertical_accuracy: 22.5,
            time_to_first_fix: 31.4,
            sats_in_use: 6,
        }
    }

    #[test]
    fn test_apply_report() {
        let report = parse_fix_report(
            "+QGPSLOC: 093024.00,37.422408,-122.084066,1.2,12.5,2,045.30,3.6,1.9,210824,06",
        )
        .unwrap();
        let mut point = LocationPoint::default();
        point.apply_report(&report);
        assert!(point.fix);
        assert_eq!(point.latitude, 37.422408);
        assert_eq!(point.longitude, -122.084066);
        assert_eq!(point.horizontal_dop, 1.2);
        assert!((point.speed - 1.0).abs() < 1e-6);
        assert!((point.heading - 45.5).abs() < 1e-6);
        assert_eq!(point.sats_in_use, 6);
        // Not carried by the fix report.
        assert_eq!(point.horizontal_accuracy, 0.0);
        assert_eq!(point.time_to_first_fix, 0.0);
    }

    #[test]
    fn test_to_value_unlocked() {
        let value = LocationPoint::default().to_value();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 1);
        assert_eq!(obj["lck"], 0);
    }

    #[test]
    fn test_to_value_locked() {
        let value = locked_point().to_value();
        let obj = value.as_object().unwrap();
        assert_eq!(obj["lck"], 1);
        assert_eq!(obj["lat"].as_f64().unwrap(), 37.422408);
        assert_eq!(obj["nsat"], 6);
        assert!(obj.contains_key("h_acc"));
        assert!(obj.contains_key("v_acc"));
    }

    #[test]
    fn test_to_value_omits_absent_accuracy() {
        let mut point = locked_point();
        point.horizontal_accuracy = 0.0;
        point.vertical_accuracy = -1.0;
        let value = point.to_value();
        let obj = value.as_object().unwrap();
        assert!(!obj.contains_key("h_acc"));
        assert!(!obj.contains_key("v_acc"));
    }

    #[test]
    fn test_to_string_simple() {
        let s = locked_point().to_string_simple();
        assert!(s.contains("lat=37.42241"));
        assert!(s.contains("speed=1.0 m/s"));
    }
}
