//! The publish payload for `loc` events.
//!
//! The payload is built as fixed-precision JSON text rather than through a
//! generic serializer: downstream consumers depend on exact decimal widths
//! (8 for coordinates, 3 for accuracy, 1 for HDOP and TTFF) and on absent
//! accuracy fields being omitted entirely.

use std::fmt::Write;

use crate::point::LocationPoint;

/// Event name used for location publishes.
pub const EVENT_NAME: &str = "loc";

/// Build the complete `loc` event payload.
///
/// Outer object: command tag, optional capture timestamp (omitted when
/// zero), the nested location object, and the request id.
pub fn build_publish(point: &LocationPoint, req_id: u32) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("{\"cmd\":\"loc\"");
    if point.system_time != 0 {
        let _ = write!(out, ",\"time\":{}", point.system_time);
    }
    out.push_str(",\"loc\":");
    write_location(&mut out, point);
    let _ = write!(out, ",\"req_id\":{req_id}}}");
    out
}

/// Write the nested location object.
///
/// An unlocked point is just `{"lck":0}`; accuracy fields appear only when
/// positive.
fn write_location(out: &mut String, point: &LocationPoint) {
    if !point.fix {
        out.push_str("{\"lck\":0}");
        return;
    }

    let _ = write!(
        out,
        "{{\"lck\":1,\"time\":{},\"lat\":{:.8},\"lon\":{:.8},\"alt\":{:.3},\"hd\":{:.2},\"spd\":{:.2},\"hdop\":{:.1}",
        point.epoch_time,
        point.latitude,
        point.longitude,
        point.altitude,
        point.heading,
        point.speed,
        point.horizontal_dop,
    );
    if point.horizontal_accuracy > 0.0 {
        let _ = write!(out, ",\"h_acc\":{:.3}", point.horizontal_accuracy);
    }
    if point.vertical_accuracy > 0.0 {
        let _ = write!(out, ",\"v_acc\":{:.3}", point.vertical_accuracy);
    }
    let _ = write!(
        out,
        ",\"nsat\":{},\"ttff\":{:.1}}}",
        point.sats_in_use, point.time_to_first_fix,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn test_locked_payload() {
        let payload = build_publish(&locked_point(), 3);

        // The payload must be well-formed JSON with the expected values.
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        assert_eq!(value["cmd"], "loc");
        assert_eq!(value["time"], 1724232630);
        assert_eq!(value["req_id"], 3);
        let loc = &value["loc"];
        assert_eq!(loc["lck"], 1);
        assert_eq!(loc["time"], 1724232624);
        assert_eq!(loc["lat"].as_f64().unwrap(), 37.422408);
        assert_eq!(loc["lon"].as_f64().unwrap(), -122.084066);
        assert_eq!(loc["nsat"], 6);

        // Fixed decimal widths are part of the contract.
        assert!(payload.contains("\"lat\":37.42240800"));
        assert!(payload.contains("\"lon\":-122.08406600"));
        assert!(payload.contains("\"h_acc\":15.000"));
        assert!(payload.contains("\"v_acc\":22.500"));
        assert!(payload.contains("\"hdop\":1.2"));
        assert!(payload.contains("\"ttff\":31.4"));
    }

    #[test]
    fn test_unlocked_payload() {
        let point = LocationPoint::default();
        let payload = build_publish(&point, 1);
        let value: serde_json::Value = serde_json::from_str(&payload).unwrap();
        let loc = value["loc"].as_object().unwrap();
        assert_eq!(loc.len(), 1);
        assert_eq!(loc["lck"], 0);
        // No capture timestamp means no outer time field.
        assert!(value.get("time").is_none());
    }

    #[test]
    fn test_accuracy_fields_omitted_when_not_positive() {
        let mut point = locked_point();
        point.horizontal_accuracy = 0.0;
        point.vertical_accuracy = -4.0;
        let payload = build_publish(&point, 1);
        assert!(!payload.contains("h_acc"));
        assert!(!payload.contains("v_acc"));
    }
}
