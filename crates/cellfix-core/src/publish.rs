//! JSON payload for the published `loc` event.
//!
//! Each numeric field carries a fixed precision (eight decimal places for
//! coordinates, one for HDOP and TTFF, and so on), so the payload is
//! written with explicit formatting rather than through a serializer.

use std::fmt::Write;

use crate::point::LocationPoint;

/// Event topic acquired positions are published under.
pub const TOPIC: &str = "loc";

/// Render the event payload for one point.
///
/// `seq` is the publish sequence number; callers bump it only after the
/// payload was accepted for delivery.
pub fn build_payload(point: &LocationPoint, seq: u32) -> String {
    let mut out = String::with_capacity(256);
    out.push_str("{\"cmd\":\"loc\"");
    if let Some(system_time) = point.system_time {
        let _ = write!(out, ",\"time\":{system_time}");
    }
    out.push_str(",\"loc\":{");
    if point.fix == 0 {
        out.push_str("\"lck\":0");
    } else {
        let _ = write!(out, "\"lck\":1,\"time\":{}", point.epoch_time.unwrap_or_default());
        let _ = write!(out, ",\"lat\":{:.8},\"lon\":{:.8}", point.latitude, point.longitude);
        let _ = write!(out, ",\"alt\":{:.3}", point.altitude);
        let _ = write!(out, ",\"hd\":{:.2},\"spd\":{:.2}", point.heading, point.speed);
        let _ = write!(out, ",\"hdop\":{:.1}", point.horizontal_dop);
        if point.horizontal_accuracy > 0.0 {
            let _ = write!(out, ",\"h_acc\":{:.3}", point.horizontal_accuracy);
        }
        if point.vertical_accuracy > 0.0 {
            let _ = write!(out, ",\"v_acc\":{:.3}", point.vertical_accuracy);
        }
        let _ = write!(out, ",\"nsat\":{}", point.sats_in_use);
        let _ = write!(out, ",\"ttff\":{:.1}", point.time_to_first_fix);
    }
    out.push_str("},");
    let _ = write!(out, "\"req_id\":{seq}");
    out.push('}');
    out
}
