//! Parsers for the modem's positioning responses.
//!
//! Pure text-to-value transforms, no I/O and no state. The modem mixes
//! success payloads and `+CME ERROR` payloads on the same logical channel,
//! so the poll handler tries fix-telemetry extraction first and only reads
//! the response as an error when that fails; "no fix yet" (516) is
//! steady-state noise while polling, not a fault.
//!
//! ## Response grammars
//!
//! ```text
//! +QGPSLOC: HHMMSS.hh,<lat>,<lon>,<hdop>,<alt>,<fix>,DDD.MM,<spkm>,<spkn>,DDMMYY,<nsat>
//! +CME ERROR: <code>
//! +QGPSCFG: "estimation_error",<h_acc>,<v_acc>,<speed_acc>,<head_acc>
//! ```
//!
//! Field widths are part of the contract with the modem firmware: the time
//! of day carries two digits each for hours, minutes and seconds, the
//! course over ground three integer degrees and two integer minutes, the
//! date two digits each for day, month and year (year counted from 2000).

use chrono::{TimeZone, Utc};

use crate::point::LocationPoint;

const QGPSLOC_TAG: &str = "+QGPSLOC: ";
const CME_ERROR_TAG: &str = "+CME ERROR:";
const ESTIMATION_ERROR_TAG: &str = "+QGPSCFG: \"estimation_error\",";

/// Remove every CR and LF from a response line. Idempotent.
pub fn strip_cr_lf(text: &str) -> String {
    text.chars().filter(|&c| c != '\r' && c != '\n').collect()
}

/// CME error codes the positioning commands are expected to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmeError {
    /// GNSS session is ongoing.
    SessionOngoing = 504,
    /// GNSS session is not active.
    SessionNotActive = 505,
    /// Operation timed out inside the modem.
    OperationTimeout = 506,
    /// GNSS is acquiring and has no fix yet.
    NoFix = 516,
    /// GNSS engine is busy.
    GnssWorking = 522,
    /// Modem-reported unknown error.
    UnknownError = 549,
    /// A numeric code outside the expected set.
    Undefined = 999,
}

/// Extract a `+CME ERROR: <code>` from a response line.
///
/// `None` when no CME error is present at all; a present code outside the
/// expected set maps to [`CmeError::Undefined`].
pub fn parse_cme_error(text: &str) -> Option<CmeError> {
    let at = text.find(CME_ERROR_TAG)?;
    let rest = text[at + CME_ERROR_TAG.len()..].trim_start();
    let digits: &str = &rest[..rest.bytes().take_while(|b| b.is_ascii_digit()).count()];
    let code: u32 = digits.parse().ok()?;

    Some(match code {
        504 => CmeError::SessionOngoing,
        505 => CmeError::SessionNotActive,
        506 => CmeError::OperationTimeout,
        516 => CmeError::NoFix,
        522 => CmeError::GnssWorking,
        549 => CmeError::UnknownError,
        _ => CmeError::Undefined,
    })
}

/// One parsed `+QGPSLOC` record.
#[derive(Debug, Clone, PartialEq)]
pub struct FixReport {
    /// Fix time, epoch seconds UTC.
    pub epoch_time: i64,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Horizontal dilution of precision.
    pub hdop: f32,
    /// Altitude in meters.
    pub altitude: f32,
    /// GNSS locked indication (0 = no fix).
    pub fix: u32,
    /// Course over ground, integer degrees part.
    pub cog_degrees: u32,
    /// Course over ground, integer minutes part.
    pub cog_minutes: u32,
    /// Ground speed in km/h as reported.
    pub speed_kmh: f32,
    /// Ground speed in knots as reported.
    pub speed_knots: f32,
    /// Satellites used in the solution.
    pub sats_in_use: u32,
}

impl FixReport {
    /// Ground speed value stored on the point: the modem's km/h reading
    /// scaled by 1000. Note this is not a km/h to m/s conversion (that
    /// would divide by 3.6); see DESIGN.md.
    pub fn speed(&self) -> f32 {
        self.speed_kmh * 1000.0
    }

    /// Course over ground in degrees.
    pub fn heading(&self) -> f32 {
        self.cog_degrees as f32 + self.cog_minutes as f32 / 60.0
    }

    /// Copy this report's telemetry onto a point.
    pub fn apply_to(&self, point: &mut LocationPoint) {
        point.fix = self.fix;
        point.epoch_time = Some(self.epoch_time);
        point.latitude = self.latitude;
        point.longitude = self.longitude;
        point.altitude = self.altitude;
        point.speed = self.speed();
        point.heading = self.heading();
        point.horizontal_dop = self.hdop;
        point.sats_in_use = self.sats_in_use;
    }
}

/// Extract a `+QGPSLOC` fix record from a response line.
///
/// `None` when the line does not carry the pattern; the caller falls back
/// to [`parse_cme_error`].
pub fn parse_fix_report(text: &str) -> Option<FixReport> {
    let at = text.find(QGPSLOC_TAG)?;
    let mut fields = text[at + QGPSLOC_TAG.len()..].split(',');

    let (hour, minute, second) = parse_time_of_day(fields.next()?)?;
    let latitude: f64 = fields.next()?.trim().parse().ok()?;
    let longitude: f64 = fields.next()?.trim().parse().ok()?;
    let hdop: f32 = fields.next()?.trim().parse().ok()?;
    let altitude: f32 = fields.next()?.trim().parse().ok()?;
    let fix: u32 = fields.next()?.trim().parse().ok()?;
    let (cog_degrees, cog_minutes) = parse_course(fields.next()?)?;
    let speed_kmh: f32 = fields.next()?.trim().parse().ok()?;
    let speed_knots: f32 = fields.next()?.trim().parse().ok()?;
    let (day, month, year) = parse_date(fields.next()?)?;
    let sats_in_use: u32 = fields.next()?.trim().parse().ok()?;

    let epoch_time = Utc
        .with_ymd_and_hms(2000 + year as i32, month, day, hour, minute, second)
        .single()?
        .timestamp();

    Some(FixReport {
        epoch_time,
        latitude,
        longitude,
        hdop,
        altitude,
        fix,
        cog_degrees,
        cog_minutes,
        speed_kmh,
        speed_knots,
        sats_in_use,
    })
}

/// `HHMMSS.hh`; the fractional seconds are discarded.
fn parse_time_of_day(field: &str) -> Option<(u32, u32, u32)> {
    let field = field.trim();
    let whole = match field.split_once('.') {
        Some((whole, frac)) if frac.bytes().all(|b| b.is_ascii_digit()) => whole,
        None => field,
        _ => return None,
    };
    if whole.len() != 6 || !whole.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((
        whole[0..2].parse().ok()?,
        whole[2..4].parse().ok()?,
        whole[4..6].parse().ok()?,
    ))
}

/// `DDD.MM`: three integer degrees, two integer minutes.
fn parse_course(field: &str) -> Option<(u32, u32)> {
    let field = field.trim();
    let (degrees, minutes) = field.split_once('.')?;
    if degrees.len() != 3 || minutes.len() != 2 {
        return None;
    }
    Some((degrees.parse().ok()?, minutes.parse().ok()?))
}

/// `DDMMYY`, year counted from 2000.
fn parse_date(field: &str) -> Option<(u32, u32, u32)> {
    let field = field.trim();
    if field.len() != 6 || !field.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some((
        field[0..2].parse().ok()?,
        field[2..4].parse().ok()?,
        field[4..6].parse().ok()?,
    ))
}

/// Estimated position errors from `+QGPSCFG: "estimation_error"`.
///
/// Only the horizontal and vertical terms are consumed downstream; the
/// speed and heading terms are captured for completeness.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AccuracyEstimate {
    pub h_acc: f32,
    pub v_acc: f32,
    pub speed_acc: f32,
    pub head_acc: f32,
}

/// Extract an estimation-error record from a response line.
pub fn parse_estimation_error(text: &str) -> Option<AccuracyEstimate> {
    let at = text.find(ESTIMATION_ERROR_TAG)?;
    let mut fields = text[at + ESTIMATION_ERROR_TAG.len()..].split(',');

    Some(AccuracyEstimate {
        h_acc: fields.next()?.trim().parse().ok()?,
        v_acc: fields.next()?.trim().parse().ok()?,
        speed_acc: fields.next()?.trim().parse().ok()?,
        head_acc: fields.next()?.trim().parse().ok()?,
    })
}
