//! Location data model shared between the session facade and the worker.

use serde::Serialize;

/// Outcome of a location request or a status query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LocationResult {
    /// GNSS is not available, typically because the modem is off.
    Unavailable,
    /// GNSS is not supported on this modem hardware.
    Unsupported,
    /// No acquisition is pending or in progress.
    Idle,
    /// An acquisition is running.
    Acquiring,
    /// A previous acquisition is still in progress.
    Pending,
    /// A position has been acquired and fixed.
    Fixed,
    /// No stable fix within the configured wait.
    TimedOut,
}

/// One acquired position.
///
/// Fields other than `fix` are only meaningful when `fix != 0`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LocationPoint {
    /// GNSS locked indication (0 = no fix).
    pub fix: u32,
    /// Fix time reported by the modem, epoch seconds UTC.
    pub epoch_time: Option<i64>,
    /// Local system time at the first fix of the attempt, epoch seconds.
    pub system_time: Option<i64>,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Altitude in meters.
    pub altitude: f32,
    /// Ground speed, see [`crate::parse::FixReport::speed`].
    pub speed: f32,
    /// Heading in degrees.
    pub heading: f32,
    /// Horizontal accuracy estimate in meters.
    pub horizontal_accuracy: f32,
    /// Horizontal dilution of precision.
    pub horizontal_dop: f32,
    /// Vertical accuracy estimate in meters.
    pub vertical_accuracy: f32,
    /// Vertical dilution of precision. Not reported by the current modem
    /// dialects; carried for payload compatibility.
    pub vertical_dop: f32,
    /// Seconds from acquisition start to the first fix.
    pub time_to_first_fix: f32,
    /// Satellites used in the solution.
    pub sats_in_use: u32,
}
