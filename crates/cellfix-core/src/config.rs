//! Acquisition configuration.

use std::time::Duration;

use bitflags::bitflags;

bitflags! {
    /// GNSS constellations requested alongside GPS.
    ///
    /// The empty set selects GPS only. The modem accepts exactly one
    /// combination at a time; when several bits are set, the selection
    /// precedence is GLONASS, BeiDou, Galileo, QZSS (see
    /// [`crate::modem::constellation_config_number`]).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Constellation: u32 {
        const GPS_GLONASS = 1 << 0;
        const GPS_BEIDOU = 1 << 1;
        const GPS_GALILEO = 1 << 2;
        const GPS_QZSS = 1 << 3;
    }
}

/// Default HDOP acceptance threshold.
pub const HDOP_THRESHOLD_DEFAULT: f32 = 100.0;
/// Default horizontal accuracy acceptance threshold, meters.
pub const HACC_THRESHOLD_DEFAULT: f32 = 50.0;
/// Default maximum wait for a stable fix.
pub const MAX_FIX_WAIT_DEFAULT: Duration = Duration::from_secs(90);
/// Interval between position polls while acquiring.
pub const POLL_INTERVAL_DEFAULT: Duration = Duration::from_secs(1);

/// Acquisition settings.
///
/// Applied wholesale by [`crate::session::LocationSession::begin`]; the
/// worker reads a stable snapshot for the duration of one attempt, so a
/// replacement mid-acquisition only affects the next attempt.
#[derive(Debug, Clone)]
pub struct LocationConfig {
    constellations: Constellation,
    hdop_threshold: f32,
    hacc_threshold: f32,
    max_fix_wait: Duration,
    poll_interval: Duration,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            constellations: Constellation::GPS_GLONASS,
            hdop_threshold: HDOP_THRESHOLD_DEFAULT,
            hacc_threshold: HACC_THRESHOLD_DEFAULT,
            max_fix_wait: MAX_FIX_WAIT_DEFAULT,
            poll_interval: POLL_INTERVAL_DEFAULT,
        }
    }
}

impl LocationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select the GNSS constellations to request.
    pub fn with_constellations(mut self, constellations: Constellation) -> Self {
        self.constellations = constellations;
        self
    }

    /// Set the HDOP threshold for a stable fix, clamped to 0..=100.
    pub fn with_hdop_threshold(mut self, hdop: f32) -> Self {
        self.hdop_threshold = hdop.clamp(0.0, 100.0);
        self
    }

    /// Set the horizontal accuracy threshold for a stable fix, in meters.
    pub fn with_hacc_threshold(mut self, meters: f32) -> Self {
        self.hacc_threshold = meters;
        self
    }

    /// Set the maximum time to wait for a stable fix.
    pub fn with_max_fix_wait(mut self, wait: Duration) -> Self {
        self.max_fix_wait = wait;
        self
    }

    /// Set the interval between position polls.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn constellations(&self) -> Constellation {
        self.constellations
    }

    pub fn hdop_threshold(&self) -> f32 {
        self.hdop_threshold
    }

    pub fn hacc_threshold(&self) -> f32 {
        self.hacc_threshold
    }

    pub fn max_fix_wait(&self) -> Duration {
        self.max_fix_wait
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}
