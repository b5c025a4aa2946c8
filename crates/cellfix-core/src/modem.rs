//! Modem capability dispatch and the positioning AT command dialect.
//!
//! The command strings below are the Quectel GNSS dialect; the exact
//! literals are part of the wire contract with the modem firmware.

use tracing::trace;

use crate::config::Constellation;

/// Start a GNSS session.
pub const CMD_SESSION_START: &str = "AT+QGPS=1";
/// End the GNSS session; issued exactly once when an attempt concludes.
pub const CMD_SESSION_END: &str = "AT+QGPSEND";
/// Position query. Mode 2 yields `(-)dd.ddddd` / `(-)ddd.ddddd`
/// coordinates, the form with the significant digits the supported
/// accuracy calls for.
pub const CMD_FIX_QUERY: &str = "AT+QGPSLOC=2";
/// Enable estimated-position-error reporting.
pub const CMD_ESTIMATION_ERROR_ENABLE: &str = "AT+QGPSCFG=\"nmea_epe\",1";
/// Query the horizontal/vertical/speed/heading error estimates.
pub const CMD_ESTIMATION_ERROR_QUERY: &str = "AT+QGPSCFG=\"estimation_error\"";

/// Detected modem identity; determines which commands and optional
/// telemetry queries the worker issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModemVariant {
    /// Not determined yet, typically because the modem is off or its
    /// device information is not cached. Detection may be retried.
    Unknown,
    /// Recognized hardware without GNSS support in this library. Sticky;
    /// acquisition must not be attempted.
    Unsupported,
    /// Quectel BG95-M5, full capability.
    Bg95M5,
    /// Quectel EG91: no estimation-error reporting and no constellation
    /// configuration.
    Eg91,
}

impl ModemVariant {
    /// True for a variant acquisition may run against.
    pub fn is_resolved(self) -> bool {
        matches!(self, ModemVariant::Bg95M5 | ModemVariant::Eg91)
    }

    pub fn supports_estimation_error(self) -> bool {
        matches!(self, ModemVariant::Bg95M5)
    }

    pub fn supports_constellation_config(self) -> bool {
        matches!(self, ModemVariant::Bg95M5)
    }
}

/// Resolve the modem variant from its power state and device model.
///
/// An off modem or an uncached model resolves to `Unknown`, which callers
/// must treat as retryable rather than caching it as an answer. Any other
/// resolution is sticky for the session lifetime.
pub fn detect_variant(modem_on: bool, device_model: Option<&str>) -> ModemVariant {
    if !modem_on {
        return ModemVariant::Unknown;
    }
    match device_model {
        None => {
            trace!("modem device info not cached yet");
            ModemVariant::Unknown
        }
        Some(model) if model.contains("BG95-M5") => {
            trace!("BG95-M5 detected");
            ModemVariant::Bg95M5
        }
        Some(model) if model.contains("EG91") => {
            trace!("EG91 detected");
            ModemVariant::Eg91
        }
        Some(model) => {
            trace!(model, "modem model not supported");
            ModemVariant::Unsupported
        }
    }
}

/// `gnssconfig` parameter for the constellation selection command.
///
/// GPS-only and GPS+GLONASS both collapse to configuration 1. When several
/// bits are set, GLONASS wins over BeiDou over Galileo over QZSS.
pub fn constellation_config_number(set: Constellation) -> u32 {
    if set.contains(Constellation::GPS_GLONASS) {
        1
    } else if set.contains(Constellation::GPS_BEIDOU) {
        2
    } else if set.contains(Constellation::GPS_GALILEO) {
        3
    } else if set.contains(Constellation::GPS_QZSS) {
        4
    } else {
        1
    }
}

/// Full constellation selection command for the given set.
pub fn constellation_select_command(set: Constellation) -> String {
    format!("AT+QGPSCFG=\"gnssconfig\",{}", constellation_config_number(set))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variant_unknown_while_off() {
        assert_eq!(detect_variant(false, Some("BG95-M5")), ModemVariant::Unknown);
    }

    #[test]
    fn variant_unknown_until_model_cached() {
        assert_eq!(detect_variant(true, None), ModemVariant::Unknown);
    }

    #[test]
    fn variant_recognized_models() {
        assert_eq!(detect_variant(true, Some("BG95-M5")), ModemVariant::Bg95M5);
        assert_eq!(detect_variant(true, Some("EG91-EX")), ModemVariant::Eg91);
    }

    #[test]
    fn variant_unrecognized_model_is_unsupported() {
        assert_eq!(detect_variant(true, Some("SARA-R510")), ModemVariant::Unsupported);
    }

    #[test]
    fn variant_capabilities() {
        assert!(ModemVariant::Bg95M5.supports_estimation_error());
        assert!(ModemVariant::Bg95M5.supports_constellation_config());
        assert!(!ModemVariant::Eg91.supports_estimation_error());
        assert!(!ModemVariant::Eg91.supports_constellation_config());
        assert!(!ModemVariant::Unknown.is_resolved());
        assert!(!ModemVariant::Unsupported.is_resolved());
        assert!(ModemVariant::Eg91.is_resolved());
    }

    #[test]
    fn constellation_precedence() {
        assert_eq!(constellation_config_number(Constellation::empty()), 1);
        assert_eq!(constellation_config_number(Constellation::GPS_GLONASS), 1);
        assert_eq!(constellation_config_number(Constellation::GPS_BEIDOU), 2);
        assert_eq!(constellation_config_number(Constellation::GPS_GALILEO), 3);
        assert_eq!(constellation_config_number(Constellation::GPS_QZSS), 4);
        assert_eq!(
            constellation_config_number(
                Constellation::GPS_GLONASS | Constellation::GPS_QZSS
            ),
            1
        );
        assert_eq!(
            constellation_config_number(
                Constellation::GPS_BEIDOU | Constellation::GPS_GALILEO
            ),
            2
        );
    }

    #[test]
    fn constellation_command_literal() {
        assert_eq!(
            constellation_select_command(Constellation::GPS_BEIDOU),
            "AT+QGPSCFG=\"gnssconfig\",2"
        );
    }
}
