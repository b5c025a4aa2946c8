//! GNSS position acquisition over a cellular modem's AT-command interface.
//!
//! A single background worker thread owns the modem's GNSS session. It
//! drives a polling state machine against the Quectel positioning AT
//! responses, parses the fixed-column response text into telemetry, and
//! applies a fix-acceptance policy (consecutive-fix settling, dilution of
//! precision, horizontal accuracy) before declaring success.
//!
//! Callers interact through a [`LocationSession`]:
//! - [`LocationSession::get_location`] blocks until the attempt concludes,
//! - [`LocationSession::get_location_async`] returns immediately and fires a
//!   completion callback exactly once,
//! - [`LocationSession::get_status`] is a lock-free state query.
//!
//! The hardware boundary is expressed as capability traits in [`platform`]:
//! the AT transport and modem status queries, optional antenna power
//! control, and an optional event sink for publishing acquired positions.
//! The library itself never touches hardware.

pub mod channel;
pub mod config;
pub mod gate;
pub mod modem;
pub mod parse;
pub mod platform;
pub mod point;
pub mod publish;
pub mod session;
mod worker;

pub use config::{Constellation, LocationConfig};
pub use platform::{AntennaPower, CellularPort, EventPublisher};
pub use point::{LocationPoint, LocationResult};
pub use session::{LocationSession, SessionError};
