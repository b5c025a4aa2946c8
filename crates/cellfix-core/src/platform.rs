//! Capability traits for the collaborators outside the acquisition core.
//!
//! The library never talks to hardware directly; the embedding supplies
//! implementations of these traits. Implementations are shared between the
//! session facade (precondition checks) and the worker thread (command
//! traffic), so they must tolerate calls from both.

/// Cellular modem transport and status queries.
pub trait CellularPort: Send + Sync {
    /// Whether the modem is powered.
    fn is_on(&self) -> bool;

    /// Whether cloud connectivity is up (gates event publication).
    fn is_connected(&self) -> bool;

    /// Modem model identifier, e.g. `"BG95-M5"`. `None` while the device
    /// information has not been cached yet.
    fn device_model(&self) -> Option<String>;

    /// Perform one blocking AT command round-trip and return the raw
    /// response text, line endings included. The per-command timeout is
    /// owned by the implementation.
    fn send_command(&self, command: &str) -> String;
}

/// GNSS antenna power rail control.
pub trait AntennaPower: Send + Sync {
    /// One-time pin setup, invoked from `begin`.
    fn configure(&self) {}

    fn power_on(&self);

    fn power_off(&self);
}

/// Outbound sink for acquired-position events.
pub trait EventPublisher: Send + Sync {
    /// Returns true when the event was accepted for delivery.
    fn publish(&self, topic: &str, payload: &str) -> bool;
}
