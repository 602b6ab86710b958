use crate::protocol::{IceCandidate, SessionDescription};

/// Observer interface for session events.
///
/// Every method has an empty default body: an event with no override is
/// simply not delivered. All hooks are invoked synchronously from inside the
/// session's handlers, so implementations should hand heavy work off rather
/// than block.
pub trait SessionEvents: Send + Sync {
    /// Human-readable connection status updates.
    fn on_status(&self, _message: &str) {}

    /// Raw relay traffic, before classification.
    fn on_debug(&self, _message: &str) {}

    /// Errors of every severity, including terminal retry exhaustion.
    fn on_error(&self, _message: &str) {}

    /// A remote session description arrived.
    fn on_sdp(&self, _description: SessionDescription) {}

    /// A remote ICE candidate arrived.
    fn on_ice(&self, _candidate: IceCandidate) {}

    /// The relay closed the connection outside of a reconnect attempt.
    fn on_disconnect(&self) {}
}

/// Events implementation that drops everything. Useful as a placeholder.
pub struct NullEvents;

impl SessionEvents for NullEvents {}
