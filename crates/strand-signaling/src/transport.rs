use thiserror::Error;
use url::Url;

/// Lifecycle events a transport delivers to the session, in arrival order.
///
/// Drivers must deliver events only for the handle created by the most
/// recent `connect()`; events from an abandoned transport are dropped with
/// the handle that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The connection to the relay is established.
    Opened,
    /// One inbound text frame.
    Message(String),
    /// The transport failed. Delivered before `Closed` when the socket is
    /// already known dead, mirroring how a failed connection reports.
    Errored,
    /// The transport is closed, cleanly or not.
    Closed,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport is closed")]
    Closed,
    #[error("transport send failed: {0}")]
    Send(String),
}

/// One live connection attempt to the relay.
///
/// A session owns at most one handle at a time and replaces it wholesale on
/// reconnect; handles are never reused. Dropping a handle tears the
/// underlying connection down without waiting for its close to complete.
pub trait Transport: Send {
    /// Queues one text frame for delivery.
    fn send_text(&mut self, frame: &str) -> Result<(), TransportError>;

    /// Requests a close. The resulting `Closed` event flows back like any
    /// other transport event.
    fn close(&mut self);

    /// Whether the underlying socket is confirmed dead. Retry scheduling
    /// depends on this answer at error time.
    fn is_closed(&self) -> bool;
}

/// Opens a fresh transport handle per connection attempt.
///
/// Opening never fails synchronously; a connection that cannot be
/// established reports through `Errored`/`Closed` events instead, matching
/// the socket APIs this abstraction fronts.
pub trait Connector: Send {
    fn open(&mut self, endpoint: &Url) -> Box<dyn Transport>;
}
