//! Signalling session core for Strand.
//!
//! This crate provides:
//! - The [`SignalingSession`] state machine: relay connection lifecycle,
//!   peer registration, inbound message classification, bounded reconnect
//! - The [`SessionEvents`] observer trait for status/debug/error/SDP/ICE/
//!   disconnect hooks
//! - Wire-protocol types and the registration frame builder
//! - The [`Transport`]/[`Connector`] seam a socket driver plugs into
//!
//! The crate is sans-IO: no sockets, no runtime, no clocks. Retry timing is
//! returned as data and fired back by the driver, which keeps every timing
//! property testable without real delays.

#![forbid(unsafe_code)]

pub mod config;
pub mod events;
pub mod protocol;
pub mod session;
pub mod transport;

pub use config::{SessionConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
pub use events::{NullEvents, SessionEvents};
pub use protocol::{
    ClientMessage, DisplayInfo, IceCandidate, PeerId, ProtocolError, ServerMessage,
    SessionDescription,
};
pub use session::{
    ConnectionState, DisplayProbe, RetryOutcome, ScheduledRetry, SignalingSession, StaticDisplay,
};
pub use transport::{Connector, Transport, TransportError, TransportEvent};
