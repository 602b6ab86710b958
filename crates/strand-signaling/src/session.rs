use crate::config::SessionConfig;
use crate::events::SessionEvents;
use crate::protocol::{
    classify, hello_frame, ClientMessage, DisplayInfo, IceCandidate, ServerMessage,
    SessionDescription,
};
use crate::transport::{Connector, Transport, TransportEvent};
use std::sync::Arc;
use std::time::Duration;

/// Source of the registration metadata.
///
/// Probed once per connection attempt, when the transport opens. Injected so
/// the session stays free of environment coupling.
pub trait DisplayProbe: Send {
    fn probe(&self) -> DisplayInfo;
}

/// Fixed display geometry, the common case for a native client whose render
/// surface is known up front.
pub struct StaticDisplay(pub DisplayInfo);

impl DisplayProbe for StaticDisplay {
    fn probe(&self) -> DisplayInfo {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// A retry the driver should fire after `delay`.
///
/// Carries enough of the session's position at schedule time for
/// `fire_retry` to recognize a timer the world has moved past.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledRetry {
    pub delay: Duration,
    attempt: u32,
    epoch: u64,
}

/// What a fired retry timer amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOutcome {
    /// A fresh connection attempt was started.
    Reconnecting,
    /// The retry bound is exceeded. Terminal: the session will not recover
    /// on its own and the host decides what happens next.
    GaveUp,
    /// The session moved on since this retry was scheduled. Nothing done.
    Stale,
}

/// Signalling session state machine.
///
/// Owns one logical connection to the relay: converts transport lifecycle
/// events into the peer-registration handshake, classifies inbound traffic,
/// reports through the [`SessionEvents`] observer and performs bounded
/// automatic reconnection. The session never blocks and never sleeps; retry
/// timing is returned as data for the driver to schedule.
pub struct SignalingSession {
    config: SessionConfig,
    connector: Box<dyn Connector>,
    display: Box<dyn DisplayProbe>,
    events: Arc<dyn SessionEvents>,
    transport: Option<Box<dyn Transport>>,
    state: ConnectionState,
    retry_count: u32,
    // Bumped by connect() and disconnect() so pending retries from a
    // superseded attempt are recognized as stale.
    epoch: u64,
}

impl SignalingSession {
    pub fn new(
        config: SessionConfig,
        connector: Box<dyn Connector>,
        display: Box<dyn DisplayProbe>,
        events: Arc<dyn SessionEvents>,
    ) -> Self {
        Self {
            config,
            connector,
            display,
            events,
            transport: None,
            state: ConnectionState::Disconnected,
            retry_count: 0,
            epoch: 0,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn retry_count(&self) -> u32 {
        self.retry_count
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Starts a connection attempt to the relay.
    ///
    /// Safe to call in any state: an existing transport handle is released
    /// first, without waiting for its close to complete, so only the newest
    /// transport's events ever reach this session.
    pub fn connect(&mut self) {
        self.transport = None;
        self.epoch += 1;
        self.state = ConnectionState::Connecting;
        self.events.on_status("connecting to server");
        let transport = self.connector.open(&self.config.endpoint);
        self.transport = Some(transport);
    }

    /// Requests an intentional teardown.
    ///
    /// The transport close is asynchronous; the resulting `Closed` event
    /// flows through the normal close handler, which emits `on_disconnect`.
    /// Without an active transport this is a no-op, but it still supersedes
    /// any pending retry.
    pub fn disconnect(&mut self) {
        self.epoch += 1;
        if let Some(transport) = self.transport.as_mut() {
            transport.close();
        }
    }

    /// Forwards a locally-generated session description to the relay.
    pub fn send_sdp(&mut self, description: SessionDescription) {
        self.send_message(ClientMessage::Sdp(description), "local sdp");
    }

    /// Forwards a locally-gathered ICE candidate to the relay.
    pub fn send_ice(&mut self, candidate: IceCandidate) {
        self.send_message(ClientMessage::Ice(candidate), "ice candidate");
    }

    fn send_message(&mut self, message: ClientMessage, label: &str) {
        if self.state != ConnectionState::Connected {
            self.events
                .on_error(&format!("cannot send {label}: not connected"));
            return;
        }
        let Some(transport) = self.transport.as_mut() else {
            self.events
                .on_error(&format!("cannot send {label}: no transport"));
            return;
        };
        match message.to_frame() {
            Ok(frame) => {
                self.events.on_debug(&format!("sending {label}: {frame}"));
                if let Err(err) = transport.send_text(&frame) {
                    self.events
                        .on_error(&format!("failed to send {label}: {err}"));
                }
            }
            Err(err) => self.events.on_error(&err.to_string()),
        }
    }

    /// Feeds one transport event into the machine.
    ///
    /// Returns a retry for the driver to schedule when an error warrants
    /// one. Events must belong to the transport opened by the most recent
    /// `connect()`; the driver drops a replaced transport's channel along
    /// with its handle.
    pub fn handle_event(&mut self, event: TransportEvent) -> Option<ScheduledRetry> {
        match event {
            TransportEvent::Opened => {
                self.handle_open();
                None
            }
            TransportEvent::Message(raw) => {
                self.handle_message(&raw);
                None
            }
            TransportEvent::Errored => self.handle_error(),
            TransportEvent::Closed => {
                self.handle_close();
                None
            }
        }
    }

    /// Fires a previously scheduled retry.
    ///
    /// A timer can outlive the failure that scheduled it. The guard checks
    /// that the session is still parked on that same failed attempt before
    /// acting, so a stale timer cannot resurrect an abandoned session.
    pub fn fire_retry(&mut self, retry: ScheduledRetry) -> RetryOutcome {
        if retry.epoch != self.epoch
            || retry.attempt != self.retry_count
            || self.state == ConnectionState::Connected
        {
            return RetryOutcome::Stale;
        }
        if self.retry_count > self.config.max_retries {
            self.events.on_error(&format!(
                "connection failed after {} retries, giving up",
                self.config.max_retries
            ));
            return RetryOutcome::GaveUp;
        }
        self.connect();
        RetryOutcome::Reconnecting
    }

    /// Transport open: register the peer.
    fn handle_open(&mut self) {
        let display = self.display.probe();
        let frame = match hello_frame(&self.config.peer_id, &display) {
            Ok(frame) => frame,
            Err(err) => {
                self.events.on_error(&err.to_string());
                return;
            }
        };
        let Some(transport) = self.transport.as_mut() else {
            return;
        };
        if let Err(err) = transport.send_text(&frame) {
            self.events
                .on_error(&format!("failed to send registration: {err}"));
            return;
        }
        self.state = ConnectionState::Connected;
        self.retry_count = 0;
        self.events.on_status(&format!(
            "registering with server, peer id: {}",
            self.config.peer_id
        ));
    }

    /// Transport message: raw payload to the debug hook, then classify.
    /// Exactly one downstream hook fires per payload.
    fn handle_message(&mut self, raw: &str) {
        self.events.on_debug(&format!("server message: {raw}"));

        match classify(raw) {
            Ok(ServerMessage::Registered) => {
                self.events.on_status("registered with server");
                self.events.on_status("waiting for stream");
            }
            Ok(ServerMessage::ServerError(payload)) => {
                // Advisory: the relay reported a problem but the connection
                // stays up.
                self.events.on_error(&format!("server error: {payload}"));
            }
            Ok(ServerMessage::Sdp(description)) => self.events.on_sdp(description),
            Ok(ServerMessage::Ice(candidate)) => self.events.on_ice(candidate),
            Err(err) => self.events.on_error(&err.to_string()),
        }
    }

    /// Transport error: count the failure and, when the socket is confirmed
    /// dead, hand the driver a delayed retry. An error on a still-open
    /// socket schedules nothing; the close handler owns that teardown.
    fn handle_error(&mut self) -> Option<ScheduledRetry> {
        self.events.on_status(&format!(
            "connection error, retrying in {}s",
            self.config.retry_delay.as_secs()
        ));
        self.retry_count += 1;

        let confirmed_closed = self
            .transport
            .as_ref()
            .map(|transport| transport.is_closed())
            .unwrap_or(true);
        if confirmed_closed {
            Some(ScheduledRetry {
                delay: self.config.retry_delay,
                attempt: self.retry_count,
                epoch: self.epoch,
            })
        } else {
            None
        }
    }

    /// Transport close. A close that lands while the session is already
    /// re-entering `connecting` belongs to the abandoned transport of an
    /// in-progress reconnect and must not fire a second disconnect.
    fn handle_close(&mut self) {
        if self.state != ConnectionState::Connecting {
            self.state = ConnectionState::Disconnected;
            self.transport = None;
            self.events.on_error("server closed connection");
            self.events.on_disconnect();
        }
    }
}
