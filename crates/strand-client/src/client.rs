//! Relay WebSocket driver for the signalling session.
//!
//! The session core is sans-IO; this module supplies the missing halves: a
//! WebSocket task per connection attempt, a host command channel, and the
//! retry timer. All session mutation happens on the driver task, so
//! transport events, host commands and retry firings never race.

use anyhow::{anyhow, Result};
use futures::{SinkExt, StreamExt};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use strand_signaling::{
    Connector, DisplayInfo, IceCandidate, RetryOutcome, ScheduledRetry, SessionConfig,
    SessionDescription, SessionEvents, SignalingSession, StaticDisplay, Transport, TransportError,
    TransportEvent,
};
use tokio::sync::mpsc;
use tokio::time::Sleep;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::debug;
use url::Url;

/// Event channel hand-off between the connector and the driver loop.
///
/// `Connector::open` has no way to return the receiver through the session,
/// so it parks the fresh channel here and the driver adopts it on the next
/// turn of its loop. Adoption drops the previous receiver, which is what
/// guarantees an abandoned transport can never reach the session again.
type InboxSlot = Arc<Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>>;

enum WsCommand {
    Send(String),
    Close,
}

struct WsTransport {
    commands: mpsc::UnboundedSender<WsCommand>,
    closed: Arc<AtomicBool>,
}

impl Transport for WsTransport {
    fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.commands
            .send(WsCommand::Send(frame.to_string()))
            .map_err(|_| TransportError::Closed)
    }

    fn close(&mut self) {
        let _ = self.commands.send(WsCommand::Close);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for WsTransport {
    fn drop(&mut self) {
        // An abandoned handle still tears its socket down.
        let _ = self.commands.send(WsCommand::Close);
    }
}

struct WsConnector {
    inbox: InboxSlot,
}

impl Connector for WsConnector {
    fn open(&mut self, endpoint: &Url) -> Box<dyn Transport> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));
        tokio::spawn(ws_task(
            endpoint.clone(),
            event_tx,
            command_rx,
            closed.clone(),
        ));
        *self.inbox.lock().unwrap() = Some(event_rx);
        Box::new(WsTransport {
            commands: command_tx,
            closed,
        })
    }
}

/// One WebSocket connection attempt, from dial to teardown.
///
/// The closed flag is set before a fatal error event is delivered so the
/// session sees the socket as confirmed dead at error time, the ordering
/// its retry scheduling expects.
async fn ws_task(
    endpoint: Url,
    events: mpsc::UnboundedSender<TransportEvent>,
    mut commands: mpsc::UnboundedReceiver<WsCommand>,
    closed: Arc<AtomicBool>,
) {
    let fail = |events: &mpsc::UnboundedSender<TransportEvent>| {
        closed.store(true, Ordering::SeqCst);
        let _ = events.send(TransportEvent::Errored);
        let _ = events.send(TransportEvent::Closed);
    };

    let mut ws = match connect_async(endpoint.as_str()).await {
        Ok((ws, _response)) => ws,
        Err(err) => {
            debug!("websocket connect to {endpoint} failed: {err}");
            fail(&events);
            return;
        }
    };

    if events.send(TransportEvent::Opened).is_err() {
        // The driver already moved on to a newer transport.
        let _ = ws.close(None).await;
        return;
    }

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(WsCommand::Send(frame)) => {
                    if let Err(err) = ws.send(Message::Text(frame.into())).await {
                        debug!("websocket send failed: {err}");
                        fail(&events);
                        return;
                    }
                }
                Some(WsCommand::Close) | None => {
                    let _ = ws.close(None).await;
                    closed.store(true, Ordering::SeqCst);
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
            },
            frame = ws.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    let _ = events.send(TransportEvent::Message(text.to_string()));
                }
                Some(Ok(Message::Close(_))) | None => {
                    closed.store(true, Ordering::SeqCst);
                    let _ = events.send(TransportEvent::Closed);
                    return;
                }
                // Binary and control frames are not part of the relay
                // protocol.
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    debug!("websocket stream error: {err}");
                    fail(&events);
                    return;
                }
            }
        }
    }
}

enum HostCommand {
    Connect,
    Disconnect,
    SendSdp(SessionDescription),
    SendIce(IceCandidate),
}

/// Cloneable host handle onto a running [`SignalingClient`].
///
/// All operations are fire-and-forget; outcomes arrive through the
/// session's observer. Sends after the client has stopped are dropped.
#[derive(Clone)]
pub struct SignalingHandle {
    commands: mpsc::UnboundedSender<HostCommand>,
}

impl SignalingHandle {
    pub fn connect(&self) {
        let _ = self.commands.send(HostCommand::Connect);
    }

    pub fn disconnect(&self) {
        let _ = self.commands.send(HostCommand::Disconnect);
    }

    pub fn send_sdp(&self, description: SessionDescription) {
        let _ = self.commands.send(HostCommand::SendSdp(description));
    }

    pub fn send_ice(&self, candidate: IceCandidate) {
        let _ = self.commands.send(HostCommand::SendIce(candidate));
    }
}

/// Drives a [`SignalingSession`] over real WebSockets.
pub struct SignalingClient {
    session: SignalingSession,
    inbox_slot: InboxSlot,
    commands: mpsc::UnboundedReceiver<HostCommand>,
}

impl SignalingClient {
    pub fn new(
        config: SessionConfig,
        display: DisplayInfo,
        events: Arc<dyn SessionEvents>,
    ) -> (Self, SignalingHandle) {
        let inbox_slot: InboxSlot = Arc::new(Mutex::new(None));
        let connector = WsConnector {
            inbox: inbox_slot.clone(),
        };
        let session = SignalingSession::new(
            config,
            Box::new(connector),
            Box::new(StaticDisplay(display)),
            events,
        );
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        (
            Self {
                session,
                inbox_slot,
                commands: command_rx,
            },
            SignalingHandle {
                commands: command_tx,
            },
        )
    }

    /// Runs the driver loop.
    ///
    /// Returns `Ok` once every handle is dropped and the session is fully
    /// torn down, or an error when the retry bound is exhausted; what to do
    /// about a session that terminal is the caller's decision.
    pub async fn run(mut self) -> Result<()> {
        let mut inbox: Option<mpsc::UnboundedReceiver<TransportEvent>> = None;
        let mut retry_timer: Option<(ScheduledRetry, Pin<Box<Sleep>>)> = None;
        let mut commands_open = true;

        loop {
            // Adopt the channel of a transport opened since the last turn;
            // the replaced receiver is dropped with it.
            if let Some(fresh) = self.inbox_slot.lock().unwrap().take() {
                inbox = Some(fresh);
            }

            if !commands_open && inbox.is_none() && retry_timer.is_none() {
                return Ok(());
            }

            tokio::select! {
                command = self.commands.recv(), if commands_open => match command {
                    Some(HostCommand::Connect) => self.session.connect(),
                    Some(HostCommand::Disconnect) => self.session.disconnect(),
                    Some(HostCommand::SendSdp(description)) => self.session.send_sdp(description),
                    Some(HostCommand::SendIce(candidate)) => self.session.send_ice(candidate),
                    None => {
                        // Host gone: tear down and let disconnect supersede
                        // any pending retry, or this loop never ends.
                        commands_open = false;
                        self.session.disconnect();
                    }
                },
                event = next_event(&mut inbox) => match event {
                    Some(event) => {
                        if let Some(retry) = self.session.handle_event(event) {
                            let sleep = Box::pin(tokio::time::sleep(retry.delay));
                            retry_timer = Some((retry, sleep));
                        }
                    }
                    None => inbox = None,
                },
                retry = retry_elapsed(&mut retry_timer) => {
                    retry_timer = None;
                    match self.session.fire_retry(retry) {
                        RetryOutcome::Reconnecting | RetryOutcome::Stale => {}
                        RetryOutcome::GaveUp => {
                            return Err(anyhow!("connection retries exhausted"));
                        }
                    }
                }
            }
        }
    }
}

async fn next_event(
    inbox: &mut Option<mpsc::UnboundedReceiver<TransportEvent>>,
) -> Option<TransportEvent> {
    match inbox {
        Some(receiver) => receiver.recv().await,
        None => futures::future::pending().await,
    }
}

async fn retry_elapsed(timer: &mut Option<(ScheduledRetry, Pin<Box<Sleep>>)>) -> ScheduledRetry {
    match timer {
        Some((retry, sleep)) => {
            sleep.as_mut().await;
            *retry
        }
        None => futures::future::pending().await,
    }
}
