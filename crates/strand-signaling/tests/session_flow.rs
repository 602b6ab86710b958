//! End-to-end session scenarios over a scripted transport.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use strand_signaling::{
    ConnectionState, Connector, DisplayInfo, IceCandidate, RetryOutcome, SessionConfig,
    SessionDescription, SessionEvents, SignalingSession, StaticDisplay, Transport, TransportError,
    TransportEvent,
};
use url::Url;

#[derive(Default)]
struct Wire {
    sent: Mutex<Vec<String>>,
    closed: AtomicBool,
}

struct ScriptedTransport {
    wire: Arc<Wire>,
}

impl Transport for ScriptedTransport {
    fn send_text(&mut self, frame: &str) -> Result<(), TransportError> {
        if self.wire.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed);
        }
        self.wire.sent.lock().unwrap().push(frame.to_string());
        Ok(())
    }

    fn close(&mut self) {
        self.wire.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.wire.closed.load(Ordering::SeqCst)
    }
}

#[derive(Default, Clone)]
struct ScriptedConnector {
    wires: Arc<Mutex<Vec<Arc<Wire>>>>,
}

impl ScriptedConnector {
    fn attempts(&self) -> usize {
        self.wires.lock().unwrap().len()
    }

    fn latest(&self) -> Arc<Wire> {
        self.wires.lock().unwrap().last().unwrap().clone()
    }
}

impl Connector for ScriptedConnector {
    fn open(&mut self, _endpoint: &Url) -> Box<dyn Transport> {
        let wire = Arc::new(Wire::default());
        self.wires.lock().unwrap().push(wire.clone());
        Box::new(ScriptedTransport { wire })
    }
}

#[derive(Default)]
struct Host {
    statuses: Mutex<Vec<String>>,
    errors: Mutex<Vec<String>>,
    descriptions: Mutex<Vec<SessionDescription>>,
    candidates: Mutex<Vec<IceCandidate>>,
    disconnects: Mutex<usize>,
}

impl SessionEvents for Host {
    fn on_status(&self, message: &str) {
        self.statuses.lock().unwrap().push(message.to_string());
    }
    fn on_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }
    fn on_sdp(&self, description: SessionDescription) {
        self.descriptions.lock().unwrap().push(description);
    }
    fn on_ice(&self, candidate: IceCandidate) {
        self.candidates.lock().unwrap().push(candidate);
    }
    fn on_disconnect(&self) {
        *self.disconnects.lock().unwrap() += 1;
    }
}

fn new_session() -> (SignalingSession, ScriptedConnector, Arc<Host>) {
    let connector = ScriptedConnector::default();
    let host = Arc::new(Host::default());
    let config = SessionConfig::new(Url::parse("ws://relay.test/ws").unwrap(), 42u64);
    let session = SignalingSession::new(
        config,
        Box::new(connector.clone()),
        Box::new(StaticDisplay(DisplayInfo::default())),
        host.clone(),
    );
    (session, connector, host)
}

#[test]
fn full_negotiation_then_clean_teardown() {
    let (mut session, connector, host) = new_session();

    session.connect();
    session.handle_event(TransportEvent::Opened);
    session.handle_event(TransportEvent::Message("HELLO".to_string()));

    // Remote offer arrives, host answers, candidates flow both ways.
    session.handle_event(TransportEvent::Message(
        r#"{"sdp":{"type":"offer","sdp":"v=0\r\no=- 0 0 IN IP4 0.0.0.0\r\n"}}"#.to_string(),
    ));
    let offer = host.descriptions.lock().unwrap()[0].clone();
    assert_eq!(offer.kind, "offer");

    session.send_sdp(SessionDescription {
        kind: "answer".to_string(),
        sdp: "v=0\r\n".to_string(),
    });
    session.handle_event(TransportEvent::Message(
        r#"{"ice":{"candidate":"candidate:0 1 UDP 2122252543","sdpMid":"0","sdpMLineIndex":0}}"#
            .to_string(),
    ));
    session.send_ice(IceCandidate {
        candidate: "candidate:1 1 UDP 1686052607".to_string(),
        sdp_mid: Some("0".to_string()),
        sdp_mline_index: Some(0),
    });

    let sent = connector.latest().sent.lock().unwrap().clone();
    assert_eq!(sent.len(), 3);
    assert!(sent[0].starts_with("HELLO 42 "));
    assert!(sent[1].contains(r#""sdp""#));
    assert!(sent[2].contains(r#""ice""#));
    assert_eq!(host.candidates.lock().unwrap().len(), 1);
    assert!(host.errors.lock().unwrap().is_empty());

    session.disconnect();
    session.handle_event(TransportEvent::Closed);
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(*host.disconnects.lock().unwrap(), 1);
}

#[test]
fn relay_loss_retries_then_recovers() {
    let (mut session, connector, host) = new_session();

    session.connect();
    session.handle_event(TransportEvent::Opened);
    session.handle_event(TransportEvent::Message("HELLO".to_string()));

    // The relay drops the socket twice; both retries reconnect and the
    // second attempt registers successfully.
    for _ in 0..2 {
        connector.latest().closed.store(true, Ordering::SeqCst);
        let retry = session
            .handle_event(TransportEvent::Errored)
            .expect("closed socket schedules a retry");
        session.handle_event(TransportEvent::Closed);
        assert_eq!(session.fire_retry(retry), RetryOutcome::Reconnecting);
    }
    assert_eq!(connector.attempts(), 3);

    session.handle_event(TransportEvent::Opened);
    assert_eq!(session.state(), ConnectionState::Connected);
    assert_eq!(session.retry_count(), 0);
    // The first drop was a real disconnect, the second landed mid-reconnect.
    assert_eq!(*host.disconnects.lock().unwrap(), 1);
    assert!(host
        .statuses
        .lock()
        .unwrap()
        .iter()
        .any(|s| s.contains("registering with server, peer id: 42")));
}
