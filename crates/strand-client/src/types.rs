use std::time::Duration;
use strand_signaling::{DisplayInfo, PeerId, SessionConfig, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY};
use url::Url;

/// Everything a Strand client instance needs to run.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub relay: Url,
    pub peer_id: PeerId,
    pub display: DisplayInfo,
    pub retry_delay: Duration,
    pub max_retries: u32,
    pub gamepad_enabled: bool,
    pub gamepad_deadzone: f32,
}

impl ClientConfig {
    pub fn new(relay: Url, peer_id: impl Into<PeerId>) -> Self {
        Self {
            relay,
            peer_id: peer_id.into(),
            display: DisplayInfo::default(),
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
            gamepad_enabled: false,
            gamepad_deadzone: crate::input::DEFAULT_AXIS_DEADZONE,
        }
    }

    pub fn session_config(&self) -> SessionConfig {
        let mut config = SessionConfig::new(self.relay.clone(), self.peer_id.clone());
        config.retry_delay = self.retry_delay;
        config.max_retries = self.max_retries;
        config
    }
}
