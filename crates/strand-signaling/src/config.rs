use crate::protocol::PeerId;
use std::time::Duration;
use url::Url;

pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(3);
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Session parameters, fixed for the lifetime of a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Address of the signalling relay.
    pub endpoint: Url,
    /// Identity announced in the registration frame.
    pub peer_id: PeerId,
    /// Delay between an abnormal closure and the next automatic attempt.
    pub retry_delay: Duration,
    /// Consecutive abnormal closures tolerated before giving up.
    pub max_retries: u32,
}

impl SessionConfig {
    pub fn new(endpoint: Url, peer_id: impl Into<PeerId>) -> Self {
        Self {
            endpoint,
            peer_id: peer_id.into(),
            retry_delay: DEFAULT_RETRY_DELAY,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}
