use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Exact token the relay sends once peer registration is acknowledged.
pub const REGISTERED_TOKEN: &str = "HELLO";

/// Prefix of relay error replies. The remainder is human-readable.
pub const ERROR_PREFIX: &str = "ERROR";

/// Peer identifier assigned by the host before connecting.
///
/// Sent verbatim in the registration frame. Numeric identities are the common
/// case but the relay treats the field as opaque text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerId(String);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for PeerId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for PeerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for PeerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// A negotiated session description, as exchanged with the relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionDescription {
    /// Description kind, `offer` or `answer`.
    #[serde(rename = "type")]
    pub kind: String,
    pub sdp: String,
}

/// One candidate network path for peer connectivity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(rename = "sdpMid", default, skip_serializing_if = "Option::is_none")]
    pub sdp_mid: Option<String>,
    #[serde(
        rename = "sdpMLineIndex",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sdp_mline_index: Option<u32>,
}

/// Local render surface geometry announced during registration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayInfo {
    pub width: u32,
    pub height: u32,
    /// Device pixel scale of the surface.
    pub scale: f64,
}

impl Default for DisplayInfo {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            scale: 1.0,
        }
    }
}

/// Wire shape of the registration metadata, JSON then base64.
#[derive(Serialize, Deserialize)]
struct RegistrationMeta {
    res: String,
    scale: f64,
}

/// Messages this endpoint sends to the relay as JSON text frames.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientMessage {
    Sdp(SessionDescription),
    Ice(IceCandidate),
}

impl ClientMessage {
    pub fn to_frame(&self) -> Result<String, ProtocolError> {
        serde_json::to_string(self).map_err(|err| ProtocolError::Encode(err.to_string()))
    }
}

/// A relay payload after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    /// Registration acknowledged.
    Registered,
    /// Relay error reply, full payload included. Advisory, not fatal.
    ServerError(String),
    Sdp(SessionDescription),
    Ice(IceCandidate),
}

#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("error encoding message: {0}")]
    Encode(String),
    #[error("error parsing message as JSON: {raw}")]
    Parse { raw: String },
    #[error("unhandled JSON message: {raw}")]
    Unrecognized { raw: String },
}

/// Builds the registration frame: `HELLO <peer> <base64(JSON metadata)>`.
pub fn hello_frame(peer: &PeerId, display: &DisplayInfo) -> Result<String, ProtocolError> {
    let meta = RegistrationMeta {
        res: format!("{}x{}", display.width, display.height),
        scale: display.scale,
    };
    let json = serde_json::to_string(&meta).map_err(|err| ProtocolError::Encode(err.to_string()))?;
    Ok(format!(
        "{REGISTERED_TOKEN} {peer} {}",
        general_purpose::STANDARD.encode(json)
    ))
}

/// Classifies one inbound relay payload.
///
/// Checked in priority order: the registration token, the error prefix, then
/// a structured document carrying either an `sdp` or an `ice` field. A field
/// set to JSON null counts as absent. Anything else is unrecognized.
pub fn classify(raw: &str) -> Result<ServerMessage, ProtocolError> {
    if raw == REGISTERED_TOKEN {
        return Ok(ServerMessage::Registered);
    }
    if raw.starts_with(ERROR_PREFIX) {
        return Ok(ServerMessage::ServerError(raw.to_string()));
    }

    let doc: serde_json::Value = serde_json::from_str(raw).map_err(|_| ProtocolError::Parse {
        raw: raw.to_string(),
    })?;

    if let Some(sdp) = doc.get("sdp").filter(|v| !v.is_null()) {
        let description =
            serde_json::from_value(sdp.clone()).map_err(|_| ProtocolError::Parse {
                raw: raw.to_string(),
            })?;
        return Ok(ServerMessage::Sdp(description));
    }
    if let Some(ice) = doc.get("ice").filter(|v| !v.is_null()) {
        let candidate = serde_json::from_value(ice.clone()).map_err(|_| ProtocolError::Parse {
            raw: raw.to_string(),
        })?;
        return Ok(ServerMessage::Ice(candidate));
    }

    Err(ProtocolError::Unrecognized {
        raw: raw.to_string(),
    })
}
