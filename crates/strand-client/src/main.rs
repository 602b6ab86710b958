#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use strand_client::{spawn_gamepad_thread, ClientConfig, PadEvents, SignalingClient};
use strand_signaling::{DisplayInfo, IceCandidate, SessionDescription, SessionEvents};
use tracing::{debug, info, warn};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "strand-client")]
struct Args {
    /// Signalling relay to register with.
    #[arg(long, default_value = "ws://127.0.0.1:8443/ws")]
    relay: Url,
    /// Peer identity announced during registration.
    #[arg(long, default_value = "1")]
    peer_id: String,
    /// Render surface width reported to the server.
    #[arg(long, default_value = "1920")]
    width: u32,
    /// Render surface height reported to the server.
    #[arg(long, default_value = "1080")]
    height: u32,
    /// Device pixel scale of the render surface.
    #[arg(long, default_value = "1.0")]
    scale: f64,
    /// Seconds between reconnect attempts.
    #[arg(long, default_value = "3")]
    retry_delay: u64,
    /// Consecutive failures tolerated before giving up.
    #[arg(long, default_value = "3")]
    max_retries: u32,
    /// Forward physical controller input.
    #[arg(long, default_value = "false")]
    gamepad: bool,
    #[arg(long, default_value = "0.05")]
    gamepad_deadzone: f32,
}

/// Forwards session events to the log. A media layer would subscribe the
/// same way and feed the SDP/ICE values into its peer connection.
struct LogEvents;

impl SessionEvents for LogEvents {
    fn on_status(&self, message: &str) {
        info!("{message}");
    }
    fn on_debug(&self, message: &str) {
        debug!("{message}");
    }
    fn on_error(&self, message: &str) {
        warn!("{message}");
    }
    fn on_sdp(&self, description: SessionDescription) {
        info!(
            "received remote description: {} ({} bytes)",
            description.kind,
            description.sdp.len()
        );
    }
    fn on_ice(&self, candidate: IceCandidate) {
        info!("received remote candidate: {}", candidate.candidate);
    }
    fn on_disconnect(&self) {
        info!("session disconnected");
    }
}

struct LogPads;

impl PadEvents for LogPads {
    fn on_button(&self, pad: usize, button: usize, value: f32) {
        debug!("pad {pad} button {button} -> {value}");
    }
    fn on_axis(&self, pad: usize, axis: usize, value: f32) {
        debug!("pad {pad} axis {axis} -> {value}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let args = Args::parse();
    let mut config = ClientConfig::new(args.relay, args.peer_id.as_str());
    config.display = DisplayInfo {
        width: args.width,
        height: args.height,
        scale: args.scale,
    };
    config.retry_delay = Duration::from_secs(args.retry_delay);
    config.max_retries = args.max_retries;
    config.gamepad_enabled = args.gamepad;
    config.gamepad_deadzone = args.gamepad_deadzone;

    if config.gamepad_enabled {
        spawn_gamepad_thread(Arc::new(LogPads), config.gamepad_deadzone);
    }

    let (client, handle) =
        SignalingClient::new(config.session_config(), config.display, Arc::new(LogEvents));
    handle.connect();

    let mut run = tokio::spawn(client.run());
    tokio::select! {
        result = &mut run => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("shutting down");
            handle.disconnect();
            drop(handle);
            run.await?
        }
    }
}
