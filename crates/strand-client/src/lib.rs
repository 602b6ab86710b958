//! Native Strand client shell.
//!
//! This crate provides:
//! - The WebSocket driver that runs a `strand-signaling` session against a
//!   real relay
//! - The physical controller poller
//! - The CLI entry point (`src/main.rs`)

#![forbid(unsafe_code)]

pub mod client;
pub mod input;
pub mod types;

pub use client::{SignalingClient, SignalingHandle};
pub use input::{
    spawn_gamepad_thread, GamepadPoller, GilrsSource, PadEvents, PadSnapshot, PadSource,
    DEFAULT_AXIS_DEADZONE, IDLE_TIMEOUT, MAX_PADS, POLL_INTERVAL,
};
pub use types::ClientConfig;
