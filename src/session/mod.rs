//! Interview session management
//!
//! This module provides the `TurnController` abstraction that manages:
//! - Capture permission and stream ownership
//! - The record → encode → exchange → decode turn cycle
//! - Published reply outputs (transcript + playable clip)
//! - Session state for UI gating

mod config;
mod controller;
mod reply;

pub use config::SessionOptions;
pub use controller::{TurnController, TurnOutcome, TurnPhase};
pub use reply::{SessionStatus, TurnReply};
