pub mod client;
pub mod messages;

pub use client::TurnClient;
pub use messages::{TurnRequest, TurnResponse};
