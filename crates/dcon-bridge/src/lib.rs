//! File-based automation bridge for the dcon console.
//!
//! An external tool drives the console by overwriting a shared JSON file; a
//! background Tokio task polls it, drops records it has already seen, and runs
//! new commands through the injected [`AutomationHost`].

mod automation_bridge;
mod automation_message;

pub use automation_bridge::{
    AutomationBridge, AutomationBridgeConfig, AutomationHost, CommandOrigin,
    DEFAULT_AUTOMATION_POLL_INTERVAL,
};
pub use automation_message::{AutomationMessage, PollDecision};
