//! Core bridge modules - variables, command queue, engine hookup, poll loop
//!
//! These modules are independent of any concrete engine or front end.

pub mod async_queue;
pub mod commands;
pub mod engine;
pub mod event_bridge;
pub mod synchronizer;
pub mod variable;

// Re-exports for convenience
pub use async_queue::AsyncQueue;
pub use commands::{NotifyPlaylistCommand, PlaylistChange, QuitCommand};
pub use engine::{Engine, Input, Notifier, PlaylistStatus, Signal, SignalHandler, SignalValue};
pub use event_bridge::EventBridge;
pub use synchronizer::{InputHandle, InputState, SyncVars, Synchronizer};
