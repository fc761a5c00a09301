//! playbridge - engine-to-presentation state bridge
//!
//! Samples a media engine on a fixed period into observable variables and
//! turns engine notifications into serialized, coalesced queued commands.

// Core bridge (variables, queue, engine contracts, synchronizer)
pub mod core;

// App modules
pub mod cli;
pub mod config;
pub mod context;
pub mod runner;
pub mod sim;

// Re-export commonly used types
pub use config::Settings;
pub use context::Context;
pub use crate::core::async_queue::AsyncQueue;
pub use crate::core::commands::{Command, CommandPtr, CommandTarget};
pub use crate::core::synchronizer::Synchronizer;
pub use crate::core::variable::{VarBool, VarPercent, Variable};
pub use runner::Runner;
