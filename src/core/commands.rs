//! Queued commands - opaque units of work executed on the processing thread.
//!
//! Commands are built by producers (poll tick, engine callbacks) and run later
//! by [`AsyncQueue::flush`](super::async_queue::AsyncQueue::flush). The bodies
//! delegate to a [`CommandTarget`] supplied by the application.

use std::fmt;
use std::sync::Arc;

use super::engine::Signal;

/// Name shared by all playlist refresh commands; used for coalescing.
pub const NOTIFY_PLAYLIST: &str = "notify playlist";

/// Unit of work placed in the async queue.
pub trait Command: Send + Sync {
    /// De-duplication key. `None` means the command is never coalesced.
    fn name(&self) -> Option<&str>;

    /// Run the command. Called once, on the processing thread.
    fn execute(&self) -> anyhow::Result<()>;
}

/// Reference-counted command payload.
pub type CommandPtr = Arc<dyn Command>;

/// Application side executor for built-in commands.
///
/// Implemented by the presentation layer; called only from the thread that
/// drains the queue.
pub trait CommandTarget: Send + Sync {
    /// Shut the application down.
    fn quit(&self) -> anyhow::Result<()>;

    /// Re-render the playlist. `change` is the most recent reason only,
    /// earlier reasons are lost when refreshes coalesce.
    fn notify_playlist(&self, change: PlaylistChange) -> anyhow::Result<()>;
}

/// Why a playlist refresh was requested.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PlaylistChange {
    /// Interface state changed
    Interface,
    /// Current played item changed
    CurrentItem,
    /// An item's metadata changed
    ItemMetadata,
}

impl From<Signal> for PlaylistChange {
    fn from(signal: Signal) -> Self {
        match signal {
            Signal::IntfChange => PlaylistChange::Interface,
            Signal::PlaylistCurrent => PlaylistChange::CurrentItem,
            Signal::ItemChange => PlaylistChange::ItemMetadata,
        }
    }
}

impl fmt::Display for PlaylistChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistChange::Interface => write!(f, "interface"),
            PlaylistChange::CurrentItem => write!(f, "current item"),
            PlaylistChange::ItemMetadata => write!(f, "item metadata"),
        }
    }
}

/// Request application shutdown. Never de-duplicated.
pub struct QuitCommand {
    target: Arc<dyn CommandTarget>,
}

impl QuitCommand {
    pub fn new(target: Arc<dyn CommandTarget>) -> Self {
        Self { target }
    }
}

impl Command for QuitCommand {
    fn name(&self) -> Option<&str> {
        None
    }

    fn execute(&self) -> anyhow::Result<()> {
        self.target.quit()
    }
}

/// Refresh the playlist view.
pub struct NotifyPlaylistCommand {
    target: Arc<dyn CommandTarget>,
    change: PlaylistChange,
}

impl NotifyPlaylistCommand {
    pub fn new(target: Arc<dyn CommandTarget>, change: PlaylistChange) -> Self {
        Self { target, change }
    }

    pub fn change(&self) -> PlaylistChange {
        self.change
    }
}

impl Command for NotifyPlaylistCommand {
    fn name(&self) -> Option<&str> {
        Some(NOTIFY_PLAYLIST)
    }

    fn execute(&self) -> anyhow::Result<()> {
        self.target.notify_playlist(self.change)
    }
}
