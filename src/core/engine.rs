//! Engine-facing contracts.
//!
//! The playback engine is an external collaborator. These traits describe the
//! state accessors the synchronizer polls and the notification registrar the
//! event bridge hooks into. Implementations must be callable from the
//! processing thread; notifier callbacks may arrive on any thread.

use std::fmt;
use std::sync::Arc;

/// Playlist run status as reported by the engine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum PlaylistStatus {
    Running,
    Paused,
    #[default]
    Stopped,
}

/// Engine state accessors.
pub trait Engine: Send + Sync {
    /// Global termination flag: the engine wants the application to quit.
    fn is_dying(&self) -> bool;

    /// Current output volume, or `None` if no output is available.
    fn volume(&self) -> Option<u32>;

    /// Largest value `volume()` can return.
    fn volume_max(&self) -> u32;

    /// Look up the current playing input anywhere in the engine.
    ///
    /// A returned input is an acquired reference; the caller must hand it back
    /// through [`Engine::release_input`] exactly once.
    fn find_input(&self) -> Option<Arc<dyn Input>>;

    /// Release a reference obtained from [`Engine::find_input`].
    fn release_input(&self, input: &dyn Input);

    fn playlist_status(&self) -> PlaylistStatus;
}

/// The engine's currently playing input.
pub trait Input: Send + Sync {
    /// The input has terminated; references to it should be dropped.
    fn is_dead(&self) -> bool;

    /// The input is shutting down but not yet dead.
    fn is_dying(&self) -> bool;

    fn is_seekable(&self) -> bool;

    /// Normalized position in [0, 1]. Negative means unknown.
    fn position(&self) -> f32;
}

/// Engine signals the event bridge listens to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// Interface state changed
    IntfChange,
    /// Current played item changed
    PlaylistCurrent,
    /// An item's metadata changed
    ItemChange,
}

impl Signal {
    pub const ALL: [Signal; 3] = [Signal::IntfChange, Signal::PlaylistCurrent, Signal::ItemChange];

    /// Engine-side variable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::IntfChange => "intf-change",
            Signal::PlaylistCurrent => "playlist-current",
            Signal::ItemChange => "item-change",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Old/new payload delivered with a signal.
#[derive(Clone, Debug, PartialEq, Default)]
pub enum SignalValue {
    #[default]
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// Receiver of engine signals. May be invoked from any engine thread.
pub trait SignalHandler: Send + Sync {
    /// Handle one signal. The engine treats `Err` as a failed callback.
    fn on_signal(&self, signal: Signal, old: &SignalValue, new: &SignalValue) -> anyhow::Result<()>;
}

/// Engine notification registrar.
pub trait Notifier: Send + Sync {
    fn add_callback(&self, signal: Signal, handler: Arc<dyn SignalHandler>);

    /// Detach a handler previously added for `signal` (matched by pointer).
    fn del_callback(&self, signal: Signal, handler: &Arc<dyn SignalHandler>);
}
