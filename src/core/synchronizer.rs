//! Synchronizer - periodic poll of engine state into observable variables.
//!
//! `manage()` is called every poll interval (100 ms by default) on the
//! processing thread. Each tick runs four steps in fixed order:
//!
//! 1. Quit check: engine termination flag -> push a [`QuitCommand`]
//! 2. Volume refresh: `volume / volume_max` into the volume variable
//! 3. Input maintenance: acquire the current input if none is held, release
//!    it once the engine marks it dead
//! 4. State propagation into time / playing / seekable-playing
//!
//! # Notification policy
//!
//! Time and playing are written every tick with notification suppressed so
//! widgets that drive scrubbing do not jitter. Seekable-playing only changes on
//! play/pause/stop transitions and notifies immediately.
//!
//! # Input handle
//!
//! At most one [`InputHandle`] is held. It is an owning reference: dropping it
//! releases the engine input, which happens on the dead transition and when
//! the synchronizer itself is dropped.

use std::sync::Arc;

use log::{debug, trace};

use super::async_queue::AsyncQueue;
use super::commands::{CommandTarget, QuitCommand};
use super::engine::{Engine, Input, PlaylistStatus};
use super::variable::{VarBool, VarPercent};

/// Default poll period in milliseconds.
pub const POLL_INTERVAL_MS: u64 = 100;

/// Owned reference to the engine's current input, released on drop.
pub struct InputHandle {
    input: Arc<dyn Input>,
    engine: Arc<dyn Engine>,
}

impl InputHandle {
    /// Wrap a reference returned by [`Engine::find_input`].
    pub fn new(input: Arc<dyn Input>, engine: Arc<dyn Engine>) -> Self {
        Self { input, engine }
    }

    pub fn input(&self) -> &dyn Input {
        &*self.input
    }
}

impl Drop for InputHandle {
    fn drop(&mut self) {
        trace!("InputHandle: releasing input");
        self.engine.release_input(&*self.input);
    }
}

/// Whether an input handle is currently held.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputState {
    None,
    Live,
}

/// Variables published by the synchronizer.
#[derive(Debug)]
pub struct SyncVars {
    /// Normalized stream position
    pub time: VarPercent,
    /// Normalized output volume
    pub volume: VarPercent,
    /// Playlist is running
    pub playing: VarBool,
    /// Seekable input is playing or paused
    pub seekable_playing: VarBool,
}

impl Default for SyncVars {
    fn default() -> Self {
        Self {
            time: VarPercent::new("time", 0.0),
            volume: VarPercent::new("volume", 0.0),
            playing: VarBool::new("playing", false),
            seekable_playing: VarBool::new("seekable_playing", false),
        }
    }
}

/// Poll loop body. Lives on the processing thread.
pub struct Synchronizer {
    engine: Arc<dyn Engine>,
    queue: Arc<AsyncQueue>,
    target: Arc<dyn CommandTarget>,
    input: Option<InputHandle>,
    vars: SyncVars,
    ticks: u64,
}

impl Synchronizer {
    pub fn new(engine: Arc<dyn Engine>, queue: Arc<AsyncQueue>, target: Arc<dyn CommandTarget>) -> Self {
        debug!("Synchronizer created");
        Self {
            engine,
            queue,
            target,
            input: None,
            vars: SyncVars::default(),
            ticks: 0,
        }
    }

    pub fn vars(&self) -> &SyncVars {
        &self.vars
    }

    /// Mutable access for subscribing observers.
    pub fn vars_mut(&mut self) -> &mut SyncVars {
        &mut self.vars
    }

    pub fn input_state(&self) -> InputState {
        match self.input {
            Some(_) => InputState::Live,
            None => InputState::None,
        }
    }

    /// Number of completed ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// One poll tick.
    pub fn manage(&mut self) {
        self.check_quit();
        self.refresh_volume();
        self.update_input();
        self.propagate_state();
        self.ticks += 1;
    }

    fn check_quit(&self) {
        // Not coalesced: a duplicate quit is harmless
        if self.engine.is_dying() {
            debug!("Engine is dying, queueing quit");
            self.queue.push(Arc::new(QuitCommand::new(Arc::clone(&self.target))));
        }
    }

    fn refresh_volume(&mut self) {
        let max = self.engine.volume_max();
        let volume = match self.engine.volume() {
            Some(v) if max > 0 => v as f64 / max as f64,
            _ => 0.0,
        };
        self.vars.volume.set(volume, true);
    }

    fn update_input(&mut self) {
        match self.input.as_ref().map(|h| h.input().is_dead()) {
            None => {
                if let Some(input) = self.engine.find_input() {
                    debug!("Synchronizer: input acquired");
                    self.input = Some(InputHandle::new(input, Arc::clone(&self.engine)));
                }
            }
            Some(true) => {
                debug!("Synchronizer: input dead, releasing");
                // Drop releases the engine reference
                self.input = None;
            }
            Some(false) => {}
        }
    }

    fn propagate_state(&mut self) {
        let live = self
            .input
            .as_ref()
            .map(InputHandle::input)
            .filter(|input| !input.is_dying());

        let Some(input) = live else {
            self.vars.playing.set(false, false);
            self.vars.seekable_playing.set(false, true);
            self.vars.time.set(0.0, false);
            return;
        };

        let seekable = input.is_seekable();
        if seekable {
            let pos = input.position();
            if pos >= 0.0 {
                self.vars.time.set(pos as f64, false);
            }
        } else {
            self.vars.time.set(0.0, false);
        }

        let status = self.engine.playlist_status();
        trace!("Synchronizer: status {:?}, seekable {}", status, seekable);
        self.vars.playing.set(status == PlaylistStatus::Running, false);
        self.vars
            .seekable_playing
            .set(seekable && status != PlaylistStatus::Stopped, true);
    }
}

impl Drop for Synchronizer {
    fn drop(&mut self) {
        if self.input.take().is_some() {
            debug!("Synchronizer dropped, input released");
        }
    }
}
