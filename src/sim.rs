//! In-process simulated engine.
//!
//! Implements the engine contracts with plain atomics so the demo binary and
//! the tests can drive every state transition by hand: start/kill inputs,
//! change volume and playlist status, fire signals from arbitrary threads.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use log::{debug, trace};

use crate::core::engine::{Engine, Input, Notifier, PlaylistStatus, Signal, SignalHandler, SignalValue};

/// Volume scale used by the simulated output.
pub const SIM_VOLUME_MAX: u32 = 1024;

/// Simulated playing input.
#[derive(Debug)]
pub struct SimInput {
    dead: AtomicBool,
    dying: AtomicBool,
    seekable: AtomicBool,
    position: AtomicU32, // f32 bits
}

impl SimInput {
    pub fn new(seekable: bool) -> Self {
        Self {
            dead: AtomicBool::new(false),
            dying: AtomicBool::new(false),
            seekable: AtomicBool::new(seekable),
            position: AtomicU32::new(0.0f32.to_bits()),
        }
    }

    pub fn set_position(&self, pos: f32) {
        self.position.store(pos.to_bits(), Ordering::Relaxed);
    }

    pub fn set_seekable(&self, seekable: bool) {
        self.seekable.store(seekable, Ordering::Relaxed);
    }

    pub fn set_dying(&self, dying: bool) {
        self.dying.store(dying, Ordering::Relaxed);
    }

    pub fn set_dead(&self) {
        self.dead.store(true, Ordering::Relaxed);
    }
}

impl Input for SimInput {
    fn is_dead(&self) -> bool {
        self.dead.load(Ordering::Relaxed)
    }

    fn is_dying(&self) -> bool {
        self.dying.load(Ordering::Relaxed)
    }

    fn is_seekable(&self) -> bool {
        self.seekable.load(Ordering::Relaxed)
    }

    fn position(&self) -> f32 {
        f32::from_bits(self.position.load(Ordering::Relaxed))
    }
}

#[derive(Debug, Default)]
struct SimState {
    volume: Option<u32>,
    input: Option<Arc<SimInput>>,
    status: PlaylistStatus,
}

/// Simulated engine with reference accounting for acquired inputs.
#[derive(Debug)]
pub struct SimEngine {
    state: Mutex<SimState>,
    dying: AtomicBool,
    volume_max: u32,
    acquired: AtomicUsize,
    released: AtomicUsize,
}

impl Default for SimEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SimEngine {
    pub fn new() -> Self {
        Self::with_volume_max(SIM_VOLUME_MAX)
    }

    pub fn with_volume_max(volume_max: u32) -> Self {
        Self {
            state: Mutex::new(SimState {
                volume: Some(0),
                ..Default::default()
            }),
            dying: AtomicBool::new(false),
            volume_max,
            acquired: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn set_dying(&self, dying: bool) {
        self.dying.store(dying, Ordering::Relaxed);
    }

    pub fn set_volume(&self, volume: Option<u32>) {
        self.state().volume = volume;
    }

    pub fn set_status(&self, status: PlaylistStatus) {
        self.state().status = status;
    }

    /// Start playing a new input and return it for further scripting.
    pub fn start_input(&self, seekable: bool) -> Arc<SimInput> {
        let input = Arc::new(SimInput::new(seekable));
        self.state().input = Some(Arc::clone(&input));
        debug!("SimEngine: input started (seekable: {})", seekable);
        input
    }

    /// Mark the current input dead and detach it from the engine.
    pub fn kill_input(&self) {
        if let Some(input) = self.state().input.take() {
            input.set_dead();
            debug!("SimEngine: input killed");
        }
    }

    /// References handed out by `find_input`.
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// References returned through `release_input`.
    pub fn released(&self) -> usize {
        self.released.load(Ordering::SeqCst)
    }

    /// References currently held by callers.
    pub fn outstanding(&self) -> usize {
        self.acquired() - self.released()
    }
}

impl Engine for SimEngine {
    fn is_dying(&self) -> bool {
        self.dying.load(Ordering::Relaxed)
    }

    fn volume(&self) -> Option<u32> {
        self.state().volume
    }

    fn volume_max(&self) -> u32 {
        self.volume_max
    }

    fn find_input(&self) -> Option<Arc<dyn Input>> {
        let input = self.state().input.clone()?;
        self.acquired.fetch_add(1, Ordering::SeqCst);
        trace!("SimEngine: input acquired");
        Some(input)
    }

    fn release_input(&self, _input: &dyn Input) {
        let released = self.released.fetch_add(1, Ordering::SeqCst) + 1;
        assert!(
            released <= self.acquired(),
            "SimEngine: input released more times than acquired"
        );
        trace!("SimEngine: input released");
    }

    fn playlist_status(&self) -> PlaylistStatus {
        self.state().status
    }
}

/// Simulated notification registrar.
#[derive(Default)]
pub struct SimNotifier {
    handlers: Mutex<HashMap<Signal, Vec<Arc<dyn SignalHandler>>>>,
}

impl SimNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `signal` to every registered handler on the calling thread.
    /// Returns the first handler error, after all handlers ran.
    pub fn fire(&self, signal: Signal, old: SignalValue, new: SignalValue) -> anyhow::Result<()> {
        // Snapshot so handlers may (un)register without deadlocking
        let handlers = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&signal)
            .cloned()
            .unwrap_or_default();

        trace!("SimNotifier: {} -> {} handler(s)", signal, handlers.len());
        let mut result = Ok(());
        for handler in handlers {
            if let Err(e) = handler.on_signal(signal, &old, &new) {
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    pub fn handler_count(&self, signal: Signal) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&signal)
            .map(|v| v.len())
            .unwrap_or(0)
    }
}

impl Notifier for SimNotifier {
    fn add_callback(&self, signal: Signal, handler: Arc<dyn SignalHandler>) {
        self.handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .entry(signal)
            .or_default()
            .push(handler);
    }

    fn del_callback(&self, signal: Signal, handler: &Arc<dyn SignalHandler>) {
        let target = Arc::as_ptr(handler) as *const ();
        if let Some(list) = self
            .handlers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get_mut(&signal)
        {
            list.retain(|h| Arc::as_ptr(h) as *const () != target);
        }
    }
}
