//! Async command queue - the only structure shared across threads.
//!
//! Architecture:
//! - Producers (engine callback threads, the poll tick) call push/remove/replace
//! - One consumer thread calls flush() and runs commands strictly FIFO
//! - Commands run outside the lock, so a command may push follow-up work
//!
//! `replace()` does remove-by-name + push under one lock acquisition. Two
//! producers racing on the same name always leave exactly one pending entry.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use std::thread::{self, ThreadId};

use crossbeam_channel::{Receiver, Sender};
use log::{error, trace, warn};

use super::commands::CommandPtr;

/// Default backlog size that triggers a warning.
pub const DEFAULT_WARN_LEN: usize = 64;

/// FIFO of pending commands with name-based removal and single-consumer drain.
pub struct AsyncQueue {
    pending: Mutex<VecDeque<CommandPtr>>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    flushing: AtomicBool,
    consumer: OnceLock<ThreadId>,
    warn_len: usize,
}

impl Default for AsyncQueue {
    fn default() -> Self {
        Self::new(DEFAULT_WARN_LEN)
    }
}

impl AsyncQueue {
    /// Create an empty queue. A backlog longer than `warn_len` is logged.
    pub fn new(warn_len: usize) -> Self {
        // Capacity 1: any number of pushes collapse into one pending wake-up
        let (wake_tx, wake_rx) = crossbeam_channel::bounded(1);
        Self {
            pending: Mutex::new(VecDeque::new()),
            wake_tx,
            wake_rx,
            flushing: AtomicBool::new(false),
            consumer: OnceLock::new(),
            warn_len,
        }
    }

    /// Append a command to the tail. Callable from any thread.
    pub fn push(&self, cmd: CommandPtr) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        pending.push_back(cmd);
        self.after_push(pending.len());
    }

    /// Drop every pending command named `name`. Returns how many were removed.
    pub fn remove(&self, name: &str) -> usize {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let removed = Self::remove_locked(&mut pending, name);
        if removed > 0 {
            trace!("AsyncQueue: removed {} pending '{}'", removed, name);
        }
        removed
    }

    /// Atomically drop pending commands sharing `cmd`'s name, then append `cmd`.
    /// Unnamed commands are simply pushed.
    pub fn replace(&self, cmd: CommandPtr) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(name) = cmd.name() {
            let removed = Self::remove_locked(&mut pending, name);
            if removed > 0 {
                trace!("AsyncQueue: coalesced {} pending '{}'", removed, name);
            }
        }
        pending.push_back(cmd);
        self.after_push(pending.len());
    }

    fn remove_locked(pending: &mut VecDeque<CommandPtr>, name: &str) -> usize {
        let before = pending.len();
        pending.retain(|cmd| cmd.name() != Some(name));
        before - pending.len()
    }

    fn after_push(&self, len: usize) {
        if len > self.warn_len {
            warn!("AsyncQueue backlog: {} pending commands", len);
        }
        // Full means a wake-up is already pending
        let _ = self.wake_tx.try_send(());
    }

    /// Execute pending commands in FIFO order until the queue is empty.
    ///
    /// Failed or panicking commands are logged and skipped. A nested call from
    /// inside a running command returns 0 immediately; the outer loop picks up
    /// anything the command pushed. Returns the number of commands run.
    pub fn flush(&self) -> usize {
        let me = thread::current().id();
        let consumer = *self.consumer.get_or_init(|| me);
        debug_assert_eq!(consumer, me, "AsyncQueue flushed from a second thread");

        if self.flushing.swap(true, Ordering::Acquire) {
            return 0;
        }
        let _guard = FlushGuard(&self.flushing);

        let mut executed = 0;
        loop {
            // Pop under the lock, run without it
            let next = self.pending.lock().unwrap_or_else(|e| e.into_inner()).pop_front();
            let Some(cmd) = next else { break };
            let label = cmd.name().unwrap_or("<unnamed>").to_string();

            match panic::catch_unwind(AssertUnwindSafe(|| cmd.execute())) {
                Ok(Ok(())) => trace!("AsyncQueue: executed '{}'", label),
                Ok(Err(e)) => error!("Command '{}' failed: {:#}", label, e),
                Err(payload) => error!("Command '{}' panicked: {}", label, panic_message(payload.as_ref())),
            }
            executed += 1;
        }
        executed
    }

    /// Receiver that becomes ready after a push. Used by the processing loop.
    pub fn wakeup(&self) -> &Receiver<()> {
        &self.wake_rx
    }

    pub fn len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of pending commands in queue order (`None` for unnamed ones).
    pub fn pending_names(&self) -> Vec<Option<String>> {
        self.pending
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|cmd| cmd.name().map(str::to_string))
            .collect()
    }
}

impl std::fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncQueue")
            .field("pending", &self.len())
            .field("flushing", &self.flushing.load(Ordering::Relaxed))
            .finish()
    }
}

/// Clears the re-entrancy flag even if the flush loop unwinds.
struct FlushGuard<'a>(&'a AtomicBool);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
