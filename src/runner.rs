//! Processing loop - timer driver plus queue drain on one thread.
//!
//! The loop waits on three channels:
//! - a `crossbeam_channel::tick` firing every poll interval -> tick + drain
//! - the queue wake-up (engine callbacks pushed work) -> drain
//! - the stop channel (message or disconnect) -> return
//!
//! Ticks never overlap: the next one starts only after the previous tick and
//! drain returned. A stop request lets the in-flight tick finish.

use std::time::Duration;

use crossbeam_channel::{select, Receiver};
use log::{debug, info};

use crate::context::Context;

/// Summary of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub ticks: u64,
    pub commands: usize,
}

/// Drives a [`Context`] on the calling thread.
pub struct Runner {
    interval: Duration,
}

impl Runner {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Build from the context's own settings.
    pub fn for_context(ctx: &Context) -> Self {
        Self::new(Duration::from_millis(ctx.settings().poll_interval_ms))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run until `stop` receives a message or all its senders are dropped.
    pub fn run(&self, ctx: &mut Context, stop: &Receiver<()>) -> RunStats {
        let ticker = crossbeam_channel::tick(self.interval);
        let wakeup = ctx.queue().wakeup().clone();
        let mut stats = RunStats::default();

        info!("Processing loop started ({:?} period)", self.interval);
        loop {
            select! {
                recv(ticker) -> _ => {
                    ctx.tick();
                    stats.ticks += 1;
                    stats.commands += ctx.drain();
                }
                recv(wakeup) -> _ => {
                    stats.commands += ctx.drain();
                }
                recv(stop) -> _ => {
                    debug!("Processing loop stop requested");
                    break;
                }
            }
        }
        // Work queued by the last tick still runs
        stats.commands += ctx.drain();
        info!(
            "Processing loop stopped: {} ticks, {} commands",
            stats.ticks, stats.commands
        );
        stats
    }
}
