//! Bridge context - owns the queue, the synchronizer and the signal hookup.
//!
//! Replaces process-wide singletons with one explicit object. Construction
//! wires everything; drop tears down in a fixed order:
//! 1. unregister the event bridge (no more producers from engine threads)
//! 2. drop the synchronizer (releases any held input)
//! 3. drop the queue (pending commands are discarded unrun)

use std::sync::Arc;

use log::{debug, info};

use crate::config::Settings;
use crate::core::async_queue::AsyncQueue;
use crate::core::commands::CommandTarget;
use crate::core::engine::{Engine, Notifier, SignalHandler};
use crate::core::event_bridge::EventBridge;
use crate::core::synchronizer::{InputState, SyncVars, Synchronizer};

/// Everything one presentation front end needs to observe an engine.
pub struct Context {
    notifier: Arc<dyn Notifier>,
    bridge: Arc<dyn SignalHandler>,
    synchronizer: Synchronizer,
    queue: Arc<AsyncQueue>,
    settings: Settings,
}

impl Context {
    pub fn new(
        engine: Arc<dyn Engine>,
        notifier: Arc<dyn Notifier>,
        target: Arc<dyn CommandTarget>,
        settings: Settings,
    ) -> Self {
        let queue = Arc::new(AsyncQueue::new(settings.queue_warn_len));
        let synchronizer = Synchronizer::new(engine, Arc::clone(&queue), Arc::clone(&target));

        let bridge: Arc<dyn SignalHandler> = Arc::new(EventBridge::new(Arc::clone(&queue), target));
        EventBridge::register(&bridge, &*notifier);

        info!("Context ready (poll every {} ms)", settings.poll_interval_ms);
        Self {
            notifier,
            bridge,
            synchronizer,
            queue,
            settings,
        }
    }

    /// Run one poll tick. Must be called on the processing thread.
    pub fn tick(&mut self) {
        self.synchronizer.manage();
    }

    /// Execute every pending command. Must be called on the processing thread.
    pub fn drain(&self) -> usize {
        self.queue.flush()
    }

    pub fn queue(&self) -> &Arc<AsyncQueue> {
        &self.queue
    }

    pub fn vars(&self) -> &SyncVars {
        self.synchronizer.vars()
    }

    pub fn vars_mut(&mut self) -> &mut SyncVars {
        self.synchronizer.vars_mut()
    }

    pub fn input_state(&self) -> InputState {
        self.synchronizer.input_state()
    }

    pub fn ticks(&self) -> u64 {
        self.synchronizer.ticks()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        EventBridge::unregister(&self.bridge, &*self.notifier);
        let pending = self.queue.len();
        if pending > 0 {
            debug!("Context dropped with {} pending command(s)", pending);
        }
        // Fields drop next in declaration order: synchronizer, then queue
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::tests::RecordingTarget;
    use crate::core::commands::PlaylistChange;
    use crate::core::engine::{PlaylistStatus, Signal, SignalValue};
    use crate::sim::{SimEngine, SimNotifier, SIM_VOLUME_MAX};

    fn context() -> (Context, Arc<SimEngine>, Arc<SimNotifier>, Arc<RecordingTarget>) {
        let engine = Arc::new(SimEngine::new());
        let notifier = Arc::new(SimNotifier::new());
        let recorder = Arc::new(RecordingTarget::default());
        let ctx = Context::new(engine.clone(), notifier.clone(), recorder.clone(), Settings::default());
        (ctx, engine, notifier, recorder)
    }

    #[test]
    fn test_signals_reach_target_after_drain() {
        let (ctx, _, notifier, recorder) = context();
        notifier.fire(Signal::PlaylistCurrent, SignalValue::Int(0), SignalValue::Int(1)).unwrap();
        notifier.fire(Signal::PlaylistCurrent, SignalValue::Int(1), SignalValue::Int(2)).unwrap();
        notifier.fire(Signal::PlaylistCurrent, SignalValue::Int(2), SignalValue::Int(3)).unwrap();

        assert_eq!(ctx.queue().len(), 1);
        assert_eq!(ctx.drain(), 1);
        assert_eq!(*recorder.refreshes.lock().unwrap(), vec![PlaylistChange::CurrentItem]);
    }

    #[test]
    fn test_tick_and_drain_quit() {
        let (mut ctx, engine, _, recorder) = context();
        engine.set_dying(true);
        ctx.tick();
        assert_eq!(ctx.queue().len(), 1);
        ctx.drain();
        assert_eq!(*recorder.quits.lock().unwrap(), 1);
        assert!(ctx.queue().is_empty());
    }

    #[test]
    fn test_tick_publishes_vars() {
        let (mut ctx, engine, _, _) = context();
        let input = engine.start_input(true);
        input.set_position(0.25);
        engine.set_status(PlaylistStatus::Running);
        engine.set_volume(Some(SIM_VOLUME_MAX / 2));

        ctx.tick();
        assert_eq!(ctx.input_state(), InputState::Live);
        assert!(ctx.vars().playing.get());
        assert!((ctx.vars().volume.get() - 0.5).abs() < f64::EPSILON);
        assert_eq!(ctx.ticks(), 1);
    }

    #[test]
    fn test_drop_unregisters_and_releases() {
        let (mut ctx, engine, notifier, _) = context();
        engine.start_input(true);
        ctx.tick();
        assert_eq!(engine.outstanding(), 1);
        for signal in Signal::ALL {
            assert_eq!(notifier.handler_count(signal), 1);
        }

        drop(ctx);
        assert_eq!(engine.outstanding(), 0);
        for signal in Signal::ALL {
            assert_eq!(notifier.handler_count(signal), 0);
        }
        // Late signals have nowhere to go and do not panic
        notifier.fire(Signal::ItemChange, SignalValue::Empty, SignalValue::Empty).unwrap();
    }
}
