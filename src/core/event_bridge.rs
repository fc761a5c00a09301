//! Event bridge - turns engine signals into queued playlist refreshes.
//!
//! Every signal, whatever its payload, produces one fresh
//! [`NotifyPlaylistCommand`] that replaces any refresh still pending. A burst
//! of signals therefore leaves at most one refresh in the queue.

use std::sync::Arc;

use log::trace;

use super::async_queue::AsyncQueue;
use super::commands::{CommandTarget, NotifyPlaylistCommand};
use super::engine::{Notifier, Signal, SignalHandler, SignalValue};

/// Signal handler registered once per playlist-related engine signal.
pub struct EventBridge {
    queue: Arc<AsyncQueue>,
    target: Arc<dyn CommandTarget>,
}

impl EventBridge {
    pub fn new(queue: Arc<AsyncQueue>, target: Arc<dyn CommandTarget>) -> Self {
        Self { queue, target }
    }

    /// Attach `bridge` to every signal in [`Signal::ALL`].
    pub fn register(bridge: &Arc<dyn SignalHandler>, notifier: &dyn Notifier) {
        for signal in Signal::ALL {
            notifier.add_callback(signal, Arc::clone(bridge));
        }
    }

    /// Detach `bridge` from every signal in [`Signal::ALL`].
    pub fn unregister(bridge: &Arc<dyn SignalHandler>, notifier: &dyn Notifier) {
        for signal in Signal::ALL {
            notifier.del_callback(signal, bridge);
        }
    }
}

impl SignalHandler for EventBridge {
    fn on_signal(&self, signal: Signal, _old: &SignalValue, _new: &SignalValue) -> anyhow::Result<()> {
        trace!("EventBridge: {} -> playlist refresh", signal);
        let cmd = NotifyPlaylistCommand::new(Arc::clone(&self.target), signal.into());
        self.queue.replace(Arc::new(cmd));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::commands::tests::RecordingTarget;
    use crate::core::commands::{PlaylistChange, NOTIFY_PLAYLIST};
    use crate::sim::SimNotifier;
    use std::thread;

    fn setup() -> (Arc<AsyncQueue>, Arc<RecordingTarget>, Arc<dyn SignalHandler>, SimNotifier) {
        let queue = Arc::new(AsyncQueue::default());
        let recorder = Arc::new(RecordingTarget::default());
        let bridge: Arc<dyn SignalHandler> =
            Arc::new(EventBridge::new(Arc::clone(&queue), recorder.clone()));
        let notifier = SimNotifier::new();
        EventBridge::register(&bridge, &notifier);
        (queue, recorder, bridge, notifier)
    }

    #[test]
    fn test_register_all_signals() {
        let (_, _, bridge, notifier) = setup();
        for signal in Signal::ALL {
            assert_eq!(notifier.handler_count(signal), 1);
        }
        EventBridge::unregister(&bridge, &notifier);
        for signal in Signal::ALL {
            assert_eq!(notifier.handler_count(signal), 0);
        }
    }

    #[test]
    fn test_every_signal_enqueues() {
        let (queue, _, _, notifier) = setup();
        notifier.fire(Signal::IntfChange, SignalValue::Empty, SignalValue::Bool(true)).unwrap();
        assert_eq!(queue.pending_names(), vec![Some(NOTIFY_PLAYLIST.to_string())]);
    }

    #[test]
    fn test_burst_coalesces_to_one_refresh() {
        let (queue, recorder, _, notifier) = setup();
        for i in 0..3 {
            notifier
                .fire(Signal::ItemChange, SignalValue::Int(i), SignalValue::Int(i + 1))
                .unwrap();
        }
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.flush(), 1);
        assert_eq!(*recorder.refreshes.lock().unwrap(), vec![PlaylistChange::ItemMetadata]);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_mixed_signals_keep_latest_reason() {
        let (queue, recorder, _, notifier) = setup();
        notifier.fire(Signal::IntfChange, SignalValue::Empty, SignalValue::Empty).unwrap();
        notifier.fire(Signal::ItemChange, SignalValue::Empty, SignalValue::Empty).unwrap();
        notifier.fire(Signal::PlaylistCurrent, SignalValue::Int(1), SignalValue::Int(2)).unwrap();

        queue.flush();
        assert_eq!(*recorder.refreshes.lock().unwrap(), vec![PlaylistChange::CurrentItem]);
    }

    #[test]
    fn test_refresh_does_not_displace_other_commands() {
        let (queue, recorder, _, notifier) = setup();
        let target: Arc<dyn CommandTarget> = recorder.clone();
        queue.push(Arc::new(crate::core::commands::QuitCommand::new(target)));
        notifier.fire(Signal::ItemChange, SignalValue::Empty, SignalValue::Empty).unwrap();
        notifier.fire(Signal::ItemChange, SignalValue::Empty, SignalValue::Empty).unwrap();

        assert_eq!(queue.pending_names(), vec![None, Some(NOTIFY_PLAYLIST.to_string())]);
    }

    #[test]
    fn test_signals_from_many_threads() {
        let (queue, recorder, _, notifier) = setup();
        thread::scope(|s| {
            for signal in Signal::ALL {
                let notifier = &notifier;
                s.spawn(move || {
                    for _ in 0..50 {
                        notifier.fire(signal, SignalValue::Empty, SignalValue::Empty).unwrap();
                    }
                });
            }
        });

        assert_eq!(queue.len(), 1);
        queue.flush();
        assert_eq!(recorder.refreshes.lock().unwrap().len(), 1);
    }
}
