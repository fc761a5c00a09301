//! Observable variables - typed state cells the presentation layer watches.
//!
//! A variable holds one value plus an ordered list of observers:
//! - `set(value, true)` stores a changed value and calls observers synchronously
//! - `set(value, false)` stores it silently (high-frequency writes like time)
//! - `notify()` re-announces the current value on explicit request
//!
//! Observers fire in insertion order. Writing an equal value does nothing.
//! Variables are owned by a single processing thread and carry no lock.

use log::trace;

/// Observer callback, receives `(old, new)`.
type Observer<T> = Box<dyn FnMut(&T, &T) + Send>;

/// Handle returned by [`Variable::add_observer`], used to detach later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Typed value holder with change notification.
pub struct Variable<T> {
    name: &'static str,
    value: T,
    dirty: bool,
    observers: Vec<(ObserverId, Observer<T>)>,
    next_id: u64,
}

/// Boolean variable (playing, seekable-playing).
pub type VarBool = Variable<bool>;

/// Fraction variable (time, volume). Usually in [0, 1] but not clamped.
pub type VarPercent = Variable<f64>;

impl<T: Clone + PartialEq> Variable<T> {
    pub fn new(name: &'static str, value: T) -> Self {
        Self {
            name,
            value,
            dirty: false,
            observers: Vec::new(),
            next_id: 0,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Current value, no side effects.
    pub fn get(&self) -> T {
        self.value.clone()
    }

    /// Store `value`. Observers are called only when the value changed and
    /// `notify` is true; a suppressed write still marks the variable dirty.
    pub fn set(&mut self, value: T, notify: bool) {
        if self.value == value {
            return;
        }
        let old = std::mem::replace(&mut self.value, value);
        self.dirty = true;
        if notify {
            self.dispatch(&old);
        }
    }

    /// Call every observer with the current value as both old and new.
    pub fn notify(&mut self) {
        let current = self.value.clone();
        self.dispatch(&current);
    }

    fn dispatch(&mut self, old: &T) {
        trace!("{}: notifying {} observer(s)", self.name, self.observers.len());
        for (_, observer) in self.observers.iter_mut() {
            observer(old, &self.value);
        }
    }

    /// Subscribe to notified writes.
    pub fn add_observer<F>(&mut self, observer: F) -> ObserverId
    where
        F: FnMut(&T, &T) + Send + 'static,
    {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Detach an observer. Returns false if it was not registered.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(oid, _)| *oid != id);
        self.observers.len() != before
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// True if the value changed since the last `clear_dirty()`.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Variable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Variable")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("dirty", &self.dirty)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_set_notifies_with_old_and_new() {
        let mut var = VarPercent::new("time", 0.0);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = Arc::clone(&seen);
        var.add_observer(move |old, new| s.lock().unwrap().push((*old, *new)));

        var.set(0.25, true);
        var.set(0.5, true);

        assert_eq!(*seen.lock().unwrap(), vec![(0.0, 0.25), (0.25, 0.5)]);
        assert_eq!(var.get(), 0.5);
    }

    #[test]
    fn test_suppressed_write_stores_silently() {
        let mut var = VarBool::new("playing", false);
        let calls = Arc::new(Mutex::new(0));
        let c = Arc::clone(&calls);
        var.add_observer(move |_, _| *c.lock().unwrap() += 1);

        var.set(true, false);
        assert!(var.get());
        assert!(var.is_dirty());
        assert_eq!(*calls.lock().unwrap(), 0);
    }

    #[test]
    fn test_unchanged_write_is_noop() {
        let mut var = VarBool::new("playing", true);
        let calls = Arc::new(Mutex::new(0));
        let c = Arc::clone(&calls);
        var.add_observer(move |_, _| *c.lock().unwrap() += 1);

        var.set(true, true);
        assert_eq!(*calls.lock().unwrap(), 0);
        assert!(!var.is_dirty());

        // Explicit request re-announces the same value
        var.notify();
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn test_observers_fire_in_insertion_order() {
        let mut var = VarBool::new("seekable_playing", false);
        let order = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let o = Arc::clone(&order);
            var.add_observer(move |_, _| o.lock().unwrap().push(i));
        }
        var.set(true, true);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn test_remove_observer() {
        let mut var = VarPercent::new("volume", 0.0);
        let calls = Arc::new(Mutex::new(0));
        let c = Arc::clone(&calls);
        let id = var.add_observer(move |_, _| *c.lock().unwrap() += 1);

        var.set(0.1, true);
        assert!(var.remove_observer(id));
        assert!(!var.remove_observer(id));
        var.set(0.2, true);

        assert_eq!(*calls.lock().unwrap(), 1);
        assert_eq!(var.observer_count(), 0);
    }

    #[test]
    fn test_out_of_range_passes_through() {
        let mut var = VarPercent::new("time", 0.0);
        var.set(1.5, false);
        assert_eq!(var.get(), 1.5);
        var.clear_dirty();
        assert!(!var.is_dirty());
    }
}
