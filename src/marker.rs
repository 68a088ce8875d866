//! The resize ownership marker used by the refinable engine.

use parking_lot::{Condvar, Mutex};

/// Shared `{owner, resizing}` cell recording which thread, if any, currently
/// holds the exclusive right to swap the table.
///
/// The state is only reachable through read and compare-and-set shaped
/// transitions, all atomic with respect to each other: at most one thread is
/// recorded as owner while `resizing` is set. Waiters block on a condition
/// variable keyed on the flag clearing rather than polling it.
pub(crate) struct ResizeMarker {
    state: Mutex<State>,
    cleared: Condvar,
}

#[derive(Clone, Copy)]
struct State {
    owner: Option<u64>,
    resizing: bool,
}

impl ResizeMarker {
    pub(crate) fn new() -> Self {
        Self {
            state: Mutex::new(State {
                owner: None,
                resizing: false,
            }),
            cleared: Condvar::new(),
        }
    }

    /// Attempts the transition `{none, false} -> {me, true}`. Only the thread
    /// that wins this transition may resize.
    pub(crate) fn try_acquire(&self, me: u64) -> bool {
        let mut state = self.state.lock();

        if state.resizing {
            return false;
        }

        *state = State {
            owner: Some(me),
            resizing: true,
        };
        true
    }

    /// Clears the marker and wakes every operation blocked on it. Must only
    /// be called by the current owner.
    pub(crate) fn release(&self, me: u64) {
        let mut state = self.state.lock();

        debug_assert_eq!(state.owner, Some(me));
        *state = State {
            owner: None,
            resizing: false,
        };

        self.cleared.notify_all();
    }

    /// Blocks while a resize by some other thread is in progress. The owner
    /// itself passes straight through.
    pub(crate) fn wait_if_resizing(&self, me: u64) {
        let mut state = self.state.lock();

        while state.resizing && state.owner != Some(me) {
            self.cleared.wait(&mut state);
        }
    }

    /// True when a thread other than `me` currently owns a resize.
    pub(crate) fn is_foreign_resize(&self, me: u64) -> bool {
        let state = self.state.lock();

        state.resizing && state.owner != Some(me)
    }
}

#[cfg(test)]
mod tests {
    use super::ResizeMarker;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn single_owner() {
        let marker = ResizeMarker::new();

        assert!(marker.try_acquire(1));
        assert!(!marker.try_acquire(2));
        assert!(marker.is_foreign_resize(2));
        assert!(!marker.is_foreign_resize(1));

        marker.release(1);
        assert!(marker.try_acquire(2));
        marker.release(2);
    }

    #[test]
    fn wait_blocks_until_release() {
        let marker = Arc::new(ResizeMarker::new());
        let released = Arc::new(AtomicBool::new(false));

        assert!(marker.try_acquire(1));

        let waiter = {
            let marker = Arc::clone(&marker);
            let released = Arc::clone(&released);
            thread::spawn(move || {
                marker.wait_if_resizing(2);
                assert!(released.load(Ordering::SeqCst));
            })
        };

        thread::sleep(std::time::Duration::from_millis(50));
        released.store(true, Ordering::SeqCst);
        marker.release(1);

        waiter.join().unwrap();
    }

    #[test]
    fn owner_is_not_blocked() {
        let marker = ResizeMarker::new();
        assert!(marker.try_acquire(7));
        // Must return immediately rather than deadlocking on our own resize.
        marker.wait_if_resizing(7);
        marker.release(7);
    }
}
