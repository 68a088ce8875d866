//! This module deals with allocating thread ids.
//! We aggressively reuse ids and try to keep them as low as possible, so the
//! resize ownership marker only ever stores a small integer.

use once_cell::sync::Lazy;
use parking_lot::Mutex;
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// This structure allocates ids.
/// It is composed of a `limit` integer and a heap of free ids lesser than
/// `limit`. If an allocation is attempted and the heap is empty, we increment
/// `limit` and return the previous value.
struct IdAllocator {
    limit: u64,
    free: BinaryHeap<Reverse<u64>>,
}

impl IdAllocator {
    fn new() -> Self {
        Self {
            limit: 0,
            free: BinaryHeap::new(),
        }
    }

    fn allocate(&mut self) -> u64 {
        self.free.pop().map(|Reverse(id)| id).unwrap_or_else(|| {
            let id = self.limit;
            self.limit += 1;
            id
        })
    }

    fn deallocate(&mut self, id: u64) {
        self.free.push(Reverse(id));
    }
}

static ID_ALLOCATOR: Lazy<Mutex<IdAllocator>> = Lazy::new(|| Mutex::new(IdAllocator::new()));

struct ThreadId(u64);

impl ThreadId {
    fn new() -> Self {
        Self(ID_ALLOCATOR.lock().allocate())
    }
}

/// Drop is implemented here because it's the only clean way to run code when
/// a thread exits.
impl Drop for ThreadId {
    fn drop(&mut self) {
        ID_ALLOCATOR.lock().deallocate(self.0);
    }
}

thread_local! {
    static THREAD_ID: ThreadId = ThreadId::new();
}

pub(crate) fn get() -> u64 {
    THREAD_ID.with(|id| id.0)
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::thread;

    #[test]
    fn stable_within_a_thread() {
        assert_eq!(super::get(), super::get());
    }

    #[test]
    fn distinct_across_live_threads() {
        let mine = super::get();
        let (done_tx, done_rx) = mpsc::channel();
        let (id_tx, id_rx) = mpsc::channel();

        let handle = thread::spawn(move || {
            id_tx.send(super::get()).unwrap();
            // Stay alive until the main thread has compared ids, so ours
            // cannot be recycled early.
            done_rx.recv().unwrap();
        });

        let theirs = id_rx.recv().unwrap();
        assert_ne!(mine, theirs);

        done_tx.send(()).unwrap();
        handle.join().unwrap();
    }
}
