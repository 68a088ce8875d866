use crate::lock::Mutex;
use crate::set::ConcurrentSet;
use crate::table::Table;
use crate::util::hash_u64;
use crate::DEFAULT_LOAD_FACTOR;
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Coarse-grained engine: one mutex guards the whole table and the size
/// counter, held for the full duration of every operation, resize included.
///
/// Every pair of operations is serialized by the same lock, which makes this
/// engine trivially linearizable and trivially contended: its concurrency
/// degree is one. It exists as the simplest correct concurrent baseline.
///
/// # Examples
///
/// ```
/// use shardset::CoarseSet;
///
/// let seen = CoarseSet::new(16);
/// assert!(seen.insert("first"));
/// assert!(seen.contains("first"));
/// ```
pub struct CoarseSet<T, S = RandomState> {
    inner: Mutex<Inner<T>>,
    hasher: S,
    load_factor: usize,
}

struct Inner<T> {
    table: Table<T>,
    len: usize,
}

impl<T: Eq + Hash> CoarseSet<T, RandomState> {
    /// Creates a set with `initial_capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, RandomState::new())
    }
}

impl<T: Eq + Hash, S: BuildHasher> CoarseSet<T, S> {
    pub fn with_hasher(initial_capacity: usize, hasher: S) -> Self {
        Self::with_load_factor(initial_capacity, DEFAULT_LOAD_FACTOR, hasher)
    }

    /// Creates a set that grows once the average chain length exceeds
    /// `load_factor`.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` or `load_factor` is zero.
    pub fn with_load_factor(initial_capacity: usize, load_factor: usize, hasher: S) -> Self {
        assert!(initial_capacity > 0, "initial capacity must be at least one bucket");
        assert!(load_factor > 0, "load factor must be at least one element per bucket");

        Self {
            inner: Mutex::new(Inner {
                table: Table::with_capacity(initial_capacity),
                len: 0,
            }),
            hasher,
            load_factor,
        }
    }

    pub fn insert(&self, elem: T) -> bool {
        let hash = hash_u64(&self.hasher, &elem);
        let mut inner = self.inner.lock();

        if !inner.table.bucket_mut(hash).insert(elem) {
            return false;
        }

        inner.len += 1;
        if inner.len / inner.table.capacity() > self.load_factor {
            // The sole lock is already held, so the resize runs in place.
            let hasher = &self.hasher;
            inner.table.grow(|elem| hash_u64(hasher, elem));
        }

        true
    }

    pub fn remove<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let hash = hash_u64(&self.hasher, elem);
        let mut inner = self.inner.lock();

        if inner.table.bucket_mut(hash).remove(elem) {
            inner.len -= 1;
            true
        } else {
            false
        }
    }

    pub fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let hash = hash_u64(&self.hasher, elem);
        self.inner.lock().table.bucket_mut(hash).contains(elem)
    }
}

impl<T, S> CoarseSet<T, S> {
    pub fn len(&self) -> usize {
        self.inner.lock().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current bucket count. Always `initial_capacity * 2^k`.
    pub fn capacity(&self) -> usize {
        self.inner.lock().table.capacity()
    }
}

impl<T: Eq + Hash, S: BuildHasher> ConcurrentSet<T> for CoarseSet<T, S> {
    fn insert(&self, elem: T) -> bool {
        CoarseSet::insert(self, elem)
    }

    fn remove<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        CoarseSet::remove(self, elem)
    }

    fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        CoarseSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        CoarseSet::len(self)
    }
}

impl<T, S> fmt::Debug for CoarseSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoarseSet")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::CoarseSet;
    use std::thread;

    #[test]
    fn double_insert_is_idempotent() {
        let set = CoarseSet::new(4);
        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_then_contains() {
        let set = CoarseSet::new(4);
        set.insert("x");
        assert!(set.remove("x"));
        assert!(!set.contains("x"));
    }

    #[test]
    fn concurrent_distinct_inserts() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 500;

        let set = CoarseSet::new(4);

        thread::scope(|scope| {
            for t in 0..THREADS {
                let set = &set;
                scope.spawn(move || {
                    for i in 0..PER_THREAD {
                        assert!(set.insert(t * PER_THREAD + i));
                    }
                });
            }
        });

        assert_eq!(set.len() as u64, THREADS * PER_THREAD);
        for elem in 0..THREADS * PER_THREAD {
            assert!(set.contains(&elem));
        }
    }
}
