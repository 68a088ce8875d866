use crate::lock::{Mutex, MutexGuard};
use crate::set::ConcurrentSet;
use crate::table::Table;
use crate::util::{hash_u64, SharedValue};
use crate::DEFAULT_LOAD_FACTOR;
use crossbeam_utils::CachePadded;
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

/// Lock-striped engine: a pool of `initial_capacity` mutexes is created once
/// and partitioned over bucket indices by hash.
///
/// Ordinary operations take exactly one stripe, `locks[hash % N]`, and touch
/// the bucket `table[hash % capacity]`. The pool never grows while the table
/// doubles, so after `k` resizes each stripe covers `2^k` buckets: effective
/// concurrency per stripe degrades as the table grows, a deliberate trade of
/// granularity for a bounded number of lock objects. The refinable engine
/// lifts exactly that limitation.
///
/// A resize takes every stripe in ascending index order, which both excludes
/// all other operations and keeps concurrent resizers deadlock free.
///
/// # Examples
///
/// ```
/// use shardset::StripedSet;
///
/// let set = StripedSet::new(16);
/// assert!(set.insert(10));
/// assert!(set.remove(&10));
/// ```
pub struct StripedSet<T, S = RandomState> {
    locks: Box<[CachePadded<Mutex<()>>]>,
    /// Guarded by the stripes: one stripe for bucket access, the whole pool
    /// for replacing the table.
    table: SharedValue<Table<T>>,
    len: AtomicUsize,
    hasher: S,
    load_factor: usize,
}

impl<T: Eq + Hash> StripedSet<T, RandomState> {
    /// Creates a set with `initial_capacity` buckets and as many stripes.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, RandomState::new())
    }
}

impl<T: Eq + Hash, S: BuildHasher> StripedSet<T, S> {
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

        let locks = (0..initial_capacity)
            .map(|_| CachePadded::new(Mutex::new(())))
            .collect();

        Self {
            locks,
            table: SharedValue::new(Table::with_capacity(initial_capacity)),
            len: AtomicUsize::new(0),
            hasher,
            load_factor,
        }
    }

    pub fn insert(&self, elem: T) -> bool {
        let hash = hash_u64(&self.hasher, &elem);
        let overloaded_at = {
            let _stripe = self.stripe(hash);

            // Safety: the stripe serializes every bucket it covers, and the
            // table is only replaced with the whole pool held.
            let table = unsafe { &*self.table.as_ptr() };
            let bucket = unsafe { &mut *table.bucket(hash).as_ptr() };

            if !bucket.insert(elem) {
                return false;
            }

            let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
            if len / table.capacity() > self.load_factor {
                Some(table.capacity())
            } else {
                None
            }
        };

        // The stripe must be released before resizing: the resize re-acquires
        // the full pool, our own stripe included.
        if let Some(capacity) = overloaded_at {
            self.resize(capacity);
        }

        true
    }

    pub fn remove<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let hash = hash_u64(&self.hasher, elem);
        let _stripe = self.stripe(hash);

        // Safety: as in `insert`.
        let table = unsafe { &*self.table.as_ptr() };
        let bucket = unsafe { &mut *table.bucket(hash).as_ptr() };

        if bucket.remove(elem) {
            self.len.fetch_sub(1, Ordering::Relaxed);
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
        let _stripe = self.stripe(hash);

        // Safety: as in `insert`.
        let table = unsafe { &*self.table.as_ptr() };
        let bucket = unsafe { &*table.bucket(hash).as_ptr() };

        bucket.contains(elem)
    }

    fn stripe(&self, hash: u64) -> MutexGuard<'_, ()> {
        self.locks[hash as usize % self.locks.len()].lock()
    }

    /// Grows the table to double capacity. `expected_capacity` is the
    /// capacity observed when the load factor tripped; if it no longer
    /// matches once the pool is held, another thread already resized and
    /// this attempt is dropped.
    fn resize(&self, expected_capacity: usize) {
        // Ascending index order at every multi-lock site.
        let _pool: Vec<MutexGuard<'_, ()>> = self.locks.iter().map(|lock| lock.lock()).collect();

        // Safety: every stripe is held, so this is the only live reference.
        let table = unsafe { &mut *self.table.as_ptr() };

        if table.capacity() != expected_capacity {
            return;
        }

        let hasher = &self.hasher;
        table.grow(|elem| hash_u64(hasher, elem));
    }
}

impl<T, S> StripedSet<T, S> {
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current bucket count. Always `initial_capacity * 2^k`.
    pub fn capacity(&self) -> usize {
        // Any one stripe excludes a resizer, which needs the whole pool.
        let _stripe = self.locks[0].lock();
        unsafe { &*self.table.as_ptr() }.capacity()
    }

    /// Number of stripe locks. Fixed at construction.
    pub fn stripes(&self) -> usize {
        self.locks.len()
    }
}

impl<T: Eq + Hash, S: BuildHasher> ConcurrentSet<T> for StripedSet<T, S> {
    fn insert(&self, elem: T) -> bool {
        StripedSet::insert(self, elem)
    }

    fn remove<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        StripedSet::remove(self, elem)
    }

    fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        StripedSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        StripedSet::len(self)
    }
}

impl<T, S> fmt::Debug for StripedSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripedSet")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .field("stripes", &self.stripes())
            .finish()
    }
}
