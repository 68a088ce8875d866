use crate::lock::Mutex;
use crate::marker::ResizeMarker;
use crate::set::ConcurrentSet;
use crate::table::Bucket;
use crate::thread_id;
use crate::util::hash_u64;
use crate::DEFAULT_LOAD_FACTOR;
use arc_swap::ArcSwap;
use crossbeam_utils::CachePadded;
use std::borrow::Borrow;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Refinable engine: lock granularity grows in step with the table, so every
/// bucket keeps a private lock at every capacity.
///
/// A generation couples the bucket array with its lock pool one-to-one and
/// is swapped wholesale during a resize, which is coordinated through a
/// resize ownership marker:
///
/// * an operation first blocks while a foreign resize is in flight, then
///   loads the current generation, locks its bucket, and re-checks both the
///   marker and that the generation it locked is still the installed one —
///   a guard taken against an already replaced generation is discarded and
///   the operation retries;
/// * a resizer wins the marker, quiesces (locks and unlocks every bucket
///   lock in ascending order, while the marker keeps new acquirers out),
///   migrates into a double-capacity generation with a matching pool,
///   installs it, and clears the marker, waking all blocked operations.
///
/// # Examples
///
/// ```
/// use shardset::RefinableSet;
///
/// let set = RefinableSet::new(4);
/// for i in 0..64 {
///     set.insert(i);
/// }
/// assert_eq!(set.len(), 64);
/// ```
pub struct RefinableSet<T, S = RandomState> {
    generation: ArcSwap<Generation<T>>,
    marker: ResizeMarker,
    len: AtomicUsize,
    hasher: S,
    load_factor: usize,
}

/// A bucket array and its matching lock pool. Replaced as a unit, never
/// mutated structurally in place, so the bucket-to-lock mapping stays 1:1 by
/// construction.
struct Generation<T> {
    buckets: Box<[CachePadded<Mutex<Bucket<T>>>]>,
}

impl<T> Generation<T> {
    fn with_capacity(capacity: usize) -> Self {
        let buckets = (0..capacity)
            .map(|_| CachePadded::new(Mutex::new(Bucket::new())))
            .collect();

        Self { buckets }
    }

    fn capacity(&self) -> usize {
        self.buckets.len()
    }

    fn bucket(&self, hash: u64) -> &Mutex<Bucket<T>> {
        &self.buckets[hash as usize % self.buckets.len()]
    }
}

impl<T: Eq + Hash> RefinableSet<T, RandomState> {
    /// Creates a set with `initial_capacity` buckets, each with its own lock.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, RandomState::new())
    }
}

impl<T: Eq + Hash, S: BuildHasher> RefinableSet<T, S> {
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
            generation: ArcSwap::from_pointee(Generation::with_capacity(initial_capacity)),
            marker: ResizeMarker::new(),
            len: AtomicUsize::new(0),
            hasher,
            load_factor,
        }
    }

    pub fn insert(&self, elem: T) -> bool {
        let hash = hash_u64(&self.hasher, &elem);
        let (inserted, capacity) =
            self.with_bucket(hash, |bucket, capacity| (bucket.insert(elem), capacity));

        if !inserted {
            return false;
        }

        let len = self.len.fetch_add(1, Ordering::Relaxed) + 1;
        if len / capacity > self.load_factor {
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
        let removed = self.with_bucket(hash, |bucket, _| bucket.remove(elem));

        if removed {
            self.len.fetch_sub(1, Ordering::Relaxed);
        }

        removed
    }

    pub fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        let hash = hash_u64(&self.hasher, elem);
        self.with_bucket(hash, |bucket, _| bucket.contains(elem))
    }

    /// Runs `f` on the bucket for `hash`, with that bucket's lock held
    /// against a generation that is guaranteed current for the duration of
    /// the call. Also hands `f` the capacity it executed against, for the
    /// load-factor decision.
    fn with_bucket<R>(&self, hash: u64, f: impl FnOnce(&mut Bucket<T>, usize) -> R) -> R {
        let me = thread_id::get();

        loop {
            // Block, not spin, while somebody else migrates the table.
            self.marker.wait_if_resizing(me);

            let generation = self.generation.load_full();
            let mut bucket = generation.bucket(hash).lock();

            // A resize may have started, or even completed, between the
            // marker check and the lock acquisition. A guard on a replaced
            // generation must not touch the live table.
            let current = self.generation.load();
            if !self.marker.is_foreign_resize(me) && Arc::ptr_eq(&generation, &current) {
                let capacity = generation.capacity();
                return f(&mut bucket, capacity);
            }

            drop(bucket);
        }
    }

    /// Grows the table to double capacity, building the matching lock pool
    /// alongside it. `expected_capacity` is the capacity the load-factor
    /// decision was made against; losing the marker race or finding the
    /// capacity already changed aborts this attempt.
    fn resize(&self, expected_capacity: usize) {
        let me = thread_id::get();

        if !self.marker.try_acquire(me) {
            // Another thread owns the resize; it will cover this overload.
            return;
        }

        let generation = self.generation.load_full();
        if generation.capacity() != expected_capacity {
            self.marker.release(me);
            return;
        }

        // Quiesce: once every lock has been held and released, no operation
        // is still mid-flight on this generation, and the marker stops new
        // ones from starting. Ascending order, like every multi-lock site.
        for bucket in generation.buckets.iter() {
            drop(bucket.lock());
        }

        let next = Generation::with_capacity(expected_capacity * 2);
        for bucket in generation.buckets.iter() {
            for elem in bucket.lock().drain() {
                next.bucket(hash_u64(&self.hasher, &elem)).lock().push(elem);
            }
        }

        // The marker excludes every other resizer, so the installed
        // generation cannot have moved. If it ever does, applying this
        // migration would lose updates; fail loudly instead.
        assert!(
            Arc::ptr_eq(&generation, &self.generation.load()),
            "table generation replaced during an owned resize",
        );

        self.generation.store(Arc::new(next));
        self.marker.release(me);
    }
}

impl<T, S> RefinableSet<T, S> {
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Relaxed)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current bucket count, which is also the current lock count. Always
    /// `initial_capacity * 2^k`.
    pub fn capacity(&self) -> usize {
        self.generation.load().capacity()
    }
}

impl<T: Eq + Hash, S: BuildHasher> ConcurrentSet<T> for RefinableSet<T, S> {
    fn insert(&self, elem: T) -> bool {
        RefinableSet::insert(self, elem)
    }

    fn remove<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        RefinableSet::remove(self, elem)
    }

    fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        RefinableSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        RefinableSet::len(self)
    }
}

impl<T, S> fmt::Debug for RefinableSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefinableSet")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::RefinableSet;
    use std::thread;

    #[test]
    fn double_insert_is_idempotent() {
        let set = RefinableSet::new(4);
        assert!(set.insert(1));
        assert!(!set.insert(1));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn lock_pool_tracks_capacity() {
        let set = RefinableSet::new(4);

        for elem in 0..256u64 {
            set.insert(elem);
        }

        // Capacity doubled at least once; the pool is the capacity here.
        assert!(set.capacity() > 4);
        assert_eq!(set.capacity() % 4, 0);
        assert!((set.capacity() / 4).is_power_of_two());
        for elem in 0..256u64 {
            assert!(set.contains(&elem));
        }
    }

    #[test]
    fn concurrent_inserts_across_growth() {
        const THREADS: u64 = 8;
        const PER_THREAD: u64 = 400;

        let set = RefinableSet::new(4);

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

    #[test]
    fn concurrent_removals() {
        const N: u64 = 1_000;

        let set = RefinableSet::new(4);
        for elem in 0..N {
            set.insert(elem);
        }

        thread::scope(|scope| {
            for t in 0..4u64 {
                let set = &set;
                scope.spawn(move || {
                    let mut elem = t;
                    while elem < N {
                        assert!(set.remove(&elem));
                        elem += 4;
                    }
                });
            }
        });

        assert_eq!(set.len(), 0);
        assert!(set.is_empty());
    }
}
