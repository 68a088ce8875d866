use crate::set::ConcurrentSet;
use crate::table::Table;
use crate::util::hash_u64;
use crate::DEFAULT_LOAD_FACTOR;
use std::borrow::Borrow;
use std::cell::RefCell;
use std::collections::hash_map::RandomState;
use std::fmt;
use std::hash::{BuildHasher, Hash};

/// Single-threaded baseline engine with no locking at all.
///
/// `SequentialSet` keeps the shared-reference API of the concurrent engines
/// by routing mutation through a `RefCell`, which also makes it `!Sync`:
/// handing it to another thread is a compile error rather than a data race.
/// The concurrent engines are tested against this one as a correctness
/// oracle.
///
/// # Examples
///
/// ```
/// use shardset::SequentialSet;
///
/// let primes = SequentialSet::new(4);
/// assert!(primes.insert(2));
/// assert!(primes.insert(3));
/// assert!(!primes.insert(2));
/// assert_eq!(primes.len(), 2);
/// ```
pub struct SequentialSet<T, S = RandomState> {
    inner: RefCell<Inner<T>>,
    hasher: S,
    load_factor: usize,
}

struct Inner<T> {
    table: Table<T>,
    len: usize,
}

impl<T: Eq + Hash> SequentialSet<T, RandomState> {
    /// Creates a set with `initial_capacity` buckets.
    ///
    /// # Panics
    ///
    /// Panics if `initial_capacity` is zero.
    pub fn new(initial_capacity: usize) -> Self {
        Self::with_hasher(initial_capacity, RandomState::new())
    }
}

impl<T: Eq + Hash, S: BuildHasher> SequentialSet<T, S> {
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
            inner: RefCell::new(Inner {
                table: Table::with_capacity(initial_capacity),
                len: 0,
            }),
            hasher,
            load_factor,
        }
    }

    pub fn insert(&self, elem: T) -> bool {
        let hash = hash_u64(&self.hasher, &elem);
        let mut inner = self.inner.borrow_mut();

        if !inner.table.bucket_mut(hash).insert(elem) {
            return false;
        }

        inner.len += 1;
        if inner.len / inner.table.capacity() > self.load_factor {
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
        let mut inner = self.inner.borrow_mut();

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
        self.inner.borrow_mut().table.bucket_mut(hash).contains(elem)
    }
}

impl<T, S> SequentialSet<T, S> {
    pub fn len(&self) -> usize {
        self.inner.borrow().len
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current bucket count. Always `initial_capacity * 2^k`.
    pub fn capacity(&self) -> usize {
        self.inner.borrow().table.capacity()
    }
}

impl<T: Eq + Hash, S: BuildHasher> ConcurrentSet<T> for SequentialSet<T, S> {
    fn insert(&self, elem: T) -> bool {
        SequentialSet::insert(self, elem)
    }

    fn remove<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        SequentialSet::remove(self, elem)
    }

    fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized,
    {
        SequentialSet::contains(self, elem)
    }

    fn len(&self) -> usize {
        SequentialSet::len(self)
    }
}

impl<T, S> fmt::Debug for SequentialSet<T, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SequentialSet")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::SequentialSet;

    #[test]
    fn matches_reference_set() {
        let set = SequentialSet::new(4);
        let mut reference = std::collections::HashSet::new();

        // A fixed mixed script of inserts and removes over a small key space.
        for step in 0..2_000u64 {
            let key = (step * 31 + 7) % 64;
            if step % 3 == 0 {
                assert_eq!(set.remove(&key), reference.remove(&key));
            } else {
                assert_eq!(set.insert(key), reference.insert(key));
            }
            assert_eq!(set.len(), reference.len());
        }

        for key in 0..64u64 {
            assert_eq!(set.contains(&key), reference.contains(&key));
        }
    }

    #[test]
    fn double_insert_is_idempotent() {
        let set = SequentialSet::new(4);
        assert!(set.insert("a"));
        assert!(!set.insert("a"));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn remove_then_contains() {
        let set = SequentialSet::new(4);
        set.insert(9);
        assert!(set.remove(&9));
        assert!(!set.contains(&9));
        assert!(set.insert(9));
        assert!(set.contains(&9));
    }

    #[test]
    fn grows_by_doubling() {
        let set = SequentialSet::new(4);

        for elem in 0..64u64 {
            set.insert(elem);
        }

        assert_eq!(set.len(), 64);
        let capacity = set.capacity();
        assert!(capacity >= 8);
        assert!((capacity / 4).is_power_of_two());
        assert_eq!(capacity % 4, 0);
        for elem in 0..64u64 {
            assert!(set.contains(&elem));
        }
    }

    #[test]
    #[should_panic(expected = "initial capacity")]
    fn zero_capacity_is_rejected() {
        let _ = SequentialSet::<u64>::new(0);
    }
}
