//! The resizable chained bucket store shared by the sequential, coarse, and
//! striped engines. The refinable engine couples its buckets directly to
//! their locks and keeps its own arrangement.

use crate::util::SharedValue;
use std::borrow::Borrow;

/// A single hash slot: the unordered elements whose hash maps here.
pub(crate) struct Bucket<T> {
    entries: Vec<T>,
}

impl<T> Bucket<T> {
    pub(crate) const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    pub(crate) fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        self.entries.iter().any(|entry| entry.borrow() == elem)
    }

    /// Appends `elem` unless an equal element is already chained here.
    pub(crate) fn insert(&mut self, elem: T) -> bool
    where
        T: Eq,
    {
        if self.entries.iter().any(|entry| *entry == elem) {
            return false;
        }

        self.entries.push(elem);
        true
    }

    pub(crate) fn remove<Q>(&mut self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + ?Sized,
    {
        match self.entries.iter().position(|entry| entry.borrow() == elem) {
            Some(index) => {
                // Buckets are unordered, so the cheap removal is fine.
                self.entries.swap_remove(index);
                true
            }
            None => false,
        }
    }

    /// Appends without the duplicate scan. Only for migration, where every
    /// element is already known to be unique.
    pub(crate) fn push(&mut self, elem: T) {
        self.entries.push(elem);
    }

    pub(crate) fn drain(&mut self) -> std::vec::Drain<'_, T> {
        self.entries.drain(..)
    }
}

/// A 0-indexed sequence of buckets; `capacity == buckets.len()`. The capacity
/// only ever doubles, so it stays a power-of-two multiple of whatever it
/// started at.
pub(crate) struct Table<T> {
    buckets: Box<[SharedValue<Bucket<T>>]>,
}

impl<T> Table<T> {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        debug_assert!(capacity > 0);

        let buckets = (0..capacity).map(|_| SharedValue::new(Bucket::new())).collect();

        Self { buckets }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// The bucket covering `hash`, to be accessed under the caller's lock
    /// discipline.
    pub(crate) fn bucket(&self, hash: u64) -> &SharedValue<Bucket<T>> {
        &self.buckets[hash as usize % self.buckets.len()]
    }

    pub(crate) fn bucket_mut(&mut self, hash: u64) -> &mut Bucket<T> {
        let index = hash as usize % self.buckets.len();
        self.buckets[index].get_mut()
    }

    /// Rebuilds the table at double capacity, re-chaining every element by
    /// its hash against the new bucket count.
    pub(crate) fn grow<F>(&mut self, hash_of: F)
    where
        F: Fn(&T) -> u64,
    {
        let mut next = Table::with_capacity(self.buckets.len() * 2);

        for bucket in self.buckets.iter_mut() {
            for elem in bucket.get_mut().drain() {
                next.bucket_mut(hash_of(&elem)).push(elem);
            }
        }

        *self = next;
    }

    /// Sum of all chain lengths. Requires exclusive access; used to reconcile
    /// the size counter in tests.
    #[cfg(test)]
    pub(crate) fn count_elements(&mut self) -> usize {
        self.buckets
            .iter_mut()
            .map(|bucket| bucket.get_mut().entries.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{Bucket, Table};

    #[test]
    fn bucket_rejects_duplicates() {
        let mut bucket = Bucket::new();
        assert!(bucket.insert(7));
        assert!(!bucket.insert(7));
        assert_eq!(bucket.entries.len(), 1);
    }

    #[test]
    fn bucket_remove() {
        let mut bucket = Bucket::new();
        bucket.insert(1);
        bucket.insert(2);
        assert!(bucket.remove(&1));
        assert!(!bucket.remove(&1));
        assert!(bucket.contains(&2));
        assert_eq!(bucket.entries.len(), 1);
    }

    #[test]
    fn grow_preserves_membership() {
        let mut table: Table<u64> = Table::with_capacity(4);

        for elem in 0..64u64 {
            // Identity hashing keeps the test deterministic.
            assert!(table.bucket_mut(elem).insert(elem));
        }

        table.grow(|elem| *elem);

        assert_eq!(table.capacity(), 8);
        assert_eq!(table.count_elements(), 64);
        for elem in 0..64u64 {
            assert!(table.bucket_mut(elem).contains(&elem));
        }
    }

    #[test]
    fn grow_rechains_by_new_capacity() {
        let mut table: Table<u64> = Table::with_capacity(2);
        table.bucket_mut(2).insert(2);
        table.bucket_mut(3).insert(3);

        table.grow(|elem| *elem);

        // With capacity 4, element 2 must now live in bucket 2, not bucket 0.
        assert!(table.bucket_mut(2).contains(&2));
        assert!(table.bucket_mut(3).contains(&3));
    }
}
