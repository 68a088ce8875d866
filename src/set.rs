use std::borrow::Borrow;
use std::hash::Hash;

/// The operation contract shared by every engine in this crate.
///
/// All four engines behave identically from the caller's point of view; they
/// differ only in how much concurrency their locking discipline admits. Every
/// operation is total: duplicates and absent elements are reported through
/// the returned boolean, never as an error.
pub trait ConcurrentSet<T: Eq + Hash> {
    /// Inserts `elem` if it is absent. Returns `true` if the element was
    /// inserted and `false` if it was already present. A successful insert
    /// may grow the table before returning.
    fn insert(&self, elem: T) -> bool;

    /// Removes `elem` if present. Returns `true` if an element was removed.
    fn remove<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized;

    /// Membership test with no side effects.
    fn contains<Q>(&self, elem: &Q) -> bool
    where
        T: Borrow<Q>,
        Q: Eq + Hash + ?Sized;

    /// Current element count. Best-effort while operations are in flight;
    /// exact whenever the set is quiescent.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
