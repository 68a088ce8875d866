use core::cell::UnsafeCell;
use core::hash::{BuildHasher, Hash, Hasher};

/// Hashes `item` once with `build_hasher`. Every engine derives both its
/// bucket index and (where applicable) its lock index from this one value.
pub(crate) fn hash_u64<S, Q>(build_hasher: &S, item: &Q) -> u64
where
    S: BuildHasher,
    Q: Hash + ?Sized,
{
    let mut hasher = build_hasher.build_hasher();

    item.hash(&mut hasher);

    hasher.finish()
}

/// A simple wrapper around `T` whose exclusivity is enforced externally.
///
/// The striped engine guards each bucket with a stripe lock that lives outside
/// the table, so the table itself is reached through a shared reference while
/// individual buckets are mutated. All access goes through `as_ptr` under the
/// lock discipline of the caller.
#[repr(transparent)]
pub(crate) struct SharedValue<T> {
    value: UnsafeCell<T>,
}

unsafe impl<T: Send> Send for SharedValue<T> {}

unsafe impl<T: Send> Sync for SharedValue<T> {}

impl<T> SharedValue<T> {
    /// Create a new `SharedValue<T>`
    pub(crate) const fn new(value: T) -> Self {
        Self {
            value: UnsafeCell::new(value),
        }
    }

    /// Get an unique reference to `T`
    pub(crate) fn get_mut(&mut self) -> &mut T {
        unsafe { &mut *self.value.get() }
    }

    /// Get a raw pointer to `T`. The caller must hold whatever lock covers
    /// this value for the duration of any dereference.
    pub(crate) fn as_ptr(&self) -> *mut T {
        self.value.get()
    }
}
