//! Chained-bucket hash sets implemented four ways with increasing
//! concurrency sophistication.
//!
//! Every engine stores elements in chained buckets, grows by doubling when a
//! load-factor threshold trips, and exposes the same operation contract
//! ([`ConcurrentSet`]): insert, remove, membership test, and size. They
//! differ only in locking discipline:
//!
//! * [`SequentialSet`] — no locking; the single-threaded baseline the others
//!   are tested against.
//! * [`CoarseSet`] — one mutex around everything.
//! * [`StripedSet`] — a fixed pool of stripe locks partitioned over buckets
//!   by hash; the pool stays put while the table grows, so granularity
//!   coarsens over time.
//! * [`RefinableSet`] — the lock pool grows in step with the table, keeping
//!   one lock per bucket; resizes are coordinated through an ownership
//!   marker plus a quiescence pass over the old pool.
//!
//! Operations that share a lock at execution time are linearizable with
//! respect to each other. Sizes are exact whenever the set is quiescent.
//! All blocking is indefinite: there are no timeouts, and a stalled lock
//! holder stalls its contenders.

mod coarse;
mod lock;
mod marker;
mod refinable;
mod sequential;
mod set;
mod striped;
mod table;
mod thread_id;
mod util;

pub use coarse::CoarseSet;
pub use refinable::RefinableSet;
pub use sequential::SequentialSet;
pub use set::ConcurrentSet;
pub use striped::StripedSet;

/// Default growth threshold: a set resizes after an insert leaves the average
/// chain longer than this many elements. Construct with
/// `with_load_factor(capacity, 1, hasher)` for the most aggressive policy.
pub const DEFAULT_LOAD_FACTOR: usize = 4;
