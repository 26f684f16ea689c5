//! Set CRDTs.
//!
//! The `add` and `remove` operations on sets do not commute, so a traditional
//! set cannot be a CRDT. A last-writer-wins element set approximates one by
//! tagging every add and remove with a timestamp and letting the most recent
//! operation on each element decide its membership.
//!
//! ###### `LwwElementSet`
//!
//! Keeps, per element, the latest add timestamp and the latest remove
//! timestamp. An element is a member if its latest add is newer than its
//! latest remove. When both carry the same timestamp the set's [`Bias`]
//! decides. `LwwElementSet` should be preferred when the rate of operations
//! on an element is small compared to the resolution of the timestamps.
//!
//! ###### `SharedLwwElementSet`
//!
//! The same set behind a mutex, for replicas updated from several threads at
//! once. Each operation holds the lock for its whole duration, so readers
//! never observe one log updated without the other.
//!
//! [`Bias`]: crate::Bias

pub use self::lwwset::{Elements, LwwElementSet, LwwElementSetOp};
pub use self::shared::SharedLwwElementSet;

mod lwwset;
mod shared;
