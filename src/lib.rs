//! A Last-Writer-Wins Element Set: a Conflict-free Replicated Data Type.
//!
//! Replicas record additions and removals of elements, each tagged with a
//! caller-provided timestamp, without coordinating with each other. Merging
//! the state of any two replicas, in any order and any number of times,
//! converges on the same set.
//!
//! ```
//! use lww_element_set::{Bias, LwwElementSet};
//!
//! let mut local = LwwElementSet::new(Bias::Add);
//! let mut remote = LwwElementSet::new(Bias::Add);
//!
//! local.add("apple", 1);
//! remote.remove("apple", 2);
//! remote.add("pear", 3);
//!
//! local.merge(&remote).unwrap();
//! assert!(!local.exists("apple"));
//! assert!(local.exists("pear"));
//! assert_eq!(1, local.len());
//! ```
//!
//! ###### Further Reading
//!
//! 1. [_A comprehensive study of Convergent and Commutative Replicated Data Types_](http://hal.inria.fr/docs/00/55/55/88/PDF/techreport.pdf) (Shapiro, et al.)

pub mod bias;
pub mod error;
pub mod set;


pub use bias::Bias;
pub use error::{Error, Result};
pub use set::{LwwElementSet, LwwElementSetOp, SharedLwwElementSet};

/// A point in time as seen by the replica that performed an operation.
///
/// Timestamps may be logical counters or wall-clock readings; the set only
/// compares them. Higher values are more recent. Callers are responsible for
/// their provenance.
pub type Timestamp = i64;

/// A Conflict-free Replicated Data Type.
///
/// Conflict-free replicated data types (also called convergent and commutative
/// replicated data types) allow for concurrent updates to distributed replicas
/// with strong eventual consistency and without coordination.
///
/// ###### Replication
///
/// Updates to CRDTs can be shared with replicas in two ways: state-based
/// replication and operation-based replication. With state-based replication,
/// the entire state of the mutated CRDT is merged into remote replicas in order
/// to restore consistency. With operation-based replication, only the mutating
/// operation is applied to remote replicas in order to restore consistency.
///
/// ###### Partial Ordering
///
/// Replicas of a CRDT are partially-ordered over the set of possible
/// operations. If all operations applied to replica `B` have been applied to
/// `A` (or, somewhat equivalently, if `B` has been merged into `A`), then
/// `B <= A`.
pub trait Crdt: Clone + Eq + PartialOrd {

    type Operation: Clone;

    type Error;

    /// Merge a replica into this CRDT.
    ///
    /// This method is used to perform state-based replication. It must be
    /// commutative, associative and idempotent. A failed merge leaves `self`
    /// untouched.
    fn merge(&mut self, other: &Self) -> std::result::Result<(), Self::Error>;

    /// Apply an operation to this CRDT.
    ///
    /// This method is used to perform operation-based replication.
    fn apply(&mut self, operation: Self::Operation);
}
