use std::borrow::Borrow;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;
use std::ptr;

use parking_lot::Mutex;

use crate::{Bias, Result, Timestamp};
use super::{LwwElementSet, LwwElementSetOp};

/// A last-writer-wins element set that can be shared between threads.
///
/// Wraps a [`LwwElementSet`] in a mutex. Every method locks the set for its
/// whole duration, so an add, remove, merge or read is never interleaved with
/// another operation on the same instance. Share it with an `Arc`.
///
/// ### Example
///
/// ```
/// use std::sync::Arc;
/// use std::thread;
/// use lww_element_set::{Bias, SharedLwwElementSet};
///
/// let set = Arc::new(SharedLwwElementSet::new(Bias::Add));
/// let writers: Vec<_> = (0..4).map(|i| {
///     let set = Arc::clone(&set);
///     thread::spawn(move || { set.add(i, 1); })
/// }).collect();
/// for writer in writers {
///     writer.join().unwrap();
/// }
/// assert_eq!(4, set.len());
/// ```
pub struct SharedLwwElementSet<T> where T: Eq + Hash {
    bias: Bias,
    inner: Mutex<LwwElementSet<T>>,
}

impl <T> SharedLwwElementSet<T> where T: Eq + Hash {

    /// Create a new, empty shared set.
    pub fn new(bias: Bias) -> SharedLwwElementSet<T> {
        SharedLwwElementSet::from(LwwElementSet::new(bias))
    }

    /// The tie-break policy this set was created with.
    pub fn bias(&self) -> Bias {
        self.bias
    }

    /// Returns true if the set contains the element.
    pub fn exists<Q>(&self, element: &Q) -> bool
    where T: Borrow<Q>, Q: Hash + Eq + ?Sized {
        self.inner.lock().exists(element)
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Returns true if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Consume the shared set, returning the set inside.
    pub fn into_inner(self) -> LwwElementSet<T> {
        self.inner.into_inner()
    }
}

impl <T> SharedLwwElementSet<T> where T: Clone + Eq + Hash {

    /// Add an element to the set at the provided timestamp.
    ///
    /// See [`LwwElementSet::add`].
    pub fn add(&self, element: T, timestamp: Timestamp) -> Option<LwwElementSetOp<T>> {
        self.inner.lock().add(element, timestamp)
    }

    /// Remove an element from the set at the provided timestamp.
    ///
    /// See [`LwwElementSet::remove`].
    pub fn remove(&self, element: T, timestamp: Timestamp) -> Option<LwwElementSetOp<T>> {
        self.inner.lock().remove(element, timestamp)
    }

    /// Merge another shared replica into this one.
    ///
    /// Both sets are locked for the duration of the merge, always in the same
    /// global order, so that merges running in opposite directions on two
    /// threads cannot deadlock and `other` cannot change halfway through.
    /// Merging a set into itself does nothing.
    ///
    /// ### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, SharedLwwElementSet};
    ///
    /// let local = SharedLwwElementSet::new(Bias::Add);
    /// let remote = SharedLwwElementSet::new(Bias::Add);
    /// local.add("a", 1);
    /// remote.remove("a", 2);
    ///
    /// local.merge(&remote).unwrap();
    /// assert!(!local.exists("a"));
    /// ```
    pub fn merge(&self, other: &SharedLwwElementSet<T>) -> Result<()> {
        if ptr::eq(self, other) {
            return Ok(());
        }
        let (mut local, remote) = if (self as *const Self) < (other as *const Self) {
            let local = self.inner.lock();
            (local, other.inner.lock())
        } else {
            let remote = other.inner.lock();
            (self.inner.lock(), remote)
        };
        local.merge(&remote)
    }

    /// Merge an immutable snapshot of another replica, such as one received
    /// from a peer, into this set.
    pub fn merge_snapshot(&self, other: &LwwElementSet<T>) -> Result<()> {
        self.inner.lock().merge(other)
    }

    /// The current members of the set, in arbitrary order.
    pub fn elements(&self) -> Vec<T> {
        self.inner.lock().elements().cloned().collect()
    }

    /// A copy of the full state of the set, logs included.
    pub fn snapshot(&self) -> LwwElementSet<T> {
        self.inner.lock().clone()
    }
}

impl <T> From<LwwElementSet<T>> for SharedLwwElementSet<T> where T: Eq + Hash {
    fn from(set: LwwElementSet<T>) -> SharedLwwElementSet<T> {
        SharedLwwElementSet { bias: set.bias(), inner: Mutex::new(set) }
    }
}

impl <T> Clone for SharedLwwElementSet<T> where T: Clone + Eq + Hash {
    fn clone(&self) -> SharedLwwElementSet<T> {
        SharedLwwElementSet::from(self.snapshot())
    }
}

impl <T> Debug for SharedLwwElementSet<T> where T: Debug + Eq + Hash {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_tuple("SharedLwwElementSet").field(&*self.inner.lock()).finish()
    }
}

#[cfg(test)]
mod test {

    use crate::{Bias, Error, LwwElementSet};
    use super::SharedLwwElementSet;

    #[test]
    fn operations_match_plain_set() {
        let shared = SharedLwwElementSet::new(Bias::Remove);
        let mut plain = LwwElementSet::new(Bias::Remove);

        for (element, timestamp) in [("a", 1), ("b", 2), ("c", 3)] {
            assert_eq!(plain.add(element, timestamp), shared.add(element, timestamp));
        }
        assert_eq!(plain.remove("b", 2), shared.remove("b", 2));
        assert_eq!(plain.remove("c", 1), shared.remove("c", 1));

        assert_eq!(plain, shared.snapshot());
        assert_eq!(2, shared.len());
        assert!(!shared.exists("b"));

        let mut elements = shared.elements();
        elements.sort();
        assert_eq!(vec!["a", "c"], elements);
    }

    #[test]
    fn merge_with_itself_is_a_no_op() {
        let shared = SharedLwwElementSet::new(Bias::Add);
        shared.add(1u32, 1);
        let before = shared.snapshot();
        assert_eq!(Ok(()), shared.merge(&shared));
        assert_eq!(before, shared.snapshot());
    }

    #[test]
    fn bias_mismatch_leaves_both_untouched() {
        let local = SharedLwwElementSet::new(Bias::Add);
        let remote = SharedLwwElementSet::new(Bias::Remove);
        local.add("x", 1);
        remote.add("y", 1);

        assert_eq!(
            Err(Error::BiasMismatch { local: Bias::Add, remote: Bias::Remove }),
            local.merge(&remote)
        );
        assert_eq!(vec!["x"], local.elements());
        assert_eq!(vec!["y"], remote.elements());

        // The lock is released on the error path.
        assert!(local.add("z", 2).is_some());
        assert!(remote.add("z", 2).is_some());
    }

    #[test]
    fn merge_snapshot_from_peer() {
        let local = SharedLwwElementSet::new(Bias::Add);
        local.add("x", 1);

        let mut peer = LwwElementSet::new(Bias::Add);
        peer.remove("x", 1);
        peer.add("y", 4);

        local.merge_snapshot(&peer).unwrap();
        assert!(local.exists("x"));
        assert!(local.exists("y"));
        assert_eq!(Some(1), local.snapshot().remove_timestamp("x"));
    }

    #[test]
    fn clone_is_independent() {
        let original = SharedLwwElementSet::new(Bias::Add);
        original.add(1u8, 1);
        let copy = original.clone();
        copy.remove(1, 2);

        assert!(original.exists(&1));
        assert!(!copy.exists(&1));
        assert_eq!(Bias::Add, copy.bias());
        assert_eq!(original.into_inner().adds(), copy.into_inner().adds());
    }
}
