use std::borrow::Borrow;
use std::cmp::Ordering::{self, Equal, Greater, Less};
use std::collections::hash_map::{self, Entry::{Occupied, Vacant}};
use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::hash::Hash;

#[cfg(any(test, feature = "quickcheck_generators"))]
use quickcheck::{Arbitrary, Gen};
use tracing::{debug, trace, warn};

use crate::{Bias, Crdt, Error, Result, Timestamp};

/// A last-writer-wins element set.
///
/// The set keeps two logs: the latest timestamp at which each element was
/// added, and the latest timestamp at which each element was removed. An
/// element is a member when its add is strictly newer than its remove, or
/// when both happened at the same timestamp and the set's [`Bias`] is
/// [`Bias::Add`].
///
/// Both logs only grow. Removed elements stay in the remove log forever.
#[derive(Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LwwElementSet<T> where T: Eq + Hash {
    bias: Bias,
    adds: HashMap<T, Timestamp>,
    removes: HashMap<T, Timestamp>,
}

/// An add or remove operation over `LwwElementSet` CRDTs.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LwwElementSetOp<T> {
    Add(T, Timestamp),
    Remove(T, Timestamp),
}

impl <T> LwwElementSet<T> where T: Eq + Hash {

    /// Create a new, empty last-writer-wins element set.
    ///
    /// ### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, LwwElementSet};
    ///
    /// let set = LwwElementSet::<i32>::new(Bias::Add);
    /// assert!(set.is_empty());
    /// ```
    pub fn new(bias: Bias) -> LwwElementSet<T> {
        LwwElementSet { bias, adds: HashMap::new(), removes: HashMap::new() }
    }

    /// Rebuild a set from its logs, as produced by [`adds`](Self::adds),
    /// [`removes`](Self::removes) or [`into_logs`](Self::into_logs) on
    /// another replica.
    ///
    /// ### Example
    ///
    /// ```
    /// use std::collections::HashMap;
    /// use lww_element_set::{Bias, LwwElementSet};
    ///
    /// let adds = HashMap::from([("a", 1), ("b", 1)]);
    /// let removes = HashMap::from([("b", 2)]);
    ///
    /// let set = LwwElementSet::from_logs(Bias::Add, adds, removes);
    /// assert!(set.exists("a"));
    /// assert!(!set.exists("b"));
    /// ```
    pub fn from_logs(bias: Bias,
                     adds: HashMap<T, Timestamp>,
                     removes: HashMap<T, Timestamp>)
                     -> LwwElementSet<T> {
        LwwElementSet { bias, adds, removes }
    }

    /// Consume the set, returning its add log and remove log.
    pub fn into_logs(self) -> (HashMap<T, Timestamp>, HashMap<T, Timestamp>) {
        (self.adds, self.removes)
    }

    /// The tie-break policy this set was created with.
    pub fn bias(&self) -> Bias {
        self.bias
    }

    /// The latest add timestamp of every element ever added.
    pub fn adds(&self) -> &HashMap<T, Timestamp> {
        &self.adds
    }

    /// The latest remove timestamp of every element ever removed.
    pub fn removes(&self) -> &HashMap<T, Timestamp> {
        &self.removes
    }

    /// The latest timestamp at which `element` was added, if it ever was.
    pub fn add_timestamp<Q>(&self, element: &Q) -> Option<Timestamp>
    where T: Borrow<Q>, Q: Hash + Eq + ?Sized {
        self.adds.get(element).copied()
    }

    /// The latest timestamp at which `element` was removed, if it ever was.
    pub fn remove_timestamp<Q>(&self, element: &Q) -> Option<Timestamp>
    where T: Borrow<Q>, Q: Hash + Eq + ?Sized {
        self.removes.get(element).copied()
    }

    /// Returns true if the set contains the element.
    ///
    /// ### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, LwwElementSet};
    ///
    /// let mut set = LwwElementSet::new(Bias::Remove);
    /// set.add("x".to_string(), 1);
    /// assert!(set.exists("x"));
    /// set.remove("x".to_string(), 1);
    /// assert!(!set.exists("x"));
    /// ```
    pub fn exists<Q>(&self, element: &Q) -> bool
    where T: Borrow<Q>, Q: Hash + Eq + ?Sized {
        match self.adds.get(element) {
            Some(&added) => self.bias.resolve(added, self.removes.get(element).copied()),
            None => false,
        }
    }

    /// An iterator over the current members of the set, in arbitrary order.
    ///
    /// Membership is computed from the logs as the iterator advances, so
    /// every call reflects all operations applied so far.
    ///
    /// ### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, LwwElementSet};
    ///
    /// let mut set = LwwElementSet::new(Bias::Add);
    /// set.add(1, 0);
    /// set.add(2, 0);
    /// set.remove(2, 1);
    /// assert_eq!(vec![&1], set.elements().collect::<Vec<_>>());
    /// ```
    pub fn elements(&self) -> Elements<'_, T> {
        Elements { adds: self.adds.iter(), removes: &self.removes, bias: self.bias }
    }

    /// Returns the number of elements in the set.
    pub fn len(&self) -> usize {
        self.elements().count()
    }

    /// Returns true if the set contains no elements.
    pub fn is_empty(&self) -> bool {
        self.elements().next().is_none()
    }
}

impl <T> LwwElementSet<T> where T: Clone + Eq + Hash {

    /// Add an element to the set at the provided timestamp.
    ///
    /// The add log only moves forward: if the element was already added at
    /// the same or a later timestamp, nothing changes and `None` is returned.
    /// Otherwise returns the operation to forward to other replicas.
    ///
    /// ### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, LwwElementSet};
    ///
    /// let mut set = LwwElementSet::new(Bias::Add);
    /// assert!(set.add("first-element", 1).is_some());
    /// assert!(set.add("first-element", 0).is_none());
    /// assert_eq!(Some(1), set.add_timestamp("first-element"));
    /// ```
    pub fn add(&mut self, element: T, timestamp: Timestamp) -> Option<LwwElementSetOp<T>> {
        record(&mut self.adds, element, timestamp).map(|element| {
            trace!(timestamp, "recorded add");
            LwwElementSetOp::Add(element, timestamp)
        })
    }

    /// Remove an element from the set at the provided timestamp.
    ///
    /// Removing an element that was never added is recorded too, so that a
    /// concurrent older add on another replica loses once merged.
    ///
    /// ### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, LwwElementSet};
    ///
    /// let mut set = LwwElementSet::new(Bias::Add);
    /// set.add("first-element", 0);
    /// assert!(set.exists("first-element"));
    /// set.remove("first-element", 1);
    /// assert!(!set.exists("first-element"));
    /// ```
    pub fn remove(&mut self, element: T, timestamp: Timestamp) -> Option<LwwElementSetOp<T>> {
        record(&mut self.removes, element, timestamp).map(|element| {
            trace!(timestamp, "recorded remove");
            LwwElementSetOp::Remove(element, timestamp)
        })
    }

    /// Merge a replica into the set.
    ///
    /// Afterwards each log holds, per element, the larger timestamp of the two
    /// replicas. `other` is not modified. Fails without touching `self` if the
    /// replicas were created with different biases.
    ///
    /// ### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, Error, LwwElementSet};
    ///
    /// let mut local = LwwElementSet::new(Bias::Add);
    /// let mut remote = LwwElementSet::new(Bias::Add);
    ///
    /// local.add(1i32, 0);
    /// remote.add(1, 1);
    /// remote.add(2, 2);
    /// remote.remove(1, 3);
    ///
    /// local.merge(&remote).unwrap();
    /// assert!(local.exists(&2));
    /// assert!(!local.exists(&1));
    /// assert_eq!(1, local.len());
    ///
    /// let other = LwwElementSet::new(Bias::Remove);
    /// assert_eq!(
    ///     Err(Error::BiasMismatch { local: Bias::Add, remote: Bias::Remove }),
    ///     local.merge(&other)
    /// );
    /// ```
    pub fn merge(&mut self, other: &LwwElementSet<T>) -> Result<()> {
        if self.bias != other.bias {
            warn!(local = %self.bias, remote = %other.bias, "refusing to merge sets with different biases");
            return Err(Error::BiasMismatch { local: self.bias, remote: other.bias });
        }
        let adds = merge_log(&mut self.adds, &other.adds);
        let removes = merge_log(&mut self.removes, &other.removes);
        debug!(adds, removes, "merged replica");
        Ok(())
    }
}

/// Stores `timestamp` for `element` if it is newer than what the log holds,
/// returning the element when the log changed.
fn record<T>(log: &mut HashMap<T, Timestamp>, element: T, timestamp: Timestamp) -> Option<T>
where T: Clone + Eq + Hash {
    match log.entry(element) {
        Occupied(entry) if *entry.get() >= timestamp => {
            trace!(timestamp, latest = *entry.get(), "dropped stale operation");
            None
        },
        Occupied(mut entry) => {
            entry.insert(timestamp);
            Some(entry.key().clone())
        },
        Vacant(entry) => {
            let element = entry.key().clone();
            entry.insert(timestamp);
            Some(element)
        },
    }
}

/// Raises every entry of `log` to the timestamp in `other`, returning the
/// number of entries that changed.
fn merge_log<T>(log: &mut HashMap<T, Timestamp>, other: &HashMap<T, Timestamp>) -> usize
where T: Clone + Eq + Hash {
    let mut updated = 0;
    for (element, &timestamp) in other {
        match log.get_mut(element) {
            Some(latest) if *latest >= timestamp => (),
            Some(latest) => {
                *latest = timestamp;
                updated += 1;
            },
            None => {
                log.insert(element.clone(), timestamp);
                updated += 1;
            },
        }
    }
    updated
}

/// True if every entry of `log` appears in `other` with a timestamp at least
/// as recent.
fn is_covered_by<T>(log: &HashMap<T, Timestamp>, other: &HashMap<T, Timestamp>) -> bool
where T: Eq + Hash {
    log.iter().all(|(element, &timestamp)| {
        other.get(element).map_or(false, |&other_timestamp| other_timestamp >= timestamp)
    })
}

/// An iterator over the members of a [`LwwElementSet`].
///
/// Created by [`LwwElementSet::elements`].
pub struct Elements<'a, T> where T: Eq + Hash {
    adds: hash_map::Iter<'a, T, Timestamp>,
    removes: &'a HashMap<T, Timestamp>,
    bias: Bias,
}

impl <'a, T> Iterator for Elements<'a, T> where T: Eq + Hash {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        let removes = self.removes;
        let bias = self.bias;
        self.adds
            .find(|&(element, &added)| bias.resolve(added, removes.get(element).copied()))
            .map(|(element, _)| element)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.adds.size_hint().1)
    }
}

impl <'a, T> IntoIterator for &'a LwwElementSet<T> where T: Eq + Hash {
    type Item = &'a T;
    type IntoIter = Elements<'a, T>;

    fn into_iter(self) -> Elements<'a, T> {
        self.elements()
    }
}

impl <T> Crdt for LwwElementSet<T> where T: Clone + Eq + Hash {

    type Operation = LwwElementSetOp<T>;

    type Error = Error;

    /// Merge a replica into the set.
    ///
    /// This method is used to perform state-based replication.
    fn merge(&mut self, other: &LwwElementSet<T>) -> Result<()> {
        LwwElementSet::merge(self, other)
    }

    /// Apply an add or remove operation to the set.
    ///
    /// This method is used to perform operation-based replication.
    ///
    /// Applying an operation to a `LwwElementSet` is idempotent.
    ///
    /// ##### Example
    ///
    /// ```
    /// use lww_element_set::{Bias, Crdt, LwwElementSet};
    ///
    /// let mut local = LwwElementSet::new(Bias::Add);
    /// let mut remote = LwwElementSet::new(Bias::Add);
    ///
    /// let op = remote.add(13i32, 0).expect("LwwElementSet should be empty.");
    ///
    /// local.apply(op);
    /// assert!(local.exists(&13));
    /// ```
    fn apply(&mut self, operation: LwwElementSetOp<T>) {
        match operation {
            LwwElementSetOp::Add(element, timestamp) => { self.add(element, timestamp); },
            LwwElementSetOp::Remove(element, timestamp) => { self.remove(element, timestamp); },
        }
    }
}

impl <T> PartialEq for LwwElementSet<T> where T: Eq + Hash {
    fn eq(&self, other: &LwwElementSet<T>) -> bool {
        self.bias == other.bias && self.adds == other.adds && self.removes == other.removes
    }
}

impl <T> Eq for LwwElementSet<T> where T: Eq + Hash {}

impl <T> PartialOrd for LwwElementSet<T> where T: Eq + Hash {
    fn partial_cmp(&self, other: &LwwElementSet<T>) -> Option<Ordering> {
        if self.bias != other.bias {
            return None;
        }
        let self_is_covered = is_covered_by(&self.adds, &other.adds)
                           && is_covered_by(&self.removes, &other.removes);
        let other_is_covered = is_covered_by(&other.adds, &self.adds)
                            && is_covered_by(&other.removes, &self.removes);

        match (self_is_covered, other_is_covered) {
            (true, true) => Some(Equal),
            (true, false) => Some(Less),
            (false, true) => Some(Greater),
            (false, false) => None,
        }
    }
}

impl <T> Debug for LwwElementSet<T> where T: Debug + Eq + Hash {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.debug_struct("LwwElementSet")
         .field("bias", &self.bias)
         .field("present", &self.elements().collect::<Vec<_>>())
         .field("adds", &self.adds)
         .field("removes", &self.removes)
         .finish()
    }
}

#[cfg(any(test, feature = "quickcheck_generators"))]
impl <T> Arbitrary for LwwElementSet<T> where T: Arbitrary + Eq + Hash {
    fn arbitrary(g: &mut Gen) -> LwwElementSet<T> {
        LwwElementSet {
            bias: Arbitrary::arbitrary(g),
            adds: Arbitrary::arbitrary(g),
            removes: Arbitrary::arbitrary(g),
        }
    }
    fn shrink(&self) -> Box<dyn Iterator<Item = LwwElementSet<T>>> {
        let bias = self.bias;
        Box::new((self.adds.clone(), self.removes.clone())
                     .shrink()
                     .map(move |(adds, removes)| LwwElementSet { bias, adds, removes }))
    }
}

#[cfg(any(test, feature = "quickcheck_generators"))]
impl <T> Arbitrary for LwwElementSetOp<T> where T: Arbitrary {
    fn arbitrary(g: &mut Gen) -> LwwElementSetOp<T> {
        if bool::arbitrary(g) {
            LwwElementSetOp::Add(Arbitrary::arbitrary(g), Arbitrary::arbitrary(g))
        } else {
            LwwElementSetOp::Remove(Arbitrary::arbitrary(g), Arbitrary::arbitrary(g))
        }
    }
    fn shrink(&self) -> Box<dyn Iterator<Item = LwwElementSetOp<T>>> {
        match self.clone() {
            LwwElementSetOp::Add(element, timestamp) => {
                Box::new((element, timestamp).shrink().map(|(e, t)| LwwElementSetOp::Add(e, t)))
            }
            LwwElementSetOp::Remove(element, timestamp) => {
                Box::new((element, timestamp).shrink().map(|(e, t)| LwwElementSetOp::Remove(e, t)))
            }
        }
    }
}
