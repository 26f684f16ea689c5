//! The tie-break policy of a set.

use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

#[cfg(any(test, feature = "quickcheck_generators"))]
use quickcheck::{Arbitrary, Gen};

use crate::{Error, Timestamp};

/// Decides membership when an element was added and removed at exactly the
/// same timestamp.
///
/// The bias is chosen when a set is created and never changes. Only replicas
/// sharing a bias can be merged.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Bias {
    /// Ties keep the element in the set.
    #[default]
    Add,
    /// Ties drop the element from the set.
    Remove,
}

impl Bias {

    /// Returns whether an element added at `added` is a member, given the
    /// timestamp of its latest removal, if any.
    ///
    /// ```
    /// use lww_element_set::Bias;
    ///
    /// assert!(Bias::Remove.resolve(2, Some(1)));
    /// assert!(!Bias::Add.resolve(1, Some(2)));
    /// assert!(Bias::Add.resolve(1, Some(1)));
    /// assert!(!Bias::Remove.resolve(1, Some(1)));
    /// ```
    pub fn resolve(self, added: Timestamp, removed: Option<Timestamp>) -> bool {
        match removed.map(|removed| added.cmp(&removed)) {
            None | Some(Ordering::Greater) => true,
            Some(Ordering::Less) => false,
            Some(Ordering::Equal) => self == Bias::Add,
        }
    }
}

impl Display for Bias {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match *self {
            Bias::Add => f.write_str("add"),
            Bias::Remove => f.write_str("remove"),
        }
    }
}

/// Parses `add` or `remove`, ignoring case and surrounding whitespace.
impl FromStr for Bias {
    type Err = Error;

    fn from_str(s: &str) -> Result<Bias, Error> {
        let trimmed = s.trim();
        if trimmed.eq_ignore_ascii_case("add") {
            Ok(Bias::Add)
        } else if trimmed.eq_ignore_ascii_case("remove") {
            Ok(Bias::Remove)
        } else {
            Err(Error::UnknownBias(s.to_string()))
        }
    }
}

#[cfg(any(test, feature = "quickcheck_generators"))]
impl Arbitrary for Bias {
    fn arbitrary(g: &mut Gen) -> Bias {
        if bool::arbitrary(g) { Bias::Add } else { Bias::Remove }
    }
    fn shrink(&self) -> Box<dyn Iterator<Item = Bias>> {
        match *self {
            Bias::Add => quickcheck::empty_shrinker(),
            Bias::Remove => quickcheck::single_shrinker(Bias::Add),
        }
    }
}
