//! Closed time interval used to describe the span already ingested.

use chrono::{DateTime, Utc};

/// A closed, inclusive time interval: `[first, last]`.
///
/// `TimeRange` never mutates in place; `extend`/`contract` return a new
/// value. Two special constants act as the identity elements for the two
/// operations: [`TimeRange::EMPTY`] for `extend`, [`TimeRange::COMPLETE`] for
/// `contract`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    first: DateTime<Utc>,
    last: DateTime<Utc>,
}

impl TimeRange {
    /// Constructs a range from inclusive endpoints. Does not validate
    /// `first <= last`; an inverted range is simply empty (see
    /// [`TimeRange::is_empty`]).
    pub fn new(first: DateTime<Utc>, last: DateTime<Utc>) -> Self {
        Self { first, last }
    }

    /// The earliest representable instant paired with the latest: the
    /// identity element for [`TimeRange::extend`].
    pub fn empty() -> Self {
        Self {
            first: DateTime::<Utc>::MAX_UTC,
            last: DateTime::<Utc>::MIN_UTC,
        }
    }

    /// The full representable span: the identity element for
    /// [`TimeRange::contract`].
    pub fn complete() -> Self {
        Self {
            first: DateTime::<Utc>::MIN_UTC,
            last: DateTime::<Utc>::MAX_UTC,
        }
    }

    /// The first (earliest) instant in the range.
    pub fn first(&self) -> DateTime<Utc> {
        self.first
    }

    /// The last (latest) instant in the range.
    pub fn last(&self) -> DateTime<Utc> {
        self.last
    }

    /// `true` when `first > last`, i.e. there is no instant in the range.
    pub fn is_empty(&self) -> bool {
        self.first > self.last
    }

    /// Widens toward the earliest `first` and latest `last` of the two
    /// ranges. `self.extend(Self::empty()) == self`;
    /// `self.extend(Self::complete()) == Self::complete()`.
    pub fn extend(&self, other: &Self) -> Self {
        Self {
            first: self.first.min(other.first),
            last: self.last.max(other.last),
        }
    }

    /// Narrows toward the latest `first` and earliest `last` of the two
    /// ranges. `self.contract(Self::complete()) == self`;
    /// `self.contract(Self::empty()) == Self::empty()`.
    pub fn contract(&self, other: &Self) -> Self {
        Self {
            first: self.first.max(other.first),
            last: self.last.min(other.last),
        }
    }
}

impl Default for TimeRange {
    /// The default range is [`TimeRange::empty`], matching the convention
    /// that an unseeded range should absorb into whatever it is extended
    /// with.
    fn default() -> Self {
        Self::empty()
    }
}
