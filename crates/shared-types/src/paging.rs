//! # Paging and Range Descriptors
//!
//! Page and range descriptors carried by `LoadPage*` / `LoadRange*` events
//! and tracked on each entity slice.
//!
//! A range comes in one of three shapes: start/end, first/last or
//! skip/take. Boundary arithmetic ("is this range subsequent to that
//! one?") is only defined for integral boundaries of the same shape.

use serde::{Deserialize, Serialize};

/// A page request or the currently tracked page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Page {
    /// Page number.
    pub page: u64,
    /// Page size.
    pub size: u64,
}

impl Page {
    /// Create a page descriptor.
    #[must_use]
    pub const fn new(page: u64, size: u64) -> Self {
        Self { page, size }
    }
}

/// Page descriptor plus the total number of pageable records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub page: Page,
    pub total_count: u64,
}

/// One boundary of a start/end or first/last range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeValue {
    /// Integral boundary (index, id, epoch millis).
    Number(i64),
    /// Textual boundary (e.g. an ISO date or a cursor).
    Text(String),
}

impl RangeValue {
    /// The integral value, if any.
    #[must_use]
    pub fn as_number(&self) -> Option<i64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl From<i64> for RangeValue {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

impl From<&str> for RangeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

/// A range request or the currently tracked range.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Range {
    /// Inclusive start/end boundaries.
    StartEnd { start: RangeValue, end: RangeValue },
    /// Inclusive first/last boundaries.
    FirstLast { first: RangeValue, last: RangeValue },
    /// Offset and count.
    SkipTake { skip: u64, take: u64 },
}

impl Range {
    /// Start/end range over integral boundaries.
    #[must_use]
    pub fn start_end(start: i64, end: i64) -> Self {
        Self::StartEnd {
            start: RangeValue::Number(start),
            end: RangeValue::Number(end),
        }
    }

    /// First/last range over integral boundaries.
    #[must_use]
    pub fn first_last(first: i64, last: i64) -> Self {
        Self::FirstLast {
            first: RangeValue::Number(first),
            last: RangeValue::Number(last),
        }
    }

    /// Skip/take range.
    #[must_use]
    pub const fn skip_take(skip: u64, take: u64) -> Self {
        Self::SkipTake { skip, take }
    }

    /// Integral start boundary (`start`, `first` or `skip`).
    #[must_use]
    pub fn start_boundary(&self) -> Option<i64> {
        match self {
            Self::StartEnd { start, .. } => start.as_number(),
            Self::FirstLast { first, .. } => first.as_number(),
            Self::SkipTake { skip, .. } => i64::try_from(*skip).ok(),
        }
    }

    /// Integral inclusive end boundary (`end`, `last`, or `skip + take - 1`).
    #[must_use]
    pub fn end_boundary(&self) -> Option<i64> {
        match self {
            Self::StartEnd { end, .. } => end.as_number(),
            Self::FirstLast { last, .. } => last.as_number(),
            Self::SkipTake { skip, take } => {
                let end = i64::try_from(skip.checked_add(*take)?).ok()?;
                end.checked_sub(1)
            }
        }
    }

    /// Returns true if both ranges use the same shape.
    #[must_use]
    pub fn same_shape(&self, other: &Range) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    /// Returns true if this range starts right after `previous` ends:
    /// `self.start == previous.end + 1`, same shape, integral boundaries.
    #[must_use]
    pub fn is_subsequent_to(&self, previous: &Range) -> bool {
        if !self.same_shape(previous) {
            return false;
        }
        match (self.start_boundary(), previous.end_boundary()) {
            (Some(start), Some(end)) => end.checked_add(1) == Some(start),
            _ => false,
        }
    }
}

/// Range descriptor plus the total number of pageable records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeInfo {
    pub range: Range,
    pub total_count: u64,
}
