//! Partitioning of large ordered collections into bounded subgroups.
//!
//! A collection of `count` elements under limit `L` is split into at most
//! `L` contiguous groups whose size is the smallest power of `L` that fits.
//! Each group is regrouped by the same rule when it is expanded, which yields
//! a balanced `L`-ary layer structure of depth `ceil(log_L(count))`.

use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Maximum number of children a node exposes before its elements are grouped.
///
/// Zero disables grouping. A limit of one cannot bound anything (every group
/// would have to hold the whole collection again), so it is raised to two.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "u64", into = "u64")]
pub struct GroupLimit(u64);

impl GroupLimit {
    pub const DISABLED: GroupLimit = GroupLimit(0);

    pub const fn new(limit: u64) -> Self {
        if limit == 1 {
            Self(2)
        } else {
            Self(limit)
        }
    }

    pub const fn get(self) -> u64 {
        self.0
    }

    pub const fn is_disabled(self) -> bool {
        self.0 == 0
    }
}

impl From<u64> for GroupLimit {
    fn from(limit: u64) -> Self {
        Self::new(limit)
    }
}

impl From<GroupLimit> for u64 {
    fn from(limit: GroupLimit) -> Self {
        limit.0
    }
}

/// True if `count` children exceed the limit and grouping is enabled.
pub fn needs_subgrouping(limit: GroupLimit, count: u64) -> bool {
    !limit.is_disabled() && count > limit.get()
}

/// Number of elements covered by each subgroup (1 when no grouping applies).
pub fn subgroup_size(limit: GroupLimit, count: u64) -> u64 {
    if !needs_subgrouping(limit, count) {
        return 1;
    }
    let mut size = 1u64;
    while count.div_ceil(size) > limit.get() {
        size = size.saturating_mul(limit.get());
    }
    size
}

/// Number of immediate children for a collection of `count` elements.
pub fn subgroup_count(limit: GroupLimit, count: u64) -> u64 {
    count.div_ceil(subgroup_size(limit, count))
}

/// Half-open element range covered by the `i`th subgroup.
pub fn subgroup_range(limit: GroupLimit, count: u64, i: u64) -> Range<u64> {
    let size = subgroup_size(limit, count);
    let start = i.saturating_mul(size).min(count);
    let end = start.saturating_add(size).min(count);
    start..end
}

/// All subgroup ranges of a collection, in order.
pub fn subgroups(limit: GroupLimit, count: u64) -> impl Iterator<Item = Range<u64>> {
    let size = subgroup_size(limit, count);
    (0..count.div_ceil(size)).map(move |i| {
        let start = i * size;
        start..start.saturating_add(size).min(count)
    })
}

/// Display label of a subgroup: absolute, inclusive bounds.
pub fn subgroup_name(offset: u64, range: &Range<u64>) -> String {
    format!(
        "[{} - {}]",
        offset + range.start,
        offset + range.end.saturating_sub(1)
    )
}
