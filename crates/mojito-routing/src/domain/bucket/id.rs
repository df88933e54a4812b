//! Prefix arithmetic for bucket ranges.

use std::fmt;

use crate::domain::kuid::{Kuid, KUID_BITS};

/// A bucket's coordinates in the trie: the first `depth` bits of `prefix`.
///
/// The range covered is `[prefix, prefix | ones(depth..)]`. Ordering by
/// `prefix` orders disjoint ranges by their position in the id space.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BucketId {
    prefix: Kuid,
    depth: usize,
}

impl BucketId {
    /// The bucket spanning the whole id space.
    pub const ROOT: BucketId = BucketId {
        prefix: Kuid::MIN,
        depth: 0,
    };

    /// Bits past `depth` are cleared.
    pub fn new(prefix: Kuid, depth: usize) -> Self {
        let depth = depth.min(KUID_BITS);
        Self {
            prefix: prefix.truncate(depth),
            depth,
        }
    }

    pub fn prefix(&self) -> &Kuid {
        &self.prefix
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Lowest id in the range.
    pub fn first(&self) -> Kuid {
        self.prefix
    }

    /// Highest id in the range.
    pub fn last(&self) -> Kuid {
        self.prefix.fill_from(self.depth)
    }

    pub fn contains(&self, id: &Kuid) -> bool {
        self.depth == 0 || id.common_prefix_len(&self.prefix) >= self.depth
    }

    /// The two children along bit `depth`. `None` at full depth.
    pub fn split(&self) -> Option<(BucketId, BucketId)> {
        if self.depth >= KUID_BITS {
            return None;
        }
        let left = BucketId {
            prefix: self.prefix,
            depth: self.depth + 1,
        };
        let right = BucketId {
            prefix: self.prefix.set_bit(self.depth),
            depth: self.depth + 1,
        };
        Some((left, right))
    }

    /// Smallest XOR distance from `target` to any id in the range.
    ///
    /// Ranges of disjoint buckets map to disjoint distance intervals, so this
    /// key orders buckets by proximity without overlap.
    pub fn min_distance(&self, target: &Kuid) -> Kuid {
        target.xor(&self.prefix).truncate(self.depth)
    }

    /// A random id inside the range.
    pub fn random_id(&self) -> Kuid {
        Kuid::random_with_prefix(&self.prefix, self.depth)
    }
}

impl fmt::Display for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.prefix, self.depth)
    }
}

impl fmt::Debug for BucketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BucketId({self})")
    }
}
