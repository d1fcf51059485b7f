use shard_iter_store::traits::{ReadAt, Timestamp, Version};

use crate::error::{Error, Result};

/// Pins the point in time an iterator reads at. Exactly one mode is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionSelector {
    Version(Version),
    Time(Timestamp),
    Latest,
}

impl VersionSelector {
    /// Builds a selector from loosely supplied inputs, for callers that carry
    /// both a version and a timestamp slot. Exactly one must be set.
    pub fn from_parts(version: Option<Version>, ts: Option<Timestamp>) -> Result<Self> {
        match (version, ts) {
            (Some(version), None) => Ok(Self::Version(version)),
            (None, Some(ts)) => Ok(Self::Time(ts)),
            (Some(_), Some(_)) => Err(Error::InvalidSelectorCombination(
                "both a version and a timestamp were supplied",
            )),
            (None, None) => Err(Error::InvalidSelectorCombination(
                "neither a version nor a timestamp was supplied",
            )),
        }
    }

    /// The point read issued for every key under this selector. Time mode
    /// keeps the timestamp all the way down to the point read.
    pub fn read_at(&self) -> ReadAt {
        match *self {
            Self::Version(v) => ReadAt::Version(v),
            Self::Time(ts) => ReadAt::Time(ts),
            Self::Latest => ReadAt::Version(Version::CURRENT),
        }
    }
}

impl From<Version> for VersionSelector {
    fn from(value: Version) -> Self {
        Self::Version(value)
    }
}

impl From<Timestamp> for VersionSelector {
    fn from(value: Timestamp) -> Self {
        Self::Time(value)
    }
}
