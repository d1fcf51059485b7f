use std::{iter::FusedIterator, mem};

use shard_iter_store::traits::{Coordinate, ObjectType, ReadAt, StoreClient, StoredObject};

use super::Source;
use crate::{
    error::{Error, Result},
    selector::VersionSelector,
};

enum HistoryState {
    Active(ReadAt),
    /// The last value was handed out but its back-reference is unusable.
    Broken(Error),
    Exhausted,
}

/// Walks one key's versions from the starting point back to the oldest one.
pub struct HistoryObjects<'a, S: StoreClient + ?Sized> {
    source: Source<'a, S>,
    ty: ObjectType,
    coord: Coordinate,
    key: String,
    state: HistoryState,
}

impl<'a, S: StoreClient + ?Sized> HistoryObjects<'a, S> {
    pub(crate) fn new(
        source: Source<'a, S>,
        ty: ObjectType,
        coord: Coordinate,
        key: String,
        start: VersionSelector,
    ) -> Self {
        Self {
            source,
            ty,
            coord,
            key,
            state: HistoryState::Active(start.read_at()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self.state, HistoryState::Exhausted)
    }

    fn step(&self, obj: &StoredObject) -> HistoryState {
        if obj.is_oldest() {
            tracing::debug!(key = %self.key, version = %obj.version, "reached oldest version");
            return HistoryState::Exhausted;
        }
        let previous = obj.previous_version_by_key();
        if self.source.options().verify_chain && previous >= obj.version {
            return HistoryState::Broken(Error::BrokenVersionChain {
                key: self.key.clone(),
                version: obj.version,
                previous,
            });
        }
        HistoryState::Active(ReadAt::Version(previous))
    }
}

impl<S: StoreClient + ?Sized> Iterator for HistoryObjects<'_, S> {
    type Item = Result<StoredObject>;

    fn next(&mut self) -> Option<Self::Item> {
        match mem::replace(&mut self.state, HistoryState::Exhausted) {
            HistoryState::Exhausted => None,
            HistoryState::Broken(e) => Some(Err(e)),
            HistoryState::Active(at) => {
                let res = self.source.get(&self.ty, &self.key, at, self.coord);
                if let Ok(ref obj) = res {
                    self.state = self.step(obj);
                }
                Some(res)
            }
        }
    }
}

impl<S: StoreClient + ?Sized> FusedIterator for HistoryObjects<'_, S> {}
