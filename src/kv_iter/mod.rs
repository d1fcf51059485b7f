use std::{collections::VecDeque, sync::Arc};

use shard_iter_store::traits::{
    Coordinate, ObjectType, ReadAt, StoreClient, StoredObject, Version,
};

use crate::{error::Result, options::ViewOptions, selector::VersionSelector};

mod concat;
mod history_iter;
mod shard_iter;
mod subgroup_iter;
mod values;

pub mod prelude {
    pub use super::{
        HistoryIter, ShardIter, SubgroupIter, TypeIter,
        history_iter::HistoryObjects,
        shard_iter::{ShardKeys, ShardObjects},
        subgroup_iter::{SubgroupObjects, TypeObjects},
        values::{Values, decode},
    };
}

pub type ShardIter<'a, S> = values::Values<shard_iter::ShardObjects<'a, S>>;
pub type HistoryIter<'a, S> = values::Values<history_iter::HistoryObjects<'a, S>>;
pub type SubgroupIter<'a, S> = values::Values<subgroup_iter::SubgroupObjects<'a, S>>;
pub type TypeIter<'a, S> = values::Values<subgroup_iter::TypeObjects<'a, S>>;

/// Borrowed store handle plus the options every blocking wait obeys.
pub(crate) struct Source<'a, S: StoreClient + ?Sized> {
    store: &'a S,
    options: Arc<ViewOptions>,
}

impl<S: StoreClient + ?Sized> Clone for Source<'_, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            options: self.options.clone(),
        }
    }
}

impl<'a, S: StoreClient + ?Sized> Source<'a, S> {
    pub(crate) fn new(store: &'a S, options: Arc<ViewOptions>) -> Self {
        Self { store, options }
    }

    pub(crate) fn options(&self) -> &ViewOptions {
        &self.options
    }

    pub(crate) fn list_keys(
        &self,
        ty: &ObjectType,
        selector: VersionSelector,
        coord: Coordinate,
    ) -> Result<VecDeque<String>> {
        let reply = match selector {
            VersionSelector::Version(v) => self.store.list_keys(ty, v, coord),
            VersionSelector::Latest => self.store.list_keys(ty, Version::CURRENT, coord),
            VersionSelector::Time(ts) => self.store.list_keys_by_time(ty, ts, coord),
        };
        self.options.wait(reply).map(VecDeque::from)
    }

    pub(crate) fn get(
        &self,
        ty: &ObjectType,
        key: &str,
        at: ReadAt,
        coord: Coordinate,
    ) -> Result<StoredObject> {
        tracing::trace!(%ty, ?coord, key, ?at, "point read");
        self.options.wait(self.store.get(ty, key, at, coord))
    }

    pub(crate) fn shard_count(&self, ty: &ObjectType, subgroup: u32) -> Result<u32> {
        self.options.wait(self.store.shard_count(ty, subgroup))
    }

    pub(crate) fn subgroup_count(&self, ty: &ObjectType) -> Result<u32> {
        self.options.wait(self.store.subgroup_count(ty))
    }
}

