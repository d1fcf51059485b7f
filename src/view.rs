use std::sync::Arc;

use shard_iter_store::traits::{Coordinate, ObjectType, StoreClient, Timestamp, Version};

use crate::{
    error::Result,
    kv_iter::{
        HistoryIter, ShardIter, Source, SubgroupIter, TypeIter,
        prelude::{HistoryObjects, ShardKeys, ShardObjects, SubgroupObjects, TypeObjects, Values},
    },
    options::ViewOptions,
    selector::VersionSelector,
};

/// Entry point for iterating a store.
///
/// The view only borrows the store handle, so any number of views and
/// iterators can read through the same client at once.
pub struct StoreView<'a, S: StoreClient + ?Sized> {
    store: &'a S,
    options: Arc<ViewOptions>,
}

impl<S: StoreClient + ?Sized> Clone for StoreView<'_, S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store,
            options: self.options.clone(),
        }
    }
}

impl<'a, S: StoreClient + ?Sized> StoreView<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self::with_options(store, Arc::new(ViewOptions::default()))
    }

    pub fn with_options(store: &'a S, options: Arc<ViewOptions>) -> Self {
        Self { store, options }
    }

    fn source(&self) -> Source<'a, S> {
        Source::new(self.store, self.options.clone())
    }

    pub fn shard(
        &self,
        ty: impl Into<ObjectType>,
        coord: Coordinate,
        selector: VersionSelector,
    ) -> ShardIter<'a, S> {
        Values::new(self.shard_objects(ty, coord, selector))
    }

    pub fn shard_objects(
        &self,
        ty: impl Into<ObjectType>,
        coord: Coordinate,
        selector: VersionSelector,
    ) -> ShardObjects<'a, S> {
        ShardObjects::new(self.source(), ty.into(), coord, selector)
    }

    /// Shard iterator from separately supplied version and timestamp. Exactly
    /// one must be set; nothing is sent to the store otherwise.
    pub fn shard_with(
        &self,
        ty: impl Into<ObjectType>,
        coord: Coordinate,
        version: Option<Version>,
        ts: Option<Timestamp>,
    ) -> Result<ShardIter<'a, S>> {
        let selector = VersionSelector::from_parts(version, ts)?;
        Ok(self.shard(ty, coord, selector))
    }

    pub fn shard_keys(
        &self,
        ty: impl Into<ObjectType>,
        coord: Coordinate,
        selector: VersionSelector,
    ) -> ShardKeys<'a, S> {
        ShardKeys::new(self.source(), ty.into(), coord, selector)
    }

    /// Reusable description of a shard scan. Each iteration over it takes a
    /// fresh key snapshot.
    pub fn shard_query(
        &self,
        ty: impl Into<ObjectType>,
        coord: Coordinate,
        selector: VersionSelector,
    ) -> ShardQuery<'a, S> {
        ShardQuery {
            view: self.clone(),
            ty: ty.into(),
            coord,
            selector,
        }
    }

    pub fn history(
        &self,
        ty: impl Into<ObjectType>,
        coord: Coordinate,
        key: impl Into<String>,
        start: VersionSelector,
    ) -> HistoryIter<'a, S> {
        Values::new(self.history_objects(ty, coord, key, start))
    }

    pub fn history_objects(
        &self,
        ty: impl Into<ObjectType>,
        coord: Coordinate,
        key: impl Into<String>,
        start: VersionSelector,
    ) -> HistoryObjects<'a, S> {
        HistoryObjects::new(self.source(), ty.into(), coord, key.into(), start)
    }

    pub fn subgroup(
        &self,
        ty: impl Into<ObjectType>,
        subgroup: u32,
        selector: VersionSelector,
    ) -> SubgroupIter<'a, S> {
        Values::new(self.subgroup_objects(ty, subgroup, selector))
    }

    pub fn subgroup_objects(
        &self,
        ty: impl Into<ObjectType>,
        subgroup: u32,
        selector: VersionSelector,
    ) -> SubgroupObjects<'a, S> {
        SubgroupObjects::new(self.source(), ty.into(), subgroup, selector)
    }

    pub fn subgroup_with(
        &self,
        ty: impl Into<ObjectType>,
        subgroup: u32,
        version: Option<Version>,
        ts: Option<Timestamp>,
    ) -> Result<SubgroupIter<'a, S>> {
        let selector = VersionSelector::from_parts(version, ts)?;
        Ok(self.subgroup(ty, subgroup, selector))
    }

    pub fn all_subgroups(
        &self,
        ty: impl Into<ObjectType>,
        selector: VersionSelector,
    ) -> TypeIter<'a, S> {
        Values::new(self.all_subgroups_objects(ty, selector))
    }

    pub fn all_subgroups_objects(
        &self,
        ty: impl Into<ObjectType>,
        selector: VersionSelector,
    ) -> TypeObjects<'a, S> {
        TypeObjects::new(self.source(), ty.into(), selector)
    }
}

pub struct ShardQuery<'a, S: StoreClient + ?Sized> {
    view: StoreView<'a, S>,
    ty: ObjectType,
    coord: Coordinate,
    selector: VersionSelector,
}

impl<S: StoreClient + ?Sized> Clone for ShardQuery<'_, S> {
    fn clone(&self) -> Self {
        Self {
            view: self.view.clone(),
            ty: self.ty.clone(),
            coord: self.coord,
            selector: self.selector,
        }
    }
}

impl<'a, S: StoreClient + ?Sized> IntoIterator for &ShardQuery<'a, S> {
    type Item = Result<String>;
    type IntoIter = ShardIter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.view.shard(self.ty.clone(), self.coord, self.selector)
    }
}

impl<'a, S: StoreClient + ?Sized> IntoIterator for ShardQuery<'a, S> {
    type Item = Result<String>;
    type IntoIter = ShardIter<'a, S>;

    fn into_iter(self) -> Self::IntoIter {
        self.view.shard(self.ty, self.coord, self.selector)
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use shard_iter_store::{
        memory::{MemStore, StoreCall},
        traits::{Coordinate, StoreClient},
    };

    use super::StoreView;
    use crate::{
        error::{Error, Result},
        options::ViewOpenOptions,
        selector::VersionSelector,
        test_utils::{fill, kv, mem_store},
    };

    #[test]
    fn query_takes_fresh_snapshots() -> anyhow::Result<()> {
        let store = mem_store(&[1]);
        let coord = Coordinate::new(0, 0);
        fill(&store, coord, &[("a", "1")])?;

        let view = StoreView::new(&store);
        let query = view.shard_query(kv(), coord, VersionSelector::Latest);
        let first = (&query).into_iter().collect::<Result<Vec<_>>>()?;
        assert_eq!(first, vec!["1"]);

        fill(&store, coord, &[("b", "2")])?;
        let second = query.into_iter().collect::<Result<Vec<_>>>()?;
        assert_eq!(second, vec!["1", "2"]);

        let listings = store
            .calls()
            .into_iter()
            .filter(|c| matches!(c, StoreCall::ListKeys { .. }))
            .count();
        assert_eq!(listings, 2);
        Ok(())
    }

    #[test]
    fn reply_timeout_maps_to_unavailable() -> anyhow::Result<()> {
        let store = mem_store(&[1]);
        let coord = Coordinate::new(0, 0);
        fill(&store, coord, &[("a", "1")])?;
        store.set_reply_delay(Some(Duration::from_millis(200)));

        let view = ViewOpenOptions::new()
            .reply_timeout(Duration::from_millis(5))
            .open(&store)?;
        let mut iter = view.shard(kv(), coord, VersionSelector::Latest);
        assert!(matches!(iter.next(), Some(Err(Error::StoreUnavailable(_)))));
        assert!(iter.next().is_none());
        Ok(())
    }

    #[test]
    fn delayed_replies_within_timeout() -> anyhow::Result<()> {
        let store = mem_store(&[1]);
        let coord = Coordinate::new(0, 0);
        fill(&store, coord, &[("a", "1")])?;
        store.set_reply_delay(Some(Duration::from_millis(5)));

        let view = ViewOpenOptions::new()
            .reply_timeout(Duration::from_secs(5))
            .open(&store)?;
        let values = view
            .shard(kv(), coord, VersionSelector::Latest)
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(values, vec!["1"]);
        Ok(())
    }

    #[test]
    fn works_through_trait_objects() -> anyhow::Result<()> {
        let store = mem_store(&[1]);
        let coord = Coordinate::new(0, 0);
        fill(&store, coord, &[("a", "1")])?;

        let store: Arc<dyn StoreClient> = Arc::new(store);
        let view = StoreView::new(&*store);
        let values = view
            .shard(kv(), coord, VersionSelector::Latest)
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(values, vec!["1"]);
        Ok(())
    }

    #[test]
    fn views_share_one_store_across_threads() -> anyhow::Result<()> {
        let store = MemStore::new().with_type(kv(), &[4]);
        for shard in 0..4 {
            fill(&store, Coordinate::new(0, shard), &[("k", "v")])?;
        }

        let view = StoreView::new(&store);
        std::thread::scope(|s| {
            let handles = (0..4)
                .map(|shard| {
                    let view = view.clone();
                    s.spawn(move || {
                        view.shard(kv(), Coordinate::new(0, shard), VersionSelector::Latest)
                            .count()
                    })
                })
                .collect::<Vec<_>>();
            for handle in handles {
                assert_eq!(handle.join().unwrap(), 1);
            }
        });
        Ok(())
    }
}
