use std::{collections::VecDeque, iter::FusedIterator};

use shard_iter_store::traits::{Coordinate, ObjectType, StoreClient, StoredObject};

use super::{Source, concat::Concat, shard_iter::ShardObjects};
use crate::{error::Result, selector::VersionSelector};

enum Opening<I> {
    Pending,
    Open(Concat<I>),
    Done,
}

/// Every shard of one subgroup, in ascending shard order.
pub struct SubgroupObjects<'a, S: StoreClient + ?Sized> {
    source: Source<'a, S>,
    ty: ObjectType,
    subgroup: u32,
    selector: VersionSelector,
    state: Opening<ShardObjects<'a, S>>,
}

impl<'a, S: StoreClient + ?Sized> SubgroupObjects<'a, S> {
    pub(crate) fn new(
        source: Source<'a, S>,
        ty: ObjectType,
        subgroup: u32,
        selector: VersionSelector,
    ) -> Self {
        Self {
            source,
            ty,
            subgroup,
            selector,
            state: Opening::Pending,
        }
    }

    pub fn subgroup(&self) -> u32 {
        self.subgroup
    }

    /// Shards not fully drained yet. `None` until the shard count is known.
    pub fn shards_left(&self) -> Option<usize> {
        match &self.state {
            Opening::Pending => None,
            Opening::Open(shards) => Some(shards.parts_left()),
            Opening::Done => Some(0),
        }
    }

    fn open(&self) -> Result<Concat<ShardObjects<'a, S>>> {
        let count = self.source.shard_count(&self.ty, self.subgroup)?;
        tracing::debug!(ty = %self.ty, subgroup = self.subgroup, shards = count, "opening subgroup");

        let shards = (0..count)
            .map(|shard| {
                ShardObjects::new(
                    self.source.clone(),
                    self.ty.clone(),
                    Coordinate::new(self.subgroup, shard),
                    self.selector,
                )
            })
            .collect::<VecDeque<_>>();
        Ok(Concat::new(shards))
    }
}

impl<S: StoreClient + ?Sized> Iterator for SubgroupObjects<'_, S> {
    type Item = Result<StoredObject>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                Opening::Pending => match self.open() {
                    Ok(shards) => self.state = Opening::Open(shards),
                    Err(e) => {
                        self.state = Opening::Done;
                        return Some(Err(e));
                    }
                },
                Opening::Open(shards) => {
                    let item = shards.next();
                    if !matches!(item, Some(Ok(_))) {
                        self.state = Opening::Done;
                    }
                    return item;
                }
                Opening::Done => return None,
            }
        }
    }
}

impl<S: StoreClient + ?Sized> FusedIterator for SubgroupObjects<'_, S> {}

/// Every subgroup of one object type, in ascending subgroup order.
pub struct TypeObjects<'a, S: StoreClient + ?Sized> {
    source: Source<'a, S>,
    ty: ObjectType,
    selector: VersionSelector,
    state: Opening<SubgroupObjects<'a, S>>,
}

impl<'a, S: StoreClient + ?Sized> TypeObjects<'a, S> {
    pub(crate) fn new(source: Source<'a, S>, ty: ObjectType, selector: VersionSelector) -> Self {
        Self {
            source,
            ty,
            selector,
            state: Opening::Pending,
        }
    }

    fn open(&self) -> Result<Concat<SubgroupObjects<'a, S>>> {
        let count = self.source.subgroup_count(&self.ty)?;
        tracing::debug!(ty = %self.ty, subgroups = count, "opening object type");

        let subgroups = (0..count)
            .map(|subgroup| {
                SubgroupObjects::new(self.source.clone(), self.ty.clone(), subgroup, self.selector)
            })
            .collect::<VecDeque<_>>();
        Ok(Concat::new(subgroups))
    }
}

impl<S: StoreClient + ?Sized> Iterator for TypeObjects<'_, S> {
    type Item = Result<StoredObject>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                Opening::Pending => match self.open() {
                    Ok(subgroups) => self.state = Opening::Open(subgroups),
                    Err(e) => {
                        self.state = Opening::Done;
                        return Some(Err(e));
                    }
                },
                Opening::Open(subgroups) => {
                    let item = subgroups.next();
                    if !matches!(item, Some(Ok(_))) {
                        self.state = Opening::Done;
                    }
                    return item;
                }
                Opening::Done => return None,
            }
        }
    }
}

impl<S: StoreClient + ?Sized> FusedIterator for TypeObjects<'_, S> {}

#[cfg(test)]
mod tests {
    use itertools::Itertools;
    use rand::Rng;
    use shard_iter_store::{
        memory::StoreCall,
        traits::{Coordinate, ObjectType, Timestamp},
    };

    use crate::{
        StoreView,
        error::{Error, Result},
        selector::VersionSelector,
        test_utils::{fill, init_tracing_not_failed, kv, mem_store},
    };

    #[test]
    fn concatenates_shards_in_order() -> anyhow::Result<()> {
        init_tracing_not_failed();

        let store = mem_store(&[3]);
        fill(&store, Coordinate::new(0, 2), &[("z", "s2-z")])?;
        fill(&store, Coordinate::new(0, 0), &[("b", "s0-b"), ("a", "s0-a")])?;
        fill(&store, Coordinate::new(0, 1), &[("m", "s1-m")])?;

        let view = StoreView::new(&store);
        let values = view
            .subgroup(kv(), 0, VersionSelector::Latest)
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(values, vec!["s0-a", "s0-b", "s1-m", "s2-z"]);
        Ok(())
    }

    #[test]
    fn total_is_sum_of_shards() -> anyhow::Result<()> {
        let mut rng = rand::rng();
        let shards = rng.random_range(1..6u32);
        let store = mem_store(&[shards]);

        let mut expected = 0;
        for shard in 0..shards {
            let n = rng.random_range(0..12);
            expected += n;
            for i in 0..n {
                store.put(&kv(), Coordinate::new(0, shard), &format!("k{}", i), "v")?;
            }
        }

        let view = StoreView::new(&store);
        let mut iter = view.subgroup(kv(), 0, VersionSelector::Latest);
        let seen = iter
            .by_ref()
            .map(|v| v.map(|_| ()))
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(seen.len(), expected);
        assert!(iter.next().is_none());

        let listed = store
            .calls()
            .iter()
            .filter_map(|c| match c {
                StoreCall::ListKeys { coord, .. } => Some(coord.shard),
                _ => None,
            })
            .collect_vec();
        assert_eq!(listed, (0..shards).collect_vec());
        Ok(())
    }

    #[test]
    fn shard_failure_is_not_treated_as_exhaustion() -> anyhow::Result<()> {
        init_tracing_not_failed();

        let store = mem_store(&[2]);
        fill(&store, Coordinate::new(0, 0), &[("a", "1"), ("b", "2")])?;
        fill(&store, Coordinate::new(0, 1), &[("c", "3")])?;
        store.fail_gets_after(1);

        let view = StoreView::new(&store);
        let mut iter = view.subgroup_objects(kv(), 0, VersionSelector::Latest);
        assert!(matches!(iter.next(), Some(Ok(_))));
        assert!(matches!(iter.next(), Some(Err(Error::StoreUnavailable(_)))));
        assert!(iter.next().is_none());
        assert_eq!(iter.shards_left(), Some(0));

        // Shard 1 was never listed.
        assert!(!store.calls().iter().any(|c| matches!(
            c,
            StoreCall::ListKeys { coord, .. } if coord.shard == 1
        )));
        Ok(())
    }

    #[test]
    fn empty_shards_are_skipped() -> anyhow::Result<()> {
        let store = mem_store(&[4]);
        fill(&store, Coordinate::new(0, 3), &[("only", "x")])?;

        let view = StoreView::new(&store);
        let mut iter = view.subgroup_objects(kv(), 0, VersionSelector::Latest);
        assert_eq!(iter.subgroup(), 0);
        assert_eq!(iter.shards_left(), None);
        let obj = iter.next().transpose()?;
        assert_eq!(obj.map(|o| o.key), Some("only".to_string()));
        assert_eq!(iter.shards_left(), Some(1));
        assert!(iter.next().is_none());
        Ok(())
    }

    #[test]
    fn unknown_subgroup() {
        let store = mem_store(&[1]);
        let view = StoreView::new(&store);
        let mut iter = view.subgroup(kv(), 7, VersionSelector::Latest);
        assert!(matches!(
            iter.next(),
            Some(Err(Error::NoSuchPartition {
                subgroup: 7,
                shard: None
            }))
        ));
        assert!(iter.next().is_none());
    }

    #[test]
    fn subgroup_selector_is_validated_up_front() {
        let store = mem_store(&[2]);
        let view = StoreView::new(&store);
        assert!(matches!(
            view.subgroup_with(kv(), 0, None, None),
            Err(Error::InvalidSelectorCombination(_))
        ));
        assert!(store.calls().is_empty());
    }

    #[test]
    fn subgroup_by_time() -> anyhow::Result<()> {
        let store = mem_store(&[2]);
        store.put_at(&kv(), Coordinate::new(0, 0), "a", "early", Timestamp(10))?;
        store.put_at(&kv(), Coordinate::new(0, 1), "b", "late", Timestamp(50))?;

        let view = StoreView::new(&store);
        let values = view
            .subgroup_with(kv(), 0, None, Some(Timestamp(20)))?
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(values, vec!["early"]);
        Ok(())
    }

    #[test]
    fn walks_every_subgroup_of_a_type() -> anyhow::Result<()> {
        let store = mem_store(&[2, 0, 1]);
        fill(&store, Coordinate::new(2, 0), &[("c", "g2")])?;
        fill(&store, Coordinate::new(0, 1), &[("b", "g0s1")])?;
        fill(&store, Coordinate::new(0, 0), &[("a", "g0s0")])?;

        let view = StoreView::new(&store);
        let values = view
            .all_subgroups(kv(), VersionSelector::Latest)
            .collect::<Result<Vec<_>>>()?;
        assert_eq!(values, vec!["g0s0", "g0s1", "g2"]);
        Ok(())
    }

    #[test]
    fn type_walk_reports_unknown_type() {
        let store = mem_store(&[1]);
        let view = StoreView::new(&store);
        let mut iter = view.all_subgroups(ObjectType::new("missing"), VersionSelector::Latest);
        assert!(matches!(iter.next(), Some(Err(Error::UnknownType(ref ty))) if ty == "missing"));
        assert!(iter.next().is_none());
        assert_eq!(
            store.calls(),
            vec![StoreCall::SubgroupCount {
                ty: ObjectType::new("missing")
            }]
        );
    }

    #[test]
    fn type_walk_stops_at_first_shard_error() -> anyhow::Result<()> {
        init_tracing_not_failed();

        let store = mem_store(&[1, 1]);
        fill(&store, Coordinate::new(0, 0), &[("a", "1"), ("b", "2")])?;
        fill(&store, Coordinate::new(1, 0), &[("c", "3")])?;
        store.fail_gets_after(1);

        let view = StoreView::new(&store);
        let mut iter = view.all_subgroups_objects(kv(), VersionSelector::Latest);
        assert!(matches!(iter.next(), Some(Ok(ref obj)) if obj.key == "a"));
        assert!(matches!(iter.next(), Some(Err(Error::StoreUnavailable(_)))));
        assert!(iter.next().is_none());

        assert!(!store.calls().iter().any(|c| matches!(
            c,
            StoreCall::ShardCount { subgroup: 1, .. }
                | StoreCall::ListKeys {
                    coord: Coordinate { subgroup: 1, .. },
                    ..
                }
        )));
        Ok(())
    }
}
