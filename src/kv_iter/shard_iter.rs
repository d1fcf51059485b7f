use std::{collections::VecDeque, iter::FusedIterator};

use shard_iter_store::traits::{Coordinate, ObjectType, StoreClient, StoredObject};

use super::Source;
use crate::{error::Result, selector::VersionSelector};

enum KeysState {
    Pending,
    Listed(VecDeque<String>),
    Done,
}

/// Keys of one shard, listed once on the first pull and handed out in order.
pub struct ShardKeys<'a, S: StoreClient + ?Sized> {
    source: Source<'a, S>,
    ty: ObjectType,
    coord: Coordinate,
    selector: VersionSelector,
    state: KeysState,
}

impl<'a, S: StoreClient + ?Sized> ShardKeys<'a, S> {
    pub(crate) fn new(
        source: Source<'a, S>,
        ty: ObjectType,
        coord: Coordinate,
        selector: VersionSelector,
    ) -> Self {
        Self {
            source,
            ty,
            coord,
            selector,
            state: KeysState::Pending,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.coord
    }

    /// Keys not handed out yet. `None` until the listing has been issued.
    pub fn remaining(&self) -> Option<usize> {
        match &self.state {
            KeysState::Pending => None,
            KeysState::Listed(keys) => Some(keys.len()),
            KeysState::Done => Some(0),
        }
    }
}

impl<S: StoreClient + ?Sized> Iterator for ShardKeys<'_, S> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match &mut self.state {
                KeysState::Pending => {
                    match self.source.list_keys(&self.ty, self.selector, self.coord) {
                        Ok(keys) => {
                            tracing::debug!(
                                ty = %self.ty,
                                coord = ?self.coord,
                                selector = ?self.selector,
                                keys = keys.len(),
                                "listed shard keys"
                            );
                            self.state = KeysState::Listed(keys);
                        }
                        Err(e) => {
                            self.state = KeysState::Done;
                            return Some(Err(e));
                        }
                    }
                }
                KeysState::Listed(keys) => match keys.pop_front() {
                    Some(key) => return Some(Ok(key)),
                    None => {
                        self.state = KeysState::Done;
                        return None;
                    }
                },
                KeysState::Done => return None,
            }
        }
    }
}

impl<S: StoreClient + ?Sized> FusedIterator for ShardKeys<'_, S> {}

/// Every object of one shard under a single version selector.
pub struct ShardObjects<'a, S: StoreClient + ?Sized> {
    keys: ShardKeys<'a, S>,
    failed: bool,
}

impl<'a, S: StoreClient + ?Sized> ShardObjects<'a, S> {
    pub(crate) fn new(
        source: Source<'a, S>,
        ty: ObjectType,
        coord: Coordinate,
        selector: VersionSelector,
    ) -> Self {
        Self {
            keys: ShardKeys::new(source, ty, coord, selector),
            failed: false,
        }
    }

    pub fn coordinate(&self) -> Coordinate {
        self.keys.coordinate()
    }

    pub fn remaining(&self) -> Option<usize> {
        if self.failed {
            return Some(0);
        }
        self.keys.remaining()
    }
}

impl<S: StoreClient + ?Sized> Iterator for ShardObjects<'_, S> {
    type Item = Result<StoredObject>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let res = self.keys.next()?.and_then(|key| {
            let keys = &self.keys;
            keys.source
                .get(&keys.ty, &key, keys.selector.read_at(), keys.coord)
        });
        if res.is_err() {
            self.failed = true;
        }
        Some(res)
    }
}

impl<S: StoreClient + ?Sized> FusedIterator for ShardObjects<'_, S> {}
