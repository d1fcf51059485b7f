use std::{
    collections::{BTreeMap, HashMap},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::Duration,
};

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use crate::{
    error::{StoreError, StoreResult},
    reply::Reply,
    traits::{
        Coordinate, NO_PREVIOUS_VERSION, ObjectType, ReadAt, StoreClient, StoredObject, Timestamp,
        Version,
    },
};

pub mod prelude {
    pub use super::{MemStore, StoreCall};
}

/// Version 1 is the sentinel back-reference, so real versions start above it.
const FIRST_VERSION: u64 = 2;

/// One request as observed by [`MemStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreCall {
    ListKeys {
        ty: ObjectType,
        version: Version,
        coord: Coordinate,
    },
    ListKeysByTime {
        ty: ObjectType,
        ts: Timestamp,
        coord: Coordinate,
    },
    Get {
        ty: ObjectType,
        key: String,
        at: ReadAt,
        coord: Coordinate,
    },
    ShardCount {
        ty: ObjectType,
        subgroup: u32,
    },
    SubgroupCount {
        ty: ObjectType,
    },
}

#[derive(Debug, Clone)]
struct Record {
    object: StoredObject,
    deleted: bool,
}

#[derive(Debug, Default)]
struct Shard {
    // Each history is sorted by ascending version.
    keys: BTreeMap<String, Vec<Record>>,
}

impl Shard {
    fn resolve(&self, key: &str, at: ReadAt) -> Option<&Record> {
        let history = self.keys.get(key)?;
        match at {
            ReadAt::Version(v) => history.iter().rev().find(|r| r.object.version <= v),
            ReadAt::Time(ts) => history.iter().rev().find(|r| r.object.timestamp <= ts),
        }
    }

    fn live_keys(&self, at: ReadAt) -> Vec<String> {
        self.keys
            .keys()
            .filter(|key| self.resolve(key, at).is_some_and(|r| !r.deleted))
            .cloned()
            .collect()
    }
}

#[derive(Debug, Default)]
struct Faults {
    gets_left: Mutex<Option<usize>>,
    fail_next_listing: AtomicBool,
}

/// In-process [`StoreClient`] holding every version of every key.
#[derive(Debug)]
pub struct MemStore {
    layout: RwLock<HashMap<ObjectType, Vec<u32>>>,
    shards: RwLock<HashMap<(ObjectType, Coordinate), Shard>>,
    next_version: AtomicU64,
    last_ts: Mutex<Timestamp>,
    faults: Faults,
    reply_delay: Mutex<Option<Duration>>,
    calls: Mutex<Vec<StoreCall>>,
}

impl Default for MemStore {
    fn default() -> Self {
        Self {
            layout: RwLock::default(),
            shards: RwLock::default(),
            next_version: AtomicU64::new(FIRST_VERSION),
            last_ts: Mutex::new(Timestamp(0)),
            faults: Faults::default(),
            reply_delay: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `ty` with `shards[i]` shards in subgroup `i`.
    pub fn with_type(self, ty: impl Into<ObjectType>, shards: &[u32]) -> Self {
        self.layout.write().insert(ty.into(), shards.to_vec());
        self
    }

    pub fn put(
        &self,
        ty: &ObjectType,
        coord: Coordinate,
        key: &str,
        value: impl Into<Bytes>,
    ) -> StoreResult<Version> {
        let ts = self.next_timestamp(None);
        self.append(ty, coord, key, value.into(), ts, false)
    }

    /// Like [`MemStore::put`] with a caller-chosen write time. A time older
    /// than the key's newest write is raised to that write's time.
    pub fn put_at(
        &self,
        ty: &ObjectType,
        coord: Coordinate,
        key: &str,
        value: impl Into<Bytes>,
        ts: Timestamp,
    ) -> StoreResult<Version> {
        let ts = self.next_timestamp(Some(ts));
        self.append(ty, coord, key, value.into(), ts, false)
    }

    /// Writes a tombstone version; later listings skip the key.
    pub fn remove(&self, ty: &ObjectType, coord: Coordinate, key: &str) -> StoreResult<Version> {
        let ts = self.next_timestamp(None);
        self.append(ty, coord, key, Bytes::new(), ts, true)
    }

    /// Stores `object` exactly as given, back-reference included.
    pub fn insert_raw(
        &self,
        ty: &ObjectType,
        coord: Coordinate,
        object: StoredObject,
    ) -> StoreResult<()> {
        self.check_partition(ty, coord)?;
        self.next_version
            .fetch_max(object.version.0.saturating_add(1), Ordering::SeqCst);

        let mut shards = self.shards.write();
        let history = shards
            .entry((ty.clone(), coord))
            .or_default()
            .keys
            .entry(object.key.clone())
            .or_default();
        let pos = history.partition_point(|r| r.object.version < object.version);
        history.insert(
            pos,
            Record {
                object,
                deleted: false,
            },
        );
        Ok(())
    }

    /// Lets the next `n` point reads succeed and fails every one after.
    pub fn fail_gets_after(&self, n: usize) {
        *self.faults.gets_left.lock() = Some(n);
    }

    pub fn fail_next_listing(&self) {
        self.faults.fail_next_listing.store(true, Ordering::SeqCst);
    }

    pub fn clear_faults(&self) {
        *self.faults.gets_left.lock() = None;
        self.faults.fail_next_listing.store(false, Ordering::SeqCst);
    }

    /// Serves every reply from a helper thread after `delay`.
    pub fn set_reply_delay(&self, delay: Option<Duration>) {
        *self.reply_delay.lock() = delay;
    }

    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.lock().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    fn next_timestamp(&self, wanted: Option<Timestamp>) -> Timestamp {
        let mut last = self.last_ts.lock();
        let ts = match wanted {
            Some(ts) => ts,
            None => Timestamp(Timestamp::now().0.max(last.0.saturating_add(1))),
        };
        *last = (*last).max(ts);
        ts
    }

    fn append(
        &self,
        ty: &ObjectType,
        coord: Coordinate,
        key: &str,
        payload: Bytes,
        timestamp: Timestamp,
        deleted: bool,
    ) -> StoreResult<Version> {
        self.check_partition(ty, coord)?;

        let mut shards = self.shards.write();
        let history = shards
            .entry((ty.clone(), coord))
            .or_default()
            .keys
            .entry(key.to_string())
            .or_default();

        let version = Version(self.next_version.fetch_add(1, Ordering::SeqCst));
        // Chains skip tombstones so every link stays readable.
        let previous_version = history
            .iter()
            .rev()
            .find(|r| !r.deleted)
            .map(|r| r.object.version)
            .unwrap_or(NO_PREVIOUS_VERSION);
        let timestamp = history
            .last()
            .map_or(timestamp, |r| r.object.timestamp.max(timestamp));
        history.push(Record {
            object: StoredObject {
                key: key.to_string(),
                version,
                previous_version,
                timestamp,
                payload,
            },
            deleted,
        });

        tracing::trace!(%ty, ?coord, key, %version, deleted, "mem store write");
        Ok(version)
    }

    fn check_partition(&self, ty: &ObjectType, coord: Coordinate) -> StoreResult<()> {
        let layout = self.layout.read();
        let subgroups = layout
            .get(ty)
            .ok_or_else(|| StoreError::UnknownType(ty.to_string()))?;
        match subgroups.get(coord.subgroup as usize) {
            Some(&shards) if coord.shard < shards => Ok(()),
            Some(_) => Err(StoreError::NoSuchPartition {
                subgroup: coord.subgroup,
                shard: Some(coord.shard),
            }),
            None => Err(StoreError::NoSuchPartition {
                subgroup: coord.subgroup,
                shard: None,
            }),
        }
    }

    fn record(&self, call: StoreCall) {
        self.calls.lock().push(call);
    }

    fn respond<T: Send + 'static>(&self, res: StoreResult<T>) -> Reply<T> {
        let Some(delay) = *self.reply_delay.lock() else {
            return Reply::ready(res);
        };

        let (replier, reply) = Reply::channel();
        std::thread::spawn(move || {
            std::thread::sleep(delay);
            replier.send(res);
        });
        reply
    }

    fn take_listing_fault(&self) -> StoreResult<()> {
        if self.faults.fail_next_listing.swap(false, Ordering::SeqCst) {
            return Err(StoreError::Unavailable("injected listing failure".into()));
        }
        Ok(())
    }

    fn take_get_fault(&self) -> StoreResult<()> {
        let mut left = self.faults.gets_left.lock();
        match left.as_mut() {
            Some(0) => Err(StoreError::Unavailable("injected get failure".into())),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
            None => Ok(()),
        }
    }

    fn list_at(&self, ty: &ObjectType, at: ReadAt, coord: Coordinate) -> StoreResult<Vec<String>> {
        self.take_listing_fault()?;
        self.check_partition(ty, coord)?;
        let shards = self.shards.read();
        Ok(shards
            .get(&(ty.clone(), coord))
            .map(|shard| shard.live_keys(at))
            .unwrap_or_default())
    }

    fn get_at(
        &self,
        ty: &ObjectType,
        key: &str,
        at: ReadAt,
        coord: Coordinate,
    ) -> StoreResult<StoredObject> {
        self.take_get_fault()?;
        self.check_partition(ty, coord)?;
        let shards = self.shards.read();
        shards
            .get(&(ty.clone(), coord))
            .and_then(|shard| shard.resolve(key, at))
            .filter(|r| !r.deleted)
            .map(|r| r.object.clone())
            .ok_or_else(|| StoreError::KeyNotFound(key.to_string()))
    }
}

impl StoreClient for MemStore {
    fn list_keys(
        &self,
        ty: &ObjectType,
        version: Version,
        coord: Coordinate,
    ) -> Reply<Vec<String>> {
        self.record(StoreCall::ListKeys {
            ty: ty.clone(),
            version,
            coord,
        });
        self.respond(self.list_at(ty, ReadAt::Version(version), coord))
    }

    fn list_keys_by_time(
        &self,
        ty: &ObjectType,
        ts: Timestamp,
        coord: Coordinate,
    ) -> Reply<Vec<String>> {
        self.record(StoreCall::ListKeysByTime {
            ty: ty.clone(),
            ts,
            coord,
        });
        self.respond(self.list_at(ty, ReadAt::Time(ts), coord))
    }

    fn get(
        &self,
        ty: &ObjectType,
        key: &str,
        at: ReadAt,
        coord: Coordinate,
    ) -> Reply<StoredObject> {
        self.record(StoreCall::Get {
            ty: ty.clone(),
            key: key.to_string(),
            at,
            coord,
        });
        self.respond(self.get_at(ty, key, at, coord))
    }

    fn shard_count(&self, ty: &ObjectType, subgroup: u32) -> Reply<u32> {
        self.record(StoreCall::ShardCount {
            ty: ty.clone(),
            subgroup,
        });
        let res = match self.layout.read().get(ty) {
            None => Err(StoreError::UnknownType(ty.to_string())),
            Some(subgroups) => subgroups
                .get(subgroup as usize)
                .copied()
                .ok_or(StoreError::NoSuchPartition {
                    subgroup,
                    shard: None,
                }),
        };
        self.respond(res)
    }

    fn subgroup_count(&self, ty: &ObjectType) -> Reply<u32> {
        self.record(StoreCall::SubgroupCount { ty: ty.clone() });
        let res = self
            .layout
            .read()
            .get(ty)
            .map(|subgroups| subgroups.len() as u32)
            .ok_or_else(|| StoreError::UnknownType(ty.to_string()));
        self.respond(res)
    }
}
