use std::{fmt, sync::Arc};

use bytes::Bytes;

use crate::reply::Reply;

pub mod prelude {
    pub use super::{
        Coordinate, NO_PREVIOUS_VERSION, ObjectType, ReadAt, StoreClient, StoredObject, Timestamp,
        Version,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Version(pub u64);

impl Version {
    /// Asks the store for whatever is newest when the request is served.
    pub const CURRENT: Version = Version(u64::MAX);

    pub fn is_current(&self) -> bool {
        *self == Self::CURRENT
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_current() {
            f.write_str("current")
        } else {
            write!(f, "{}", self.0)
        }
    }
}

/// Back-reference carried by the oldest version of a key.
pub const NO_PREVIOUS_VERSION: Version = Version(1);

/// Microseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(pub u64);

impl Timestamp {
    pub fn now() -> Self {
        let micros = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or_default();
        Self(micros)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}us", self.0)
    }
}

/// Names a logical namespace inside the store.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ObjectType(Arc<str>);

impl ObjectType {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self(Arc::from(name.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectType {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl fmt::Debug for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ObjectType").field(&&*self.0).finish()
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Coordinate {
    pub subgroup: u32,
    pub shard: u32,
}

impl Coordinate {
    pub fn new(subgroup: u32, shard: u32) -> Self {
        Self { subgroup, shard }
    }
}

/// How a point read is resolved by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadAt {
    /// The newest object whose version is at most the given one.
    Version(Version),
    /// The newest object written at or before the given time.
    Time(Timestamp),
}

#[derive(Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub key: String,
    pub version: Version,
    pub previous_version: Version,
    pub timestamp: Timestamp,
    pub payload: Bytes,
}

impl StoredObject {
    pub fn payload_bytes(&self) -> &[u8] {
        &self.payload
    }

    pub fn previous_version_by_key(&self) -> Version {
        self.previous_version
    }

    pub fn is_oldest(&self) -> bool {
        self.previous_version == NO_PREVIOUS_VERSION
    }
}

impl fmt::Debug for StoredObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("StoredObject");
        d.field("key", &self.key)
            .field("version", &self.version)
            .field("previous_version", &self.previous_version)
            .field("timestamp", &self.timestamp);
        match std::str::from_utf8(&self.payload) {
            Ok(text) => d.field("payload", &text),
            Err(_) => d.field("payload", &self.payload),
        };
        d.finish()
    }
}

/// A connection to the external store.
///
/// Every call returns immediately with a [`Reply`]; the caller decides when to
/// block on it.
pub trait StoreClient: Send + Sync {
    fn list_keys(&self, ty: &ObjectType, version: Version, coord: Coordinate)
    -> Reply<Vec<String>>;

    fn list_keys_by_time(
        &self,
        ty: &ObjectType,
        ts: Timestamp,
        coord: Coordinate,
    ) -> Reply<Vec<String>>;

    fn get(&self, ty: &ObjectType, key: &str, at: ReadAt, coord: Coordinate)
    -> Reply<StoredObject>;

    fn shard_count(&self, ty: &ObjectType, subgroup: u32) -> Reply<u32>;

    fn subgroup_count(&self, ty: &ObjectType) -> Reply<u32>;
}

impl<S: StoreClient + ?Sized> StoreClient for &S {
    fn list_keys(
        &self,
        ty: &ObjectType,
        version: Version,
        coord: Coordinate,
    ) -> Reply<Vec<String>> {
        (**self).list_keys(ty, version, coord)
    }

    fn list_keys_by_time(
        &self,
        ty: &ObjectType,
        ts: Timestamp,
        coord: Coordinate,
    ) -> Reply<Vec<String>> {
        (**self).list_keys_by_time(ty, ts, coord)
    }

    fn get(
        &self,
        ty: &ObjectType,
        key: &str,
        at: ReadAt,
        coord: Coordinate,
    ) -> Reply<StoredObject> {
        (**self).get(ty, key, at, coord)
    }

    fn shard_count(&self, ty: &ObjectType, subgroup: u32) -> Reply<u32> {
        (**self).shard_count(ty, subgroup)
    }

    fn subgroup_count(&self, ty: &ObjectType) -> Reply<u32> {
        (**self).subgroup_count(ty)
    }
}
