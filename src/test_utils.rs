use shard_iter_store::{
    memory::MemStore,
    traits::{Coordinate, ObjectType},
};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub fn init_tracing_not_failed() {
    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(EnvFilter::from_default_env())
        .try_init();
}

pub fn kv() -> ObjectType {
    ObjectType::new("kv")
}

/// Store with one `kv` subgroup per entry of `shards`.
pub fn mem_store(shards: &[u32]) -> MemStore {
    MemStore::new().with_type(kv(), shards)
}

pub fn fill(store: &MemStore, coord: Coordinate, pairs: &[(&str, &str)]) -> anyhow::Result<()> {
    for (key, value) in pairs {
        store.put(&kv(), coord, key, value.to_string())?;
    }
    Ok(())
}
