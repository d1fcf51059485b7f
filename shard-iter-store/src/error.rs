#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Unknown object type: {0}")]
    UnknownType(String),

    #[error("No such partition: subgroup {subgroup}, shard {shard:?}")]
    NoSuchPartition { subgroup: u32, shard: Option<u32> },
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
