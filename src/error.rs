use shard_iter_store::{error::StoreError, traits::Version};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Key not found: {key}")]
    KeyNotFound { key: String },

    #[error("Unknown object type: {0}")]
    UnknownType(String),

    #[error("No such partition: subgroup {subgroup}, shard {shard:?}")]
    NoSuchPartition { subgroup: u32, shard: Option<u32> },

    #[error("Decode: key {key} at version {version}: {source}")]
    DecodeFailure {
        key: String,
        version: Version,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Invalid selector combination: {0}")]
    InvalidSelectorCombination(&'static str),

    #[error("Broken version chain: key {key} at version {version} points back to {previous}")]
    BrokenVersionChain {
        key: String,
        version: Version,
        previous: Version,
    },

    #[error("Invalid options: {0}")]
    InvalidOptions(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(msg) => Error::StoreUnavailable(msg),
            StoreError::KeyNotFound(key) => Error::KeyNotFound { key },
            StoreError::UnknownType(ty) => Error::UnknownType(ty),
            StoreError::NoSuchPartition { subgroup, shard } => {
                Error::NoSuchPartition { subgroup, shard }
            }
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
