mod kv_iter;
mod view;

pub mod error;
pub mod options;
pub mod selector;

#[cfg(test)]
mod test_utils;

pub use kv_iter::prelude::*;
pub use shard_iter_store as store;
pub use view::{ShardQuery, StoreView};

pub mod prelude {
    pub use crate::{
        error::{Error, Result},
        kv_iter::prelude::*,
        options::{ViewOpenOptions, ViewOptions},
        selector::VersionSelector,
        view::{ShardQuery, StoreView},
    };
    pub use shard_iter_store::prelude::*;
}
