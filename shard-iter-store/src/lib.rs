pub mod error;
pub mod memory;
pub mod reply;
pub mod traits;

pub mod prelude {
    pub use crate::{
        error::{StoreError, StoreResult},
        memory::prelude::*,
        reply::{Replier, Reply},
        traits::prelude::*,
    };
}
