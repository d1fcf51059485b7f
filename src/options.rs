use std::{sync::Arc, time::Duration};

use shard_iter_store::{reply::Reply, traits::StoreClient};

use crate::{
    StoreView,
    error::{Error, Result},
};

#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub(crate) reply_timeout: Option<Duration>,

    pub(crate) verify_chain: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            reply_timeout: None,
            verify_chain: true,
        }
    }
}

impl ViewOptions {
    pub(crate) fn wait<T>(&self, reply: Reply<T>) -> Result<T> {
        let res = match self.reply_timeout {
            Some(timeout) => reply.wait_timeout(timeout),
            None => reply.wait(),
        };
        res.map_err(Error::from)
    }
}

#[derive(Debug)]
pub struct ViewOpenOptions {
    reply_timeout: Option<Duration>,

    verify_chain: bool,
}

impl Default for ViewOpenOptions {
    fn default() -> Self {
        let defaults = ViewOptions::default();
        Self {
            reply_timeout: defaults.reply_timeout,
            verify_chain: defaults.verify_chain,
        }
    }
}

impl ViewOpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upper bound on each blocking wait for the store. Unset waits forever.
    pub fn reply_timeout(&mut self, timeout: Duration) -> &mut Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// Reject back-references that do not point to an older version.
    pub fn verify_chain(&mut self, verify: bool) -> &mut Self {
        self.verify_chain = verify;
        self
    }

    pub fn build(&self) -> Result<Arc<ViewOptions>> {
        if self.reply_timeout.is_some_and(|t| t.is_zero()) {
            return Err(Error::InvalidOptions(
                "reply timeout must be greater than zero".into(),
            ));
        }

        let opts = ViewOptions {
            reply_timeout: self.reply_timeout,
            verify_chain: self.verify_chain,
        };
        Ok(Arc::new(opts))
    }

    pub fn open<'a, S>(&self, store: &'a S) -> Result<StoreView<'a, S>>
    where
        S: StoreClient + ?Sized,
    {
        Ok(StoreView::with_options(store, self.build()?))
    }
}
