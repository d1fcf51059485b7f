use std::iter::FusedIterator;

use shard_iter_store::traits::StoredObject;

use crate::error::{Error, Result};

/// Decodes the payload as UTF-8 text.
pub fn decode(obj: &StoredObject) -> Result<String> {
    match std::str::from_utf8(obj.payload_bytes()) {
        Ok(text) => Ok(text.to_owned()),
        Err(source) => Err(Error::DecodeFailure {
            key: obj.key.clone(),
            version: obj.version,
            source,
        }),
    }
}

/// Turns a sequence of objects into a sequence of their decoded payloads.
///
/// The first error of either kind ends the sequence.
#[derive(Debug)]
pub struct Values<I> {
    inner: I,
    done: bool,
}

impl<I> Values<I> {
    pub(crate) fn new(inner: I) -> Self {
        Self { inner, done: false }
    }

    pub fn into_inner(self) -> I {
        self.inner
    }
}

impl<I> Iterator for Values<I>
where
    I: Iterator<Item = Result<StoredObject>>,
{
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let res = match self.inner.next() {
            Some(Ok(obj)) => decode(&obj),
            Some(Err(e)) => Err(e),
            None => {
                self.done = true;
                return None;
            }
        };
        if let Err(ref e) = res {
            tracing::warn!("sequence ended with error: {}", e);
            self.done = true;
        }
        Some(res)
    }
}

impl<I> FusedIterator for Values<I> where I: Iterator<Item = Result<StoredObject>> {}
