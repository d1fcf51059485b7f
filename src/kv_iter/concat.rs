use std::{collections::VecDeque, iter::FusedIterator};

use crate::error::Result;

/// Drains `parts` front to back.
///
/// A part returning `None` is finished and the next one takes over. A part
/// returning an error ends the whole sequence; it never counts as finished.
pub(crate) struct Concat<I> {
    parts: VecDeque<I>,
    finished: usize,
    failed: bool,
}

impl<I> Concat<I> {
    pub(crate) fn new(parts: VecDeque<I>) -> Self {
        Self {
            parts,
            finished: 0,
            failed: false,
        }
    }

    /// Parts not fully drained yet, the current one included.
    pub(crate) fn parts_left(&self) -> usize {
        if self.failed { 0 } else { self.parts.len() }
    }
}

impl<I, T> Iterator for Concat<I>
where
    I: Iterator<Item = Result<T>>,
{
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        while let Some(part) = self.parts.front_mut() {
            match part.next() {
                Some(Ok(item)) => return Some(Ok(item)),
                Some(Err(e)) => {
                    self.failed = true;
                    self.parts.clear();
                    return Some(Err(e));
                }
                None => {
                    tracing::debug!(part = self.finished, "part exhausted, advancing");
                    self.parts.pop_front();
                    self.finished += 1;
                }
            }
        }
        None
    }
}

impl<I, T> FusedIterator for Concat<I> where I: Iterator<Item = Result<T>> {}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use super::Concat;
    use crate::error::{Error, Result};

    fn part(items: Vec<Result<u32>>) -> std::vec::IntoIter<Result<u32>> {
        items.into_iter()
    }

    #[test]
    fn concatenates_in_order_and_skips_empty_parts() -> anyhow::Result<()> {
        let parts = VecDeque::from(vec![
            part(vec![Ok(1), Ok(2)]),
            part(vec![]),
            part(vec![Ok(3)]),
        ]);
        let mut concat = Concat::new(parts);
        assert_eq!(concat.parts_left(), 3);

        let items = concat.by_ref().collect::<Result<Vec<_>>>()?;
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(concat.parts_left(), 0);
        Ok(())
    }

    #[test]
    fn error_is_not_exhaustion() {
        let parts = VecDeque::from(vec![
            part(vec![Ok(1), Err(Error::StoreUnavailable("down".into())), Ok(2)]),
            part(vec![Ok(3)]),
        ]);
        let mut concat = Concat::new(parts);

        assert!(matches!(concat.next(), Some(Ok(1))));
        assert!(matches!(concat.next(), Some(Err(Error::StoreUnavailable(_)))));
        // The later part is never reached.
        assert!(concat.next().is_none());
        assert_eq!(concat.parts_left(), 0);
    }
}
