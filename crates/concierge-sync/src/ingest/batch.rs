//! Two-tier commit batching: one small early batch, then larger ones.

/// Size of the first commit, kept small so partial results show up quickly.
pub const FIRST_BATCH_SIZE: usize = 20;
pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Debug)]
pub struct Batcher<T> {
    first_batch: usize,
    batch_size: usize,
    pending: Vec<T>,
    flushed: usize,
}

impl<T> Batcher<T> {
    #[must_use]
    pub fn new(first_batch: usize, batch_size: usize) -> Self {
        let first_batch = first_batch.max(1);
        Self {
            first_batch,
            batch_size: batch_size.max(1),
            pending: Vec::with_capacity(first_batch),
            flushed: 0,
        }
    }

    fn threshold(&self) -> usize {
        if self.flushed == 0 {
            self.first_batch
        } else {
            self.batch_size
        }
    }

    /// Add `item`, returning a full batch when the current tier fills up.
    pub fn push(&mut self, item: T) -> Option<Vec<T>> {
        self.pending.push(item);
        if self.pending.len() >= self.threshold() {
            self.take()
        } else {
            None
        }
    }

    /// Whatever is pending, if anything.
    pub fn drain(&mut self) -> Option<Vec<T>> {
        if self.pending.is_empty() {
            None
        } else {
            self.take()
        }
    }

    fn take(&mut self) -> Option<Vec<T>> {
        self.flushed += 1;
        let next = Vec::with_capacity(self.batch_size);
        Some(std::mem::replace(&mut self.pending, next))
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl<T> Default for Batcher<T> {
    fn default() -> Self {
        Self::new(FIRST_BATCH_SIZE, DEFAULT_BATCH_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_batch_is_small_then_grows() {
        let mut batcher = Batcher::new(2, 3);
        let sizes: Vec<usize> = (0..9)
            .filter_map(|i| batcher.push(i))
            .map(|b| b.len())
            .collect();
        assert_eq!(sizes, vec![2, 3, 3]);
        assert_eq!(batcher.pending(), 1);
        assert_eq!(batcher.drain(), Some(vec![8]));
        assert_eq!(batcher.drain(), None);
    }

    #[test]
    fn batches_preserve_order() {
        let mut batcher = Batcher::new(1, 2);
        assert_eq!(batcher.push('a'), Some(vec!['a']));
        assert_eq!(batcher.push('b'), None);
        assert_eq!(batcher.push('c'), Some(vec!['b', 'c']));
    }

    #[test]
    fn default_uses_twenty_first() {
        let mut batcher = Batcher::default();
        let first = (0..FIRST_BATCH_SIZE).find_map(|i| batcher.push(i)).unwrap();
        assert_eq!(first.len(), FIRST_BATCH_SIZE);
    }
}
