use std::fmt;

use sinkplan_error::Result;

use crate::arrays::batch::Batch;

/// Pull-based stream of batches for a single partition.
pub struct BatchStream {
    inner: Box<dyn Iterator<Item = Result<Batch>> + Send>,
}

impl BatchStream {
    pub fn new(iter: impl Iterator<Item = Result<Batch>> + Send + 'static) -> Self {
        BatchStream {
            inner: Box::new(iter),
        }
    }

    pub fn empty() -> Self {
        Self::new(std::iter::empty())
    }

    pub fn from_batches(batches: Vec<Batch>) -> Self {
        Self::new(batches.into_iter().map(Ok))
    }

    /// Pull all batches from the stream, stopping at the first error.
    pub fn collect_batches(self) -> Result<Vec<Batch>> {
        self.collect()
    }
}

impl Iterator for BatchStream {
    type Item = Result<Batch>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next()
    }
}

impl fmt::Debug for BatchStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchStream").finish_non_exhaustive()
    }
}

/// Select the batches belonging to a partition, distributing round-robin.
pub fn partition_batches(batches: Vec<Batch>, partition: usize, partitions: usize) -> Vec<Batch> {
    let partitions = partitions.max(1);
    batches
        .into_iter()
        .enumerate()
        .filter_map(|(idx, batch)| (idx % partitions == partition).then_some(batch))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arrays::batch::Row;

    fn batch(v: i64) -> Batch {
        Batch::from_rows([Row::new([v.into()])])
    }

    #[test]
    fn round_robin() {
        let batches: Vec<_> = (0..5).map(batch).collect();

        assert_eq!(
            vec![batch(0), batch(2), batch(4)],
            partition_batches(batches.clone(), 0, 2)
        );
        assert_eq!(vec![batch(1), batch(3)], partition_batches(batches.clone(), 1, 2));
        assert!(partition_batches(batches, 3, 2).is_empty());
    }

    #[test]
    fn collect_stops_at_error() {
        let stream = BatchStream::new(
            vec![
                Ok(batch(1)),
                Err(sinkplan_error::DbError::new("boom")),
                Ok(batch(2)),
            ]
            .into_iter(),
        );
        let err = stream.collect_batches().unwrap_err();
        assert_eq!("boom", err.get_msg());
    }
}
