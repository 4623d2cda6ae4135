//! Chunk planning: partitioning a resource into contiguous byte ranges.
//!
//! [`plan`] is a pure function. It never touches the network and its output
//! always satisfies the partition invariants: chunks are ascending,
//! non-overlapping and gap-free, the first starts at 0 and the last ends at
//! `size - 1`.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use super::constants::DEFAULT_CHUNK_COUNT;

/// Rejected chunk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PlanError {
    /// A chunk count of zero was requested.
    #[error("invalid chunk count 0: must be at least 1")]
    ZeroChunkCount,

    /// A chunk size of zero was requested.
    #[error("invalid chunk size 0: must be at least 1 byte")]
    ZeroChunkSize,
}

/// A contiguous byte range of the resource assigned to one worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Position of the chunk in the plan.
    pub index: usize,
    /// First byte offset (inclusive).
    pub start: u64,
    /// Number of bytes; zero only for the single chunk of an empty resource.
    pub len: u64,
}

impl Chunk {
    /// Last byte offset (inclusive), `None` for an empty chunk.
    #[must_use]
    pub fn end(&self) -> Option<u64> {
        (self.len > 0).then(|| self.start + self.len - 1)
    }

    /// Inclusive `(start, end)` pair for a `Range` header.
    #[must_use]
    pub fn byte_range(&self) -> Option<(u64, u64)> {
        self.end().map(|end| (self.start, end))
    }

    /// Whether the chunk holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl fmt::Display for Chunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.end() {
            Some(end) => write!(f, "chunk {} (bytes {}-{})", self.index, self.start, end),
            None => write!(f, "chunk {} (empty)", self.index),
        }
    }
}

/// Validates requested chunk parameters without planning.
///
/// # Errors
///
/// Returns [`PlanError`] for a zero count or zero size.
pub fn validate_request(
    requested_count: Option<u64>,
    requested_size: Option<u64>,
) -> Result<(), PlanError> {
    if requested_count == Some(0) {
        return Err(PlanError::ZeroChunkCount);
    }
    if requested_size == Some(0) {
        return Err(PlanError::ZeroChunkSize);
    }
    Ok(())
}

/// Partitions `size` bytes into chunks.
///
/// - Without range support the whole resource is one chunk.
/// - An explicit `requested_size` wins over `requested_count`.
/// - With only a count, the chunk size is `ceil(size / count)`; the plan may
///   hold fewer than `count` chunks but never more.
/// - With neither, [`DEFAULT_CHUNK_COUNT`] is used as the count.
/// - `size == 0` yields one empty chunk.
///
/// # Errors
///
/// Returns [`PlanError`] for a zero count or zero size, regardless of range
/// support.
///
/// # Example
///
/// ```
/// use pump_core::download::plan;
///
/// let chunks = plan(10, Some(4), None, true).unwrap();
/// let lens: Vec<u64> = chunks.iter().map(|c| c.len).collect();
/// assert_eq!(lens, vec![3, 3, 3, 1]);
/// ```
pub fn plan(
    size: u64,
    requested_count: Option<u64>,
    requested_size: Option<u64>,
    range_supported: bool,
) -> Result<Vec<Chunk>, PlanError> {
    validate_request(requested_count, requested_size)?;

    if size == 0 || !range_supported {
        return Ok(vec![Chunk {
            index: 0,
            start: 0,
            len: size,
        }]);
    }

    let chunk_size = match (requested_size, requested_count) {
        (Some(chunk_size), _) => chunk_size,
        (None, Some(count)) => size.div_ceil(count),
        (None, None) => size.div_ceil(DEFAULT_CHUNK_COUNT),
    };

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < size {
        let len = chunk_size.min(size - start);
        chunks.push(Chunk {
            index: chunks.len(),
            start,
            len,
        });
        start += len;
    }
    Ok(chunks)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn assert_partitions(chunks: &[Chunk], size: u64) {
        assert!(!chunks.is_empty());
        assert_eq!(chunks[0].start, 0);
        let mut next = 0;
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.index, i, "indices must be ordinal");
            assert_eq!(chunk.start, next, "gap or overlap before {chunk}");
            assert!(chunk.len > 0, "{chunk} must not be empty");
            next = chunk.start + chunk.len;
        }
        assert_eq!(next, size, "plan must end at size");
        assert_eq!(chunks.last().unwrap().end(), Some(size - 1));
    }

    #[test]
    fn test_plan_by_count_partitions_exactly() {
        for size in [1_u64, 2, 7, 10, 99, 100, 1000, 1 << 20, 12_345_679] {
            for count in [1_u64, 2, 3, 7, 8, 16, 100, 5000] {
                let chunks = plan(size, Some(count), None, true).unwrap();
                assert_partitions(&chunks, size);
                assert!(
                    chunks.len() as u64 <= count,
                    "size {size} count {count} produced {} chunks",
                    chunks.len()
                );
            }
        }
    }

    #[test]
    fn test_plan_by_count_shrinks_last_chunk() {
        let chunks = plan(100, Some(3), None, true).unwrap();
        let lens: Vec<u64> = chunks.iter().map(|c| c.len).collect();
        assert_eq!(lens, vec![34, 34, 32]);
    }

    #[test]
    fn test_plan_count_equal_to_size_gives_single_byte_chunks() {
        let chunks = plan(5, Some(5), None, true).unwrap();
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.len == 1));
    }

    #[test]
    fn test_plan_count_larger_than_size_never_emits_empty_chunks() {
        let chunks = plan(3, Some(8), None, true).unwrap();
        assert_partitions(&chunks, 3);
        assert_eq!(chunks.len(), 3);
    }

    #[test]
    fn test_plan_by_size_derives_count() {
        for size in [1_u64, 9, 10, 11, 1000, 65_537] {
            for chunk_size in [1_u64, 3, 10, 4096, 100_000] {
                let chunks = plan(size, None, Some(chunk_size), true).unwrap();
                let expected = size.div_ceil(chunk_size);
                assert_eq!(chunks.len() as u64, expected);
                assert_partitions(&chunks, size);
                for chunk in &chunks[..chunks.len() - 1] {
                    assert_eq!(chunk.len, chunk_size);
                }
                assert_eq!(
                    chunks.last().unwrap().len,
                    size - chunk_size * (expected - 1)
                );
            }
        }
    }

    #[test]
    fn test_plan_size_takes_precedence_over_count() {
        let chunks = plan(100, Some(2), Some(10), true).unwrap();
        assert_eq!(chunks.len(), 10);
    }

    #[test]
    fn test_plan_without_range_support_is_single_chunk() {
        let requests = [(Some(8), None), (None, Some(3)), (Some(4), Some(4)), (None, None)];
        for (count, chunk_size) in requests {
            let chunks = plan(1000, count, chunk_size, false).unwrap();
            assert_eq!(
                chunks,
                vec![Chunk {
                    index: 0,
                    start: 0,
                    len: 1000
                }]
            );
        }
    }

    #[test]
    fn test_plan_defaults_to_eight_chunks() {
        let chunks = plan(800, None, None, true).unwrap();
        assert_eq!(chunks.len(), 8);
        assert!(chunks.iter().all(|c| c.len == 100));
    }

    #[test]
    fn test_plan_empty_resource_is_one_empty_chunk() {
        for supported in [true, false] {
            let chunks = plan(0, Some(8), None, supported).unwrap();
            assert_eq!(chunks.len(), 1);
            assert!(chunks[0].is_empty());
            assert_eq!(chunks[0].end(), None);
            assert_eq!(chunks[0].byte_range(), None);
        }
    }

    #[test]
    fn test_plan_rejects_zero_count() {
        assert_eq!(plan(100, Some(0), None, true), Err(PlanError::ZeroChunkCount));
        assert_eq!(plan(100, Some(0), None, false), Err(PlanError::ZeroChunkCount));
    }

    #[test]
    fn test_plan_rejects_zero_size() {
        assert_eq!(plan(100, None, Some(0), true), Err(PlanError::ZeroChunkSize));
        assert_eq!(plan(0, Some(4), Some(0), false), Err(PlanError::ZeroChunkSize));
    }

    #[test]
    fn test_chunk_display_shows_inclusive_range() {
        let chunk = Chunk {
            index: 3,
            start: 300,
            len: 100,
        };
        assert_eq!(chunk.to_string(), "chunk 3 (bytes 300-399)");
        assert_eq!(chunk.byte_range(), Some((300, 399)));
    }
}
