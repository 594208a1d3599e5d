use bytes::Bytes;

use crate::{ByteRange, RelayError, RelayResult};

/// A validated inclusive byte range of an object of known size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedRange {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
}

impl ResolvedRange {
    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn is_full_content(&self) -> bool {
        self.start == 0 && self.end + 1 == self.total_size
    }
}

/// Chunk-aligned fetch plan for one byte range.
///
/// Every remote fetch starts at a multiple of `chunk_size`. The first chunk
/// drops `first_trim` leading bytes and the last keeps `last_trim` bytes, so
/// concatenating the trimmed chunks yields exactly `start..=end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    pub start: u64,
    pub end: u64,
    pub total_size: u64,
    pub chunk_size: u64,
    pub aligned_offset: u64,
    pub first_trim: u64,
    pub last_trim: u64,
    pub chunk_count: u64,
}

impl ChunkPlan {
    /// Plan `start..=end` (end defaults to the last byte) over `size` bytes.
    ///
    /// Requires `start <= end < size`; anything else is `RangeNotSatisfiable`.
    ///
    /// `chunk_count` counts the chunks the range touches, not
    /// `ceil(length / chunk_size)`: bytes 3..=4 with 4-byte chunks need two.
    pub fn new(start: u64, end: Option<u64>, size: u64, chunk_size: u64) -> RelayResult<Self> {
        let end_or_last = end.unwrap_or(size.saturating_sub(1));
        if size == 0 || start > end_or_last || end_or_last >= size {
            return Err(RelayError::range_not_satisfiable(start, end_or_last, size));
        }
        if chunk_size == 0 {
            return Err(RelayError::invalid("chunk size must be positive"));
        }
        let end = end_or_last;

        let first_chunk = start / chunk_size;
        let last_chunk = end / chunk_size;

        Ok(Self {
            start,
            end,
            total_size: size,
            chunk_size,
            aligned_offset: first_chunk * chunk_size,
            first_trim: start - first_chunk * chunk_size,
            last_trim: end % chunk_size + 1,
            chunk_count: last_chunk - first_chunk + 1,
        })
    }

    /// Plan a requested range; `None` covers the whole object.
    pub fn for_range(range: Option<ByteRange>, size: u64, chunk_size: u64) -> RelayResult<Self> {
        match range {
            Some(range) => Self::new(range.start, range.end, size, chunk_size),
            None => Self::new(0, None, size, chunk_size),
        }
    }

    pub fn content_length(&self) -> u64 {
        self.end - self.start + 1
    }

    pub fn resolved_range(&self) -> ResolvedRange {
        ResolvedRange {
            start: self.start,
            end: self.end,
            total_size: self.total_size,
        }
    }

    /// Remote offset of chunk `index` (zero-based)
    pub fn chunk_offset(&self, index: u64) -> u64 {
        self.aligned_offset + index * self.chunk_size
    }

    /// Cut chunk `index` (zero-based) down to the bytes inside the range.
    ///
    /// Bounds clamp to the chunk's actual length, so a short final read is
    /// never sliced past its end.
    pub fn trim(&self, index: u64, chunk: Bytes) -> Bytes {
        let len = chunk.len() as u64;
        let first = index == 0;
        let last = index + 1 == self.chunk_count;

        let head = if first { self.first_trim.min(len) } else { 0 };
        let tail = if last { self.last_trim.min(len) } else { len };
        if head >= tail {
            return Bytes::new();
        }
        chunk.slice(head as usize..tail as usize)
    }
}
