use std::ops::Range;

use termunion_common::{Result, error::Error};

/// The contiguous block of global document ids owned by one partition.
///
/// Partition `i` of a merged view owns the global ids `start..start + len`.
/// Slices of consecutive partitions are expected to be non-overlapping and
/// increasing, which lets a postings consumer translate partition-local ids to
/// global ids by adding `start`. The merge engine itself never interprets a
/// slice; it only hands it out next to the partition's postings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DocIdSlice {
    /// First global document id of the partition.
    pub start: u32,
    /// Number of documents in the partition.
    pub len: u32,
}

impl DocIdSlice {
    /// # Panics
    ///
    /// Panics if the slice extends past the u32 document id space.
    pub fn new(start: u32, len: u32) -> DocIdSlice {
        assert!(
            start.checked_add(len).is_some(),
            "slice of {len} docs at {start} overflows the doc id space"
        );
        DocIdSlice { start, len }
    }

    /// Global id one past the last document of the partition.
    ///
    /// # Panics
    ///
    /// Panics if the slice extends past the u32 document id space, which
    /// [`DocIdSlice::new`] rules out.
    #[inline]
    pub fn end(&self) -> u32 {
        self.start.checked_add(self.len).unwrap_or_else(|| {
            panic!(
                "slice of {} docs at {} overflows the doc id space",
                self.len, self.start
            )
        })
    }

    #[inline]
    pub fn range(&self) -> Range<u32> {
        self.start..self.end()
    }

    #[inline]
    pub fn contains(&self, global_doc: u32) -> bool {
        self.range().contains(&global_doc)
    }

    /// Translates a partition-local document id to its global id.
    ///
    /// # Panics
    ///
    /// Panics if `local_doc` is outside of the partition.
    #[inline]
    pub fn to_global(&self, local_doc: u32) -> u32 {
        assert!(
            local_doc < self.len,
            "local doc {local_doc} is out of bounds for a slice of {} docs",
            self.len
        );
        self.start + local_doc
    }

    /// Lays out consecutive slices for partitions with the given document counts.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error when the counts add up to more than
    /// the u32 document id space.
    pub fn consecutive(doc_counts: impl IntoIterator<Item = u32>) -> Result<Vec<DocIdSlice>> {
        let mut start = 0u32;
        doc_counts
            .into_iter()
            .map(|len| {
                let end = start.checked_add(len).ok_or_else(|| {
                    Error::invalid_arg("doc_counts", "total exceeds the u32 doc id space")
                })?;
                let slice = DocIdSlice { start, len };
                start = end;
                Ok(slice)
            })
            .collect()
    }
}
