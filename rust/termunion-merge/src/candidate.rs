use std::cmp::Ordering;
use std::fmt;

use termunion_common::Result;

use crate::{cursor::TermsCursor, queue::SlotOrdering, slice::DocIdSlice};

/// A partition cursor handed to [`crate::MergedTermsCursor::reset`], tagged with
/// the index of the partition it reads.
pub struct PartitionCursor<C> {
    /// Index of the partition, i.e. of its slice in the merged view.
    pub partition: usize,
    /// Cursor positioned on the first term of the partition, or with no current
    /// term when the partition is empty.
    pub cursor: C,
}

impl<C: TermsCursor> PartitionCursor<C> {
    /// Advances a freshly created cursor to its first term and wraps it.
    pub fn first(partition: usize, mut cursor: C) -> Result<PartitionCursor<C>> {
        cursor.advance()?;
        Ok(PartitionCursor { partition, cursor })
    }
}

/// One partition taking part in a merge session: the partition's cursor along
/// with its identity and document id slice.
pub(crate) struct Candidate<C> {
    pub(crate) partition: usize,
    pub(crate) slice: DocIdSlice,
    pub(crate) cursor: C,
}

impl<C: TermsCursor> Candidate<C> {
    #[inline]
    pub(crate) fn term(&self) -> Option<&[u8]> {
        self.cursor.term()
    }
}

impl<C: TermsCursor> fmt::Debug for Candidate<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Candidate")
            .field("partition", &self.partition)
            .field("slice", &self.slice)
            .field("term", &self.term().map(String::from_utf8_lossy))
            .finish()
    }
}

impl<C: TermsCursor> SlotOrdering for [Candidate<C>] {
    /// Orders candidates by their current term. Only positioned candidates are
    /// ever queued, so the `None` case does not arise in practice.
    #[inline]
    fn compare_slots(&self, a: usize, b: usize) -> Ordering {
        self[a].term().cmp(&self[b].term())
    }
}
