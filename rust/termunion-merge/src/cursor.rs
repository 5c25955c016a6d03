//! Contracts of the per-partition readers consumed by the merge engine.
//!
//! The engine never implements a partition dictionary itself. Every partition is
//! reached through the [`TermsCursor`] trait, which exposes the positioning
//! primitives of a sorted term dictionary (sequential advance, exact seek and
//! ceiling seek) along with the statistics and postings of the current term.
//!
//! # Ordering
//!
//! Terms are arbitrary byte sequences ordered by unsigned lexicographic byte
//! comparison, i.e. the `Ord` implementation of `[u8]`. Every cursor must
//! enumerate its terms in strictly increasing order under that comparison.
//!
//! # Errors
//!
//! All cursor operations that may touch storage return a
//! [`termunion_common::Result`]. The engine performs no retries and no recovery:
//! an error aborts the operation in progress and is surfaced unchanged.

use termunion_common::Result;

/// Outcome of a ceiling seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeekStatus {
    /// The cursor is positioned on the requested term.
    Found,
    /// The requested term is absent; the cursor is positioned on the smallest
    /// term greater than the requested one.
    NotFound,
    /// Every term of the dictionary is smaller than the requested one.
    /// The cursor has no current term afterwards.
    End,
}

bitflags::bitflags! {
    /// Features requested from a postings cursor.
    ///
    /// Each feature implies the ones it depends on: positions imply frequencies,
    /// offsets and payloads imply positions.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct PostingsFlags: u8 {
        /// Per-document term frequencies.
        const FREQS = 1 << 0;
        /// Term positions within each document.
        const POSITIONS = Self::FREQS.bits() | (1 << 1);
        /// Start and end character offsets of each position.
        const OFFSETS = Self::POSITIONS.bits() | (1 << 2);
        /// Per-position payloads.
        const PAYLOADS = Self::POSITIONS.bits() | (1 << 3);
        /// Everything.
        const ALL = Self::OFFSETS.bits() | Self::PAYLOADS.bits();
    }
}

/// A sorted term dictionary cursor over one partition.
///
/// A freshly created cursor is unpositioned: [`term`](TermsCursor::term) returns
/// `None` until [`advance`](TermsCursor::advance) or one of the seek methods
/// positions it.
///
/// Implementations exist per concrete partition representation; see
/// [`crate::memory::MemoryTermsCursor`] for the in-memory one. `Box<T>` and
/// `&mut T` forward to `T`, so trait objects can be merged as well:
/// `Box<dyn TermsCursor<Postings = P>>`.
pub trait TermsCursor {
    /// Postings cursor produced for the current term.
    type Postings: PostingsCursor;

    /// Returns the term the cursor is positioned on, or `None` when the cursor
    /// is unpositioned or exhausted.
    fn term(&self) -> Option<&[u8]>;

    /// Moves to the next term in increasing order and returns it.
    ///
    /// Returns `Ok(None)` once the dictionary is exhausted. An unpositioned cursor
    /// moves to its first term.
    fn advance(&mut self) -> Result<Option<&[u8]>>;

    /// Attempts to position the cursor exactly on `term`.
    ///
    /// Returns `Ok(true)` when the term exists; the cursor is then positioned on
    /// it. On `Ok(false)` the position is unspecified and the cursor must be
    /// re-positioned by another seek before it is used again.
    fn seek_exact(&mut self, term: &[u8]) -> Result<bool>;

    /// Positions the cursor on the smallest term greater than or equal to `term`.
    fn seek_ceil(&mut self, term: &[u8]) -> Result<SeekStatus>;

    /// Number of documents containing the current term.
    fn doc_freq(&self) -> Result<u32>;

    /// Total number of occurrences of the current term across all documents,
    /// or `None` when the partition does not record term frequencies.
    fn total_term_freq(&self) -> Result<Option<u64>>;

    /// Creates a postings cursor for the current term.
    ///
    /// The returned cursor is owned by the caller and independent of further
    /// positioning of this cursor.
    fn postings(&mut self, flags: PostingsFlags) -> Result<Self::Postings>;
}

/// A cursor over the documents containing one term within one partition.
///
/// Document ids are local to the partition and strictly increasing.
pub trait PostingsCursor {
    /// Moves to the next document and returns its local id, or `Ok(None)` when
    /// the postings are exhausted.
    fn next_doc(&mut self) -> Result<Option<u32>>;

    /// Frequency of the term in the current document.
    ///
    /// Reports `1` when frequencies were not requested.
    fn freq(&self) -> u32;
}

impl<T: TermsCursor + ?Sized> TermsCursor for Box<T> {
    type Postings = T::Postings;

    #[inline]
    fn term(&self) -> Option<&[u8]> {
        (**self).term()
    }

    #[inline]
    fn advance(&mut self) -> Result<Option<&[u8]>> {
        (**self).advance()
    }

    #[inline]
    fn seek_exact(&mut self, term: &[u8]) -> Result<bool> {
        (**self).seek_exact(term)
    }

    #[inline]
    fn seek_ceil(&mut self, term: &[u8]) -> Result<SeekStatus> {
        (**self).seek_ceil(term)
    }

    #[inline]
    fn doc_freq(&self) -> Result<u32> {
        (**self).doc_freq()
    }

    #[inline]
    fn total_term_freq(&self) -> Result<Option<u64>> {
        (**self).total_term_freq()
    }

    #[inline]
    fn postings(&mut self, flags: PostingsFlags) -> Result<Self::Postings> {
        (**self).postings(flags)
    }
}

impl<T: TermsCursor + ?Sized> TermsCursor for &mut T {
    type Postings = T::Postings;

    #[inline]
    fn term(&self) -> Option<&[u8]> {
        (**self).term()
    }

    #[inline]
    fn advance(&mut self) -> Result<Option<&[u8]>> {
        (**self).advance()
    }

    #[inline]
    fn seek_exact(&mut self, term: &[u8]) -> Result<bool> {
        (**self).seek_exact(term)
    }

    #[inline]
    fn seek_ceil(&mut self, term: &[u8]) -> Result<SeekStatus> {
        (**self).seek_ceil(term)
    }

    #[inline]
    fn doc_freq(&self) -> Result<u32> {
        (**self).doc_freq()
    }

    #[inline]
    fn total_term_freq(&self) -> Result<Option<u64>> {
        (**self).total_term_freq()
    }

    #[inline]
    fn postings(&mut self, flags: PostingsFlags) -> Result<Self::Postings> {
        (**self).postings(flags)
    }
}

impl<T: PostingsCursor + ?Sized> PostingsCursor for Box<T> {
    #[inline]
    fn next_doc(&mut self) -> Result<Option<u32>> {
        (**self).next_doc()
    }

    #[inline]
    fn freq(&self) -> u32 {
        (**self).freq()
    }
}
