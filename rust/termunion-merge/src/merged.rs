//! Merged, deduplicated view over the term dictionaries of many partitions.
//!
//! [`MergedTermsCursor`] performs a k-way merge of N sorted partition cursors. At
//! every position it exposes the merged term together with the *top group*: the
//! partitions whose cursors are positioned on that term. Statistics are summed
//! over the top group, and postings are handed out per top-group member, ordered
//! by partition index, for a downstream consumer to merge at the document level.
//!
//! # Positioning
//!
//! - [`MergedTermsCursor::next`] advances to the next distinct term of the union.
//! - [`MergedTermsCursor::seek_ceil`] positions on the smallest term ≥ a target.
//! - [`MergedTermsCursor::seek_exact`] positions on a target only if some
//!   partition holds it. It does not maintain the merge queue; the queue is
//!   rebuilt by a ceiling seek to the current term on the following `next`.
//!
//! # Monotonic seeks
//!
//! When a ceiling seek is followed by a seek to a target that is not smaller,
//! partitions whose current term already decides the outcome are not asked to
//! seek again. A partition positioned exactly on the target matches; a partition
//! positioned past the target cannot contain it. This covers the common pattern
//! of a query walking a sorted list of terms. Any `next`, exact seek or `reset`
//! disables the shortcut until the next ceiling seek.
//!
//! # Thread Safety
//!
//! A cursor is a single-threaded session object. Callers needing concurrent
//! merged iteration create one cursor per thread.

use std::cmp::Ordering;
use std::fmt;

use termunion_common::{Result, error::Error, verify_state};

use crate::{
    candidate::{Candidate, PartitionCursor},
    cursor::{PostingsFlags, SeekStatus, TermsCursor},
    queue::MergeQueue,
    slice::DocIdSlice,
};

/// Configuration of a [`MergedTermsCursor`].
#[derive(Debug, Clone)]
pub struct MergedTermsOptions {
    /// Skip the partition seeks whose outcome is implied by a preceding ceiling
    /// seek to a smaller or equal target. Results are identical either way.
    pub monotonic_seek: bool,
}

impl Default for MergedTermsOptions {
    fn default() -> Self {
        MergedTermsOptions {
            monotonic_seek: true,
        }
    }
}

/// A partition positioned on the current merged term.
#[derive(Debug)]
pub struct TermMatch<'a, C> {
    /// Index of the partition.
    pub partition: usize,
    /// The partition's cursor, positioned on the current term.
    pub cursor: &'a C,
    /// Document ids owned by the partition.
    pub slice: DocIdSlice,
}

/// Postings of the current term within one partition, as handed to the
/// postings consumer.
#[derive(Debug)]
pub struct SubPostings<P> {
    /// Index of the partition.
    pub partition: usize,
    /// Document ids owned by the partition; translates the local ids reported
    /// by `postings`.
    pub slice: DocIdSlice,
    /// Postings cursor over partition-local document ids.
    pub postings: P,
}

/// Sorted, deduplicated view over the term dictionaries of many partitions.
///
/// The cursor is created once for a fixed set of partition slices, then bound to
/// actual partition cursors with [`reset`](Self::reset). It can be reset any
/// number of times, e.g. once per field.
///
/// # States
///
/// - **Unpositioned**: right after `reset`, after an exact seek that matched
///   nothing, or after a partition reported an error. [`term`](Self::term) is
///   `None`.
/// - **Positioned**: [`term`](Self::term) is the merged term and the top group
///   is populated.
/// - **Exhausted**: `next` or `seek_ceil` ran past the last term.
///
/// # Example
///
/// ```
/// use termunion_merge::{DocIdSlice, MemoryTermDictionary, MergedTermsCursor, PartitionCursor};
///
/// let a = MemoryTermDictionary::from_terms(["apple", "cherry"]).unwrap();
/// let b = MemoryTermDictionary::from_terms(["banana", "cherry"]).unwrap();
///
/// let mut merged = MergedTermsCursor::new(DocIdSlice::consecutive([1, 1]).unwrap());
/// let cursors = vec![
///     PartitionCursor::first(0, a.cursor()).unwrap(),
///     PartitionCursor::first(1, b.cursor()).unwrap(),
/// ];
/// merged.reset(cursors).expect("non-empty");
///
/// let mut terms = Vec::new();
/// while let Some(term) = merged.next().unwrap() {
///     terms.push(String::from_utf8(term.to_vec()).unwrap());
/// }
/// assert_eq!(terms, ["apple", "banana", "cherry"]);
/// ```
pub struct MergedTermsCursor<C> {
    /// Document id slice of every partition, indexed by partition.
    slices: Vec<DocIdSlice>,
    options: MergedTermsOptions,
    /// Partitions that held at least one term at `reset`.
    subs: Vec<Candidate<C>>,
    /// Slots of `subs` that are still being merged.
    queue: MergeQueue,
    /// Partitions bound by the current `reset`, indexed by partition.
    bound: Vec<bool>,
    /// Slots of `subs` positioned on the current term.
    top: Vec<usize>,
    /// Target of the last ceiling seek, valid when `has_last_seek` is set.
    last_seek: Vec<u8>,
    has_last_seek: bool,
    /// Set by an exact seek or a partition failure: the queue does not reflect
    /// every partition, and must be rebuilt before advancing.
    pending_reseek_to_ceiling: bool,
    /// Copy of the current term used while re-seeking to it.
    scratch: Vec<u8>,
}

impl<C: TermsCursor> MergedTermsCursor<C> {
    /// Creates a cursor over partitions with the given document id slices.
    ///
    /// Slice `i` describes partition `i`; the number of slices bounds the number
    /// of cursors accepted by [`reset`](Self::reset).
    pub fn new(slices: Vec<DocIdSlice>) -> MergedTermsCursor<C> {
        Self::with_options(slices, MergedTermsOptions::default())
    }

    pub fn with_options(
        slices: Vec<DocIdSlice>,
        options: MergedTermsOptions,
    ) -> MergedTermsCursor<C> {
        let capacity = slices.len();
        MergedTermsCursor {
            slices,
            options,
            subs: Vec::with_capacity(capacity),
            queue: MergeQueue::with_capacity(capacity),
            bound: vec![false; capacity],
            top: Vec::with_capacity(capacity),
            last_seek: Vec::new(),
            has_last_seek: false,
            pending_reseek_to_ceiling: false,
            scratch: Vec::new(),
        }
    }

    pub fn options(&self) -> &MergedTermsOptions {
        &self.options
    }

    /// Number of partition slices the cursor was created for.
    pub fn partition_count(&self) -> usize {
        self.slices.len()
    }

    /// Number of partitions that held at least one term at the last `reset`.
    pub fn active_partition_count(&self) -> usize {
        self.subs.len()
    }

    /// Binds the cursor to a new set of partition cursors.
    ///
    /// Every cursor must already be positioned on its partition's first term
    /// (see [`PartitionCursor::first`]); cursors without a current term belong to
    /// empty partitions and are skipped. Previously bound cursors are dropped.
    ///
    /// Returns `None` when none of the partitions holds a term, in which case
    /// the merged view is empty. Otherwise the cursor is unpositioned until the
    /// first call to [`next`](Self::next) or a seek.
    ///
    /// # Panics
    ///
    /// Panics if a partition index has no slice, if a partition index is supplied
    /// twice, or if more cursors than slices are supplied.
    pub fn reset<I>(&mut self, cursors: I) -> Option<&mut Self>
    where
        I: IntoIterator<Item = PartitionCursor<C>>,
    {
        self.subs.clear();
        self.queue.clear();
        self.top.clear();
        self.has_last_seek = false;
        self.pending_reseek_to_ceiling = false;
        self.bound.fill(false);

        let mut supplied = 0;
        for PartitionCursor { partition, cursor } in cursors {
            supplied += 1;
            assert!(
                supplied <= self.slices.len(),
                "more partition cursors than the {} slices of the merged view",
                self.slices.len()
            );
            assert!(
                partition < self.slices.len(),
                "partition {partition} is out of bounds for {} slices",
                self.slices.len()
            );
            assert!(
                !self.bound[partition],
                "partition {partition} is bound more than once"
            );
            self.bound[partition] = true;
            if cursor.term().is_none() {
                continue;
            }
            let slot = self.subs.len();
            self.subs.push(Candidate {
                partition,
                slice: self.slices[partition],
                cursor,
            });
            self.queue.insert(slot, self.subs.as_slice());
        }

        log::trace!(
            "merged terms reset: {} of {supplied} partitions hold terms",
            self.subs.len()
        );

        if self.queue.is_empty() {
            None
        } else {
            Some(self)
        }
    }

    /// The current merged term, or `None` when unpositioned or exhausted.
    pub fn term(&self) -> Option<&[u8]> {
        self.top
            .first()
            .and_then(|&slot| self.subs[slot].term())
    }

    /// Positions the view exactly on `target`.
    ///
    /// Returns `Ok(true)` when at least one partition holds `target`; the top
    /// group then consists of exactly those partitions. Returns `Ok(false)`
    /// otherwise, leaving the view unpositioned.
    ///
    /// # Errors
    ///
    /// A partition failure is returned unchanged and leaves the view
    /// unpositioned.
    pub fn seek_exact(&mut self, target: &[u8]) -> Result<bool> {
        let result = self.try_seek_exact(target);
        if result.is_err() {
            self.abandon_position();
        }
        result
    }

    fn try_seek_exact(&mut self, target: &[u8]) -> Result<bool> {
        self.queue.clear();
        self.top.clear();

        let shortcut = self.monotonic_shortcut(target);
        self.has_last_seek = false;
        self.pending_reseek_to_ceiling = true;

        for slot in 0..self.subs.len() {
            let sub = &mut self.subs[slot];
            let matched = if shortcut {
                match sub.term() {
                    Some(current) => match target.cmp(current) {
                        Ordering::Equal => true,
                        Ordering::Less => false,
                        Ordering::Greater => sub.cursor.seek_exact(target)?,
                    },
                    None => false,
                }
            } else {
                sub.cursor.seek_exact(target)?
            };

            if matched {
                assert_eq!(
                    sub.term(),
                    Some(target),
                    "partition {} reported an exact match on a different term",
                    sub.partition
                );
                self.top.push(slot);
            }
        }

        log::trace!(
            "merged terms seek_exact: {} partitions matched{}",
            self.top.len(),
            if shortcut { " (monotonic)" } else { "" }
        );
        Ok(!self.top.is_empty())
    }

    /// Positions the view on the smallest term greater than or equal to `target`.
    ///
    /// - [`SeekStatus::Found`]: some partition holds `target`; it is the current term.
    /// - [`SeekStatus::NotFound`]: the current term is the smallest term greater
    ///   than `target` across all partitions.
    /// - [`SeekStatus::End`]: every partition is exhausted at or before `target`.
    ///
    /// # Errors
    ///
    /// A partition failure is returned unchanged and leaves the view
    /// unpositioned.
    pub fn seek_ceil(&mut self, target: &[u8]) -> Result<SeekStatus> {
        let result = self.try_seek_ceil(target);
        if result.is_err() {
            self.abandon_position();
        }
        result
    }

    fn try_seek_ceil(&mut self, target: &[u8]) -> Result<SeekStatus> {
        self.queue.clear();
        self.top.clear();
        self.pending_reseek_to_ceiling = false;

        let shortcut = self.monotonic_shortcut(target);
        self.last_seek.clear();
        self.last_seek.extend_from_slice(target);
        self.has_last_seek = true;

        for slot in 0..self.subs.len() {
            let sub = &mut self.subs[slot];
            let status = if shortcut {
                match sub.term() {
                    Some(current) => match target.cmp(current) {
                        Ordering::Equal => SeekStatus::Found,
                        Ordering::Less => SeekStatus::NotFound,
                        Ordering::Greater => sub.cursor.seek_ceil(target)?,
                    },
                    None => SeekStatus::End,
                }
            } else {
                sub.cursor.seek_ceil(target)?
            };

            match status {
                SeekStatus::Found => {
                    self.top.push(slot);
                    self.queue.insert(slot, self.subs.as_slice());
                }
                SeekStatus::NotFound => {
                    debug_assert!(self.subs[slot].term().is_some());
                    self.queue.insert(slot, self.subs.as_slice());
                }
                SeekStatus::End => {}
            }
        }

        let status = if !self.top.is_empty() {
            SeekStatus::Found
        } else if !self.queue.is_empty() {
            // No exact match, but some partitions hold larger terms: move to the
            // smallest of them.
            self.pull_top();
            SeekStatus::NotFound
        } else {
            SeekStatus::End
        };

        log::trace!(
            "merged terms seek_ceil: {status:?}, {} partitions on the current term{}",
            self.top.len(),
            if shortcut { " (monotonic)" } else { "" }
        );
        Ok(status)
    }

    /// Advances to the next term of the union and returns it, or `Ok(None)` once
    /// every partition is exhausted.
    ///
    /// Right after `reset` this moves to the first term.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidOperation` error when the view has no position to
    /// advance from: after an exact seek that matched nothing, or after a
    /// partition failure. A partition failure is returned unchanged and leaves
    /// the view unpositioned; a seek repositions it.
    pub fn next(&mut self) -> Result<Option<&[u8]>> {
        if self.pending_reseek_to_ceiling {
            verify_state!("next on an unpositioned view", !self.top.is_empty());
            // Partitions that missed the exact seek were left wherever their own
            // seek put them; a ceiling seek to the current term brings all of
            // them back into the queue.
            let mut current = std::mem::take(&mut self.scratch);
            current.clear();
            if let Some(term) = self.term() {
                current.extend_from_slice(term);
            }
            log::debug!(
                "merged terms: re-seeking to {:?} after an exact seek",
                String::from_utf8_lossy(&current)
            );
            let status = self.seek_ceil(&current);
            self.scratch = current;
            let status = status?;
            assert_eq!(
                status,
                SeekStatus::Found,
                "ceiling seek to the current term must find it"
            );
        }
        self.has_last_seek = false;

        if let Err(e) = self.push_top() {
            self.abandon_position();
            return Err(e);
        }

        if self.queue.is_empty() {
            log::trace!("merged terms exhausted");
            Ok(None)
        } else {
            self.pull_top();
            Ok(self.term())
        }
    }

    /// Number of partitions positioned on the current term.
    pub fn match_count(&self) -> usize {
        self.top.len()
    }

    /// The partitions positioned on the current term.
    ///
    /// The order is unspecified until [`merged_postings`](Self::merged_postings)
    /// is called, which sorts the group by partition index.
    pub fn match_set(&self) -> impl Iterator<Item = TermMatch<'_, C>> {
        self.top.iter().map(|&slot| {
            let sub = &self.subs[slot];
            TermMatch {
                partition: sub.partition,
                cursor: &sub.cursor,
                slice: sub.slice,
            }
        })
    }

    /// Number of documents containing the current term, summed over the
    /// partitions holding it.
    pub fn doc_freq(&self) -> Result<u64> {
        let mut sum = 0u64;
        for &slot in &self.top {
            sum += u64::from(self.subs[slot].cursor.doc_freq()?);
        }
        Ok(sum)
    }

    /// Total number of occurrences of the current term, summed over the
    /// partitions holding it.
    ///
    /// # Panics
    ///
    /// Panics if a partition holding the term does not record term frequencies.
    pub fn total_term_freq(&self) -> Result<u64> {
        let mut sum = 0u64;
        for &slot in &self.top {
            let sub = &self.subs[slot];
            let freq = sub.cursor.total_term_freq()?.unwrap_or_else(|| {
                panic!(
                    "partition {} reports an unknown total term frequency for a matched term",
                    sub.partition
                )
            });
            sum += freq;
        }
        Ok(sum)
    }

    /// Creates the postings of the current term for every partition holding it,
    /// ordered by ascending partition index.
    ///
    /// The order is part of the contract: a consumer translating local document
    /// ids through the slices relies on it to emit globally increasing ids.
    pub fn merged_postings(
        &mut self,
        flags: PostingsFlags,
    ) -> Result<Vec<SubPostings<C::Postings>>> {
        let subs = &self.subs;
        self.top.sort_unstable_by_key(|&slot| subs[slot].partition);

        let mut postings = Vec::with_capacity(self.top.len());
        for &slot in &self.top {
            let sub = &mut self.subs[slot];
            postings.push(SubPostings {
                partition: sub.partition,
                slice: sub.slice,
                postings: sub.cursor.postings(flags)?,
            });
        }
        Ok(postings)
    }

    /// Positioning by ordinal is not supported: partitions number their terms
    /// independently and there is no cheap mapping to a global rank.
    pub fn seek_ord(&mut self, _ord: u64) -> Result<()> {
        Err(Error::unsupported("seek_ord on a merged term view"))
    }

    /// See [`seek_ord`](Self::seek_ord).
    pub fn ord(&self) -> Result<u64> {
        Err(Error::unsupported("ord on a merged term view"))
    }

    /// Whether the previous operation leaves every partition's current term
    /// at or after its ceiling of `target`.
    fn monotonic_shortcut(&self, target: &[u8]) -> bool {
        self.options.monotonic_seek && self.has_last_seek && self.last_seek.as_slice() <= target
    }

    /// Forgets the position after a partition failure. The partition cursors may
    /// be anywhere, so the shortcut is disabled and `next` refuses to run until a
    /// seek rebuilds the queue.
    fn abandon_position(&mut self) {
        self.queue.clear();
        self.top.clear();
        self.has_last_seek = false;
        self.pending_reseek_to_ceiling = true;
    }

    /// Collects the partitions tied at the queue minimum into the top group.
    fn pull_top(&mut self) {
        debug_assert!(self.top.is_empty());
        self.queue.fill_top(self.subs.as_slice(), &mut self.top);
    }

    /// Advances every partition of the top group and restores the queue.
    ///
    /// Top-group members are the smallest entries of the queue, so each of them
    /// reaches the root in turn.
    fn push_top(&mut self) -> Result<()> {
        let count = self.top.len();
        self.top.clear();
        for _ in 0..count {
            let Some(slot) = self.queue.peek_min() else {
                break;
            };
            let exhausted = self.subs[slot].cursor.advance()?.is_none();
            if exhausted {
                self.queue.remove_min(self.subs.as_slice());
            } else {
                self.queue.update_min_key(self.subs.as_slice());
            }
        }
        Ok(())
    }
}

impl<C: TermsCursor> fmt::Debug for MergedTermsCursor<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MergedTermsCursor")
            .field("subs", &self.subs)
            .field("term", &self.term().map(String::from_utf8_lossy))
            .field("match_count", &self.top.len())
            .finish()
    }
}
