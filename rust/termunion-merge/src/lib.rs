//! Merged term dictionary view over many index partitions.
//!
//! A search index is usually split into independently built partitions
//! (segments), each with its own sorted term dictionary. This crate presents
//! the union of those dictionaries as a single sorted, deduplicated vocabulary
//! without building a combined dictionary.
//!
//! # Overview
//!
//! - [`TermsCursor`] and [`PostingsCursor`] are the contracts of a partition's
//!   dictionary and postings readers. The merge consumes them; storage formats
//!   implement them.
//! - [`MergedTermsCursor`] performs a tie-aware k-way merge over N partition
//!   cursors. At each merged term it knows which partitions hold the term, sums
//!   their statistics, and hands out their postings in partition order together
//!   with each partition's [`DocIdSlice`].
//! - [`MemoryTermDictionary`] is an in-memory partition, useful for transient
//!   data and tests.
//!
//! # Quick Start
//!
//! ```rust
//! use termunion_merge::{
//!     DocIdSlice, MemoryTermDictionary, MergedTermsCursor, PartitionCursor, SeekStatus,
//! };
//!
//! let a = MemoryTermDictionary::from_terms(["apple", "banana", "cherry"]).unwrap();
//! let b = MemoryTermDictionary::from_terms(["banana", "date"]).unwrap();
//!
//! let mut merged = MergedTermsCursor::new(DocIdSlice::consecutive([1, 1]).unwrap());
//! merged
//!     .reset(vec![
//!         PartitionCursor::first(0, a.cursor()).unwrap(),
//!         PartitionCursor::first(1, b.cursor()).unwrap(),
//!     ])
//!     .expect("partitions hold terms");
//!
//! assert_eq!(merged.seek_ceil(b"blueberry").unwrap(), SeekStatus::NotFound);
//! assert_eq!(merged.term(), Some(&b"cherry"[..]));
//!
//! assert!(merged.seek_exact(b"banana").unwrap());
//! assert_eq!(merged.doc_freq().unwrap(), 2);
//! ```

mod candidate;
pub mod cursor;
pub mod memory;
pub mod merged;
pub mod queue;
pub mod slice;

pub use candidate::PartitionCursor;
pub use cursor::{PostingsCursor, PostingsFlags, SeekStatus, TermsCursor};
pub use memory::{MemoryPostings, MemoryTermDictionary, MemoryTermsCursor, Posting, TermEntry};
pub use merged::{MergedTermsCursor, MergedTermsOptions, SubPostings, TermMatch};
pub use slice::DocIdSlice;
