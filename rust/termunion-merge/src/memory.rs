//! In-memory partition dictionaries.
//!
//! [`MemoryTermDictionary`] holds a sorted vocabulary with its postings in plain
//! vectors and serves it through [`MemoryTermsCursor`], an implementation of the
//! [`TermsCursor`] contract that seeks by binary search. It is meant for small,
//! transient partitions (e.g. a buffer of recently added documents merged with
//! persisted segments) and for exercising the merge engine.

use termunion_common::{Result, error::Error, verify_arg};

use crate::cursor::{PostingsCursor, PostingsFlags, SeekStatus, TermsCursor};

/// One occurrence record: a partition-local document id and the number of
/// times the term occurs in that document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc: u32,
    pub freq: u32,
}

impl Posting {
    pub fn new(doc: u32, freq: u32) -> Posting {
        Posting { doc, freq }
    }
}

/// A term with its postings, sorted by document id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TermEntry {
    pub term: Vec<u8>,
    pub postings: Vec<Posting>,
}

impl TermEntry {
    pub fn new(term: impl Into<Vec<u8>>, postings: Vec<Posting>) -> TermEntry {
        TermEntry {
            term: term.into(),
            postings,
        }
    }
}

/// Sorted in-memory term dictionary of one partition.
#[derive(Debug, Clone)]
pub struct MemoryTermDictionary {
    entries: Vec<TermEntry>,
    has_term_freqs: bool,
}

impl MemoryTermDictionary {
    /// Builds a dictionary from unordered entries.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidArgument` error if a term occurs twice, if a term has
    /// no postings, or if a term's postings are not strictly increasing by
    /// document id, carry a zero frequency or use the document id `u32::MAX`.
    pub fn from_entries(entries: impl IntoIterator<Item = TermEntry>) -> Result<Self> {
        let mut entries = entries.into_iter().collect::<Vec<_>>();
        entries.sort_unstable_by(|a, b| a.term.cmp(&b.term));

        if let Some(pair) = entries.windows(2).find(|pair| pair[0].term == pair[1].term) {
            return Err(Error::invalid_arg(
                "entries",
                format!(
                    "duplicate term {:?}",
                    String::from_utf8_lossy(&pair[0].term)
                ),
            ));
        }

        for entry in &entries {
            let postings = &entry.postings;
            verify_arg!(postings, !postings.is_empty());
            verify_arg!(postings, postings.windows(2).all(|w| w[0].doc < w[1].doc));
            verify_arg!(postings, postings.iter().all(|p| p.freq > 0));
            // `doc_count` must fit the u32 doc id space.
            verify_arg!(postings, postings.iter().all(|p| p.doc < u32::MAX));
        }

        Ok(MemoryTermDictionary {
            entries,
            has_term_freqs: true,
        })
    }

    /// Builds a dictionary where every term occurs once, in document 0.
    pub fn from_terms<T: AsRef<[u8]>>(terms: impl IntoIterator<Item = T>) -> Result<Self> {
        Self::from_entries(
            terms
                .into_iter()
                .map(|term| TermEntry::new(term.as_ref(), vec![Posting::new(0, 1)])),
        )
    }

    /// Makes the dictionary report unknown total term frequencies, as a
    /// partition indexed without frequencies would.
    pub fn without_term_freqs(mut self) -> Self {
        self.has_term_freqs = false;
        self
    }

    /// Number of distinct terms.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of documents the partition spans: one past the largest document
    /// id in any postings list.
    pub fn doc_count(&self) -> u32 {
        self.entries
            .iter()
            .filter_map(|entry| entry.postings.last())
            .map(|posting| posting.doc + 1)
            .max()
            .unwrap_or(0)
    }

    /// The terms in increasing order.
    pub fn terms(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.iter().map(|entry| entry.term.as_slice())
    }

    pub fn get(&self, term: &[u8]) -> Option<&TermEntry> {
        self.entries
            .binary_search_by(|entry| entry.term.as_slice().cmp(term))
            .ok()
            .map(|idx| &self.entries[idx])
    }

    /// Creates an unpositioned cursor over the dictionary.
    pub fn cursor(&self) -> MemoryTermsCursor<'_> {
        MemoryTermsCursor {
            entries: &self.entries,
            has_term_freqs: self.has_term_freqs,
            current: None,
            next: 0,
        }
    }
}

/// [`TermsCursor`] over a [`MemoryTermDictionary`].
#[derive(Debug, Clone)]
pub struct MemoryTermsCursor<'a> {
    entries: &'a [TermEntry],
    has_term_freqs: bool,
    /// Index of the current entry.
    current: Option<usize>,
    /// Index of the entry `advance` moves to.
    next: usize,
}

impl<'a> MemoryTermsCursor<'a> {
    fn position(&mut self, idx: usize) {
        if idx < self.entries.len() {
            self.current = Some(idx);
            self.next = idx + 1;
        } else {
            self.current = None;
            self.next = self.entries.len();
        }
    }

    fn current_term(&self) -> Option<&'a [u8]> {
        let entries = self.entries;
        self.current.map(|idx| entries[idx].term.as_slice())
    }

    fn current_entry(&self) -> Result<&'a TermEntry> {
        let entries = self.entries;
        self.current
            .map(|idx| &entries[idx])
            .ok_or_else(|| Error::invalid_operation("term statistics of an unpositioned cursor"))
    }
}

impl<'a> TermsCursor for MemoryTermsCursor<'a> {
    type Postings = MemoryPostings<'a>;

    fn term(&self) -> Option<&[u8]> {
        self.current_term()
    }

    fn advance(&mut self) -> Result<Option<&[u8]>> {
        self.position(self.next);
        Ok(self.current_term())
    }

    fn seek_exact(&mut self, term: &[u8]) -> Result<bool> {
        match self
            .entries
            .binary_search_by(|entry| entry.term.as_slice().cmp(term))
        {
            Ok(idx) => {
                self.position(idx);
                Ok(true)
            }
            Err(_) => {
                self.position(self.entries.len());
                Ok(false)
            }
        }
    }

    fn seek_ceil(&mut self, term: &[u8]) -> Result<SeekStatus> {
        let idx = self
            .entries
            .partition_point(|entry| entry.term.as_slice() < term);
        self.position(idx);
        Ok(match self.current_term() {
            Some(found) if found == term => SeekStatus::Found,
            Some(_) => SeekStatus::NotFound,
            None => SeekStatus::End,
        })
    }

    fn doc_freq(&self) -> Result<u32> {
        let entry = self.current_entry()?;
        u32::try_from(entry.postings.len())
            .map_err(|_| Error::invalid_arg("postings", "more than u32::MAX documents"))
    }

    fn total_term_freq(&self) -> Result<Option<u64>> {
        let entry = self.current_entry()?;
        Ok(self
            .has_term_freqs
            .then(|| entry.postings.iter().map(|p| u64::from(p.freq)).sum()))
    }

    fn postings(&mut self, flags: PostingsFlags) -> Result<MemoryPostings<'a>> {
        let entry = self.current_entry()?;
        Ok(MemoryPostings {
            postings: &entry.postings,
            with_freqs: flags.contains(PostingsFlags::FREQS),
            next: 0,
        })
    }
}

/// [`PostingsCursor`] over the postings of one in-memory term.
#[derive(Debug, Clone)]
pub struct MemoryPostings<'a> {
    postings: &'a [Posting],
    with_freqs: bool,
    next: usize,
}

impl PostingsCursor for MemoryPostings<'_> {
    fn next_doc(&mut self) -> Result<Option<u32>> {
        let doc = self.postings.get(self.next).map(|posting| posting.doc);
        if doc.is_some() {
            self.next += 1;
        }
        Ok(doc)
    }

    fn freq(&self) -> u32 {
        if !self.with_freqs {
            return 1;
        }
        self.next
            .checked_sub(1)
            .and_then(|idx| self.postings.get(idx))
            .map_or(1, |posting| posting.freq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use termunion_common::error::ErrorKind;

    fn sample() -> MemoryTermDictionary {
        MemoryTermDictionary::from_entries([
            TermEntry::new("delta", vec![Posting::new(4, 1)]),
            TermEntry::new("alpha", vec![Posting::new(0, 2), Posting::new(3, 1)]),
            TermEntry::new("charlie", vec![Posting::new(1, 5)]),
        ])
        .unwrap()
    }

    fn collect_terms(cursor: &mut MemoryTermsCursor<'_>) -> Vec<String> {
        let mut terms = Vec::new();
        while let Some(term) = cursor.advance().unwrap() {
            terms.push(String::from_utf8(term.to_vec()).unwrap());
        }
        terms
    }

    #[test]
    fn test_entries_are_sorted() {
        let dict = sample();
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.doc_count(), 5);
        let mut cursor = dict.cursor();
        assert_eq!(cursor.term(), None);
        assert_eq!(collect_terms(&mut cursor), ["alpha", "charlie", "delta"]);
        assert_eq!(cursor.term(), None);
        assert_eq!(cursor.advance().unwrap(), None);
    }

    #[test]
    fn test_advance_through_trait_object() {
        let dict = sample();
        let mut cursor: Box<dyn TermsCursor<Postings = MemoryPostings<'_>> + '_> =
            Box::new(dict.cursor());
        assert_eq!(cursor.advance().unwrap(), Some(&b"alpha"[..]));
        let by_ref = &mut cursor;
        assert_eq!(by_ref.advance().unwrap(), Some(&b"charlie"[..]));
        assert_eq!(by_ref.term(), Some(&b"charlie"[..]));
    }

    #[test]
    fn test_duplicate_term_rejected() {
        let err = MemoryTermDictionary::from_terms(["b", "a", "b"]).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "entries");
                assert!(message.contains("duplicate term \"b\""));
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_postings_rejected() {
        let empty = MemoryTermDictionary::from_entries([TermEntry::new("a", vec![])]);
        assert!(matches!(
            empty.unwrap_err().kind(),
            ErrorKind::InvalidArgument { .. }
        ));

        let unsorted = MemoryTermDictionary::from_entries([TermEntry::new(
            "a",
            vec![Posting::new(3, 1), Posting::new(3, 1)],
        )]);
        assert!(unsorted.is_err());

        let zero_freq =
            MemoryTermDictionary::from_entries([TermEntry::new("a", vec![Posting::new(0, 0)])]);
        assert!(zero_freq.is_err());

        let last_doc = MemoryTermDictionary::from_entries([TermEntry::new(
            "a",
            vec![Posting::new(0, 1), Posting::new(u32::MAX, 1)],
        )]);
        assert!(matches!(
            last_doc.unwrap_err().kind(),
            ErrorKind::InvalidArgument { .. }
        ));

        let dict = MemoryTermDictionary::from_entries([TermEntry::new(
            "a",
            vec![Posting::new(u32::MAX - 1, 1)],
        )])
        .unwrap();
        assert_eq!(dict.doc_count(), u32::MAX);
    }

    #[test]
    fn test_seek_ceil() {
        let dict = sample();
        let mut cursor = dict.cursor();
        assert_eq!(cursor.seek_ceil(b"charlie").unwrap(), SeekStatus::Found);
        assert_eq!(cursor.term(), Some(&b"charlie"[..]));
        assert_eq!(cursor.seek_ceil(b"b").unwrap(), SeekStatus::NotFound);
        assert_eq!(cursor.term(), Some(&b"charlie"[..]));
        assert_eq!(cursor.advance().unwrap(), Some(&b"delta"[..]));
        assert_eq!(cursor.seek_ceil(b"").unwrap(), SeekStatus::NotFound);
        assert_eq!(cursor.term(), Some(&b"alpha"[..]));
        assert_eq!(cursor.seek_ceil(b"echo").unwrap(), SeekStatus::End);
        assert_eq!(cursor.term(), None);
    }

    #[test]
    fn test_seek_exact() {
        let dict = sample();
        let mut cursor = dict.cursor();
        assert!(cursor.seek_exact(b"delta").unwrap());
        assert_eq!(cursor.term(), Some(&b"delta"[..]));
        assert!(!cursor.seek_exact(b"bravo").unwrap());
        assert!(cursor.seek_exact(b"alpha").unwrap());
        assert_eq!(cursor.advance().unwrap(), Some(&b"charlie"[..]));
    }

    #[test]
    fn test_term_statistics() {
        let dict = sample();
        let mut cursor = dict.cursor();
        assert!(cursor.doc_freq().is_err());

        cursor.seek_exact(b"alpha").unwrap();
        assert_eq!(cursor.doc_freq().unwrap(), 2);
        assert_eq!(cursor.total_term_freq().unwrap(), Some(3));

        let dict = sample().without_term_freqs();
        let mut cursor = dict.cursor();
        cursor.seek_exact(b"charlie").unwrap();
        assert_eq!(cursor.doc_freq().unwrap(), 1);
        assert_eq!(cursor.total_term_freq().unwrap(), None);
    }

    #[test]
    fn test_postings() {
        let dict = sample();
        let mut cursor = dict.cursor();
        cursor.seek_exact(b"alpha").unwrap();

        let mut postings = cursor.postings(PostingsFlags::FREQS).unwrap();
        assert_eq!(postings.next_doc().unwrap(), Some(0));
        assert_eq!(postings.freq(), 2);
        assert_eq!(postings.next_doc().unwrap(), Some(3));
        assert_eq!(postings.freq(), 1);
        assert_eq!(postings.next_doc().unwrap(), None);

        let mut postings = cursor.postings(PostingsFlags::empty()).unwrap();
        assert_eq!(postings.next_doc().unwrap(), Some(0));
        assert_eq!(postings.freq(), 1);
    }
}
