use indexmap::IndexMap;

use crate::packages::indexer::FreqTable;
use crate::packages::preprocess::TokenLine;

/// One position of one line: the batch-wide frequency of `token` at its
/// column, the token itself, and the 0-based content column. Kept by value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Term {
    pub freq: usize,
    pub token: String,
    pub col: i64,
}

impl Term {
    pub fn new(freq: usize, token: impl Into<String>, col: i64) -> Self {
        Term {
            freq,
            token: token.into(),
            col,
        }
    }

    /// Ordinal carrier appended to the freq-desc view during root
    /// selection; its frequency slot holds the line ordinal.
    pub fn sentinel(ordinal: usize) -> Self {
        Term {
            freq: ordinal,
            token: "-1".to_string(),
            col: -1,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.col < 0
    }
}

/// A `(frequency, multiplicity)` pair from a line's commons view.
pub type FreqPair = (usize, usize);

/// One line of a length group, in the four shapes the splitters consume.
/// The source keeps these as separate vectors rather than index
/// permutations over shared storage; that separation is preserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineVectors {
    pub ordinal: usize,
    /// Triples in column order, sentinel-free. Down-splitter input.
    pub raw: Vec<Term>,
    /// Triples sorted by frequency descending (stable). Mutated by the
    /// splitters; the sentinel is appended here by root selection.
    pub freq_desc: Vec<Term>,
    /// `(freq, multiplicity)` pairs, multiplicity descending, first-seen
    /// order on ties.
    pub commons: Vec<FreqPair>,
    /// The same pairs, frequency descending.
    pub freq_pairs: Vec<FreqPair>,
}

/// Builds the triple vector and its derived views for one line.
/// Column 0 (the ordinal) is excluded; triple at local index `i` carries
/// column `i` and its frequency was indexed at column `i + 1`.
pub fn vectorize(tokens: &TokenLine, freqs: &FreqTable) -> LineVectors {
    let ordinal = tokens[0]
        .parse::<usize>()
        .expect("ordinal token is decimal");

    let mut raw = Vec::with_capacity(tokens.len() - 1);
    for (col, token) in tokens.iter().enumerate().skip(1) {
        let freq = *freqs
            .get(&(col, token.clone()))
            .expect("token missing from frequency table");
        raw.push(Term::new(freq, token.clone(), (col - 1) as i64));
    }

    let mut freq_desc = raw.clone();
    freq_desc.sort_by(|a, b| b.freq.cmp(&a.freq));

    let mut counts: IndexMap<usize, usize> = IndexMap::new();
    for term in &raw {
        *counts.entry(term.freq).or_default() += 1;
    }
    let mut commons: Vec<FreqPair> = counts.into_iter().collect();
    commons.sort_by(|a, b| b.1.cmp(&a.1));

    let mut freq_pairs = commons.clone();
    freq_pairs.sort_by(|a, b| b.0.cmp(&a.0));

    LineVectors {
        ordinal,
        raw,
        freq_desc,
        commons,
        freq_pairs,
    }
}

#[cfg(test)]
fn table(entries: &[(usize, &str, usize)]) -> FreqTable {
    entries
        .iter()
        .map(|(col, token, freq)| ((*col, token.to_string()), *freq))
        .collect()
}

#[test]
fn test_vectorize_views() {
    let freqs = table(&[(1, "send", 9), (2, "x", 1), (3, "done", 9)]);
    let tokens: TokenLine = vec!["4", "send", "x", "done"]
        .into_iter()
        .map(String::from)
        .collect();
    let line = vectorize(&tokens, &freqs);

    assert_eq!(line.ordinal, 4);
    assert_eq!(
        line.raw,
        vec![
            Term::new(9, "send", 0),
            Term::new(1, "x", 1),
            Term::new(9, "done", 2),
        ]
    );
    // stable: equal frequencies keep column order
    assert_eq!(
        line.freq_desc,
        vec![
            Term::new(9, "send", 0),
            Term::new(9, "done", 2),
            Term::new(1, "x", 1),
        ]
    );
    assert_eq!(line.commons, vec![(9, 2), (1, 1)]);
    assert_eq!(line.freq_pairs, vec![(9, 2), (1, 1)]);
}

#[test]
fn test_commons_tie_keeps_first_seen_order() {
    // frequencies 3 and 7 both occur twice; 3 is seen first
    let freqs = table(&[(1, "a", 3), (2, "b", 7), (3, "c", 3), (4, "d", 7)]);
    let tokens: TokenLine = vec!["0", "a", "b", "c", "d"]
        .into_iter()
        .map(String::from)
        .collect();
    let line = vectorize(&tokens, &freqs);
    assert_eq!(line.commons, vec![(3, 2), (7, 2)]);
    assert_eq!(line.freq_pairs, vec![(7, 2), (3, 2)]);
}

#[test]
fn test_sentinel_is_distinguishable() {
    let sentinel = Term::sentinel(42);
    assert_eq!(sentinel.freq, 42);
    assert!(sentinel.is_sentinel());
    assert!(!Term::new(1, "x", 0).is_sentinel());
}
