use std::collections::{BTreeMap, HashMap};
use std::sync::mpsc;

use dashmap::DashMap;
use threadpool::ThreadPool;
use threadpool_scope::scope_with;

use crate::packages::preprocess::{Preprocessor, TokenLine};

/// `(column, token)` pair. The same string at two columns is two keys.
pub type ColumnToken = (usize, String);

/// How many lines of the whole batch carry `token` at `column`. Built once
/// by the indexer, read-only afterwards. Column 0 (the ordinal) is indexed
/// but never consulted by the later stages.
pub type FreqTable = HashMap<ColumnToken, usize>;

/// Lines binned by token count (ordinal included), ascending.
pub type LengthGroups = BTreeMap<usize, Vec<TokenLine>>;

enum FreqSink<'a> {
    Local(&'a mut FreqTable),
    Shared(&'a DashMap<ColumnToken, usize>),
}

fn index_tokens(tokens: &[String], sink: &mut FreqSink) {
    match sink {
        FreqSink::Local(table) => {
            for (col, token) in tokens.iter().enumerate() {
                *table.entry((col, token.clone())).or_default() += 1;
            }
        }
        FreqSink::Shared(table) => {
            for (col, token) in tokens.iter().enumerate() {
                *table.entry((col, token.clone())).or_default() += 1;
            }
        }
    }
}

/// Single-pass sequential build of the frequency table and length bins.
pub fn index_lines(lines: &[String], pre: &Preprocessor) -> (FreqTable, LengthGroups) {
    let mut freqs = FreqTable::new();
    let mut groups = LengthGroups::new();
    for (ordinal, line) in lines.iter().enumerate() {
        let tokens = pre.tokenize(line, ordinal);
        index_tokens(&tokens, &mut FreqSink::Local(&mut freqs));
        groups.entry(tokens.len()).or_default().push(tokens);
    }
    (freqs, groups)
}

/// Concurrent build: per-worker chunks tokenize into a shared dashmap and
/// send their local length bins back over a channel. Bins are merged and
/// re-sorted by ordinal afterwards, so the result is identical to the
/// sequential build.
pub fn index_lines_conc(
    lines: &[String],
    pre: &Preprocessor,
    num_workers: usize,
) -> (FreqTable, LengthGroups) {
    let shared: DashMap<ColumnToken, usize> = DashMap::new();
    let pool = ThreadPool::new(num_workers);
    let (tx, rx) = mpsc::channel();
    let chunk_size = (lines.len() / num_workers).max(1);

    scope_with(&pool, |scope| {
        for (chunk_idx, chunk) in lines.chunks(chunk_size).enumerate() {
            let tx = tx.clone();
            let shared = &shared;
            let base = chunk_idx * chunk_size;
            scope.execute(move || {
                log::trace!(
                    "indexing {} lines from ordinal {} on thread {}",
                    chunk.len(),
                    base,
                    thread_id::get()
                );
                let mut bins = LengthGroups::new();
                for (offset, line) in chunk.iter().enumerate() {
                    let tokens = pre.tokenize(line, base + offset);
                    index_tokens(&tokens, &mut FreqSink::Shared(shared));
                    bins.entry(tokens.len()).or_default().push(tokens);
                }
                tx.send(bins).unwrap();
            });
        }
        pool.join();
    });

    drop(tx);

    let mut groups = LengthGroups::new();
    for bins in rx {
        for (len, mut chunk_lines) in bins {
            groups.entry(len).or_default().append(&mut chunk_lines);
        }
    }
    for group_lines in groups.values_mut() {
        group_lines.sort_by_key(|tokens| {
            tokens[0].parse::<usize>().expect("ordinal token is decimal")
        });
    }

    let mut freqs = FreqTable::with_capacity(shared.len());
    for (key, value) in shared {
        freqs.insert(key, value);
    }
    (freqs, groups)
}

#[cfg(test)]
fn sample_lines() -> Vec<String> {
    vec![
        "user 1 logged".to_string(),
        "user 2 logged".to_string(),
        "session closed".to_string(),
        "user 1 logged".to_string(),
    ]
}

#[test]
fn test_index_lines_counts_per_column() {
    let pre = Preprocessor::new(&[], &[], "HDFS");
    let (freqs, groups) = index_lines(&sample_lines(), &pre);

    assert_eq!(freqs[&(1, "user".to_string())], 3);
    assert_eq!(freqs[&(2, "1".to_string())], 2);
    assert_eq!(freqs[&(2, "2".to_string())], 1);
    assert_eq!(freqs[&(3, "logged".to_string())], 3);
    assert_eq!(freqs[&(1, "session".to_string())], 1);
    // ordinal column is indexed too
    assert_eq!(freqs[&(0, "0".to_string())], 1);

    assert_eq!(groups.len(), 2);
    assert_eq!(groups[&4].len(), 3);
    assert_eq!(groups[&3], vec![vec!["2", "session", "closed"]]);
}

#[test]
fn test_same_token_at_two_columns_is_two_keys() {
    let pre = Preprocessor::new(&[], &[], "HDFS");
    let lines = vec!["ping ping".to_string()];
    let (freqs, _) = index_lines(&lines, &pre);
    assert_eq!(freqs[&(1, "ping".to_string())], 1);
    assert_eq!(freqs[&(2, "ping".to_string())], 1);
}

#[test]
fn test_index_lines_conc_matches_sequential() {
    use pretty_assertions::assert_eq;

    let lines: Vec<String> = (0..97)
        .map(|i| format!("op {} end {}", i % 7, i))
        .collect();
    let pre = Preprocessor::new(&[], &[], "HDFS");
    let (seq_freqs, seq_groups) = index_lines(&lines, &pre);
    let (conc_freqs, conc_groups) = index_lines_conc(&lines, &pre, 4);
    assert_eq!(seq_freqs, conc_freqs);
    assert_eq!(seq_groups, conc_groups);
}

#[test]
fn test_index_lines_empty_batch() {
    let pre = Preprocessor::new(&[], &[], "HDFS");
    let (freqs, groups) = index_lines(&[], &pre);
    assert!(freqs.is_empty());
    assert!(groups.is_empty());
}
