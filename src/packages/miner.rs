use std::sync::mpsc;

use regex::Regex;
use threadpool::ThreadPool;
use threadpool_scope::scope_with;

use crate::packages::emitter::{emit_templates, TemplateSet};
use crate::packages::indexer::{index_lines, index_lines_conc, FreqTable};
use crate::packages::preprocess::{Preprocessor, TokenLine};
use crate::packages::tree::{down_split, select_roots, up_split};
use crate::packages::vectorize::{vectorize, LineVectors};

// The root threshold the selector is always invoked with; the first
// commons entry then qualifies unconditionally.
const ROOT_THRESHOLD_PER: f64 = 0.0;

/// Runs the full inference over one length group.
fn mine_group(
    group: &[TokenLine],
    freqs: &FreqTable,
    down_threshold: usize,
    mask_digits: bool,
) -> TemplateSet {
    let vectors: Vec<LineVectors> = group.iter().map(|tokens| vectorize(tokens, freqs)).collect();
    let mut buckets = select_roots(vectors, ROOT_THRESHOLD_PER);
    up_split(&mut buckets);
    down_split(&mut buckets, down_threshold);
    emit_templates(buckets, mask_digits)
}

fn merge(into: &mut TemplateSet, from: TemplateSet) {
    for (template, mut members) in from {
        into.entry(template).or_default().append(&mut members);
    }
}

/// Sequential inference over a batch of content lines. Returns the
/// insertion-ordered catalog mapping each template to its member line
/// ordinals; groups are processed in ascending length order.
pub fn mine_templates(
    lines: &[String],
    filters: &[Regex],
    delimiters: &[Regex],
    dataset: &str,
    down_threshold: usize,
    mask_digits: bool,
) -> TemplateSet {
    let pre = Preprocessor::new(filters, delimiters, dataset);
    let (freqs, groups) = index_lines(lines, &pre);
    log::debug!(
        "{} lines, {} length groups, {} distinct column tokens",
        lines.len(),
        groups.len(),
        freqs.len()
    );

    let mut templates = TemplateSet::new();
    for (length, group) in &groups {
        let set = mine_group(group, &freqs, down_threshold, mask_digits);
        log::debug!("group length {length}: {} lines, {} templates", group.len(), set.len());
        merge(&mut templates, set);
    }
    templates
}

/// Concurrent variant: the index is built by chunk workers on a shared
/// dashmap and each length group is then dispatched to the pool, results
/// merged in ascending length order so the catalog matches the sequential
/// path exactly.
pub fn mine_templates_conc(
    lines: &[String],
    filters: &[Regex],
    delimiters: &[Regex],
    dataset: &str,
    down_threshold: usize,
    mask_digits: bool,
    num_workers: usize,
) -> TemplateSet {
    let num_workers = num_workers.max(1);
    let pre = Preprocessor::new(filters, delimiters, dataset);
    let (freqs, groups) = index_lines_conc(lines, &pre, num_workers);
    log::debug!(
        "{} lines, {} length groups, {} distinct column tokens",
        lines.len(),
        groups.len(),
        freqs.len()
    );

    let pool = ThreadPool::new(num_workers);
    let (tx, rx) = mpsc::channel();
    scope_with(&pool, |scope| {
        for (length, group) in &groups {
            let tx = tx.clone();
            let freqs = &freqs;
            scope.execute(move || {
                log::trace!(
                    "mining group length {} ({} lines) on thread {}",
                    length,
                    group.len(),
                    thread_id::get()
                );
                tx.send((*length, mine_group(group, freqs, down_threshold, mask_digits)))
                    .unwrap();
            });
        }
        pool.join();
    });
    drop(tx);

    let mut results: Vec<(usize, TemplateSet)> = rx.into_iter().collect();
    results.sort_by_key(|(length, _)| *length);

    let mut templates = TemplateSet::new();
    for (_, set) in results {
        merge(&mut templates, set);
    }
    templates
}

#[cfg(test)]
use pretty_assertions::assert_eq;

#[cfg(test)]
use crate::packages::emitter::Template;

#[cfg(test)]
fn mine(lines: &[&str]) -> TemplateSet {
    mine_with(lines, 2, false)
}

#[cfg(test)]
fn mine_with(lines: &[&str], down_threshold: usize, mask_digits: bool) -> TemplateSet {
    let lines: Vec<String> = lines.iter().map(|s| s.to_string()).collect();
    mine_templates(&lines, &[], &[], "HDFS", down_threshold, mask_digits)
}

#[cfg(test)]
fn template(tokens: &[&str]) -> Template {
    tokens.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_single_line() {
    let templates = mine(&["alpha beta"]);
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[&template(&["alpha", "beta"])], vec![0]);
}

#[test]
fn test_pure_digit_column() {
    let templates = mine(&["user 1 logged", "user 2 logged", "user 3 logged"]);
    assert_eq!(templates.len(), 1);
    assert_eq!(
        templates[&template(&["user", "<*>", "logged"])],
        vec![0, 1, 2]
    );
}

#[test]
fn test_mixed_length_groups() {
    let templates = mine(&["a b c", "a b", "a b c"]);
    assert_eq!(templates.len(), 2);
    assert_eq!(templates[&template(&["a", "b"])], vec![1]);
    assert_eq!(templates[&template(&["a", "b", "c"])], vec![0, 2]);
}

#[test]
fn test_down_split_variable() {
    let templates = mine(&["op X end", "op Y end", "op Z end", "op W end"]);
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[&template(&["op", "<*>", "end"])], vec![0, 1, 2, 3]);
}

#[test]
fn test_constant_column_preserved() {
    let templates = mine(&["READ block 1", "READ block 2", "READ block 3"]);
    assert_eq!(templates.len(), 1);
    assert_eq!(
        templates[&template(&["READ", "block", "<*>"])],
        vec![0, 1, 2]
    );
}

#[test]
fn test_mask_digits_promotes_alphanumerics() {
    let templates = mine_with(&["READ blk0 x", "READ blk1 x", "READ blk2 x"], 2, true);
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[&template(&["READ", "<*>", "x"])], vec![0, 1, 2]);
}

#[test]
fn test_total_coverage() {
    let lines = [
        "a b c", "d e", "a b c", "f g h i", "d x", "a q c", "f g h i",
    ];
    let templates = mine(&lines);
    let mut covered: Vec<usize> = templates.values().flatten().copied().collect();
    covered.sort_unstable();
    assert_eq!(covered, (0..lines.len()).collect::<Vec<_>>());
}

#[test]
fn test_arity_matches_group_length() {
    let templates = mine(&["one", "two three", "four five six", "seven eight"]);
    for (template, members) in &templates {
        for &id in members {
            let expected = match id {
                0 => 1,
                1 | 3 => 2,
                _ => 3,
            };
            assert_eq!(template.len(), expected);
        }
    }
}

#[test]
fn test_determinism() {
    let lines = [
        "op X end", "op Y end", "user 1 logged", "user 2 logged", "a b", "op Z end",
    ];
    let first = mine(&lines);
    let second = mine(&lines);
    assert_eq!(first, second);
    assert_eq!(
        first.keys().collect::<Vec<_>>(),
        second.keys().collect::<Vec<_>>()
    );
}

#[test]
fn test_group_isolation() {
    let before = mine(&["a b c", "a b", "a b c"]);
    let after = mine(&["a b c", "z q", "a b c"]);
    assert_eq!(
        before[&template(&["a", "b", "c"])],
        after[&template(&["a", "b", "c"])]
    );
}

#[test]
fn test_wildcard_idempotence() {
    let filters = vec![Regex::new(r"sess-\d+").unwrap()];
    let lines = vec!["open sess-1 ok".to_string(), "open sess-2 ok".to_string()];
    let templates = mine_templates(&lines, &filters, &[], "HDFS", 2, false);
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[&template(&["open", "<*>", "ok"])], vec![0, 1]);
}

#[test]
fn test_slash_tokens_are_masked() {
    let templates = mine(&["mount /dev/sda1 done"]);
    assert_eq!(templates[&template(&["mount", "<*>", "done"])], vec![0]);
}

#[test]
fn test_empty_batch_emits_empty_catalog() {
    let templates = mine_templates(&[], &[], &[], "HDFS", 2, false);
    assert!(templates.is_empty());
}

#[test]
fn test_empty_content_line_is_covered() {
    let templates = mine(&["", "x y", "x y"]);
    assert_eq!(templates[&Template::new()], vec![0]);
    assert_eq!(templates[&template(&["x", "y"])], vec![1, 2]);
}

#[test]
fn test_concurrent_matches_sequential() {
    let lines: Vec<String> = (0..200)
        .map(|i| match i % 3 {
            0 => format!("op {} end", i),
            1 => format!("user u{} logged in", i),
            _ => "heartbeat ok".to_string(),
        })
        .collect();
    let seq = mine_templates(&lines, &[], &[], "HDFS", 2, false);
    let conc = mine_templates_conc(&lines, &[], &[], "HDFS", 2, false, 4);
    assert_eq!(seq, conc);
    assert_eq!(
        seq.keys().collect::<Vec<_>>(),
        conc.keys().collect::<Vec<_>>()
    );
}
