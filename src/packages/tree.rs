use std::collections::HashSet;

use indexmap::IndexMap;

use crate::packages::vectorize::{FreqPair, LineVectors, Term};
use crate::packages::WILDCARD;

/// `(frequency, multiplicity)` pair a line elected as its root.
pub type RootKey = FreqPair;

/// Lines of one length group, bucketed by root key. The three maps are
/// parallel: `detail` holds the freq-desc views (the ones the splitters
/// rewrite, sentinel appended), `pairs` the freq-pairs-desc views the
/// up-splitter inspects, `inorder` the raw vectors the down-splitter reads.
#[derive(Debug, Default)]
pub struct RootBuckets {
    pub detail: IndexMap<RootKey, Vec<Vec<Term>>>,
    pub pairs: IndexMap<RootKey, Vec<Vec<FreqPair>>>,
    pub inorder: IndexMap<RootKey, Vec<Vec<Term>>>,
}

/// Elects a root key per line and registers the line's three views under
/// it. The sentinel triple is appended to the freq-desc view here so the
/// emitter can recover the ordinal after any amount of re-sorting.
pub fn select_roots(lines: Vec<LineVectors>, threshold_per: f64) -> RootBuckets {
    let mut buckets = RootBuckets::default();
    for line in lines {
        let LineVectors {
            ordinal,
            raw,
            mut freq_desc,
            commons,
            freq_pairs,
        } = line;
        let key = choose_root(&commons, threshold_per);
        freq_desc.push(Term::sentinel(ordinal));
        buckets.detail.entry(key).or_default().push(freq_desc);
        buckets.pairs.entry(key).or_default().push(freq_pairs);
        buckets.inorder.entry(key).or_default().push(raw);
    }
    buckets
}

/// Scans the commons list for the first entry whose multiplicity clears
/// `max_multiplicity * threshold_per` (non-strict). Falls back to the
/// highest-multiplicity entry seen when nothing qualifies. A line without
/// content columns lands in the `(0, 0)` bucket.
fn choose_root(commons: &[FreqPair], threshold_per: f64) -> RootKey {
    if commons.is_empty() {
        return (0, 0);
    }
    let max_mult = commons.iter().map(|pair| pair.1).max().unwrap_or(0);
    let threshold = max_mult as f64 * threshold_per;
    let mut candidate = commons[0];
    let mut best = 0usize;
    for pair in commons {
        if pair.1 as f64 >= threshold {
            return *pair;
        }
        if pair.1 >= best {
            candidate = *pair;
            best = pair.1;
        }
    }
    candidate
}

/// Left-of-root refinement. Frequency classes sitting before the root in a
/// member's freq-pairs-desc view are constant only if they co-occur with
/// the root on every member; the first class that does not is rewritten to
/// the wildcard across the bucket, and the bucket is then done.
pub fn up_split(buckets: &mut RootBuckets) {
    for (key, nodes) in &buckets.pairs {
        let mut father_count: Vec<FreqPair> = Vec::new();
        for node in nodes {
            let pos = match node.iter().position(|pair| pair == key) {
                Some(pos) => pos,
                None if node.is_empty() => continue,
                None => panic!("root key {key:?} missing from its bucket"),
            };
            father_count.extend_from_slice(&node[..pos]);
        }

        let mut seen: HashSet<FreqPair> = HashSet::new();
        for father in &father_count {
            if !seen.insert(*father) {
                continue;
            }
            let occurrences = father_count.iter().filter(|f| *f == father).count();
            if occurrences == key.0 {
                continue;
            }
            let details = buckets
                .detail
                .get_mut(key)
                .expect("detail bucket missing for root key");
            for line in details.iter_mut() {
                for term in line.iter_mut() {
                    if !term.is_sentinel() && term.freq == father.0 {
                        term.token = WILDCARD.to_string();
                    }
                }
            }
            break;
        }
    }
}

/// Right-of-root refinement. Positions whose frequency differs from the
/// root's are variable candidates; if the tokens observed there across the
/// bucket reach `threshold` distinct values, every occurrence of those
/// tokens is rewritten to the wildcard.
pub fn down_split(buckets: &mut RootBuckets, threshold: usize) {
    for (key, nodes) in &buckets.inorder {
        let Some(first) = nodes.first() else {
            continue;
        };
        let candidate_positions: Vec<usize> = first
            .iter()
            .enumerate()
            .filter(|(_, term)| term.freq != key.0)
            .map(|(pos, _)| pos)
            .collect();

        let mut variable: HashSet<String> = HashSet::new();
        for &pos in &candidate_positions {
            let observed: HashSet<&str> = nodes
                .iter()
                .filter(|node| pos < node.len())
                .map(|node| node[pos].token.as_str())
                .collect();
            if observed.len() >= threshold {
                variable.extend(observed.into_iter().map(str::to_string));
            }
        }
        if variable.is_empty() {
            continue;
        }

        let details = buckets
            .detail
            .get_mut(key)
            .expect("detail bucket missing for root key");
        for line in details.iter_mut() {
            for term in line.iter_mut() {
                if !term.is_sentinel() && variable.contains(&term.token) {
                    term.token = WILDCARD.to_string();
                }
            }
        }
    }
}

#[cfg(test)]
fn bucket_with(
    key: RootKey,
    detail: Vec<Vec<Term>>,
    pairs: Vec<Vec<FreqPair>>,
    inorder: Vec<Vec<Term>>,
) -> RootBuckets {
    let mut buckets = RootBuckets::default();
    buckets.detail.insert(key, detail);
    buckets.pairs.insert(key, pairs);
    buckets.inorder.insert(key, inorder);
    buckets
}

#[test]
fn test_choose_root_takes_first_entry_at_zero_threshold() {
    assert_eq!(choose_root(&[(3, 2), (1, 1)], 0.0), (3, 2));
    assert_eq!(choose_root(&[(1, 1)], 0.0), (1, 1));
}

#[test]
fn test_choose_root_empty_commons_gets_zero_bucket() {
    assert_eq!(choose_root(&[], 0.0), (0, 0));
}

#[test]
fn test_choose_root_candidate_fallback() {
    // with an unreachable threshold the scan falls through to the entry
    // with the highest multiplicity, later entries winning ties
    assert_eq!(choose_root(&[(9, 2), (4, 3), (2, 3)], 100.0), (2, 3));
}

#[test]
fn test_select_roots_appends_sentinel_and_registers_views() {
    let line = LineVectors {
        ordinal: 5,
        raw: vec![Term::new(2, "a", 0), Term::new(1, "b", 1)],
        freq_desc: vec![Term::new(2, "a", 0), Term::new(1, "b", 1)],
        commons: vec![(2, 1), (1, 1)],
        freq_pairs: vec![(2, 1), (1, 1)],
    };
    let buckets = select_roots(vec![line], 0.0);
    assert_eq!(buckets.detail.len(), 1);
    let detail = &buckets.detail[&(2, 1)];
    assert_eq!(detail[0].last().unwrap(), &Term::sentinel(5));
    assert_eq!(buckets.pairs[&(2, 1)][0], vec![(2, 1), (1, 1)]);
    assert_eq!(buckets.inorder[&(2, 1)][0].len(), 2);
}

#[test]
fn test_up_split_rewrites_first_mismatching_father_only() {
    use pretty_assertions::assert_eq;

    // root (3, 2) sits last in both pair views; the (5, 1) class occurs
    // twice across the prefixes != root frequency 3, so every freq-5
    // triple is masked. (4, 1) also mismatches but the bucket stops after
    // the first rewrite.
    let key = (3, 2);
    let detail = vec![
        vec![
            Term::new(5, "boot", 0),
            Term::new(4, "disk", 1),
            Term::new(3, "ok", 2),
            Term::sentinel(0),
        ],
        vec![
            Term::new(5, "boot", 0),
            Term::new(4, "disk", 1),
            Term::new(3, "ok", 2),
            Term::sentinel(1),
        ],
    ];
    let pairs = vec![
        vec![(5, 1), (4, 1), (3, 2)],
        vec![(5, 1), (4, 1), (3, 2)],
    ];
    let mut buckets = bucket_with(key, detail, pairs, vec![]);

    up_split(&mut buckets);

    let rewritten = &buckets.detail[&key];
    assert_eq!(rewritten[0][0].token, "<*>");
    assert_eq!(rewritten[0][1].token, "disk"); // untouched after the break
    assert_eq!(rewritten[0][2].token, "ok");
    assert_eq!(rewritten[1][0].token, "<*>");
    assert_eq!(rewritten[0].last().unwrap(), &Term::sentinel(0));
}

#[test]
fn test_up_split_keeps_fathers_that_co_occur() {
    // father count equals the root frequency: constant, nothing rewritten
    let key = (2, 1);
    let detail = vec![
        vec![Term::new(9, "hdr", 0), Term::new(2, "go", 1), Term::sentinel(0)],
        vec![Term::new(9, "hdr", 0), Term::new(2, "go", 1), Term::sentinel(1)],
    ];
    let pairs = vec![vec![(9, 1), (2, 1)], vec![(9, 1), (2, 1)]];
    let mut buckets = bucket_with(key, detail, pairs, vec![]);

    up_split(&mut buckets);

    assert_eq!(buckets.detail[&key][0][0].token, "hdr");
}

#[test]
fn test_down_split_masks_diverse_positions() {
    use pretty_assertions::assert_eq;

    let key = (4, 2);
    let names = ["alice", "bob", "carol", "dave"];
    let mut detail = Vec::new();
    let mut inorder = Vec::new();
    for (ordinal, name) in names.iter().enumerate() {
        let raw = vec![
            Term::new(4, "login", 0),
            Term::new(1, *name, 1),
            Term::new(4, "ok", 2),
        ];
        let mut fd = raw.clone();
        fd.sort_by(|a, b| b.freq.cmp(&a.freq));
        fd.push(Term::sentinel(ordinal));
        detail.push(fd);
        inorder.push(raw);
    }
    let mut buckets = bucket_with(key, detail, vec![], inorder);

    down_split(&mut buckets, 2);

    for line in &buckets.detail[&key] {
        let masked: Vec<&str> = line.iter().map(|t| t.token.as_str()).collect();
        assert_eq!(masked, vec!["login", "ok", "<*>", "-1"]);
    }
}

#[test]
fn test_down_split_below_threshold_keeps_tokens() {
    let key = (2, 2);
    let raw = vec![Term::new(2, "put", 0), Term::new(1, "k1", 1)];
    let mut fd = raw.clone();
    fd.push(Term::sentinel(0));
    let mut buckets = bucket_with(key, vec![fd], vec![], vec![raw]);

    down_split(&mut buckets, 2);

    assert_eq!(buckets.detail[&key][0][1].token, "k1");
}
