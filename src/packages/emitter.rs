use indexmap::IndexMap;

use crate::packages::tree::RootBuckets;
use crate::packages::WILDCARD;

/// An ordered tuple of tokens and wildcards; equality is structural.
pub type Template = Vec<String>;

/// Insertion-ordered catalog: template → member line ordinals.
pub type TemplateSet = IndexMap<Template, Vec<usize>>;

/// Canonicalizes every bucket line into its template. The ordinal is
/// recovered from the trailing sentinel before the triples are re-sorted
/// into column order; the sentinel sorts to the front and is skipped.
pub fn emit_templates(buckets: RootBuckets, mask_digits: bool) -> TemplateSet {
    let mut templates = TemplateSet::new();
    for (_key, lines) in buckets.detail {
        for line in lines {
            let ordinal = line
                .last()
                .filter(|term| term.is_sentinel())
                .map(|term| term.freq)
                .expect("bucket line lost its sentinel");
            let mut by_col = line;
            by_col.sort_by_key(|term| term.col);
            let template: Template = by_col
                .iter()
                .filter(|term| !term.is_sentinel())
                .map(|term| normalize_token(&term.token, mask_digits))
                .collect();
            templates.entry(template).or_default().push(ordinal);
        }
    }
    templates
}

/// The emission rules, in order: slash-bearing, pure-digit and
/// already-masked tokens always collapse to the wildcard; with
/// `mask_digits` any token containing a digit does too.
pub fn normalize_token(token: &str, mask_digits: bool) -> String {
    if token.contains('/') {
        return WILDCARD.to_string();
    }
    if !token.is_empty() && token.bytes().all(|b| b.is_ascii_digit()) {
        return WILDCARD.to_string();
    }
    if token.contains(WILDCARD) {
        return WILDCARD.to_string();
    }
    if mask_digits && token.bytes().any(|b| b.is_ascii_digit()) {
        return WILDCARD.to_string();
    }
    token.to_string()
}

#[cfg(test)]
use crate::packages::vectorize::Term;

#[test]
fn test_normalize_token_rules() {
    assert_eq!(normalize_token("var/log", false), "<*>");
    assert_eq!(normalize_token("12345", false), "<*>");
    assert_eq!(normalize_token("<*>,", false), "<*>");
    assert_eq!(normalize_token("blk42", false), "blk42");
    assert_eq!(normalize_token("blk42", true), "<*>");
    assert_eq!(normalize_token("ready", true), "ready");
    assert_eq!(normalize_token("", false), "");
}

#[test]
fn test_emit_orders_by_column_and_drops_sentinel() {
    use pretty_assertions::assert_eq;

    let mut buckets = RootBuckets::default();
    buckets.detail.insert(
        (2, 2),
        vec![vec![
            Term::new(2, "end", 2),
            Term::new(2, "start", 0),
            Term::new(1, "77", 1),
            Term::sentinel(9),
        ]],
    );
    let templates = emit_templates(buckets, false);
    assert_eq!(templates.len(), 1);
    assert_eq!(
        templates[&vec![
            "start".to_string(),
            "<*>".to_string(),
            "end".to_string()
        ]],
        vec![9]
    );
}

#[test]
fn test_emit_aggregates_members_per_template() {
    let mut buckets = RootBuckets::default();
    buckets.detail.insert(
        (1, 1),
        vec![
            vec![Term::new(1, "ping", 0), Term::sentinel(0)],
            vec![Term::new(1, "ping", 0), Term::sentinel(2)],
        ],
    );
    buckets.detail.insert(
        (3, 1),
        vec![vec![Term::new(3, "ping", 0), Term::sentinel(1)]],
    );
    let templates = emit_templates(buckets, false);
    assert_eq!(templates.len(), 1);
    assert_eq!(templates[&vec!["ping".to_string()]], vec![0, 2, 1]);
}

#[test]
fn test_emit_empty_line_yields_empty_template() {
    let mut buckets = RootBuckets::default();
    buckets.detail.insert((0, 0), vec![vec![Term::sentinel(3)]]);
    let templates = emit_templates(buckets, false);
    assert_eq!(templates[&Template::new()], vec![3]);
}
