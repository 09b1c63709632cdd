use regex::Regex;

use crate::packages::WILDCARD;

/// One preprocessed line: the ordinal token followed by the content tokens.
pub type TokenLine = Vec<String>;

/// Turns raw message content into the token stream the indexer consumes.
/// Filters are substituted with the wildcard, delimiters are deleted, and
/// the dataset pack re-spaces punctuation so it tokenizes separately.
pub struct Preprocessor<'a> {
    filters: &'a [Regex],
    delimiters: &'a [Regex],
    dataset: &'a str,
    spaces_re: Regex,
}

impl<'a> Preprocessor<'a> {
    pub fn new(filters: &'a [Regex], delimiters: &'a [Regex], dataset: &'a str) -> Self {
        Preprocessor {
            filters,
            delimiters,
            dataset,
            spaces_re: Regex::new(r" +").expect("space run pattern"),
        }
    }

    pub fn tokenize(&self, line: &str, ordinal: usize) -> TokenLine {
        let mut s = line.to_string();
        for re in self.filters {
            s = re.replace_all(&s, WILDCARD).to_string();
        }
        for re in self.delimiters {
            s = re.replace_all(&s, "").to_string();
        }
        s = expand_punctuation(&s, self.dataset);
        s = s.replace(',', ", ");
        let s = self.spaces_re.replace_all(&s, " ");
        let s = s.trim();

        let mut tokens: TokenLine = Vec::with_capacity(16);
        tokens.push(ordinal.to_string());
        if !s.is_empty() {
            tokens.extend(s.split(' ').map(str::to_string));
        }
        tokens
    }
}

/// Appends a space after each punctuation mark the dataset wants split off.
/// Unknown tags expand nothing.
fn expand_punctuation(s: &str, dataset: &str) -> String {
    let marks: &[&str] = match dataset {
        "HealthApp" => &[":", "=", "|"],
        "Android" => &["(", ")", ":", "="],
        "HPC" => &["=", "-", ":"],
        "BGL" => &["=", "..", "(", ")"],
        "Hadoop" => &["_", ":", "=", "(", ")"],
        "HDFS" => &[":"],
        "Linux" => &["=", ":"],
        "Spark" => &[":"],
        "Thunderbird" => &[":", "="],
        "Windows" => &[":", "=", "[", "]"],
        "Zookeeper" => &[":", "="],
        _ => &[],
    };
    let mut s = s.to_string();
    for mark in marks {
        s = s.replace(mark, &format!("{} ", mark));
    }
    s
}

#[test]
fn test_tokenize_prepends_ordinal() {
    let pre = Preprocessor::new(&[], &[], "HDFS");
    assert_eq!(pre.tokenize("alpha beta", 7), vec!["7", "alpha", "beta"]);
}

#[test]
fn test_tokenize_expands_dataset_punctuation() {
    let pre = Preprocessor::new(&[], &[], "HDFS");
    assert_eq!(
        pre.tokenize("src: /10 dest: /9", 0),
        vec!["0", "src:", "/10", "dest:", "/9"]
    );

    let pre = Preprocessor::new(&[], &[], "HealthApp");
    assert_eq!(
        pre.tokenize("onStandStepChanged=1204", 3),
        vec!["3", "onStandStepChanged=", "1204"]
    );
}

#[test]
fn test_tokenize_unknown_dataset_skips_expansion() {
    let pre = Preprocessor::new(&[], &[], "NoSuchDataset");
    assert_eq!(pre.tokenize("a:b=c", 0), vec!["0", "a:b=c"]);
}

#[test]
fn test_tokenize_inserts_space_after_commas() {
    let pre = Preprocessor::new(&[], &[], "NoSuchDataset");
    assert_eq!(pre.tokenize("a,b,c", 0), vec!["0", "a,", "b,", "c"]);
}

#[test]
fn test_tokenize_collapses_space_runs() {
    let pre = Preprocessor::new(&[], &[], "HDFS");
    assert_eq!(pre.tokenize("  a    b  ", 0), vec!["0", "a", "b"]);
}

#[test]
fn test_filters_substitute_wildcard() {
    let filters = vec![Regex::new(r"blk_(|-)[0-9]+").unwrap()];
    let pre = Preprocessor::new(&filters, &[], "HDFS");
    assert_eq!(
        pre.tokenize("Received block blk_-1608 of size 91178", 0),
        vec!["0", "Received", "block", "<*>", "of", "size", "91178"]
    );
}

#[test]
fn test_delimiters_are_deleted_before_expansion() {
    let delimiters = vec![Regex::new(r"[!?]").unwrap()];
    let pre = Preprocessor::new(&[], &delimiters, "HDFS");
    assert_eq!(pre.tokenize("ready?! go:now", 0), vec!["0", "ready", "go:", "now"]);
}

#[test]
fn test_filter_marker_survives_comma_expansion() {
    // a filter match followed by a comma must not corrupt the marker
    let filters = vec![Regex::new(r"\d+\.\d+\.\d+\.\d+").unwrap()];
    let pre = Preprocessor::new(&filters, &[], "NoSuchDataset");
    assert_eq!(
        pre.tokenize("peers 10.0.0.1,10.0.0.2 joined", 0),
        vec!["0", "peers", "<*>,", "<*>", "joined"]
    );
}
