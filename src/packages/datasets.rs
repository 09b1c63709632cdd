use regex::Regex;

use crate::packages::error::SiftError;

/// Builtin header format for a known dataset tag.
pub fn format_string(dataset: &str) -> Option<&'static str> {
    match dataset {
        "Linux" => Some(r"<Month> <Date> <Time> <Level> <Component>(\[<PID>\])?: <Content>"),
        "Spark" => Some(r"<Date> <Time> <Level> <Component>: <Content>"),
        "HDFS" => Some(r"<Date> <Time> <Pid> <Level> <Component>: <Content>"),
        "HPC" => Some(r"<LogId> <Node> <Component> <State> <Time> <Flag> <Content>"),
        "Android" => Some(r"<Date> <Time>  <Pid>  <Tid> <Level> <Component>: <Content>"),
        "HealthApp" => Some(r"<Time>\|<Component>\|<Pid>\|<Content>"),
        "BGL" => Some(
            r"<Label> <Timestamp> <Date> <Node> <Time> <NodeRepeat> <Type> <Component> <Level> <Content>",
        ),
        "Hadoop" => Some(r"<Date> <Time> <Level> \[<Process>\] <Component>: <Content>"),
        "Thunderbird" => Some(
            r"<Label> <Timestamp> <Date> <User> <Month> <Day> <Time> <Location> <Component>(\[<PID>\])?: <Content>",
        ),
        "Windows" => Some(r"<Date> <Time>, <Level>                  <Component>    <Content>"),
        "Zookeeper" => Some(r"<Date> <Time> - <Level>  \[<Node>:<Component>@<Id>\] - <Content>"),
        _ => None,
    }
}

/// Censoring regexes substituted with the wildcard before tokenization.
pub fn filter_patterns(dataset: &str) -> Vec<&'static str> {
    match dataset {
        "Linux" => vec![
            r"(\d+\.){3}\d+",
            r"\w{3} \w{3} \d{2} \d{2}:\d{2}:\d{2} \d{4}",
            r"\d{2}:\d{2}:\d{2}",
        ],
        "Spark" => vec![r"(\d+\.){3}\d+", r"\b[KGTM]?B\b", r"([\w-]+\.){2,}[\w-]+"],
        "HDFS" => vec![
            r"blk_(|-)[0-9]+", // block id
            r"(/|)([0-9]+\.){3}[0-9]+(:[0-9]+|)(:|)", // IP
        ],
        "HPC" => vec![r"=\d+"],
        "Android" => vec![
            r"(/[\w-]+)+",
            r"([\w-]+\.){2,}[\w-]+",
            r"\b(\-?\+?\d+)\b|\b0[Xx][a-fA-F\d]+\b|\b[a-fA-F\d]{4,}\b",
        ],
        "BGL" => vec![r"core\.\d+"],
        "Hadoop" => vec![r"(\d+\.){3}\d+"],
        "Thunderbird" => vec![r"(\d+\.){3}\d+"],
        "Windows" => vec![r"0x.*?\s"],
        "Zookeeper" => vec![r"(/|)(\d+\.){3}\d+(:\d+)?"],
        _ => vec![],
    }
}

/// Delimiter regexes deleted outright before tokenization.
pub fn delimiter_patterns(dataset: &str) -> Vec<&'static str> {
    match dataset {
        "HDFS" => vec![r"[,!?=]"],
        _ => vec![],
    }
}

pub fn compile_filters<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, SiftError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p.as_ref()).map_err(|source| SiftError::FilterRegex {
                pattern: p.as_ref().to_string(),
                source,
            })
        })
        .collect()
}

pub fn compile_delimiters<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<Regex>, SiftError> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p.as_ref()).map_err(|source| SiftError::DelimiterRegex {
                pattern: p.as_ref().to_string(),
                source,
            })
        })
        .collect()
}

#[test]
fn test_builtin_packs_compile() {
    for dataset in [
        "HealthApp",
        "Android",
        "HPC",
        "BGL",
        "Hadoop",
        "HDFS",
        "Linux",
        "Spark",
        "Thunderbird",
        "Windows",
        "Zookeeper",
    ] {
        assert!(format_string(dataset).is_some(), "{dataset} has no format");
        compile_filters(&filter_patterns(dataset)).unwrap();
        compile_delimiters(&delimiter_patterns(dataset)).unwrap();
    }
}

#[test]
fn test_unknown_dataset_has_no_pack() {
    assert!(format_string("NoSuchDataset").is_none());
    assert!(filter_patterns("NoSuchDataset").is_empty());
    assert!(delimiter_patterns("NoSuchDataset").is_empty());
}

#[test]
fn test_invalid_user_regex_is_fatal() {
    let err = compile_filters(&["(unclosed"]).unwrap_err();
    assert!(matches!(err, SiftError::FilterRegex { .. }));
}
