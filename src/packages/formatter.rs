use std::fs::File;
use std::io::{self, BufRead};
use std::path::Path;

use regex::Regex;

use crate::packages::error::SiftError;

/// Hard cap on matched lines, inherited from the benchmark tooling.
const MAX_MATCHED_LINES: usize = 2_000_000;

/// Header-parsed view of a raw log file: field names, one row of field
/// values per matched line, and the number of lines dropped on the floor.
#[derive(Debug)]
pub struct StructuredLog {
    pub headers: Vec<String>,
    pub records: Vec<Vec<String>>,
    pub skipped: usize,
}

impl StructuredLog {
    /// Owned copy of one named column.
    pub fn column(&self, name: &str) -> Option<Vec<String>> {
        let idx = self.headers.iter().position(|h| h == name)?;
        Some(self.records.iter().map(|r| r[idx].clone()).collect())
    }
}

// https://doc.rust-lang.org/rust-by-example/std_misc/file/read_lines.html
// Returns an Iterator to the Reader of the lines of the file.
fn read_lines<P>(filename: P) -> io::Result<io::Lines<io::BufReader<File>>>
where
    P: AsRef<Path>,
{
    let file = File::open(filename)?;
    Ok(io::BufReader::new(file).lines())
}

fn regex_generator_helper(format: &str) -> (Vec<String>, String) {
    let splitters_re = Regex::new(r"(<[^<>]+>)").expect("field splitter pattern");
    let spaces_re = Regex::new(r" +").expect("space run pattern");
    let brackets: &[_] = &['<', '>'];

    let mut headers = Vec::new();
    let mut pattern = String::new();
    let mut prev_end = 0;
    for m in splitters_re.find_iter(format) {
        let splitter = spaces_re.replace_all(&format[prev_end..m.start()], r"\s+");
        pattern.push_str(&splitter);
        let header = m.as_str().trim_matches(brackets).to_string();
        pattern.push_str(format!("(?P<{}>.*?)", header).as_str());
        headers.push(header);
        prev_end = m.end();
    }
    let trailing = spaces_re.replace_all(&format[prev_end..], r"\s+");
    pattern.push_str(&trailing);
    (headers, pattern)
}

/// Compiles a `<Field>`-style format string into the anchored header regex
/// and the ordered list of field names it captures.
pub fn regex_generator(format: &str) -> Result<(Vec<String>, Regex), SiftError> {
    let (headers, pattern) = regex_generator_helper(format);
    let re = Regex::new(format!("^{}$", pattern).as_str()).map_err(|source| {
        SiftError::LogFormat {
            format: format.to_string(),
            source,
        }
    })?;
    Ok((headers, re))
}

/// Runs the header regex over a raw log file. Lines that fail to match the
/// header (or fail to decode) are dropped silently and only counted.
pub fn structure_file(path: &Path, format: &str) -> Result<StructuredLog, SiftError> {
    let (headers, re) = regex_generator(format)?;
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in read_lines(path)? {
        let line = match line {
            Ok(l) => l,
            Err(_) => {
                // some weirdly-encoded line, throw it out
                skipped += 1;
                continue;
            }
        };
        match re.captures(line.trim()) {
            Some(caps) => {
                records.push(
                    headers
                        .iter()
                        .map(|h| caps.name(h).map_or("", |m| m.as_str()).to_string())
                        .collect(),
                );
                if records.len() == MAX_MATCHED_LINES {
                    break;
                }
            }
            None => skipped += 1,
        }
    }
    Ok(StructuredLog {
        headers,
        records,
        skipped,
    })
}

#[test]
fn test_regex_generator_helper() {
    let linux_format = r"<Month> <Date> <Time> <Level> <Component>(\[<PID>\])?: <Content>";
    let (headers, pattern) = regex_generator_helper(linux_format);
    assert_eq!(
        headers,
        vec!["Month", "Date", "Time", "Level", "Component", "PID", "Content"]
    );
    assert_eq!(
        pattern,
        r"(?P<Month>.*?)\s+(?P<Date>.*?)\s+(?P<Time>.*?)\s+(?P<Level>.*?)\s+(?P<Component>.*?)(\[(?P<PID>.*?)\])?:\s+(?P<Content>.*?)"
    );
}

#[test]
fn test_regex_generator_keeps_leading_and_trailing_literals() {
    let (headers, pattern) = regex_generator_helper(r"[<Time>] <Program> - end");
    assert_eq!(headers, vec!["Time", "Program"]);
    assert_eq!(pattern, r"[(?P<Time>.*?)]\s+(?P<Program>.*?)\s+-\s+end");
}

#[test]
fn test_structure_file() {
    use std::io::Write;

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "081109 203615 148 INFO dfs.DataNode$PacketResponder: PacketResponder 1 terminating").unwrap();
    writeln!(file, "this line has no header").unwrap();
    writeln!(file, "081109 203807 222 INFO dfs.DataNode$PacketResponder: Responder 2 done").unwrap();
    file.flush().unwrap();

    let log = structure_file(
        file.path(),
        r"<Date> <Time> <Pid> <Level> <Component>: <Content>",
    )
    .unwrap();
    assert_eq!(log.records.len(), 2);
    assert_eq!(log.skipped, 1);
    assert_eq!(
        log.column("Content").unwrap(),
        vec!["PacketResponder 1 terminating", "Responder 2 done"]
    );
    assert_eq!(log.column("Pid").unwrap(), vec!["148", "222"]);
}

#[test]
fn test_bad_format_is_config_error() {
    let err = regex_generator(r"(<Oops> <Content>").unwrap_err();
    assert!(matches!(err, SiftError::LogFormat { .. }));
}
