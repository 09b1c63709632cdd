use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::packages::emitter::TemplateSet;
use crate::packages::error::SiftError;
use crate::packages::formatter::StructuredLog;

/// Space-joined template string for each of the `n` input lines.
pub fn line_templates(n: usize, templates: &TemplateSet) -> Vec<String> {
    let mut per_line = vec![String::new(); n];
    for (template, members) in templates {
        let joined = template.join(" ");
        for &id in members {
            per_line[id] = joined.clone();
        }
    }
    per_line
}

/// Writes the header-parsed table back out with a leading 1-based `LineId`
/// column and a trailing `Template` column.
pub fn write_structured_csv(
    path: &Path,
    log: &StructuredLog,
    per_line: &[String],
) -> Result<(), SiftError> {
    let mut wtr = csv::Writer::from_path(path)?;

    let mut header = Vec::with_capacity(log.headers.len() + 2);
    header.push("LineId".to_string());
    header.extend(log.headers.iter().cloned());
    header.push("Template".to_string());
    wtr.write_record(&header)?;

    for (idx, record) in log.records.iter().enumerate() {
        let mut row = Vec::with_capacity(record.len() + 2);
        row.push((idx + 1).to_string());
        row.extend(record.iter().cloned());
        row.push(per_line[idx].clone());
        wtr.write_record(&row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Writes the flat catalog: space-joined tokens, two spaces, member count.
pub fn write_template_catalog(path: &Path, templates: &TemplateSet) -> Result<(), SiftError> {
    let mut out = BufWriter::new(File::create(path)?);
    for (template, members) in templates {
        writeln!(out, "{}  {}", template.join(" "), members.len())?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
fn sample_catalog() -> TemplateSet {
    let mut templates = TemplateSet::new();
    templates.insert(
        vec!["op".to_string(), "<*>".to_string(), "end".to_string()],
        vec![0, 2],
    );
    templates.insert(vec!["a".to_string(), "b".to_string()], vec![1]);
    templates
}

#[test]
fn test_line_templates_assignment() {
    let per_line = line_templates(3, &sample_catalog());
    assert_eq!(per_line, vec!["op <*> end", "a b", "op <*> end"]);
}

#[test]
fn test_write_template_catalog_format() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("templates.csv");
    write_template_catalog(&path, &sample_catalog()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents, "op <*> end  2\na b  1\n");
}

#[test]
fn test_write_structured_csv_columns() {
    let log = StructuredLog {
        headers: vec!["Level".to_string(), "Content".to_string()],
        records: vec![
            vec!["INFO".to_string(), "op X end".to_string()],
            vec!["WARN".to_string(), "a b".to_string()],
            vec!["INFO".to_string(), "op Y end".to_string()],
        ],
        skipped: 0,
    };
    let per_line = line_templates(3, &sample_catalog());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("structured.csv");
    write_structured_csv(&path, &log, &per_line).unwrap();

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines[0], "LineId,Level,Content,Template");
    assert_eq!(lines[1], "1,INFO,op X end,op <*> end");
    assert_eq!(lines[2], "2,WARN,a b,a b");
    assert_eq!(lines[3], "3,INFO,op Y end,op <*> end");
}
