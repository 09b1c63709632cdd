use thiserror::Error;

#[derive(Error, Debug)]
pub enum SiftError {
    #[error("invalid filter regex {pattern:?}: {source}")]
    FilterRegex { pattern: String, source: regex::Error },

    #[error("invalid delimiter regex {pattern:?}: {source}")]
    DelimiterRegex { pattern: String, source: regex::Error },

    #[error("log format {format:?} does not compile: {source}")]
    LogFormat { format: String, source: regex::Error },

    #[error("log format {0:?} declares no <Content> field")]
    MissingContentField(String),

    #[error("unknown dataset {0:?} and no --log-format override given")]
    UnknownDataset(String),

    #[error("reference column {0:?} not found in ground truth file")]
    MissingReferenceColumn(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}
