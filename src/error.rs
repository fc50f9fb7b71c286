use std::fmt;
use std::io;

/// Point in the pipeline where branch lengths are compared
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitStage {
    /// After raw interpretation, before mid-measure commands split measures
    BeforeSplit,
    /// After the command processor split measures
    AfterSplit,
}

impl fmt::Display for SplitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitStage::BeforeSplit => write!(
                f,
                "before splitting measures on mid-measure commands; check the number of ',' in each branch"
            ),
            SplitStage::AfterSplit => write!(
                f,
                "after splitting measures on mid-measure commands; check that each branch has the same GOGO, BPMCHANGE and SCROLL commands"
            ),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("TJA does not contain required '{key}' metadata")]
    MissingMetadata { key: &'static str },

    #[error("Invalid {key} value: '{value}'")]
    InvalidHeaderValue { key: String, value: String },

    #[error("Invalid COURSE value: '{0}'")]
    InvalidCourseValue(String),

    #[error("Invalid value '{0}' for #START")]
    InvalidStartValue(String),

    #[error("Invalid value '{value}' for #{command} (course line {line})")]
    InvalidCommandValue {
        command: String,
        value: String,
        line: usize,
    },

    #[error("Malformed #BRANCHSTART '{value}': {reason}")]
    MalformedBranchStart { value: String, reason: String },

    #[error("Branches do not have the same number of measures {lengths:?} (checked {stage})")]
    BranchLengthMismatch {
        stage: SplitStage,
        lengths: [usize; 3],
    },

    #[error("Fumen parse error: {0}")]
    FumenParse(String),

    #[error("HP table error: {0}")]
    HpTable(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
