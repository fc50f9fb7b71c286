//! Recoverable conditions reported alongside a successful result

use crate::constants::Branch;
use log::warn;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Warning {
    #[error(
        "Expected {expected} measure(s) in the '{branch}' branch but it only had {actual}; {}",
        healing(.copied_from)
    )]
    BranchLengthHealed {
        branch: Branch,
        expected: usize,
        actual: usize,
        copied_from: Option<Branch>,
    },

    #[error("Ignoring invalid note '{glyph}' in measure '{measure}'")]
    InvalidNote { glyph: char, measure: String },

    #[error("'8' note without a matching drumroll/balloon/kusudama note; ignoring it")]
    UnmatchedRollEnd,

    #[error("Not enough values for 'BALLOON:' ({balloons:?}); using 1 hit")]
    BalloonCountExhausted { balloons: Vec<i32> },

    #[error("Data encountered before first COURSE: '{line}'")]
    DataBeforeCourse { line: String },

    #[error("Ignoring invalid #MEASURE value '{value}'")]
    InvalidTimeSignature { value: String },

    #[error("Ignoring invalid DEMOSTART value '{value}'")]
    InvalidDemoStart { value: String },

    #[error("Ignoring unknown #SENOTECHANGE value '{value}'")]
    UnknownSeNote { value: String },
}

fn healing(copied_from: &Option<Branch>) -> String {
    match copied_from {
        Some(from) => format!("measures were copied from the '{from}' branch"),
        None => "empty measures were added".to_string(),
    }
}

/// Collects warnings and logs them unless silent
#[derive(Debug, Default)]
pub struct Warnings {
    silent: bool,
    items: Vec<Warning>,
}

impl Warnings {
    pub fn new(silent: bool) -> Self {
        Self {
            silent,
            items: Vec::new(),
        }
    }

    pub fn push(&mut self, warning: Warning) {
        if !self.silent {
            warn!("{warning}");
        }
        self.items.push(warning);
    }

    pub fn is_silent(&self) -> bool {
        self.silent
    }

    pub fn items(&self) -> &[Warning] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
