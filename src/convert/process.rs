//! Command processor: resolve rolling state and split measures
//!
//! Commands at glyph position 0 amend the measure they open; commands that
//! change tempo, scroll, go-go or note type mid-measure close the measure in
//! progress and open a sub-measure starting at the command's position.

use crate::branches::Branches;
use crate::constants::{Branch, Glyph, NoteType};
use crate::error::{Error, Result, SplitStage};
use crate::tja::{EventKind, ItemData, Measure};
use serde::{Deserialize, Serialize};

/// How `#BRANCHSTART` thresholds are measured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchKind {
    /// `p`: fraction of the branch points accumulated since the last branch
    Percentage,
    /// `r`: raw branch points
    Points,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BranchCondition {
    pub kind: BranchKind,
    /// Thresholds for advanced and master
    pub thresholds: (f32, f32),
}

impl BranchCondition {
    /// Parse a `type,val1,val2` descriptor
    pub fn parse(value: &str) -> Result<Self> {
        let malformed = |reason: String| Error::MalformedBranchStart {
            value: value.to_string(),
            reason,
        };

        let parts: Vec<&str> = value.split(',').map(str::trim).collect();
        let [kind, first, second] = parts[..] else {
            return Err(malformed(format!(
                "expected 3 comma-separated values, got {}",
                parts.len()
            )));
        };

        let (kind, scale) = match kind.to_ascii_lowercase().as_str() {
            "r" => (BranchKind::Points, 1.0),
            "p" => (BranchKind::Percentage, 100.0),
            other => return Err(malformed(format!("unknown branch type '{other}'"))),
        };
        let number = |s: &str| -> Result<f32> {
            s.parse::<f32>()
                .map_err(|_| malformed(format!("threshold '{s}' is not a number")))
        };

        Ok(Self {
            kind,
            thresholds: (number(first)? / scale, number(second)? / scale),
        })
    }
}

/// A measure (or sub-measure) with its rolling state resolved
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedMeasure {
    pub bpm: f32,
    pub scroll: f32,
    pub gogo: bool,
    pub barline: bool,
    pub time_sig: (i32, i32),
    /// Glyph slots in the source measure
    pub sub_divisions: usize,
    pub pos_start: usize,
    pub pos_end: usize,
    /// One-shot delay before this measure, milliseconds
    pub delay: f32,
    pub level_hold: bool,
    /// Type forced onto the first note by `#SENOTECHANGE`
    pub se_note: Option<NoteType>,
    pub branch_condition: Option<BranchCondition>,
    /// (glyph position, glyph) pairs
    pub notes: Vec<(usize, Glyph)>,
}

/// State carried from one measure to the next
#[derive(Debug, Clone, Copy)]
struct Rolling {
    bpm: f32,
    scroll: f32,
    gogo: bool,
    barline: bool,
    time_sig: (i32, i32),
}

impl Rolling {
    fn open(&self, sub_divisions: usize, pos_start: usize, se_note: Option<NoteType>) -> ProcessedMeasure {
        ProcessedMeasure {
            bpm: self.bpm,
            scroll: self.scroll,
            gogo: self.gogo,
            barline: self.barline,
            time_sig: self.time_sig,
            sub_divisions,
            pos_start,
            pos_end: 0,
            delay: 0.0,
            level_hold: false,
            se_note,
            branch_condition: None,
            notes: Vec::new(),
        }
    }
}

/// Process one branch
pub fn process_branch(measures: &[Measure], bpm: f32) -> Result<Vec<ProcessedMeasure>> {
    let mut state = Rolling {
        bpm,
        scroll: 1.0,
        gogo: false,
        barline: true,
        time_sig: (4, 4),
    };
    let mut processed = Vec::with_capacity(measures.len());

    for measure in measures {
        let sub_divisions = measure.notes.len();
        let mut current = state.open(sub_divisions, 0, None);

        for item in &measure.combined {
            let kind = match &item.data {
                ItemData::Note(glyph) => {
                    current.notes.push((item.pos, *glyph));
                    continue;
                }
                ItemData::Event(kind) => kind,
            };

            let mut se_note = None;
            match kind {
                EventKind::Delay(secs) => current.delay = secs * 1000.0,
                EventKind::BranchStart(value) => {
                    current.branch_condition = Some(BranchCondition::parse(value)?)
                }
                EventKind::Section => {}
                EventKind::LevelHold => current.level_hold = true,
                EventKind::Barline(on) => {
                    state.barline = *on;
                    current.barline = *on;
                }
                EventKind::Measure(num, den) => {
                    state.time_sig = (*num, *den);
                    current.time_sig = state.time_sig;
                }
                EventKind::Bpm(value) => state.bpm = *value,
                EventKind::Scroll(value) => state.scroll = *value,
                EventKind::Gogo(on) => state.gogo = *on,
                EventKind::SeNote(note) => se_note = Some(*note),
            }

            if !kind.splits_measure() {
                continue;
            }
            if item.pos == 0 {
                match kind {
                    EventKind::Bpm(_) => current.bpm = state.bpm,
                    EventKind::Scroll(_) => current.scroll = state.scroll,
                    EventKind::Gogo(_) => current.gogo = state.gogo,
                    EventKind::SeNote(_) => current.se_note = se_note,
                    _ => {}
                }
            } else {
                let next = state.open(sub_divisions, item.pos, se_note);
                let mut done = std::mem::replace(&mut current, next);
                done.pos_end = item.pos;
                processed.push(done);
            }
        }

        current.pos_end = sub_divisions;
        processed.push(current);
    }

    Ok(processed)
}

/// Process every branch and re-check branch lengths after splitting
pub fn process_commands(
    branches: &Branches<Vec<Measure>>,
    bpm: f32,
) -> Result<Branches<Vec<ProcessedMeasure>>> {
    let processed = Branches {
        normal: process_branch(&branches[Branch::Normal], bpm)?,
        professional: process_branch(&branches[Branch::Professional], bpm)?,
        master: process_branch(&branches[Branch::Master], bpm)?,
    };

    if processed.values().all(|b| !b.is_empty()) {
        let lengths = [
            processed.normal.len(),
            processed.professional.len(),
            processed.master.len(),
        ];
        if lengths.iter().any(|&len| len != lengths[0]) {
            return Err(Error::BranchLengthMismatch {
                stage: SplitStage::AfterSplit,
                lengths,
            });
        }
    }

    Ok(processed)
}
