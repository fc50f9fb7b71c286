//! In-memory Fumen chart

use super::header::FumenHeader;
use crate::branches::Branches;
use crate::constants::{Branch, NoteType};
use serde::Serialize;

/// Quarter-compensation term: one 4/4 measure at `bpm`, in milliseconds
pub fn measure_ms(bpm: f32) -> f32 {
    4.0 * 60000.0 / bpm
}

/// One converted difficulty
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FumenCourse {
    pub header: FumenHeader,
    pub measures: Vec<FumenMeasure>,
    pub score_init: i32,
    pub score_diff: i32,
    /// Base score per note
    pub shinuchi_score: i32,
}

impl FumenCourse {
    /// Total number of notes in `branch`
    pub fn note_count(&self, branch: Branch) -> usize {
        self.measures
            .iter()
            .map(|m| m.branches[branch].notes.len())
            .sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FumenMeasure {
    pub bpm: f32,
    pub offset_start: f32,
    pub offset_end: f32,
    pub duration: f32,
    pub gogo: bool,
    pub barline: bool,
    /// Two unlock thresholds per branch, -1 when unset
    pub branch_info: [i32; 6],
    pub branches: Branches<FumenBranch>,
    #[serde(skip)]
    pub padding1: u16,
    #[serde(skip)]
    pub padding2: i32,
}

impl FumenMeasure {
    pub fn new() -> Self {
        Self {
            bpm: 0.0,
            offset_start: 0.0,
            offset_end: 0.0,
            duration: 0.0,
            gogo: false,
            barline: true,
            branch_info: [-1; 6],
            branches: Branches::default(),
            padding1: 0,
            padding2: 0,
        }
    }

    /// Duration of a measure spanning `length` of `sub_divisions` glyph slots
    pub fn set_duration(&mut self, time_sig: (i32, i32), length: usize, sub_divisions: usize) {
        let measure_size = time_sig.0 as f32 / time_sig.1 as f32;
        let measure_ratio = if sub_divisions == 0 {
            1.0
        } else {
            length as f32 / sub_divisions as f32
        };
        self.duration = measure_ms(self.bpm) * measure_size * measure_ratio;
    }

    /// Anchor the first measure to the song offset (seconds)
    pub fn set_first_ms_offsets(&mut self, song_offset: f32) {
        self.offset_start = -1000.0 * song_offset - measure_ms(self.bpm);
        self.offset_end = self.offset_start + self.duration;
    }

    /// Chain this measure after `prev`
    pub fn set_ms_offsets(&mut self, delay: f32, prev: &FumenMeasure) {
        self.offset_start =
            prev.offset_end + delay + measure_ms(prev.bpm) - measure_ms(self.bpm);
        self.offset_end = self.offset_start + self.duration;
    }

    /// Write the two unlock slots belonging to `branch`
    pub fn set_branch_slots(&mut self, branch: Branch, values: [i32; 2]) {
        let at = branch.index() * 2;
        self.branch_info[at..at + 2].copy_from_slice(&values);
    }
}

impl Default for FumenMeasure {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FumenBranch {
    /// Scroll speed
    pub speed: f32,
    #[serde(skip)]
    pub padding: u16,
    pub notes: Vec<FumenNote>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FumenNote {
    pub note_type: NoteType,
    /// Milliseconds from the start of the measure
    pub pos: f32,
    /// Milliseconds from the start of the song, don/ka notes only
    pub pos_abs: f32,
    /// Gap to the next don/ka note, filled by the alternation pass
    #[serde(skip)]
    pub diff: i32,
    pub score_init: i32,
    pub score_diff: i32,
    #[serde(skip)]
    pub padding: f32,
    pub item: i32,
    pub duration: f32,
    pub multi_measure: bool,
    pub hits: i32,
    #[serde(skip)]
    pub hits_padding: i32,
    #[serde(skip)]
    pub drumroll_bytes: [u8; 8],
    /// Type forced by `#SENOTECHANGE`
    pub manually_set: bool,
}

impl FumenNote {
    pub fn new(note_type: NoteType, pos: f32) -> Self {
        Self {
            note_type,
            pos,
            pos_abs: 0.0,
            diff: 0,
            score_init: 0,
            score_diff: 0,
            padding: 0.0,
            item: 0,
            duration: 0.0,
            multi_measure: false,
            hits: 0,
            hits_padding: 0,
            drumroll_bytes: [0; 8],
            manually_set: false,
        }
    }
}
