//! Parsed TJA song structure

use crate::branches::Branches;
use crate::constants::{Difficulty, Glyph, NoteType};
use serde::Serialize;
use std::collections::BTreeMap;

/// Whole chart file
#[derive(Debug, Clone)]
pub struct Song {
    /// Song-level BPM
    pub bpm: f32,
    /// Song-level OFFSET in seconds
    pub offset: f32,
    pub metadata: Metadata,
    /// Courses keyed by name (`Oni`, `OniP1`, ...)
    pub courses: BTreeMap<String, Course>,
}

/// One playable difficulty
#[derive(Debug, Clone)]
pub struct Course {
    pub bpm: f32,
    pub offset: f32,
    pub difficulty: Difficulty,
    /// Star rating, clamped to 1..=10 (0 when undeclared)
    pub level: i32,
    /// Hit counts for balloon/kusudama notes, consumed front to back
    pub balloon: Vec<i32>,
    pub score_init: i32,
    pub score_diff: i32,
    /// Raw course lines, starting with `#START`
    pub data: Vec<String>,
    /// Interpreted measures per branch
    pub branches: Branches<Vec<Measure>>,
    pub has_branches: bool,
}

impl Course {
    pub fn new(difficulty: Difficulty, bpm: f32, offset: f32) -> Self {
        Self {
            bpm,
            offset,
            difficulty,
            level: 0,
            balloon: Vec::new(),
            score_init: 0,
            score_diff: 0,
            data: Vec::new(),
            branches: Branches::default(),
            has_branches: false,
        }
    }

    /// Copy of the header fields with an empty line buffer
    pub fn header_copy(&self) -> Self {
        Self {
            data: Vec::new(),
            branches: Branches::default(),
            has_branches: false,
            balloon: self.balloon.clone(),
            ..*self
        }
    }
}

/// Raw measure as written between two `,` separators
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Measure {
    /// Note-data characters
    pub notes: Vec<char>,
    pub events: Vec<Event>,
    /// Notes and events merged by position, events first on ties
    pub combined: Vec<MeasureItem>,
}

impl Measure {
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty() && self.events.is_empty()
    }
}

/// Command placed at a glyph index inside a measure
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub kind: EventKind,
    pub pos: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum EventKind {
    Gogo(bool),
    Barline(bool),
    /// Seconds
    Delay(f32),
    Scroll(f32),
    Bpm(f32),
    /// Time signature numerator/denominator
    Measure(i32, i32),
    LevelHold,
    SeNote(NoteType),
    Section,
    /// Raw `type,val1,val2` descriptor
    BranchStart(String),
}

impl EventKind {
    /// Events that split a measure when they occur mid-measure
    pub fn splits_measure(&self) -> bool {
        matches!(
            self,
            EventKind::Bpm(_) | EventKind::Scroll(_) | EventKind::Gogo(_) | EventKind::SeNote(_)
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ItemData {
    Note(Glyph),
    Event(EventKind),
}

/// Entry of the merged note/event stream
#[derive(Debug, Clone, PartialEq)]
pub struct MeasureItem {
    pub pos: usize,
    pub data: ItemData,
}

/// Title or subtitle in each supported language
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LocalizedText {
    pub default: String,
    pub ja: String,
    pub en: String,
    pub cn: String,
    pub tw: String,
    pub ko: String,
}

/// Song-level descriptive fields
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Metadata {
    pub title: LocalizedText,
    pub subtitle: LocalizedText,
    pub maker: String,
    pub genre: String,
    pub wave: String,
    pub demo_start: f32,
}
