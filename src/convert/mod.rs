//! TJA to Fumen conversion
//!
//! [`Converter`] runs the command processor and chart converter over each
//! course of a parsed [`Song`] and names the resulting files.

pub mod alternate;
pub mod chart;
pub mod process;

pub use process::{BranchCondition, BranchKind, ProcessedMeasure};

use crate::constants::Difficulty;
use crate::error::Result;
use crate::fumen::{Endian, FumenCourse, HpTable};
use crate::tja::{Course, Song};
use crate::warning::Warnings;
use log::info;
use serde::{Deserialize, Serialize};

/// Conversion settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Suppress warning output (warnings are still collected)
    pub silent: bool,
    /// Byte order of the written files
    pub endian: Endian,
    /// Run the don/ka alternation pass
    pub alternate_notes: bool,
}

/// One converted course, ready to be written
#[derive(Debug, Clone)]
pub struct ConvertedCourse {
    /// Course key in the song (`Oni`, `HardP2`, ...)
    pub name: String,
    /// File-name id (`m`, `h_2`, ...)
    pub id: String,
    pub fumen: FumenCourse,
}

pub struct Converter {
    options: ConvertOptions,
    hp_table: HpTable,
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            hp_table: HpTable::default(),
        }
    }

    pub fn with_hp_table(mut self, hp_table: HpTable) -> Self {
        self.hp_table = hp_table;
        self
    }

    /// Fresh warning collector honouring the silent option
    pub fn warnings(&self) -> Warnings {
        Warnings::new(self.options.silent)
    }

    /// Convert one course
    pub fn convert_course(&self, course: &Course, warnings: &mut Warnings) -> Result<FumenCourse> {
        let mut fumen = chart::convert_course(course, &self.hp_table, warnings)?;
        fumen.header.endian = self.options.endian;
        if self.options.alternate_notes {
            alternate::fix_dk_note_types(&mut fumen);
        }
        Ok(fumen)
    }

    /// Convert every course of a song, in course-name order
    pub fn convert_song(&self, song: &Song, warnings: &mut Warnings) -> Result<Vec<ConvertedCourse>> {
        let mut converted = Vec::with_capacity(song.courses.len());
        for (name, course) in &song.courses {
            let fumen = self.convert_course(course, warnings)?;
            let id = course_id(name, course.difficulty);
            info!(
                "Converted course {name} ({} measure(s)) as '{id}'",
                fumen.measures.len()
            );
            converted.push(ConvertedCourse {
                name: name.clone(),
                id,
                fumen,
            });
        }
        Ok(converted)
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

/// File-name id for a course: difficulty letter plus `_1`/`_2` for P1/P2
pub fn course_id(name: &str, difficulty: Difficulty) -> String {
    let id = difficulty.course_id();
    if name.ends_with("P1") {
        format!("{id}_1")
    } else if name.ends_with("P2") {
        format!("{id}_2")
    } else {
        id.to_string()
    }
}

/// Output file name for a course of the song `stem`
pub fn output_file_name(stem: &str, id: &str) -> String {
    format!("{stem}_{id}.bin")
}
