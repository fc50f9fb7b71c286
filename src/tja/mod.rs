//! TJA text chart parser
//!
//! Parsing runs in three passes: line cleaning and song metadata
//! ([`lines`]), per-course partitioning ([`course`]) and per-course command
//! interpretation ([`interpreter`]).

pub mod course;
pub mod interpreter;
pub mod lines;
pub mod model;

pub use interpreter::ParsedCourse;
pub use model::{Course, Event, EventKind, ItemData, Measure, MeasureItem, Metadata, Song};

use crate::error::Result;
use crate::warning::Warnings;
use log::debug;
use std::fs;
use std::path::Path;

/// Parse a TJA chart from source text
pub fn parse_str(src: &str, warnings: &mut Warnings) -> Result<Song> {
    let lines = lines::clean_lines(src);
    let (bpm, offset) = lines::required_metadata(&lines)?;
    let metadata = lines::parse_metadata(&lines, warnings);
    let mut courses = course::split_courses(&lines, bpm, offset, warnings)?;

    for (name, course) in courses.iter_mut() {
        let parsed = interpreter::interpret_course(&course.data, warnings)?;
        debug!(
            "Course {name}: {} measure(s), branches: {}",
            parsed.branches.normal.len(),
            parsed.has_branches
        );
        let balloon = std::mem::take(&mut course.balloon);
        course.balloon = course::fix_balloon_field(balloon, &parsed.balloons);
        course.branches = parsed.branches;
        course.has_branches = parsed.has_branches;
    }

    Ok(Song {
        bpm,
        offset,
        metadata,
        courses,
    })
}

/// Parse a TJA chart file
///
/// The file is decoded as UTF-8; invalid sequences are replaced rather than
/// rejected.
pub fn parse_file(path: &Path, warnings: &mut Warnings) -> Result<Song> {
    let bytes = fs::read(path)?;
    let src = String::from_utf8_lossy(&bytes);
    parse_str(&src, warnings)
}
