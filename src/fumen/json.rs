//! JSON serialization types for Fumen data

use super::header::FumenHeader;
use super::model::{FumenCourse, FumenMeasure};
use crate::branches::Branches;
use crate::constants::Branch;
use serde::Serialize;

/// Top-level JSON structure for a Fumen file
#[derive(Debug, Clone, Serialize)]
pub struct FumenJson<'a> {
    /// Byte order tag ("<" or ">")
    pub order: &'static str,
    pub header: &'a FumenHeader,
    /// Distinct timing windows, one (good, ok, bad) triple per entry
    pub timing_windows: Vec<[f32; 3]>,
    /// Note count per branch
    pub note_counts: Branches<usize>,
    #[serde(skip_serializing_if = "is_zero")]
    pub score_init: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub score_diff: i32,
    #[serde(skip_serializing_if = "is_zero")]
    pub shinuchi_score: i32,
    pub measures: &'a [FumenMeasure],
}

fn is_zero(v: &i32) -> bool {
    *v == 0
}

impl<'a> FumenJson<'a> {
    pub fn new(course: &'a FumenCourse) -> Self {
        let mut timing_windows: Vec<[f32; 3]> = Vec::new();
        for triple in course.header.timing_windows.chunks_exact(3) {
            let triple = [triple[0], triple[1], triple[2]];
            if !timing_windows.contains(&triple) {
                timing_windows.push(triple);
            }
        }

        Self {
            order: course.header.endian.tag(),
            header: &course.header,
            timing_windows,
            note_counts: Branches::from_fn(|b: Branch| course.note_count(b)),
            score_init: course.score_init,
            score_diff: course.score_diff,
            shinuchi_score: course.shinuchi_score,
            measures: &course.measures,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{Difficulty, NoteType};
    use crate::fumen::model::FumenNote;

    #[test]
    fn test_json_shape() {
        let mut course = FumenCourse::default();
        course.header.set_timing_windows(Difficulty::Oni);
        course.header.measure_count = 1;
        let mut measure = FumenMeasure::new();
        measure.bpm = 200.0;
        measure
            .branches
            .normal
            .notes
            .push(FumenNote::new(NoteType::DonBig, 10.0));
        course.measures.push(measure);

        let value = serde_json::to_value(FumenJson::new(&course)).unwrap();
        assert_eq!(value["order"], "<");
        assert_eq!(value["timing_windows"].as_array().unwrap().len(), 1);
        assert_eq!(value["note_counts"]["normal"], 1);
        assert_eq!(value["note_counts"]["master"], 0);
        assert_eq!(value["header"]["measure_count"], 1);
        assert!(value.get("score_init").is_none());
        assert_eq!(
            value["measures"][0]["branches"]["normal"]["notes"][0]["note_type"],
            "DON"
        );
    }
}
