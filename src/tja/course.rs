//! Partitioning song lines into per-difficulty courses

use super::lines::{parse_command, parse_key_value};
use super::model::Course;
use crate::branches::Branches;
use crate::constants::{Branch, Difficulty};
use crate::error::{Error, Result};
use crate::warning::{Warning, Warnings};
use std::collections::{BTreeMap, VecDeque};

/// Player side selected by `#START`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Player {
    P1,
    P2,
}

impl Player {
    fn suffix(self) -> &'static str {
        match self {
            Player::P1 => "P1",
            Player::P2 => "P2",
        }
    }
}

fn parse_player(value: &str) -> Result<Option<Player>> {
    match value {
        "" => Ok(None),
        "P1" | "1P" => Ok(Some(Player::P1)),
        "P2" | "2P" => Ok(Some(Player::P2)),
        other => Err(Error::InvalidStartValue(other.to_string())),
    }
}

/// Capitalize the first letter, lower-case the rest
fn capitalize(value: &str) -> String {
    let lower = value.to_lowercase();
    let mut chars = lower.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn parse_header_int(key: &str, value: &str) -> Result<i32> {
    value.trim().parse().map_err(|_| Error::InvalidHeaderValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Score fields may list several comma-separated values; the last one wins
fn parse_score(key: &str, value: &str, empty_default: i32) -> Result<i32> {
    if value.is_empty() {
        return Ok(empty_default);
    }
    parse_header_int(key, value.rsplit(',').next().unwrap_or(value))
}

fn parse_balloons(value: &str) -> Vec<i32> {
    let value = value.strip_suffix(',').unwrap_or(value);
    value
        .split(',')
        .map(|v| v.trim().parse::<i32>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .unwrap_or_default()
}

/// Split cleaned song lines into courses keyed by name
pub fn split_courses(
    lines: &[String],
    bpm: f32,
    offset: f32,
    warnings: &mut Warnings,
) -> Result<BTreeMap<String, Course>> {
    let mut courses: BTreeMap<String, Course> = BTreeMap::new();
    let mut current: Option<String> = None;
    let mut base: Option<Difficulty> = None;

    let course_entry = |courses: &mut BTreeMap<String, Course>, name: &str, d: Difficulty| {
        courses
            .entry(name.to_string())
            .or_insert_with(|| Course::new(d, bpm, offset));
    };

    for line in lines {
        if let Some((key, value)) = parse_key_value(line) {
            // Header fields before any COURSE apply to the default Oni course
            let target_difficulty = base.unwrap_or(Difficulty::Oni);
            let target = current
                .clone()
                .unwrap_or_else(|| target_difficulty.name().to_string());
            match key.as_str() {
                "COURSE" => {
                    let normalized = capitalize(&value);
                    let difficulty = Difficulty::from_course_value(&normalized)
                        .ok_or(Error::InvalidCourseValue(value.clone()))?;
                    course_entry(&mut courses, difficulty.name(), difficulty);
                    base = Some(difficulty);
                    current = Some(difficulty.name().to_string());
                }
                "LEVEL" => {
                    let level = parse_header_int("LEVEL", &value)?.clamp(1, 10);
                    course_entry(&mut courses, &target, target_difficulty);
                    if let Some(course) = courses.get_mut(&target) {
                        course.level = level;
                    }
                }
                "SCOREINIT" | "SCOREDIFF" => {
                    let is_init = key == "SCOREINIT";
                    let score = parse_score(&key, &value, if is_init { 300 } else { 120 })?;
                    course_entry(&mut courses, &target, target_difficulty);
                    if let Some(course) = courses.get_mut(&target) {
                        if is_init {
                            course.score_init = score;
                        } else {
                            course.score_diff = score;
                        }
                    }
                }
                "BALLOON" => {
                    course_entry(&mut courses, &target, target_difficulty);
                    if !value.is_empty() {
                        if let Some(course) = courses.get_mut(&target) {
                            course.balloon = parse_balloons(&value);
                        }
                    }
                }
                "STYLE" => {
                    if value.eq_ignore_ascii_case("Single") {
                        current = base.map(|d| d.name().to_string());
                    }
                }
                _ => {}
            }
            continue;
        }

        let command = parse_command(line);
        if let Some((_, value)) = command.as_ref().filter(|(name, _)| name == "START") {
            let difficulty = base.unwrap_or(Difficulty::Oni);
            let base_name = difficulty.name();
            course_entry(&mut courses, base_name, difficulty);
            let name = match parse_player(value)? {
                Some(player) => {
                    let name = format!("{base_name}{}", player.suffix());
                    let copy = courses
                        .get(base_name)
                        .map(Course::header_copy)
                        .unwrap_or_else(|| Course::new(difficulty, bpm, offset));
                    courses.insert(name.clone(), copy);
                    name
                }
                None => current.clone().unwrap_or_else(|| base_name.to_string()),
            };
            course_entry(&mut courses, &name, difficulty);
            if let Some(course) = courses.get_mut(&name) {
                course.data.push("#START".to_string());
            }
            current = Some(name);
            continue;
        }

        match current.as_ref().and_then(|name| courses.get_mut(name)) {
            Some(course) => course.data.push(line.clone()),
            None => warnings.push(Warning::DataBeforeCourse { line: line.clone() }),
        }
    }

    // A chart written only for P1 doubles as the single-player chart
    for difficulty in Difficulty::ALL {
        let single_empty = courses
            .get(difficulty.name())
            .map_or(true, |c| c.data.is_empty());
        let p1_name = format!("{}P1", difficulty.name());
        if single_empty {
            if let Some(p1) = courses.get(&p1_name).filter(|c| !c.data.is_empty()) {
                let p1 = p1.clone();
                courses.insert(difficulty.name().to_string(), p1);
            }
        }
    }

    courses.retain(|_, course| !course.data.is_empty());
    Ok(courses)
}

/// Balloon glyph occurrence, either written for one branch or shared by all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalloonMark {
    Own,
    Shared,
}

/// Reconcile the BALLOON list with the balloon notes seen in each branch
///
/// The converter consumes one list for all three branches in order, so counts
/// written once for shared (all-branch) notes must be repeated per branch.
pub fn fix_balloon_field(field: Vec<i32>, seen: &Branches<Vec<BalloonMark>>) -> Vec<i32> {
    if !seen.values().all(|marks| !marks.is_empty()) {
        return field;
    }

    if seen.values().all(|marks| marks.len() == field.len()) {
        return field.iter().cycle().take(field.len() * 3).copied().collect();
    }

    if !seen
        .values()
        .any(|marks| marks.contains(&BalloonMark::Shared))
    {
        return field;
    }

    let total: usize = seen.values().map(Vec::len).sum();
    if field.len() >= total {
        return field;
    }

    let mut remaining: VecDeque<i32> = field.into();
    let mut shared = Vec::new();
    let mut fixed = Vec::new();

    for mark in &seen[Branch::Normal] {
        let Some(hits) = remaining.pop_front() else {
            return fixed;
        };
        if *mark == BalloonMark::Shared {
            shared.push(hits);
        }
        fixed.push(hits);
    }

    for branch in [Branch::Professional, Branch::Master] {
        let mut dupes: VecDeque<i32> = shared.iter().copied().collect();
        for mark in &seen[branch] {
            let next = match mark {
                BalloonMark::Shared => dupes.pop_front(),
                BalloonMark::Own => remaining.pop_front(),
            };
            match next {
                Some(hits) => fixed.push(hits),
                None => return fixed,
            }
        }
    }

    fixed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(src: &str) -> Vec<String> {
        super::super::lines::clean_lines(src)
    }

    #[test]
    fn test_split_single_course() {
        let src = "BPM:120\nOFFSET:0\nCOURSE:oni\nLEVEL:12\nBALLOON:5,10,\nSCOREINIT:400,500\n#START\n1111,\n#END\n";
        let mut warnings = Warnings::new(true);
        let courses = split_courses(&lines(src), 120.0, 0.0, &mut warnings).unwrap();
        assert_eq!(courses.len(), 1);
        let oni = &courses["Oni"];
        assert_eq!(oni.level, 10);
        assert_eq!(oni.balloon, vec![5, 10]);
        assert_eq!(oni.score_init, 500);
        assert_eq!(oni.data, vec!["#START", "1111,", "#END"]);
        // BPM/OFFSET lines come before any #START
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_course_without_declaration_defaults_to_oni() {
        let src = "BPM:120\nOFFSET:0\n#START\n1,\n#END\n";
        let mut warnings = Warnings::new(true);
        let courses = split_courses(&lines(src), 120.0, 0.0, &mut warnings).unwrap();
        assert!(courses.contains_key("Oni"));
    }

    #[test]
    fn test_data_before_course_is_dropped() {
        let src = "BPM:120\n1010,\nCOURSE:Easy\n#START\n1,\n#END\n";
        let mut warnings = Warnings::new(true);
        let courses = split_courses(&lines(src), 120.0, 0.0, &mut warnings).unwrap();
        assert_eq!(courses["Easy"].data, vec!["#START", "1,", "#END"]);
        assert_eq!(
            warnings.items(),
            &[Warning::DataBeforeCourse {
                line: "1010,".to_string()
            }]
        );
    }

    #[test]
    fn test_invalid_course_is_fatal() {
        let src = "COURSE:Extreme\n";
        let mut warnings = Warnings::new(true);
        let err = split_courses(&lines(src), 120.0, 0.0, &mut warnings).unwrap_err();
        assert!(matches!(err, Error::InvalidCourseValue(v) if v == "Extreme"));
    }

    #[test]
    fn test_player_courses() {
        let src = "COURSE:Hard\nLEVEL:5\nSTYLE:Double\n#START P1\n1,\n#END\n#START 2P\n2,\n#END\n";
        let mut warnings = Warnings::new(true);
        let courses = split_courses(&lines(src), 120.0, 0.0, &mut warnings).unwrap();
        let names: Vec<_> = courses.keys().cloned().collect();
        assert_eq!(names, vec!["Hard", "HardP1", "HardP2"]);
        assert_eq!(courses["HardP2"].level, 5);
        assert_eq!(courses["HardP2"].data, vec!["#START", "2,", "#END"]);
        // Only P1 existed, so the single-player chart is a copy of it
        assert_eq!(courses["Hard"].data, courses["HardP1"].data);
    }

    #[test]
    fn test_invalid_start_value() {
        let src = "COURSE:Hard\n#START P3\n";
        let mut warnings = Warnings::new(true);
        let err = split_courses(&lines(src), 120.0, 0.0, &mut warnings).unwrap_err();
        assert!(matches!(err, Error::InvalidStartValue(v) if v == "P3"));
    }

    #[test]
    fn test_balloon_field_tripled() {
        let seen = Branches::from_fn(|_| vec![BalloonMark::Own, BalloonMark::Own]);
        assert_eq!(fix_balloon_field(vec![3, 4], &seen), vec![3, 4, 3, 4, 3, 4]);
    }

    #[test]
    fn test_balloon_field_shared() {
        let seen = Branches {
            normal: vec![BalloonMark::Shared, BalloonMark::Own],
            professional: vec![BalloonMark::Shared, BalloonMark::Own],
            master: vec![BalloonMark::Shared],
        };
        assert_eq!(fix_balloon_field(vec![5, 6, 7], &seen), vec![5, 6, 5, 7, 5]);
    }

    #[test]
    fn test_balloon_field_unbranched_untouched() {
        let seen = Branches {
            normal: vec![BalloonMark::Own],
            professional: vec![],
            master: vec![],
        };
        assert_eq!(fix_balloon_field(vec![9], &seen), vec![9]);
    }
}
