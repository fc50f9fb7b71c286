//! Chart converter: processed measures to a Fumen course

use super::process::{process_commands, BranchCondition, BranchKind};
use crate::branches::Branches;
use crate::constants::{Branch, Glyph, NoteType};
use crate::error::Result;
use crate::fumen::model::measure_ms;
use crate::fumen::{FumenCourse, FumenHeader, FumenMeasure, FumenNote, HpTable};
use crate::tja::Course;
use crate::warning::{Warning, Warnings};
use log::debug;
use std::collections::VecDeque;

/// Drumroll milliseconds are worth this many points when deriving shinuchi
const DRUMROLL_SCORE_FACTOR: f64 = 1.6920079999994086;

/// Per-branch statistics gathered while converting
#[derive(Debug, Default)]
struct Totals {
    notes: Branches<i32>,
    balloon_hits: Branches<i32>,
    drumroll_ms: Branches<f32>,
}

/// Note that opened a drumroll/balloon, as (measure, note) indices
type OpenRoll = (usize, usize);

/// Convert one interpreted course
pub fn convert_course(
    course: &Course,
    hp_table: &HpTable,
    warnings: &mut Warnings,
) -> Result<FumenCourse> {
    let processed = process_commands(&course.branches, course.bpm)?;
    let n_measures = processed.normal.len();

    let mut header = FumenHeader::new();
    header.measure_count = n_measures as i32;
    header.has_branches = processed.values().all(|b| !b.is_empty()) as i32;

    let mut measures = vec![FumenMeasure::new(); n_measures];
    let mut balloons: VecDeque<i32> = course.balloon.iter().copied().collect();
    let mut totals = Totals::default();
    let mut conditions: Vec<BranchCondition> = Vec::new();

    for branch in Branch::ALL {
        let branch_measures = &processed[branch];
        if branch_measures.is_empty() {
            continue;
        }

        let mut points_total = 0;
        let mut points_measure = 0;
        let mut roll: Option<OpenRoll> = None;
        let mut level_hold = false;

        for (idx_m, pm) in branch_measures.iter().enumerate().take(n_measures) {
            let measure_len = pm.pos_end.saturating_sub(pm.pos_start);

            let (before, rest) = measures.split_at_mut(idx_m);
            let measure = &mut rest[0];
            measure.branches[branch].speed = pm.scroll;
            measure.gogo = pm.gogo;
            measure.bpm = pm.bpm;
            measure.set_duration(pm.time_sig, measure_len, pm.sub_divisions);
            match before.last() {
                Some(prev) => measure.set_ms_offsets(pm.delay, prev),
                None => measure.set_first_ms_offsets(course.offset),
            }

            let is_sub_measure = measure_len < pm.sub_divisions && pm.pos_start != 0;
            if !pm.barline || is_sub_measure {
                measure.barline = false;
            }

            if let Some(condition) = pm.branch_condition {
                if condition.thresholds != (0.0, 0.0) {
                    measure.set_branch_slots(
                        branch,
                        branch_slots(condition, points_total, branch, level_hold),
                    );
                    points_total = 0;
                    level_hold = false;
                    conditions.push(condition);
                }
            }

            points_total += points_measure;
            if pm.level_hold {
                level_hold = true;
            }
            points_measure = 0;

            let duration = measure.duration;
            let mut se_note = pm.se_note;
            for &(pos, glyph) in &pm.notes {
                let ratio = if measure_len == 0 {
                    0.0
                } else {
                    pos.saturating_sub(pm.pos_start) as f32 / measure_len as f32
                };
                let note_pos = duration * ratio;

                let tja_type = match glyph {
                    Glyph::EndRoll => {
                        match roll.take() {
                            Some((mi, ni)) => {
                                let note = &mut measures[mi].branches[branch].notes[ni];
                                if note.multi_measure {
                                    note.duration += note_pos;
                                } else {
                                    note.duration += note_pos - note.pos;
                                }
                                totals.drumroll_ms[branch] += note.duration;
                                note.duration = note.duration.trunc();
                            }
                            None => warnings.push(Warning::UnmatchedRollEnd),
                        }
                        continue;
                    }
                    Glyph::Note(note_type) => note_type,
                };

                if tja_type == NoteType::Kusudama && roll.is_some() {
                    continue;
                }

                let mut note = match se_note.take() {
                    Some(forced) => {
                        let mut note = FumenNote::new(forced, note_pos);
                        note.manually_set = true;
                        note
                    }
                    None => FumenNote::new(tja_type, note_pos),
                };
                note.score_init = course.score_init;
                note.score_diff = course.score_diff;

                let mut opens_roll = false;
                match note.note_type {
                    NoteType::Drumroll | NoteType::DrumrollBig => opens_roll = true,
                    NoteType::Balloon | NoteType::Kusudama => {
                        note.hits = match balloons.pop_front() {
                            Some(hits) => hits,
                            None => {
                                warnings.push(Warning::BalloonCountExhausted {
                                    balloons: course.balloon.clone(),
                                });
                                1
                            }
                        };
                        totals.balloon_hits[branch] += note.hits;
                        opens_roll = true;
                    }
                    other if other.is_don_ka() => totals.notes[branch] += 1,
                    _ => {}
                }
                points_measure += header.branch_points(note.note_type);

                let notes = &mut measures[idx_m].branches[branch].notes;
                notes.push(note);
                if opens_roll {
                    roll = Some((idx_m, notes.len() - 1));
                }
            }

            if let Some((mi, ni)) = roll {
                let note = &mut measures[mi].branches[branch].notes[ni];
                if note.multi_measure {
                    note.duration += duration;
                } else {
                    note.multi_measure = true;
                    note.duration += duration - note.pos;
                }
            }
        }
    }

    header.set_hp_bytes(totals.notes.normal, course.difficulty, course.level, hp_table);
    header.set_timing_windows(course.difficulty);
    apply_branch_scoring(&mut header, &conditions);

    if totals.notes.professional != 0 {
        header.normal_professional_ratio =
            (65536.0 * (totals.notes.normal as f64 / totals.notes.professional as f64)) as i32;
    }
    if totals.notes.master != 0 {
        header.normal_master_ratio =
            (65536.0 * (totals.notes.normal as f64 / totals.notes.master as f64)) as i32;
    }

    let shinuchi_score = shinuchi_score(&totals);
    debug!(
        "Converted {} measure(s), {:?} notes, shinuchi {shinuchi_score}",
        n_measures, totals.notes
    );

    let mut fumen = FumenCourse {
        header,
        measures,
        score_init: course.score_init,
        score_diff: course.score_diff,
        shinuchi_score,
    };
    set_absolute_positions(&mut fumen);
    Ok(fumen)
}

/// Unlock thresholds for `branch` at a branch point
fn branch_slots(
    condition: BranchCondition,
    points_total: i32,
    branch: Branch,
    level_hold: bool,
) -> [i32; 2] {
    if level_hold {
        return match branch {
            Branch::Normal => [999, 999],
            Branch::Professional => [0, 999],
            Branch::Master => [0, 0],
        };
    }

    let (first, second) = condition.thresholds;
    match condition.kind {
        BranchKind::Points => [first as i32, second as i32],
        BranchKind::Percentage => {
            let absolute = |percent: f32| -> i32 {
                if percent > 1.0 {
                    999
                } else if percent > 0.0 {
                    (points_total as f32 * percent).round() as i32
                } else {
                    0
                }
            };
            [absolute(first), absolute(second)]
        }
    }
}

/// Zero the branch point constants that can never matter for these conditions
fn apply_branch_scoring(header: &mut FumenHeader, conditions: &[BranchCondition]) {
    if conditions.is_empty() {
        return;
    }

    // Branching is decided by drumrolls alone
    let drumroll_only = conditions.iter().all(|c| {
        let (first, second) = c.thresholds;
        c.kind == BranchKind::Points
            || (first == 0.0 && second == 0.0)
            || (first > 1.0 && second > 1.0)
    });
    if drumroll_only {
        header.branch_pts_good = 0;
        header.branch_pts_good_big = 0;
        header.branch_pts_ok = 0;
        header.branch_pts_ok_big = 0;
        header.branch_pts_balloon = 0;
        header.branch_pts_kusudama = 0;
    }

    if conditions.iter().all(|c| c.kind != BranchKind::Points) {
        header.branch_pts_drumroll = 0;
        header.branch_pts_drumroll_big = 0;
    }
}

fn shinuchi_score(totals: &Totals) -> i32 {
    let max_notes = totals.notes.values().copied().max().unwrap_or(0);
    if max_notes == 0 {
        return 0;
    }
    let max_balloon = totals.balloon_hits.values().copied().max().unwrap_or(0);
    let max_roll = totals
        .drumroll_ms
        .values()
        .copied()
        .fold(0.0f32, f32::max);

    let per_note = (1_000_000.0
        - max_balloon as f64 * 100.0
        - max_roll as f64 * DRUMROLL_SCORE_FACTOR)
        / max_notes as f64;
    ((per_note / 10.0).ceil() * 10.0) as i32
}

/// Song-relative position of every don/ka note
pub fn set_absolute_positions(fumen: &mut FumenCourse) {
    for measure in &mut fumen.measures {
        let base = measure.offset_start + measure_ms(measure.bpm);
        for branch in Branch::ALL {
            for note in &mut measure.branches[branch].notes {
                if note.note_type.is_don_ka() {
                    note.pos_abs = base + note.pos;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tja;

    fn convert(src: &str) -> (FumenCourse, Warnings) {
        let mut warnings = Warnings::new(true);
        let song = tja::parse_str(src, &mut warnings).unwrap();
        let course = song.courses.values().next().unwrap();
        let fumen = convert_course(course, &HpTable::default(), &mut warnings).unwrap();
        (fumen, warnings)
    }

    #[test]
    fn test_drumroll_across_measures() {
        let (fumen, warnings) = convert("BPM:120\nOFFSET:0\n#START\n0005,\n0000,\n8000,\n#END\n");
        assert!(warnings.is_empty());
        let roll = &fumen.measures[0].branches.normal.notes[0];
        assert_eq!(roll.note_type, NoteType::Drumroll);
        assert_eq!(roll.pos, 1500.0);
        assert!(roll.multi_measure);
        // 500 ms left in the first measure, a full 2000 ms measure, then 0 ms
        assert_eq!(roll.duration, 2500.0);
        assert!(fumen.measures[2].branches.normal.notes.is_empty());
    }

    #[test]
    fn test_roll_within_measure() {
        let (fumen, _) = convert("BPM:120\nOFFSET:0\n#START\n6080,\n#END\n");
        let roll = &fumen.measures[0].branches.normal.notes[0];
        assert_eq!(roll.note_type, NoteType::DrumrollBig);
        assert!(!roll.multi_measure);
        assert_eq!(roll.duration, 1000.0);
    }

    #[test]
    fn test_unmatched_roll_end() {
        let (fumen, warnings) = convert("BPM:120\nOFFSET:0\n#START\n1800,\n#END\n");
        assert_eq!(fumen.measures[0].branches.normal.notes.len(), 1);
        assert_eq!(warnings.items(), &[Warning::UnmatchedRollEnd]);
    }

    #[test]
    fn test_balloon_exhausted() {
        let (fumen, warnings) =
            convert("BPM:120\nOFFSET:0\nBALLOON:4\n#START\n7080,\n7080,\n#END\n");
        assert_eq!(fumen.measures[0].branches.normal.notes[0].hits, 4);
        assert_eq!(fumen.measures[1].branches.normal.notes[0].hits, 1);
        assert_eq!(
            warnings.items(),
            &[Warning::BalloonCountExhausted { balloons: vec![4] }]
        );
    }

    #[test]
    fn test_kusudama_inside_roll_dropped() {
        let (fumen, _) = convert("BPM:120\nOFFSET:0\nBALLOON:10\n#START\n9098,\n#END\n");
        let notes = &fumen.measures[0].branches.normal.notes;
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].note_type, NoteType::Kusudama);
        assert_eq!(notes[0].hits, 10);
    }

    #[test]
    fn test_se_note_forces_first_note() {
        let (fumen, _) = convert("BPM:120\nOFFSET:0\n#START\n#SENOTECHANGE 2\n1111,\n#END\n");
        let notes = &fumen.measures[0].branches.normal.notes;
        assert_eq!(notes[0].note_type, NoteType::Don2);
        assert!(notes[0].manually_set);
        assert_eq!(notes[1].note_type, NoteType::Don);
        assert!(!notes[1].manually_set);
    }

    #[test]
    fn test_sub_measure_hides_barline() {
        let (fumen, _) = convert("BPM:120\nOFFSET:0\n#START\n11\n#SCROLL 2\n11,\n#END\n");
        assert_eq!(fumen.measures.len(), 2);
        assert!(fumen.measures[0].barline);
        assert!(!fumen.measures[1].barline);
        assert_eq!(fumen.measures[1].branches.normal.speed, 2.0);
        assert_eq!(fumen.measures[0].duration, 1000.0);
        assert_eq!(fumen.measures[1].offset_start, fumen.measures[0].offset_end);
    }

    #[test]
    fn test_percentage_branch_slots() {
        let src = "BPM:120\nOFFSET:0\n#START\n1111,\n0,\n\
                   #BRANCHSTART p,50,200\n#N\n1,\n#E\n1,\n#M\n1,\n#BRANCHEND\n#END\n";
        let (fumen, _) = convert(src);
        assert_eq!(fumen.header.has_branches, 1);
        // Points lag one measure behind: only measure 0's 4 notes (20 each) count
        assert_eq!(fumen.measures[2].branch_info, [40, 999, 40, 999, 40, 999]);
        assert_eq!(fumen.measures[0].branch_info, [-1; 6]);
        assert_eq!(fumen.measures[1].branch_info, [-1; 6]);
        // Percentage-only conditions zero the drumroll points
        assert_eq!(fumen.header.branch_pts_drumroll, 0);
        assert_eq!(fumen.header.branch_pts_good, 20);
    }

    #[test]
    fn test_points_branch_is_drumroll_only() {
        let src = "BPM:120\nOFFSET:0\n#START\n\
                   #BRANCHSTART r,5,10\n#N\n5008,\n#E\n5008,\n#M\n5008,\n#BRANCHEND\n#END\n";
        let (fumen, _) = convert(src);
        assert_eq!(fumen.measures[0].branch_info, [5, 10, 5, 10, 5, 10]);
        assert_eq!(fumen.header.branch_pts_good, 0);
        assert_eq!(fumen.header.branch_pts_balloon, 0);
        assert_eq!(fumen.header.branch_pts_drumroll, 1);
    }

    #[test]
    fn test_level_hold_slots() {
        let slots = |branch| {
            branch_slots(
                BranchCondition {
                    kind: BranchKind::Percentage,
                    thresholds: (0.5, 0.5),
                },
                100,
                branch,
                true,
            )
        };
        assert_eq!(slots(Branch::Normal), [999, 999]);
        assert_eq!(slots(Branch::Professional), [0, 999]);
        assert_eq!(slots(Branch::Master), [0, 0]);
    }

    #[test]
    fn test_level_hold_forces_slots_and_resets_points() {
        let src = "BPM:120\nOFFSET:0\n#START\n1111,\n#LEVELHOLD\n1111,\n\
                   #BRANCHSTART p,50,80\n#N\n1,\n#E\n1,\n#M\n1,\n\
                   #BRANCHSTART p,50,80\n#N\n1,\n#E\n1,\n#M\n1,\n#BRANCHEND\n#END\n";
        let (fumen, _) = convert(src);
        assert_eq!(fumen.measures.len(), 4);
        assert_eq!(fumen.measures[2].branch_info, [999, 999, 0, 999, 0, 0]);
        // Measure 0 was discarded by the reset; only measure 1's 80 points count
        assert_eq!(fumen.measures[3].branch_info, [40, 64, 40, 64, 40, 64]);
    }

    #[test]
    fn test_ratios_and_shinuchi() {
        let src = "BPM:120\nOFFSET:0\n#START\n\
                   #BRANCHSTART r,1,2\n#N\n1000,\n#E\n1100,\n#M\n1111,\n#BRANCHEND\n#END\n";
        let (fumen, _) = convert(src);
        assert_eq!(fumen.header.normal_normal_ratio, 65536);
        assert_eq!(fumen.header.normal_professional_ratio, 32768);
        assert_eq!(fumen.header.normal_master_ratio, 16384);
        // 1,000,000 / 4 notes
        assert_eq!(fumen.shinuchi_score, 250000);
    }

    #[test]
    fn test_absolute_positions() {
        let (fumen, _) = convert("BPM:120\nOFFSET:1\n#START\n0101,\n#END\n");
        let notes = &fumen.measures[0].branches.normal.notes;
        // offset_start = -1000 - 2000, plus one measure of compensation
        assert_eq!(notes[0].pos_abs, -1000.0 + 500.0);
        assert_eq!(notes[1].pos_abs, -1000.0 + 1500.0);
    }
}
