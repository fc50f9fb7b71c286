//! Don/ka alternation: pick "2"/"3" note variants for dense runs
//!
//! Notes are grouped into clusters by the gap to the next note, relative to
//! the song's dominant tempo. Gaps under an eighth note are grouped first,
//! then each remaining gap under a quarter note in ascending order.

use crate::constants::{Branch, NoteType};
use crate::fumen::model::measure_ms;
use crate::fumen::{FumenCourse, FumenNote};

/// Location of a don/ka note, as (measure, note) indices
type NoteRef = (usize, usize);

#[derive(Debug, Clone, PartialEq)]
enum Item {
    Single(usize),
    Cluster(Vec<usize>),
}

/// Most frequent measure tempo; the earliest wins ties
pub fn dominant_bpm(course: &FumenCourse) -> Option<f32> {
    let mut counts: Vec<(f32, usize)> = Vec::new();
    for measure in &course.measures {
        match counts.iter_mut().find(|(bpm, _)| *bpm == measure.bpm) {
            Some((_, count)) => *count += 1,
            None => counts.push((measure.bpm, 1)),
        }
    }
    let mut best: Option<(f32, usize)> = None;
    for (bpm, count) in counts {
        if best.map_or(true, |(_, top)| count > top) {
            best = Some((bpm, count));
        }
    }
    best.map(|(bpm, _)| bpm)
}

/// Reclassify don/ka notes of every branch
pub fn fix_dk_note_types(course: &mut FumenCourse) {
    let Some(song_bpm) = dominant_bpm(course) else {
        return;
    };
    for branch in Branch::ALL {
        fix_branch(course, branch, song_bpm);
    }
}

fn note_mut(course: &mut FumenCourse, branch: Branch, (mi, ni): NoteRef) -> &mut FumenNote {
    &mut course.measures[mi].branches[branch].notes[ni]
}

fn fix_branch(course: &mut FumenCourse, branch: Branch, song_bpm: f32) {
    let mut dk_notes: Vec<(NoteRef, f32)> = Vec::new();
    for (mi, measure) in course.measures.iter().enumerate() {
        for (ni, note) in measure.branches[branch].notes.iter().enumerate() {
            if note.note_type.is_don_ka() {
                dk_notes.push(((mi, ni), note.pos_abs));
            }
        }
    }
    if dk_notes.is_empty() {
        return;
    }
    dk_notes.sort_by(|a, b| a.1.total_cmp(&b.1));

    let diffs: Vec<i32> = (0..dk_notes.len())
        .map(|i| match dk_notes.get(i + 1) {
            Some(next) => (next.1 - dk_notes[i].1) as i32,
            None => 0,
        })
        .collect();
    for (&(at, _), &diff) in dk_notes.iter().zip(&diffs) {
        note_mut(course, branch, at).diff = diff;
    }

    let measure_duration = measure_ms(song_bpm);
    let quarter = (measure_duration / 4.0) as i32;
    let eighth = (measure_duration / 8.0) as i32;

    let mut unique = diffs.clone();
    unique.sort_unstable();
    unique.dedup();
    let mut tiers: Vec<Vec<i32>> = Vec::new();
    let mut under_eighth = Vec::new();
    for diff in unique.into_iter().filter(|&d| d < quarter) {
        if diff < eighth {
            under_eighth.push(diff);
        } else {
            tiers.push(vec![diff]);
        }
    }
    if !under_eighth.is_empty() {
        tiers.insert(0, under_eighth);
    }

    let mut items: Vec<Item> = (0..dk_notes.len()).map(Item::Single).collect();
    for tier in &tiers {
        items = cluster_notes(items, tier, &diffs);
    }

    let refs: Vec<NoteRef> = dk_notes.iter().map(|(at, _)| *at).collect();
    for item in items {
        let cluster = match item {
            Item::Single(i) => vec![i],
            Item::Cluster(members) => members,
        };
        replace_alternate(course, branch, &cluster, &refs, &diffs, eighth);
    }
}

/// Merge runs of notes whose gap is one of `tier`; the run's closing note joins it
fn cluster_notes(items: Vec<Item>, tier: &[i32], diffs: &[i32]) -> Vec<Item> {
    let mut clustered = Vec::new();
    let mut current: Vec<usize> = Vec::new();

    for item in items {
        match item {
            Item::Cluster(_) => {
                if !current.is_empty() {
                    clustered.push(Item::Cluster(std::mem::take(&mut current)));
                }
                clustered.push(item);
            }
            Item::Single(i) => {
                if tier.contains(&diffs[i]) {
                    current.push(i);
                } else if !current.is_empty() {
                    current.push(i);
                    clustered.push(Item::Cluster(std::mem::take(&mut current)));
                } else {
                    clustered.push(item);
                }
            }
        }
    }
    if !current.is_empty() {
        clustered.push(Item::Cluster(current));
    }
    clustered
}

fn replace_alternate(
    course: &mut FumenCourse,
    branch: Branch,
    cluster: &[usize],
    refs: &[NoteRef],
    diffs: &[i32],
    eighth: i32,
) {
    let Some(&last) = cluster.last() else {
        return;
    };
    let editable = |note: &FumenNote| !note.note_type.is_big() && !note.manually_set;

    for &i in cluster {
        let note = note_mut(course, branch, refs[i]);
        if editable(&*note) {
            note.note_type = note.note_type.alternate();
        }
    }

    let all_small_dons = cluster
        .iter()
        .all(|&i| note_mut(course, branch, refs[i]).note_type.is_small_don());
    if all_small_dons && cluster.len() % 2 == 1 {
        for &i in cluster.iter().skip(1).step_by(2) {
            let note = note_mut(course, branch, refs[i]);
            if editable(&*note) {
                note.note_type = NoteType::Don3;
            }
        }
    }

    let fast_cluster_of_4 =
        cluster.len() == 4 && cluster[..3].iter().all(|&i| diffs[i] < eighth);
    if !fast_cluster_of_4 {
        let note = note_mut(course, branch, refs[last]);
        if editable(&*note) {
            note.note_type = note.note_type.plain();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fumen::FumenMeasure;

    /// One 120 BPM measure holding `notes` at the given absolute positions
    fn course(notes: &[(NoteType, f32)]) -> FumenCourse {
        let mut measure = FumenMeasure::new();
        measure.bpm = 120.0;
        for &(note_type, pos_abs) in notes {
            let mut note = FumenNote::new(note_type, pos_abs);
            note.pos_abs = pos_abs;
            measure.branches.normal.notes.push(note);
        }
        let mut course = FumenCourse::default();
        course.measures.push(measure);
        course
    }

    fn types(course: &FumenCourse) -> Vec<NoteType> {
        course.measures[0]
            .branches
            .normal
            .notes
            .iter()
            .map(|n| n.note_type)
            .collect()
    }

    #[test]
    fn test_dominant_bpm() {
        let mut course = FumenCourse::default();
        for bpm in [120.0, 150.0, 150.0, 120.0, 180.0] {
            let mut measure = FumenMeasure::new();
            measure.bpm = bpm;
            course.measures.push(measure);
        }
        assert_eq!(dominant_bpm(&course), Some(120.0));
        assert_eq!(dominant_bpm(&FumenCourse::default()), None);
    }

    #[test]
    fn test_isolated_notes_unchanged() {
        // Half-note gaps at 120 BPM are never clustered
        let mut c = course(&[(NoteType::Don, 0.0), (NoteType::Ka, 1000.0)]);
        fix_dk_note_types(&mut c);
        assert_eq!(types(&c), vec![NoteType::Don, NoteType::Ka]);
    }

    #[test]
    fn test_sixteenth_run_of_three_dons() {
        // Eighth note = 250 ms, sixteenths 125 ms apart
        let mut c = course(&[
            (NoteType::Don, 0.0),
            (NoteType::Don, 125.0),
            (NoteType::Don, 250.0),
        ]);
        fix_dk_note_types(&mut c);
        assert_eq!(types(&c), vec![NoteType::Don2, NoteType::Don3, NoteType::Don]);
    }

    #[test]
    fn test_mixed_run_keeps_big_notes() {
        let mut c = course(&[
            (NoteType::Don, 0.0),
            (NoteType::Ka, 125.0),
            (NoteType::DonBig, 250.0),
            (NoteType::Ka, 1000.0),
        ]);
        fix_dk_note_types(&mut c);
        assert_eq!(
            types(&c),
            vec![NoteType::Don2, NoteType::Ka2, NoteType::DonBig, NoteType::Ka]
        );
    }

    #[test]
    fn test_manually_set_notes_exempt() {
        let mut c = course(&[(NoteType::Ka, 0.0), (NoteType::Ka, 125.0), (NoteType::Ka, 1000.0)]);
        c.measures[0].branches.normal.notes[0].manually_set = true;
        fix_dk_note_types(&mut c);
        assert_eq!(types(&c), vec![NoteType::Ka, NoteType::Ka, NoteType::Ka]);
    }
}
