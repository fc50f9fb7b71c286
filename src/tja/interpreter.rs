//! Command interpreter: course lines to per-branch measures
//!
//! Walks the raw lines of one course, tracking which branch(es) the current
//! line applies to and the measure cursor, and records note glyphs and timed
//! events into measures. Branches that fall behind their peers are healed on
//! the spot.

use super::course::BalloonMark;
use super::lines::parse_command;
use super::model::{Event, EventKind, ItemData, Measure, MeasureItem};
use crate::branches::Branches;
use crate::constants::{Branch, Glyph, NoteType};
use crate::error::{Error, Result, SplitStage};
use crate::warning::{Warning, Warnings};
use log::debug;

/// Result of interpreting one course
#[derive(Debug, Clone)]
pub struct ParsedCourse {
    pub branches: Branches<Vec<Measure>>,
    /// Balloon glyphs seen per branch, used to repair the BALLOON list
    pub balloons: Branches<Vec<BalloonMark>>,
    pub has_branches: bool,
}

/// Branches the current line is written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    All,
    Only(Branch),
}

impl Scope {
    fn branches(self) -> &'static [Branch] {
        match self {
            Scope::All => &Branch::ALL,
            Scope::Only(Branch::Normal) => &[Branch::Normal],
            Scope::Only(Branch::Professional) => &[Branch::Professional],
            Scope::Only(Branch::Master) => &[Branch::Master],
        }
    }
}

struct Interpreter<'w> {
    parsed: Branches<Vec<Measure>>,
    balloons: Branches<Vec<BalloonMark>>,
    scope: Scope,
    /// Scope at `#START`: all branches when the course declares any
    default_scope: Scope,
    /// Descriptor of the most recent `#BRANCHSTART`
    branch_condition: String,
    /// Measure cursor
    idx_m: usize,
    /// Cursor position at the last `#BRANCHSTART`
    idx_m_branch_start: usize,
    warnings: &'w mut Warnings,
}

/// Interpret the lines of one course
pub fn interpret_course(data: &[String], warnings: &mut Warnings) -> Result<ParsedCourse> {
    let has_branches = data.iter().any(|line| line.starts_with("#BRANCH"));
    let default_scope = if has_branches {
        Scope::All
    } else {
        Scope::Only(Branch::Normal)
    };

    let mut interp = Interpreter {
        parsed: Branches::from_fn(|_| vec![Measure::default()]),
        balloons: Branches::default(),
        scope: default_scope,
        default_scope,
        branch_condition: String::new(),
        idx_m: 0,
        idx_m_branch_start: 0,
        warnings,
    };

    for (idx_l, line) in data.iter().enumerate() {
        let Some((command, value)) = parse_command(line) else {
            interp.note_line(line);
            continue;
        };

        match command.as_str() {
            "GOGOSTART" | "GOGOEND" | "BARLINEON" | "BARLINEOFF" | "DELAY" | "SCROLL"
            | "BPMCHANGE" | "MEASURE" | "LEVELHOLD" | "SENOTECHANGE" | "SECTION"
            | "BRANCHSTART" => {
                let next_line = data.get(idx_l + 1).map(String::as_str);
                interp.event_command(&command, &value, idx_l + 1, next_line)?;
            }
            "START" | "END" => interp.scope = default_scope,
            "N" => interp.select_branch(Branch::Normal),
            "E" => interp.select_branch(Branch::Professional),
            "M" => interp.select_branch(Branch::Master),
            "BRANCHEND" => interp.scope = Scope::All,
            _ => debug!("Ignoring unsupported command '{command}'"),
        }
    }

    interp.finish(has_branches)
}

impl Interpreter<'_> {
    fn select_branch(&mut self, branch: Branch) {
        self.scope = Scope::Only(branch);
        self.idx_m = self.idx_m_branch_start;
    }

    /// Pad `branch` up to `expected` measures, or to the longest branch
    fn heal(&mut self, branch: Branch, expected: Option<usize>) {
        let actual = self.parsed[branch].len();
        let (expected, copied_from) = match expected {
            Some(len) => (len, None),
            None => {
                let mut longest = branch;
                let mut len = actual;
                for (other, measures) in self.parsed.iter() {
                    if measures.len() > len {
                        len = measures.len();
                        longest = other;
                    }
                }
                (len, Some(longest))
            }
        };
        if actual >= expected {
            return;
        }

        match copied_from {
            Some(from) => {
                let copied = self.parsed[from][actual..expected].to_vec();
                self.parsed[branch].extend(copied);
            }
            None => self.parsed[branch].resize_with(expected, Measure::default),
        }
        self.warnings.push(Warning::BranchLengthHealed {
            branch,
            expected,
            actual,
            copied_from,
        });
    }

    fn note_line(&mut self, line: &str) {
        let (notes, terminal) = match line.strip_suffix(',') {
            Some(notes) => (notes, true),
            None => (line, false),
        };

        for &branch in self.scope.branches() {
            self.heal(branch, Some(self.idx_m + 1));
            let measures = &mut self.parsed[branch];
            measures[self.idx_m].notes.extend(notes.chars());
            if terminal {
                measures.push(Measure::default());
            }
        }
        if terminal {
            self.idx_m += 1;
        }

        let mark = match self.scope {
            Scope::All => BalloonMark::Shared,
            Scope::Only(_) => BalloonMark::Own,
        };
        let count = notes.chars().filter(|&c| Glyph::is_balloon_char(c)).count();
        for &branch in self.scope.branches() {
            self.balloons[branch].extend(std::iter::repeat(mark).take(count));
        }
    }

    fn event_command(
        &mut self,
        command: &str,
        value: &str,
        line: usize,
        next_line: Option<&str>,
    ) -> Result<()> {
        let mut pos = 0;
        for &branch in self.scope.branches() {
            self.heal(branch, Some(self.idx_m + 1));
            pos = self.parsed[branch][self.idx_m].notes.len();
        }

        let number = |value: &str| -> Result<f32> {
            value.trim().parse().map_err(|_| Error::InvalidCommandValue {
                command: command.to_string(),
                value: value.to_string(),
                line,
            })
        };

        let kind = match command {
            "GOGOSTART" => Some(EventKind::Gogo(true)),
            "GOGOEND" => Some(EventKind::Gogo(false)),
            "BARLINEON" => Some(EventKind::Barline(true)),
            "BARLINEOFF" => Some(EventKind::Barline(false)),
            "DELAY" => Some(EventKind::Delay(number(value)?)),
            "SCROLL" => Some(EventKind::Scroll(number(value)?)),
            "BPMCHANGE" => Some(EventKind::Bpm(number(value)?)),
            "MEASURE" => match parse_time_signature(value) {
                Some((num, den)) => Some(EventKind::Measure(num, den)),
                None => {
                    self.warnings.push(Warning::InvalidTimeSignature {
                        value: value.to_string(),
                    });
                    None
                }
            },
            "LEVELHOLD" => Some(EventKind::LevelHold),
            "SENOTECHANGE" => {
                match value.trim().parse().ok().and_then(NoteType::from_se_index) {
                    Some(note) => Some(EventKind::SeNote(note)),
                    None => {
                        self.warnings.push(Warning::UnknownSeNote {
                            value: value.to_string(),
                        });
                        None
                    }
                }
            }
            "SECTION" => {
                let opens_branch =
                    next_line.is_some_and(|next| next.starts_with("#BRANCHSTART"));
                if opens_branch || self.branch_condition.is_empty() {
                    self.scope = self.default_scope;
                    Some(EventKind::Section)
                } else {
                    Some(EventKind::BranchStart(self.branch_condition.clone()))
                }
            }
            "BRANCHSTART" => {
                self.scope = Scope::All;
                self.branch_condition = value.to_string();
                for branch in Branch::ALL {
                    self.heal(branch, None);
                }
                self.idx_m_branch_start = self.idx_m;
                Some(EventKind::BranchStart(value.to_string()))
            }
            _ => None,
        };

        if let Some(kind) = kind {
            for &branch in self.scope.branches() {
                self.heal(branch, Some(self.idx_m + 1));
                self.parsed[branch][self.idx_m].events.push(Event {
                    kind: kind.clone(),
                    pos,
                });
            }
        }
        Ok(())
    }

    fn finish(mut self, has_branches: bool) -> Result<ParsedCourse> {
        // The last terminal line opens a measure that never receives data
        for branch in Branch::ALL {
            if self.parsed[branch].last().is_some_and(Measure::is_empty) {
                self.parsed[branch].pop();
            }
        }
        for branch in Branch::ALL {
            if !self.parsed[branch].is_empty() {
                self.heal(branch, None);
            }
        }

        for branch in Branch::ALL {
            for measure in self.parsed[branch].iter_mut() {
                filter_and_merge(measure, self.warnings);
            }
        }

        if has_branches {
            let lengths = [
                self.parsed.normal.len(),
                self.parsed.professional.len(),
                self.parsed.master.len(),
            ];
            if lengths.iter().any(|&len| len != lengths[0]) {
                return Err(Error::BranchLengthMismatch {
                    stage: SplitStage::BeforeSplit,
                    lengths,
                });
            }
        }

        Ok(ParsedCourse {
            branches: self.parsed,
            balloons: self.balloons,
            has_branches,
        })
    }
}

/// Parse `a/b`, ignoring surrounding text
fn parse_time_signature(value: &str) -> Option<(i32, i32)> {
    let (num, den) = value.split_once('/')?;
    let digits_end = |s: &str| s.chars().rev().take_while(char::is_ascii_digit).count();
    let num = &num[num.len() - digits_end(num)..];
    let den_len = den.chars().take_while(char::is_ascii_digit).count();
    let den = &den[..den_len];
    let num: i32 = num.parse().ok()?;
    let den: i32 = den.parse().ok()?;
    if den == 0 {
        return None;
    }
    Some((num, den))
}

/// Drop unknown glyphs, then merge notes and events by position
fn filter_and_merge(measure: &mut Measure, warnings: &mut Warnings) {
    let raw: String = measure.notes.iter().collect();
    let mut valid = Vec::with_capacity(measure.notes.len());
    let mut notes = Vec::new();
    for &c in &measure.notes {
        if Glyph::is_blank_char(c) {
            valid.push(c);
            continue;
        }
        match Glyph::from_char(c) {
            Some(glyph) => {
                notes.push(MeasureItem {
                    pos: valid.len(),
                    data: ItemData::Note(glyph),
                });
                valid.push(c);
            }
            None => warnings.push(Warning::InvalidNote {
                glyph: c,
                measure: raw.clone(),
            }),
        }
    }
    measure.notes = valid;

    let mut notes = notes.into_iter().peekable();
    let mut events = measure
        .events
        .iter()
        .map(|event| MeasureItem {
            pos: event.pos,
            data: ItemData::Event(event.kind.clone()),
        })
        .peekable();

    let mut combined = Vec::new();
    loop {
        let take_event = match (notes.peek(), events.peek()) {
            (Some(note), Some(event)) => note.pos >= event.pos,
            (None, Some(_)) => true,
            (Some(_), None) => false,
            (None, None) => break,
        };
        let item = if take_event {
            events.next()
        } else {
            notes.next()
        };
        combined.extend(item);
    }
    measure.combined = combined;
}
