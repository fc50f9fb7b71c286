//! Fixed lookup tables shared by the parser, converter and binary codec
//!
//! Every table here is a closed enum with an exhaustive mapping to and from
//! its textual or wire representation. Unknown values are rejected where
//! they enter the pipeline.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three alternative note tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Branch {
    Normal,
    Professional,
    Master,
}

impl Branch {
    /// All branches in wire order
    pub const ALL: [Branch; 3] = [Branch::Normal, Branch::Professional, Branch::Master];

    pub fn index(self) -> usize {
        match self {
            Branch::Normal => 0,
            Branch::Professional => 1,
            Branch::Master => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Branch::Normal => "normal",
            Branch::Professional => "professional",
            Branch::Master => "master",
        }
    }
}

impl fmt::Display for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Course difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Difficulty {
    Easy,
    Normal,
    Hard,
    Oni,
    Ura,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Easy,
        Difficulty::Normal,
        Difficulty::Hard,
        Difficulty::Oni,
        Difficulty::Ura,
    ];

    /// Normalize a `COURSE:` value (already capitalized) to a difficulty
    pub fn from_course_value(value: &str) -> Option<Self> {
        match value {
            "0" | "Easy" => Some(Difficulty::Easy),
            "1" | "Normal" => Some(Difficulty::Normal),
            "2" | "Hard" => Some(Difficulty::Hard),
            "3" | "Oni" => Some(Difficulty::Oni),
            "4" | "Ura" | "Edit" => Some(Difficulty::Ura),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Normal => "Normal",
            Difficulty::Hard => "Hard",
            Difficulty::Oni => "Oni",
            Difficulty::Ura => "Ura",
        }
    }

    /// Single-letter id used in game file names
    pub fn course_id(self) -> &'static str {
        match self {
            Difficulty::Easy => "e",
            Difficulty::Normal => "n",
            Difficulty::Hard => "h",
            Difficulty::Oni => "m",
            Difficulty::Ura => "x",
        }
    }

    /// Ura shares every Oni lookup table
    pub fn table_key(self) -> Difficulty {
        match self {
            Difficulty::Ura => Difficulty::Oni,
            other => other,
        }
    }

    /// HP required to clear the course
    pub fn hp_clear(self) -> i32 {
        match self.table_key() {
            Difficulty::Easy => 6000,
            Difficulty::Normal | Difficulty::Hard => 7000,
            _ => 8000,
        }
    }

    /// (good, ok, bad) judgement windows in milliseconds
    pub fn timing_windows(self) -> (f32, f32, f32) {
        match self.table_key() {
            Difficulty::Easy | Difficulty::Normal => {
                (41.708_335_876_464_8, 108.441_665_649_414, 125.125)
            }
            _ => (25.025_001_525_878_9, 75.075_004_577_637, 108.441_665_649_414),
        }
    }

    /// Star-rating bucket used to select an HP table column
    pub fn star_bucket(self, stars: i32) -> Option<&'static str> {
        let bucket = match (self.table_key(), stars) {
            (_, s) if !(1..=10).contains(&s) => return None,
            (Difficulty::Oni, 1..=7) => "17",
            (Difficulty::Oni, 8) => "8",
            (Difficulty::Oni, _) => "910",
            (Difficulty::Hard | Difficulty::Normal, 1 | 2) => "12",
            (Difficulty::Hard | Difficulty::Normal, 3) => "3",
            (Difficulty::Hard | Difficulty::Normal, 4) => "4",
            (Difficulty::Hard, _) => "58",
            (Difficulty::Normal, _) => "57",
            (Difficulty::Easy, 1) => "1",
            (Difficulty::Easy, 2 | 3) => "23",
            (Difficulty::Easy, _) => "45",
            (Difficulty::Ura, _) => return None,
        };
        Some(bucket)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Fumen note type, in wire-code order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NoteType {
    Don,
    Don2,
    Don3,
    Ka,
    Ka2,
    Drumroll,
    #[serde(rename = "DON")]
    DonBig,
    #[serde(rename = "KA")]
    KaBig,
    #[serde(rename = "DRUMROLL")]
    DrumrollBig,
    Balloon,
    #[serde(rename = "DON2")]
    DonBig2,
    Kusudama,
    #[serde(rename = "KA2")]
    KaBig2,
    /// Undocumented codes 0xe..=0x19 and 0x22
    Unknown(u32),
    Drumroll2,
}

impl NoteType {
    /// Numeric code written to the binary
    pub fn code(self) -> u32 {
        match self {
            NoteType::Don => 0x1,
            NoteType::Don2 => 0x2,
            NoteType::Don3 => 0x3,
            NoteType::Ka => 0x4,
            NoteType::Ka2 => 0x5,
            NoteType::Drumroll => 0x6,
            NoteType::DonBig => 0x7,
            NoteType::KaBig => 0x8,
            NoteType::DrumrollBig => 0x9,
            NoteType::Balloon => 0xa,
            NoteType::DonBig2 => 0xb,
            NoteType::Kusudama => 0xc,
            NoteType::KaBig2 => 0xd,
            NoteType::Unknown(code) => code,
            NoteType::Drumroll2 => 0x62,
        }
    }

    pub fn from_code(code: u32) -> Option<Self> {
        let note = match code {
            0x1 => NoteType::Don,
            0x2 => NoteType::Don2,
            0x3 => NoteType::Don3,
            0x4 => NoteType::Ka,
            0x5 => NoteType::Ka2,
            0x6 => NoteType::Drumroll,
            0x7 => NoteType::DonBig,
            0x8 => NoteType::KaBig,
            0x9 => NoteType::DrumrollBig,
            0xa => NoteType::Balloon,
            0xb => NoteType::DonBig2,
            0xc => NoteType::Kusudama,
            0xd => NoteType::KaBig2,
            0xe..=0x19 | 0x22 => NoteType::Unknown(code),
            0x62 => NoteType::Drumroll2,
            _ => return None,
        };
        Some(note)
    }

    /// Note type selected by `#SENOTECHANGE <index>`
    pub fn from_se_index(index: i32) -> Option<Self> {
        match index {
            1 => Some(NoteType::Don),
            2 => Some(NoteType::Don2),
            3 => Some(NoteType::Don3),
            4 => Some(NoteType::Ka),
            5 => Some(NoteType::Ka2),
            _ => None,
        }
    }

    /// Any don or ka note, small or big
    pub fn is_don_ka(self) -> bool {
        matches!(
            self,
            NoteType::Don
                | NoteType::Don2
                | NoteType::Don3
                | NoteType::Ka
                | NoteType::Ka2
                | NoteType::DonBig
                | NoteType::KaBig
                | NoteType::DonBig2
                | NoteType::KaBig2
        )
    }

    pub fn is_big(self) -> bool {
        matches!(
            self,
            NoteType::DonBig | NoteType::DonBig2 | NoteType::KaBig | NoteType::KaBig2
        )
    }

    /// Small don in any visual variant
    pub fn is_small_don(self) -> bool {
        matches!(self, NoteType::Don | NoteType::Don2 | NoteType::Don3)
    }

    /// Notes followed by the 8-byte drumroll payload in the body
    pub fn has_roll_payload(self) -> bool {
        matches!(self, NoteType::Drumroll | NoteType::DrumrollBig)
    }

    /// Balloon-style notes carry a hit count instead of score values
    pub fn uses_hits(self) -> bool {
        matches!(self, NoteType::Balloon | NoteType::Kusudama)
    }

    /// Alternate ("2") variant of a small don/ka
    pub fn alternate(self) -> Self {
        match self {
            NoteType::Don | NoteType::Don2 | NoteType::Don3 => NoteType::Don2,
            NoteType::Ka | NoteType::Ka2 => NoteType::Ka2,
            other => other,
        }
    }

    /// Plain variant of a small don/ka
    pub fn plain(self) -> Self {
        match self {
            NoteType::Don | NoteType::Don2 | NoteType::Don3 => NoteType::Don,
            NoteType::Ka | NoteType::Ka2 => NoteType::Ka,
            other => other,
        }
    }
}

/// A single TJA note-data character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    /// `8`: closes the open drumroll/balloon
    EndRoll,
    Note(NoteType),
}

impl Glyph {
    /// Glyph for a note character; blanks and unknown characters give `None`
    pub fn from_char(c: char) -> Option<Self> {
        let glyph = match c {
            '1' => Glyph::Note(NoteType::Don),
            '2' | 'F' => Glyph::Note(NoteType::Ka),
            '3' => Glyph::Note(NoteType::DonBig),
            '4' => Glyph::Note(NoteType::KaBig),
            '5' | 'D' | 'I' => Glyph::Note(NoteType::Drumroll),
            '6' | 'H' => Glyph::Note(NoteType::DrumrollBig),
            '7' => Glyph::Note(NoteType::Balloon),
            '8' => Glyph::EndRoll,
            '9' => Glyph::Note(NoteType::Kusudama),
            'A' | 'E' => Glyph::Note(NoteType::DonBig2),
            'B' | 'G' => Glyph::Note(NoteType::KaBig2),
            _ => return None,
        };
        Some(glyph)
    }

    /// `0` and `C` hold a sub-division slot without placing anything
    pub fn is_blank_char(c: char) -> bool {
        c == '0' || c == 'C'
    }

    /// Glyphs that consume a value from the course's BALLOON list
    pub fn is_balloon_char(c: char) -> bool {
        c == '7' || c == '9'
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_note_codes_round_trip() {
        for code in (0x1..=0x19).chain([0x22, 0x62]) {
            let note = NoteType::from_code(code).unwrap();
            assert_eq!(note.code(), code);
        }
        assert_eq!(NoteType::from_code(0x1a), None);
        assert_eq!(NoteType::from_code(0), None);
    }

    #[test]
    fn test_course_normalization() {
        assert_eq!(Difficulty::from_course_value("3"), Some(Difficulty::Oni));
        assert_eq!(Difficulty::from_course_value("Edit"), Some(Difficulty::Ura));
        assert_eq!(Difficulty::from_course_value("Extreme"), None);
        assert_eq!(Difficulty::Ura.table_key(), Difficulty::Oni);
        assert_eq!(Difficulty::Ura.hp_clear(), 8000);
        assert_eq!(Difficulty::Hard.hp_clear(), 7000);
        assert_eq!(Difficulty::Easy.hp_clear(), 6000);
    }

    #[test]
    fn test_star_buckets() {
        assert_eq!(Difficulty::Oni.star_bucket(7), Some("17"));
        assert_eq!(Difficulty::Ura.star_bucket(10), Some("910"));
        assert_eq!(Difficulty::Hard.star_bucket(6), Some("58"));
        assert_eq!(Difficulty::Normal.star_bucket(6), Some("57"));
        assert_eq!(Difficulty::Easy.star_bucket(3), Some("23"));
        assert_eq!(Difficulty::Easy.star_bucket(0), None);
    }

    #[test]
    fn test_glyph_table() {
        assert_eq!(Glyph::from_char('C'), None);
        assert!(Glyph::is_blank_char('C'));
        assert!(!Glyph::is_blank_char('J'));
        assert_eq!(Glyph::from_char('8'), Some(Glyph::EndRoll));
        assert_eq!(Glyph::from_char('I'), Some(Glyph::Note(NoteType::Drumroll)));
        assert_eq!(Glyph::from_char('G'), Some(Glyph::Note(NoteType::KaBig2)));
        assert_eq!(Glyph::from_char('J'), None);
    }

    #[test]
    fn test_variants() {
        assert_eq!(NoteType::Don3.alternate(), NoteType::Don2);
        assert_eq!(NoteType::Ka2.plain(), NoteType::Ka);
        assert_eq!(NoteType::DonBig.alternate(), NoteType::DonBig);
        assert!(NoteType::DonBig2.is_big());
        assert!(NoteType::DrumrollBig.has_roll_payload());
        assert!(!NoteType::Drumroll2.has_roll_payload());
    }
}
