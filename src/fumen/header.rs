//! Fumen header definitions, parsing and writing

use super::hp::HpTable;
use crate::constants::{Difficulty, NoteType};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Header size in bytes
pub const FUMEN_HEADER_SIZE: usize = 520;

/// Number of timing-window floats (36 good/ok/bad triples)
pub const TIMING_WINDOW_COUNT: usize = 108;

/// Fumen header offsets (in bytes)
pub mod offset {
    /// 108 × f32 timing windows
    pub const TIMING_WINDOWS: usize = 0;
    pub const HAS_BRANCHES: usize = 432;
    pub const HP_MAX: usize = 436;
    pub const HP_CLEAR: usize = 440;
    pub const HP_GAIN_GOOD: usize = 444;
    pub const HP_GAIN_OK: usize = 448;
    pub const HP_LOSS_BAD: usize = 452;
    pub const NORMAL_NORMAL_RATIO: usize = 456;
    pub const NORMAL_PROFESSIONAL_RATIO: usize = 460;
    pub const NORMAL_MASTER_RATIO: usize = 464;
    pub const BRANCH_PTS_GOOD: usize = 468;
    pub const BRANCH_PTS_OK: usize = 472;
    pub const BRANCH_PTS_BAD: usize = 476;
    pub const BRANCH_PTS_DRUMROLL: usize = 480;
    pub const BRANCH_PTS_GOOD_BIG: usize = 484;
    pub const BRANCH_PTS_OK_BIG: usize = 488;
    pub const BRANCH_PTS_DRUMROLL_BIG: usize = 492;
    pub const BRANCH_PTS_BALLOON: usize = 496;
    pub const BRANCH_PTS_KUSUDAMA: usize = 500;
    pub const BRANCH_PTS_UNKNOWN: usize = 504;
    /// Always 12345678
    pub const DUMMY_DATA: usize = 508;
    pub const MEASURE_COUNT: usize = 512;
    pub const UNKNOWN_DATA: usize = 516;
}

/// Byte order of a Fumen file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Endian {
    #[default]
    #[serde(rename = "<")]
    Little,
    #[serde(rename = ">")]
    Big,
}

impl Endian {
    /// Detect the byte order from the measure-count field
    ///
    /// Big-endian when the big-endian reading of the count is strictly
    /// larger, otherwise little-endian. Game files rely on this exact rule,
    /// which reads small counts in the opposite order to the one they were
    /// written in; use [`FumenHeader::parse_as`] when the order is known.
    pub fn detect(measure_count: [u8; 4]) -> Self {
        if u32::from_be_bytes(measure_count) > u32::from_le_bytes(measure_count) {
            Endian::Big
        } else {
            Endian::Little
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            Endian::Little => "<",
            Endian::Big => ">",
        }
    }

    pub fn u16_bytes(self, value: u16) -> [u8; 2] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    pub fn u32_bytes(self, value: u32) -> [u8; 4] {
        match self {
            Endian::Little => value.to_le_bytes(),
            Endian::Big => value.to_be_bytes(),
        }
    }

    pub fn i32_bytes(self, value: i32) -> [u8; 4] {
        self.u32_bytes(value as u32)
    }

    pub fn f32_bytes(self, value: f32) -> [u8; 4] {
        self.u32_bytes(value.to_bits())
    }

    pub fn u16_from(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        }
    }

    pub fn u32_from(self, bytes: [u8; 4]) -> u32 {
        match self {
            Endian::Little => u32::from_le_bytes(bytes),
            Endian::Big => u32::from_be_bytes(bytes),
        }
    }

    pub fn i32_from(self, bytes: [u8; 4]) -> i32 {
        self.u32_from(bytes) as i32
    }

    pub fn f32_from(self, bytes: [u8; 4]) -> f32 {
        f32::from_bits(self.u32_from(bytes))
    }
}

/// Fumen header structure
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FumenHeader {
    pub endian: Endian,
    #[serde(skip)]
    pub timing_windows: [f32; TIMING_WINDOW_COUNT],
    pub has_branches: i32,
    pub hp_max: i32,
    pub hp_clear: i32,
    pub hp_gain_good: i32,
    pub hp_gain_ok: i32,
    pub hp_loss_bad: i32,
    pub normal_normal_ratio: i32,
    pub normal_professional_ratio: i32,
    pub normal_master_ratio: i32,
    pub branch_pts_good: i32,
    pub branch_pts_ok: i32,
    pub branch_pts_bad: i32,
    pub branch_pts_drumroll: i32,
    pub branch_pts_good_big: i32,
    pub branch_pts_ok_big: i32,
    pub branch_pts_drumroll_big: i32,
    pub branch_pts_balloon: i32,
    pub branch_pts_kusudama: i32,
    pub branch_pts_unknown: i32,
    pub dummy_data: i32,
    pub measure_count: i32,
    pub unknown_data: i32,
}

impl FumenHeader {
    pub fn new() -> Self {
        Self {
            endian: Endian::Little,
            timing_windows: [0.0; TIMING_WINDOW_COUNT],
            has_branches: 0,
            hp_max: 10000,
            hp_clear: 8000,
            hp_gain_good: 10,
            hp_gain_ok: 5,
            hp_loss_bad: -20,
            normal_normal_ratio: 65536,
            normal_professional_ratio: 65536,
            normal_master_ratio: 65536,
            branch_pts_good: 20,
            branch_pts_ok: 10,
            branch_pts_bad: 0,
            branch_pts_drumroll: 1,
            branch_pts_good_big: 20,
            branch_pts_ok_big: 10,
            branch_pts_drumroll_big: 1,
            branch_pts_balloon: 30,
            branch_pts_kusudama: 30,
            branch_pts_unknown: 20,
            dummy_data: 12345678,
            measure_count: 0,
            unknown_data: 0,
        }
    }

    /// Parse the header block at the start of `data`, detecting its byte order
    pub fn parse(data: &[u8]) -> Result<Self> {
        let count = data
            .get(offset::MEASURE_COUNT..offset::MEASURE_COUNT + 4)
            .ok_or_else(|| too_small(data.len()))?;
        let endian = Endian::detect([count[0], count[1], count[2], count[3]]);
        Self::parse_as(data, endian)
    }

    /// Parse the header block at the start of `data` in a known byte order
    pub fn parse_as(data: &[u8], endian: Endian) -> Result<Self> {
        if data.len() < FUMEN_HEADER_SIZE {
            return Err(too_small(data.len()));
        }
        let word = |at: usize| [data[at], data[at + 1], data[at + 2], data[at + 3]];
        let int = |at: usize| endian.i32_from(word(at));

        let mut timing_windows = [0.0; TIMING_WINDOW_COUNT];
        for (i, window) in timing_windows.iter_mut().enumerate() {
            *window = endian.f32_from(word(offset::TIMING_WINDOWS + i * 4));
        }

        Ok(Self {
            endian,
            timing_windows,
            has_branches: int(offset::HAS_BRANCHES),
            hp_max: int(offset::HP_MAX),
            hp_clear: int(offset::HP_CLEAR),
            hp_gain_good: int(offset::HP_GAIN_GOOD),
            hp_gain_ok: int(offset::HP_GAIN_OK),
            hp_loss_bad: int(offset::HP_LOSS_BAD),
            normal_normal_ratio: int(offset::NORMAL_NORMAL_RATIO),
            normal_professional_ratio: int(offset::NORMAL_PROFESSIONAL_RATIO),
            normal_master_ratio: int(offset::NORMAL_MASTER_RATIO),
            branch_pts_good: int(offset::BRANCH_PTS_GOOD),
            branch_pts_ok: int(offset::BRANCH_PTS_OK),
            branch_pts_bad: int(offset::BRANCH_PTS_BAD),
            branch_pts_drumroll: int(offset::BRANCH_PTS_DRUMROLL),
            branch_pts_good_big: int(offset::BRANCH_PTS_GOOD_BIG),
            branch_pts_ok_big: int(offset::BRANCH_PTS_OK_BIG),
            branch_pts_drumroll_big: int(offset::BRANCH_PTS_DRUMROLL_BIG),
            branch_pts_balloon: int(offset::BRANCH_PTS_BALLOON),
            branch_pts_kusudama: int(offset::BRANCH_PTS_KUSUDAMA),
            branch_pts_unknown: int(offset::BRANCH_PTS_UNKNOWN),
            dummy_data: int(offset::DUMMY_DATA),
            measure_count: int(offset::MEASURE_COUNT),
            unknown_data: int(offset::UNKNOWN_DATA),
        })
    }

    /// Serialize in the header's own byte order
    pub fn to_bytes(&self) -> [u8; FUMEN_HEADER_SIZE] {
        let mut data = [0; FUMEN_HEADER_SIZE];
        for (i, window) in self.timing_windows.iter().enumerate() {
            let at = offset::TIMING_WINDOWS + i * 4;
            data[at..at + 4].copy_from_slice(&self.endian.f32_bytes(*window));
        }
        for (at, value) in self.int_fields() {
            data[at..at + 4].copy_from_slice(&self.endian.i32_bytes(value));
        }
        data
    }

    fn int_fields(&self) -> [(usize, i32); 22] {
        [
            (offset::HAS_BRANCHES, self.has_branches),
            (offset::HP_MAX, self.hp_max),
            (offset::HP_CLEAR, self.hp_clear),
            (offset::HP_GAIN_GOOD, self.hp_gain_good),
            (offset::HP_GAIN_OK, self.hp_gain_ok),
            (offset::HP_LOSS_BAD, self.hp_loss_bad),
            (offset::NORMAL_NORMAL_RATIO, self.normal_normal_ratio),
            (offset::NORMAL_PROFESSIONAL_RATIO, self.normal_professional_ratio),
            (offset::NORMAL_MASTER_RATIO, self.normal_master_ratio),
            (offset::BRANCH_PTS_GOOD, self.branch_pts_good),
            (offset::BRANCH_PTS_OK, self.branch_pts_ok),
            (offset::BRANCH_PTS_BAD, self.branch_pts_bad),
            (offset::BRANCH_PTS_DRUMROLL, self.branch_pts_drumroll),
            (offset::BRANCH_PTS_GOOD_BIG, self.branch_pts_good_big),
            (offset::BRANCH_PTS_OK_BIG, self.branch_pts_ok_big),
            (offset::BRANCH_PTS_DRUMROLL_BIG, self.branch_pts_drumroll_big),
            (offset::BRANCH_PTS_BALLOON, self.branch_pts_balloon),
            (offset::BRANCH_PTS_KUSUDAMA, self.branch_pts_kusudama),
            (offset::BRANCH_PTS_UNKNOWN, self.branch_pts_unknown),
            (offset::DUMMY_DATA, self.dummy_data),
            (offset::MEASURE_COUNT, self.measure_count),
            (offset::UNKNOWN_DATA, self.unknown_data),
        ]
    }

    /// Fill all 36 window triples from the difficulty table
    pub fn set_timing_windows(&mut self, difficulty: Difficulty) {
        let (good, ok, bad) = difficulty.timing_windows();
        for triple in self.timing_windows.chunks_exact_mut(3) {
            triple.copy_from_slice(&[good, ok, bad]);
        }
    }

    /// Set HP gain/loss from the lookup table and the clear threshold
    pub fn set_hp_bytes(&mut self, n_notes: i32, difficulty: Difficulty, stars: i32, table: &HpTable) {
        if let Some(values) = table.lookup(n_notes, difficulty, stars) {
            self.hp_gain_good = values.good;
            self.hp_gain_ok = values.ok;
            self.hp_loss_bad = values.bad;
        }
        self.hp_clear = difficulty.hp_clear();
    }

    /// Branch points awarded for a good hit on `note`
    pub fn branch_points(&self, note: NoteType) -> i32 {
        match note {
            NoteType::Don | NoteType::Ka => self.branch_pts_good,
            NoteType::DonBig | NoteType::KaBig => self.branch_pts_good_big,
            NoteType::Balloon => self.branch_pts_balloon,
            NoteType::Kusudama => self.branch_pts_kusudama,
            _ => 0,
        }
    }
}

fn too_small(len: usize) -> Error {
    Error::FumenParse(format!("File too small for fumen header ({len} bytes)"))
}

impl Default for FumenHeader {
    fn default() -> Self {
        Self::new()
    }
}
