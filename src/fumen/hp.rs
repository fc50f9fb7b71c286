//! HP gain/loss lookup table
//!
//! The table is data shipped alongside the game, so it is loaded from a CSV
//! file rather than compiled in. The first row names the columns
//! (`good_Oni-17`, `ok_Oni-17`, `bad_Oni-17`, ...) and each following row
//! holds the values for one note count, starting at 1.

use crate::constants::Difficulty;
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Largest note count covered by the table
pub const MAX_NOTES: i32 = 2500;

/// HP values for one (difficulty, stars, note count) entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HpValues {
    pub good: i32,
    pub ok: i32,
    pub bad: i32,
}

#[derive(Debug, Clone, Default)]
pub struct HpTable {
    columns: HashMap<String, usize>,
    rows: Vec<Vec<i32>>,
}

impl HpTable {
    /// Parse CSV text
    pub fn parse_csv(src: &str) -> Result<Self> {
        let mut lines = src
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());

        let Some(header) = lines.next() else {
            return Ok(Self::default());
        };
        let columns: HashMap<String, usize> = header
            .split(',')
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        let mut rows = Vec::new();
        for (idx, line) in lines.enumerate() {
            let row = line
                .split(',')
                .map(|cell| cell.trim().parse::<i32>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::HpTable(format!("row {}: {e}", idx + 1)))?;
            if row.len() != columns.len() {
                return Err(Error::HpTable(format!(
                    "row {} has {} values, expected {}",
                    idx + 1,
                    row.len(),
                    columns.len()
                )));
            }
            rows.push(row);
        }

        Ok(Self { columns, rows })
    }

    /// Load a CSV file
    pub fn load(path: &Path) -> Result<Self> {
        let src = fs::read_to_string(path)?;
        Self::parse_csv(&src)
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of note-count rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Look up the values for a course; `None` keeps the header defaults
    pub fn lookup(&self, n_notes: i32, difficulty: Difficulty, stars: i32) -> Option<HpValues> {
        if !(1..=MAX_NOTES).contains(&n_notes) {
            return None;
        }
        let bucket = difficulty.star_bucket(stars)?;
        let key = format!("{}-{bucket}", difficulty.table_key().name());
        let row = self.rows.get(usize::try_from(n_notes - 1).ok()?)?;
        let cell = |prefix: &str| -> Option<i32> {
            let column = *self.columns.get(&format!("{prefix}_{key}"))?;
            row.get(column).copied()
        };
        Some(HpValues {
            good: cell("good")?,
            ok: cell("ok")?,
            bad: cell("bad")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "good_Oni-17,ok_Oni-17,bad_Oni-17,good_Easy-1,ok_Easy-1,bad_Easy-1\n\
                       2000,1000,-4000,1500,750,-1500\n\
                       1000,500,-2000,750,375,-750\n";

    #[test]
    fn test_lookup() {
        let table = HpTable::parse_csv(CSV).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(
            table.lookup(2, Difficulty::Ura, 5),
            Some(HpValues {
                good: 1000,
                ok: 500,
                bad: -2000
            })
        );
        assert_eq!(table.lookup(1, Difficulty::Easy, 1).map(|v| v.good), Some(1500));
    }

    #[test]
    fn test_lookup_out_of_range() {
        let table = HpTable::parse_csv(CSV).unwrap();
        assert_eq!(table.lookup(0, Difficulty::Oni, 5), None);
        assert_eq!(table.lookup(3, Difficulty::Oni, 5), None);
        assert_eq!(table.lookup(2501, Difficulty::Oni, 5), None);
        // Column missing from the table
        assert_eq!(table.lookup(1, Difficulty::Hard, 5), None);
        // Stars outside 1..=10
        assert_eq!(table.lookup(1, Difficulty::Oni, 0), None);
    }

    #[test]
    fn test_malformed_row() {
        let err = HpTable::parse_csv("good_Oni-17,ok_Oni-17\n1,x\n").unwrap_err();
        assert!(matches!(err, Error::HpTable(_)));
        let err = HpTable::parse_csv("good_Oni-17,ok_Oni-17\n1\n").unwrap_err();
        assert!(matches!(err, Error::HpTable(_)));
    }

    #[test]
    fn test_empty_table() {
        let table = HpTable::parse_csv("").unwrap();
        assert!(table.is_empty());
        assert_eq!(table.lookup(1, Difficulty::Oni, 5), None);
    }
}
