//! Fumen file reader and parser

use super::header::{Endian, FumenHeader, FUMEN_HEADER_SIZE};
use super::model::{FumenBranch, FumenCourse, FumenMeasure, FumenNote};
use crate::constants::{Branch, NoteType};
use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use log::debug;
use std::fs;
use std::io::Read;
use std::path::Path;

/// Fumen file reader
pub struct FumenReader<'a> {
    data: &'a [u8],
    pos: usize,
    endian: Endian,
    /// Byte order to use instead of detecting it from the header
    forced: Option<Endian>,
}

impl<'a> FumenReader<'a> {
    /// Create a new reader from raw (uncompressed) fumen data
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            endian: Endian::Little,
            forced: None,
        }
    }

    /// Create a reader for data in a known byte order
    pub fn with_endian(data: &'a [u8], endian: Endian) -> Self {
        Self {
            forced: Some(endian),
            ..Self::new(data)
        }
    }

    /// Check if we've reached the end of data
    pub fn is_eof(&self) -> bool {
        self.pos >= self.data.len()
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let end = self.pos + N;
        let bytes = self
            .data
            .get(self.pos..end)
            .ok_or_else(|| Error::FumenParse(format!("Unexpected end of data at byte {}", self.pos)))?;
        let mut out = [0; N];
        out.copy_from_slice(bytes);
        self.pos = end;
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(self.endian.u16_from(self.read_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.endian.i32_from(self.read_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.endian.f32_from(self.read_array()?))
    }

    /// Parse the header and switch to its byte order
    pub fn parse_header(&mut self) -> Result<FumenHeader> {
        let header = match self.forced {
            Some(endian) => FumenHeader::parse_as(self.data, endian)?,
            None => FumenHeader::parse(self.data)?,
        };
        self.endian = header.endian;
        self.pos = FUMEN_HEADER_SIZE;
        Ok(header)
    }

    /// Parse a whole course
    pub fn parse_course(&mut self) -> Result<FumenCourse> {
        let header = self.parse_header()?;
        let count = usize::try_from(header.measure_count).map_err(|_| {
            Error::FumenParse(format!("Invalid measure count {}", header.measure_count))
        })?;

        let mut measures = Vec::with_capacity(count.min(self.data.len() / 64));
        for _ in 0..count {
            measures.push(self.parse_measure()?);
        }
        if !self.is_eof() {
            debug!(
                "Ignoring {} trailing byte(s) after {count} measure(s)",
                self.data.len() - self.position()
            );
        }

        let (score_init, score_diff) = measures
            .iter()
            .flat_map(|m: &FumenMeasure| m.branches.values().flat_map(|b| b.notes.iter()))
            .find(|note| !note.note_type.uses_hits())
            .map_or((0, 0), |note| (note.score_init, note.score_diff));

        Ok(FumenCourse {
            header,
            measures,
            score_init,
            score_diff,
            shinuchi_score: 0,
        })
    }

    fn parse_measure(&mut self) -> Result<FumenMeasure> {
        let mut measure = FumenMeasure::new();
        measure.bpm = self.read_f32()?;
        measure.offset_start = self.read_f32()?;
        measure.offset_end = measure.offset_start;
        measure.gogo = self.read_u8()? != 0;
        measure.barline = self.read_u8()? != 0;
        measure.padding1 = self.read_u16()?;
        for info in measure.branch_info.iter_mut() {
            *info = self.read_i32()?;
        }
        measure.padding2 = self.read_i32()?;

        for branch in Branch::ALL {
            measure.branches[branch] = self.parse_branch()?;
        }
        Ok(measure)
    }

    fn parse_branch(&mut self) -> Result<FumenBranch> {
        let length = self.read_u16()?;
        let padding = self.read_u16()?;
        let speed = self.read_f32()?;
        let mut notes = Vec::with_capacity(length as usize);
        for _ in 0..length {
            notes.push(self.parse_note()?);
        }
        Ok(FumenBranch {
            speed,
            padding,
            notes,
        })
    }

    fn parse_note(&mut self) -> Result<FumenNote> {
        let at = self.pos;
        let code = self.read_i32()?;
        let note_type = u32::try_from(code)
            .ok()
            .and_then(NoteType::from_code)
            .ok_or_else(|| Error::FumenParse(format!("Unknown note type {code:#x} at byte {at}")))?;

        let mut note = FumenNote::new(note_type, self.read_f32()?);
        note.item = self.read_i32()?;
        note.padding = self.read_f32()?;
        let first = self.read_u16()? as i32;
        let second = self.read_u16()? as i32;
        if note_type.uses_hits() {
            note.hits = first;
            note.hits_padding = second;
        } else {
            note.score_init = first;
            note.score_diff = second >> 2;
        }
        note.duration = self.read_f32()?;
        if note_type.has_roll_payload() {
            note.drumroll_bytes = self.read_array()?;
        }
        Ok(note)
    }
}

/// Inflate gzip data, passing anything else through
pub fn decompress(data: Vec<u8>) -> Result<Vec<u8>> {
    if data.starts_with(&[0x1f, 0x8b]) {
        let mut decoder = GzDecoder::new(data.as_slice());
        let mut inflated = Vec::new();
        decoder.read_to_end(&mut inflated)?;
        Ok(inflated)
    } else {
        Ok(data)
    }
}

/// Parse a course from (possibly gzip-compressed) bytes
///
/// With `endian` set to `None` the byte order is detected from the header.
pub fn read_bytes(data: Vec<u8>, endian: Option<Endian>) -> Result<FumenCourse> {
    let data = decompress(data)?;
    let mut reader = match endian {
        Some(endian) => FumenReader::with_endian(&data, endian),
        None => FumenReader::new(&data),
    };
    reader.parse_course()
}

/// Read a (possibly gzip-compressed) fumen file
pub fn read_file(path: &Path, endian: Option<Endian>) -> Result<FumenCourse> {
    read_bytes(fs::read(path)?, endian)
}
