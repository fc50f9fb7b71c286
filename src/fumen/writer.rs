//! Fumen file writer

use super::header::Endian;
use super::model::{FumenCourse, FumenMeasure, FumenNote};
use crate::constants::Branch;
use crate::error::Result;
use log::debug;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Fumen body writer over any byte sink
pub struct FumenWriter<W: Write> {
    out: W,
    endian: Endian,
    /// Bytes written so far
    written: u64,
}

impl<W: Write> FumenWriter<W> {
    pub fn new(out: W, endian: Endian) -> Self {
        Self {
            out,
            endian,
            written: 0,
        }
    }

    /// Write raw bytes
    pub fn write_data(&mut self, data: &[u8]) -> Result<()> {
        self.out.write_all(data)?;
        self.written += data.len() as u64;
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_data(&[value])
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_data(&self.endian.u16_bytes(value))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_data(&self.endian.i32_bytes(value))
    }

    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_data(&self.endian.f32_bytes(value))
    }

    /// Write the header followed by every measure
    pub fn write_course(&mut self, course: &FumenCourse) -> Result<()> {
        self.write_data(&course.header.to_bytes())?;
        for measure in &course.measures {
            self.write_measure(measure)?;
        }
        Ok(())
    }

    fn write_measure(&mut self, measure: &FumenMeasure) -> Result<()> {
        self.write_f32(measure.bpm)?;
        self.write_f32(measure.offset_start)?;
        self.write_u8(measure.gogo as u8)?;
        self.write_u8(measure.barline as u8)?;
        self.write_u16(measure.padding1)?;
        for info in measure.branch_info {
            self.write_i32(info)?;
        }
        self.write_i32(measure.padding2)?;

        for branch in Branch::ALL {
            let branch = &measure.branches[branch];
            self.write_u16(branch.notes.len() as u16)?;
            self.write_u16(branch.padding)?;
            self.write_f32(branch.speed)?;
            for note in &branch.notes {
                self.write_note(note)?;
            }
        }
        Ok(())
    }

    fn write_note(&mut self, note: &FumenNote) -> Result<()> {
        self.write_i32(note.note_type.code() as i32)?;
        self.write_f32(note.pos)?;
        self.write_i32(note.item)?;
        self.write_f32(note.padding)?;
        if note.hits != 0 {
            self.write_u16(clamp_u16(note.hits))?;
            self.write_u16(clamp_u16(note.hits_padding))?;
        } else {
            self.write_u16(clamp_u16(note.score_init))?;
            self.write_u16(clamp_u16(note.score_diff.saturating_mul(4)))?;
        }
        self.write_f32(note.duration)?;
        if note.note_type.has_roll_payload() {
            self.write_data(&note.drumroll_bytes)?;
        }
        Ok(())
    }

    /// Number of bytes written
    pub fn position(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

fn clamp_u16(value: i32) -> u16 {
    value.clamp(0, u16::MAX as i32) as u16
}

/// Serialize a course to bytes in its header's byte order
pub fn to_bytes(course: &FumenCourse) -> Result<Vec<u8>> {
    let mut writer = FumenWriter::new(Vec::new(), course.header.endian);
    writer.write_course(course)?;
    Ok(writer.into_inner())
}

/// Write a course to `path`, gzip-compressed if requested
pub fn write_file(course: &FumenCourse, path: &Path, gzip: bool) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);
    if gzip {
        let mut writer =
            FumenWriter::new(GzEncoder::new(file, Compression::default()), course.header.endian);
        writer.write_course(course)?;
        debug!("Compressing {} byte(s) into {}", writer.position(), path.display());
        writer.into_inner().finish()?.flush()?;
    } else {
        let mut writer = FumenWriter::new(file, course.header.endian);
        writer.write_course(course)?;
        writer.flush()?;
        debug!("Wrote {} byte(s) to {}", writer.position(), path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NoteType;
    use crate::fumen::header::FUMEN_HEADER_SIZE;

    fn course_with(notes: Vec<FumenNote>) -> FumenCourse {
        let mut measure = FumenMeasure::new();
        measure.bpm = 120.0;
        measure.branches.normal.notes = notes;
        let mut course = FumenCourse::default();
        course.header.measure_count = 1;
        course.measures.push(measure);
        course
    }

    #[test]
    fn test_measure_layout() {
        let bytes = to_bytes(&course_with(Vec::new())).unwrap();
        // 40-byte measure record plus three empty 8-byte branch records
        assert_eq!(bytes.len(), FUMEN_HEADER_SIZE + 40 + 3 * 8);
        let m = &bytes[FUMEN_HEADER_SIZE..];
        assert_eq!(&m[0..4], &120.0f32.to_le_bytes());
        assert_eq!(m[9], 1); // barline
        assert_eq!(&m[12..16], &(-1i32).to_le_bytes());
    }

    #[test]
    fn test_position_counts_bytes() {
        let mut writer = FumenWriter::new(Vec::new(), Endian::Little);
        writer.write_course(&course_with(Vec::new())).unwrap();
        assert_eq!(writer.position(), (FUMEN_HEADER_SIZE + 40 + 3 * 8) as u64);
        assert_eq!(writer.into_inner().len(), FUMEN_HEADER_SIZE + 40 + 3 * 8);
    }

    #[test]
    fn test_note_scores_clamped() {
        let mut note = FumenNote::new(NoteType::Don, 0.0);
        note.score_init = 100_000;
        note.score_diff = 20_000;
        let bytes = to_bytes(&course_with(vec![note])).unwrap();
        let n = &bytes[FUMEN_HEADER_SIZE + 40 + 8..];
        assert_eq!(&n[0..4], &1i32.to_le_bytes());
        assert_eq!(&n[16..18], &u16::MAX.to_le_bytes());
        assert_eq!(&n[18..20], &u16::MAX.to_le_bytes());
    }

    #[test]
    fn test_drumroll_payload_and_hits() {
        let roll = FumenNote::new(NoteType::Drumroll, 0.0);
        let mut balloon = FumenNote::new(NoteType::Balloon, 10.0);
        balloon.hits = 7;
        balloon.score_init = 300;
        let bytes = to_bytes(&course_with(vec![roll, balloon])).unwrap();
        assert_eq!(bytes.len(), FUMEN_HEADER_SIZE + 40 + 3 * 8 + (24 + 8) + 24);
        let b = &bytes[FUMEN_HEADER_SIZE + 40 + 8 + 32..];
        assert_eq!(&b[16..18], &7u16.to_le_bytes());
        assert_eq!(&b[18..20], &0u16.to_le_bytes());
    }

    #[test]
    fn test_big_endian_body() {
        let mut course = course_with(Vec::new());
        course.header.endian = Endian::Big;
        let bytes = to_bytes(&course).unwrap();
        assert_eq!(&bytes[FUMEN_HEADER_SIZE..FUMEN_HEADER_SIZE + 4], &120.0f32.to_be_bytes());
        assert_eq!(&bytes[512..516], &1i32.to_be_bytes());
    }
}
