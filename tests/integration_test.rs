//! Integration tests for TJA conversion and Fumen round trips
//!
//! These tests parse TJA source, convert it to Fumen courses and verify the
//! output through the reader and JSON models

use std::fs;
use tempfile::tempdir;
use tja2fumen::constants::NoteType;
use tja2fumen::error::SplitStage;
use tja2fumen::fumen::header::FUMEN_HEADER_SIZE;
use tja2fumen::fumen::{reader, writer, Endian, FumenCourse, FumenHeader, FumenJson};
use tja2fumen::{tja, ConvertOptions, Converter, Error, Warnings};

/// Convert the only course of `src`
fn convert_one(src: &str) -> FumenCourse {
    let converter = Converter::default();
    let mut warnings = Warnings::new(true);
    let song = tja::parse_str(src, &mut warnings).expect("Parse failed");
    let mut courses = converter
        .convert_song(&song, &mut warnings)
        .expect("Conversion failed");
    assert_eq!(courses.len(), 1);
    courses.remove(0).fumen
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-3
}

#[test]
fn test_single_measure_two_dons() {
    let fumen = convert_one("BPM:180\nOFFSET:0\nCOURSE:Oni\n#START\n1100,\n#END\n");
    assert_eq!(fumen.measures.len(), 1);
    assert_eq!(fumen.header.measure_count, 1);

    let measure = &fumen.measures[0];
    assert!(approx(measure.duration, 240000.0 / 180.0));
    let notes = &measure.branches.normal.notes;
    assert_eq!(notes.len(), 2);
    assert!(notes.iter().all(|n| n.note_type == NoteType::Don));
    assert!(approx(notes[0].pos, 0.0));
    assert!(approx(notes[1].pos, measure.duration / 4.0));
}

#[test]
fn test_offset_chain() {
    let fumen = convert_one("BPM:150\nOFFSET:0\n#START\n1,\n1,\n#END\n");
    assert_eq!(fumen.measures.len(), 2);
    assert!(approx(fumen.measures[0].offset_start, -1600.0));
    assert!(approx(fumen.measures[0].offset_end, 0.0));
    assert!(approx(
        fumen.measures[1].offset_start,
        fumen.measures[0].offset_end
    ));
}

#[test]
fn test_balloon_hits_in_order() {
    let fumen = convert_one("BPM:120\nOFFSET:0\nBALLOON:5,10\n#START\n7008,\n7008,\n#END\n");
    let hits: Vec<i32> = fumen
        .measures
        .iter()
        .flat_map(|m| m.branches.normal.notes.iter())
        .filter(|n| n.note_type == NoteType::Balloon)
        .map(|n| n.hits)
        .collect();
    assert_eq!(hits, vec![5, 10]);
}

#[test]
fn test_zero_note_course() {
    let fumen = convert_one("BPM:120\nOFFSET:0\n#START\n0,\n0,\n#END\n");
    assert_eq!(fumen.header.measure_count, 2);
    assert!(fumen
        .measures
        .iter()
        .all(|m| m.branches.values().all(|b| b.notes.is_empty())));
    assert_eq!(fumen.shinuchi_score, 0);

    let bytes = writer::to_bytes(&fumen).unwrap();
    let back = reader::read_bytes(bytes, Some(Endian::Little)).unwrap();
    assert_eq!(back.measures.len(), 2);
}

#[test]
fn test_branch_mismatch_is_fatal() {
    let src = "BPM:120\nOFFSET:0\n#START\n#BRANCHSTART r,1,2\n\
               #N\n11,\n#E\n1\n#BPMCHANGE 240\n1,\n#M\n11,\n#BRANCHEND\n#END\n";
    let converter = Converter::default();
    let mut warnings = Warnings::new(true);
    let song = tja::parse_str(src, &mut warnings).unwrap();
    let err = converter.convert_song(&song, &mut warnings).unwrap_err();
    assert!(matches!(
        err,
        Error::BranchLengthMismatch {
            stage: SplitStage::AfterSplit,
            ..
        }
    ));
}

#[test]
fn test_missing_bpm_is_fatal() {
    let mut warnings = Warnings::new(true);
    let err = tja::parse_str("OFFSET:0\n#START\n1,\n#END\n", &mut warnings).unwrap_err();
    assert!(matches!(err, Error::MissingMetadata { key: "BPM" }));
}

#[test]
fn test_header_round_trip_both_orders() {
    let src = "BPM:120\nOFFSET:-0.5\nCOURSE:Hard\nLEVEL:7\n#START\n1212,\n#GOGOSTART\n3040,\n#END\n";
    for endian in [Endian::Little, Endian::Big] {
        let converter = Converter::new(ConvertOptions {
            silent: true,
            endian,
            alternate_notes: false,
        });
        let mut warnings = converter.warnings();
        let song = tja::parse_str(src, &mut warnings).unwrap();
        let course = converter
            .convert_course(&song.courses["Hard"], &mut warnings)
            .unwrap();

        let bytes = writer::to_bytes(&course).unwrap();
        assert!(bytes.len() > FUMEN_HEADER_SIZE);
        let back = reader::read_bytes(bytes, Some(endian)).unwrap();
        assert_eq!(back.header.endian, endian);
        assert_eq!(back.header, course.header);
        assert_eq!(back.measures.len(), course.measures.len());
        assert!(back.measures[1].gogo);
        let types: Vec<NoteType> = back.measures[1]
            .branches
            .normal
            .notes
            .iter()
            .map(|n| n.note_type)
            .collect();
        assert_eq!(types, vec![NoteType::DonBig, NoteType::KaBig]);
    }
}

#[test]
fn test_detected_order_of_converted_file() {
    let fumen = convert_one("BPM:120\nOFFSET:0\n#START\n1,\n1,\n1,\n#END\n");
    let bytes = writer::to_bytes(&fumen).unwrap();
    // Three measures little-endian: the big-endian reading 0x03000000 is larger
    let detected = FumenHeader::parse(&bytes).unwrap();
    assert_eq!(detected.endian, Endian::Big);
    assert_eq!(detected.measure_count, 0x0300_0000);
    assert_eq!(
        FumenHeader::parse_as(&bytes, Endian::Little).unwrap(),
        fumen.header
    );
}

#[test]
fn test_write_and_read_back_files() {
    let dir = tempdir().unwrap();
    let src_path = dir.path().join("song.tja");
    fs::write(
        &src_path,
        "TITLE:Test\nBPM:140\nOFFSET:0\nCOURSE:Oni\n#START\n1122,\n5008,\n#END\n\
         COURSE:Easy\n#START\n1,\n#END\n",
    )
    .unwrap();

    let converter = Converter::default();
    let mut warnings = converter.warnings();
    let song = tja::parse_file(&src_path, &mut warnings).unwrap();
    let courses = converter.convert_song(&song, &mut warnings).unwrap();
    assert_eq!(courses.len(), 2);

    for (i, course) in courses.iter().enumerate() {
        let gzip = i % 2 == 1;
        let path = dir
            .path()
            .join(tja2fumen::convert::output_file_name("song", &course.id));
        writer::write_file(&course.fumen, &path, gzip).unwrap();

        let raw = fs::read(&path).unwrap();
        assert_eq!(raw.starts_with(&[0x1f, 0x8b]), gzip);

        let back = reader::read_file(&path, Some(course.fumen.header.endian)).unwrap();
        assert_eq!(back.header, course.fumen.header);
        assert_eq!(back.measures.len(), course.fumen.measures.len());
        assert_eq!(back.score_init, course.fumen.score_init);
    }

    assert!(dir.path().join("song_m.bin").exists());
    assert!(dir.path().join("song_e.bin").exists());
}

#[test]
fn test_json_dump() {
    let fumen = convert_one("BPM:120\nOFFSET:0\n#START\n1020,\n#END\n");
    let json = serde_json::to_value(FumenJson::new(&fumen)).unwrap();
    assert_eq!(json["order"], "<");
    assert_eq!(json["note_counts"]["normal"], 2);
    assert_eq!(json["measures"].as_array().unwrap().len(), 1);
}
