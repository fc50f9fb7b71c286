//! Line splitting and song-level metadata

use super::model::{LocalizedText, Metadata};
use crate::error::{Error, Result};
use crate::warning::{Warning, Warnings};

/// Strip comments and blank lines
pub fn clean_lines(src: &str) -> Vec<String> {
    let src = src.trim_start_matches('\u{FEFF}');
    src.lines()
        .filter_map(|line| {
            let code = line.split("//").next().unwrap_or("").trim();
            if code.is_empty() {
                None
            } else {
                Some(code.to_string())
            }
        })
        .collect()
}

/// Split a `KEY:VALUE` line; the key is upper-cased and the value trimmed
pub fn parse_key_value(line: &str) -> Option<(String, String)> {
    let (key, value) = line.split_once(':')?;
    if key.is_empty() || !key.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some((key.to_ascii_uppercase(), value.trim().to_string()))
}

/// Split a `#COMMAND [args]` line; the command is upper-cased
pub fn parse_command(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix('#')?;
    let end = rest
        .find(|c: char| !c.is_ascii_alphanumeric())
        .unwrap_or(rest.len());
    if end == 0 {
        return None;
    }
    let (name, tail) = rest.split_at(end);
    let value = if tail.starts_with(char::is_whitespace) {
        tail.trim()
    } else {
        ""
    };
    Some((name.to_ascii_uppercase(), value.to_string()))
}

/// Find the mandatory song-level BPM and OFFSET
pub fn required_metadata(lines: &[String]) -> Result<(f32, f32)> {
    let find = |key: &'static str| -> Result<f32> {
        let value = lines
            .iter()
            .filter_map(|line| parse_key_value(line))
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
            .ok_or(Error::MissingMetadata { key })?;
        value.parse().map_err(|_| Error::InvalidHeaderValue {
            key: key.to_string(),
            value,
        })
    };
    Ok((find("BPM")?, find("OFFSET")?))
}

const TITLE_KEYS: [&str; 6] = ["TITLE", "TITLEJA", "TITLEEN", "TITLECN", "TITLETW", "TITLEKO"];

/// Gather descriptive metadata from header lines
pub fn parse_metadata(lines: &[String], warnings: &mut Warnings) -> Metadata {
    let mut metadata = Metadata::default();
    let mut titles: Vec<(usize, String)> = Vec::new();
    let mut subtitles: Vec<(usize, String)> = Vec::new();

    for (key, value) in lines.iter().filter_map(|line| parse_key_value(line)) {
        if let Some(lang) = TITLE_KEYS.iter().position(|k| *k == key) {
            let text = tagged(lang, &value);
            set_lang(&mut metadata.title, lang, text.clone());
            titles.push((lang, text));
            continue;
        }
        if let Some(lang) = key
            .strip_prefix("SUB")
            .and_then(|k| TITLE_KEYS.iter().position(|t| *t == k))
        {
            let text = tagged(lang, value.trim_start_matches(['-', '+']));
            set_lang(&mut metadata.subtitle, lang, text.clone());
            subtitles.push((lang, text));
            continue;
        }
        match key.as_str() {
            "MAKER" => metadata.maker = value,
            "GENRE" => metadata.genre = value,
            "WAVE" => metadata.wave = value,
            "DEMOSTART" if !value.is_empty() => match value.parse() {
                Ok(secs) => metadata.demo_start = secs,
                Err(_) => warnings.push(Warning::InvalidDemoStart { value }),
            },
            _ => {}
        }
    }

    backfill(&mut metadata.title, &titles);
    backfill(&mut metadata.subtitle, &subtitles);
    metadata
}

fn tagged(lang: usize, value: &str) -> String {
    let font = match lang {
        0 => detect_font(value),
        1 => "jp",
        2 => "efigs",
        3 => "cn",
        4 => "tw",
        _ => "ko",
    };
    format!("<font={font}>{value}")
}

/// Pick a font family from the script used in `text`
fn detect_font(text: &str) -> &'static str {
    let has = |pred: fn(char) -> bool| text.chars().any(pred);
    if has(|c| {
        matches!(c,
            '\u{3041}'..='\u{3094}' | '\u{30A1}'..='\u{30F4}' | 'ー'
            | 'ａ'..='ｚ' | 'Ａ'..='Ｚ' | '０'..='９'
            | '々' | '〆' | '〤' | 'ヶ')
    }) {
        "jp"
    } else if has(|c| {
        matches!(c, '\u{1100}'..='\u{11FF}' | '\u{3130}'..='\u{318F}' | '\u{AC00}'..='\u{D7AF}')
    }) {
        "ko"
    } else if has(|c| matches!(c, '\u{4E00}'..='\u{9FFF}')) {
        "cn"
    } else {
        "efigs"
    }
}

fn set_lang(text: &mut LocalizedText, lang: usize, value: String) {
    match lang {
        0 => text.default = value,
        1 => text.ja = value,
        2 => text.en = value,
        3 => text.cn = value,
        4 => text.tw = value,
        _ => text.ko = value,
    }
}

/// Fill empty variants from the first non-blank one in key order
fn backfill(text: &mut LocalizedText, available: &[(usize, String)]) {
    let mut latest: [Option<&String>; 6] = [None; 6];
    for (lang, value) in available {
        latest[*lang] = Some(value);
    }
    let common = latest
        .iter()
        .flatten()
        .find(|v| !v.trim().is_empty())
        .map(|v| v.to_string())
        .unwrap_or_default();
    for slot in [
        &mut text.default,
        &mut text.ja,
        &mut text.en,
        &mut text.cn,
        &mut text.tw,
        &mut text.ko,
    ] {
        if slot.is_empty() {
            *slot = common.clone();
        }
    }
}
