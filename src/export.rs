//! Comma-separated export of the journal.
//!
//! Columns are `Date,Mood,Energy,Sleep,Stress,Notes`. Notes are always quoted,
//! with embedded quotes doubled; missing ratings are empty fields.

use chrono::{FixedOffset, NaiveDate};

use crate::models::{Mood, WellnessEntry};

pub const HEADER: [&str; 6] = ["Date", "Mood", "Energy", "Sleep", "Stress", "Notes"];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CsvError {
    #[error("missing or unexpected header")]
    Header,

    #[error("line {line}: {reason}")]
    Row { line: usize, reason: String },

    #[error("unterminated quoted field")]
    UnterminatedQuote,
}

/// One parsed export row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvRow {
    pub date: NaiveDate,
    pub mood: Mood,
    pub energy: Option<i32>,
    pub sleep: Option<i32>,
    pub stress: Option<i32>,
    pub notes: Option<String>,
}

impl CsvRow {
    pub fn from_entry(entry: &WellnessEntry, offset: FixedOffset) -> Self {
        Self {
            date: entry.local_date(offset),
            mood: entry.mood,
            energy: entry.energy,
            sleep: entry.sleep,
            stress: entry.stress,
            notes: entry.notes.clone(),
        }
    }
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn rating(value: Option<i32>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

pub fn to_csv(entries: &[WellnessEntry], offset: FixedOffset) -> String {
    let mut ordered: Vec<&WellnessEntry> = entries.iter().collect();
    ordered.sort_by_key(|e| e.id);

    let mut out = HEADER.join(",");
    out.push('\n');
    for entry in ordered {
        let row = [
            entry.local_date(offset).format("%Y-%m-%d").to_string(),
            entry.mood.label().to_string(),
            rating(entry.energy),
            rating(entry.sleep),
            rating(entry.stress),
            quote(entry.notes.as_deref().unwrap_or("")),
        ];
        out.push_str(&row.join(","));
        out.push('\n');
    }
    out
}

/// Split text into records, honoring quoted fields that contain commas,
/// doubled quotes or line breaks.
fn split_records(text: &str) -> Result<Vec<Vec<String>>, CsvError> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' => in_quotes = true,
            ',' => record.push(std::mem::take(&mut field)),
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                record.push(std::mem::take(&mut field));
                records.push(std::mem::take(&mut record));
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(CsvError::UnterminatedQuote);
    }
    if !field.is_empty() || !record.is_empty() {
        record.push(field);
        records.push(record);
    }
    Ok(records)
}

fn parse_rating(raw: &str, line: usize, column: &str) -> Result<Option<i32>, CsvError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i32>().map(Some).map_err(|_| CsvError::Row {
        line,
        reason: format!("{column} '{raw}' is not a number"),
    })
}

pub fn parse_csv(text: &str) -> Result<Vec<CsvRow>, CsvError> {
    let mut records = split_records(text)?.into_iter();

    match records.next() {
        Some(header) if header.iter().map(String::as_str).eq(HEADER) => {}
        _ => return Err(CsvError::Header),
    }

    records
        .enumerate()
        .map(|(i, record)| {
            let line = i + 2;
            let [date, mood, energy, sleep, stress, notes]: [String; 6] =
                record.try_into().map_err(|r: Vec<String>| CsvError::Row {
                    line,
                    reason: format!("expected 6 fields, found {}", r.len()),
                })?;

            let date = NaiveDate::parse_from_str(&date, "%Y-%m-%d").map_err(|e| CsvError::Row {
                line,
                reason: format!("bad date '{date}': {e}"),
            })?;
            let mood = Mood::from_label(&mood).ok_or_else(|| CsvError::Row {
                line,
                reason: format!("unknown mood '{mood}'"),
            })?;

            Ok(CsvRow {
                date,
                mood,
                energy: parse_rating(&energy, line, "energy")?,
                sleep: parse_rating(&sleep, line, "sleep")?,
                stress: parse_rating(&stress, line, "stress")?,
                notes: Some(notes).filter(|n| !n.is_empty()),
            })
        })
        .collect()
}
