//! Writing ranked matches: CSV `query,match,distance` lines or a JSON array of
//! `[query, match, cosine]` triples.

use std::fmt;
use std::io::Write;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::search::MatchRecord;

/// Fractional digits for distances in CSV output.
pub const DISTANCE_PRECISION: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Csv,
    Json,
}

impl FromStr for OutputFormat {
    type Err = OutputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(OutputError::UnknownFormat(s.to_string())),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Csv => "csv",
            Self::Json => "json",
        })
    }
}

/// One `query_id,matched_id,distance` line per record.
pub fn write_csv<W: Write>(records: &[MatchRecord], mut writer: W) -> Result<(), OutputError> {
    for r in records {
        writeln!(
            writer,
            "{},{},{:.prec$}",
            r.query_id,
            r.matched_id,
            r.distance(),
            prec = DISTANCE_PRECISION
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Pretty JSON array of `[query_id, matched_id, similarity]` triples.
pub fn write_json<W: Write>(records: &[MatchRecord], mut writer: W) -> Result<(), OutputError> {
    let triples: Vec<(&str, &str, f32)> = records
        .iter()
        .map(|r| (r.query_id.as_str(), r.matched_id.as_str(), r.similarity))
        .collect();
    serde_json::to_writer_pretty(&mut writer, &triples)?;
    writeln!(writer)?;
    writer.flush()?;
    Ok(())
}

pub fn write_results<W: Write>(
    records: &[MatchRecord],
    format: OutputFormat,
    writer: W,
) -> Result<(), OutputError> {
    match format {
        OutputFormat::Csv => write_csv(records, writer),
        OutputFormat::Json => write_json(records, writer),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("failed to write results: {0}")]
    Write(#[from] std::io::Error),
    #[error("failed to encode results: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unknown output format: {0:?} (expected csv or json)")]
    UnknownFormat(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn records() -> Vec<MatchRecord> {
        vec![
            MatchRecord {
                query_id: "duyên".into(),
                matched_id: "fate".into(),
                similarity: 0.25,
            },
            MatchRecord {
                query_id: "phở".into(),
                matched_id: "soup".into(),
                similarity: 1.0,
            },
        ]
    }

    #[test]
    fn csv_has_six_digit_distances() {
        let mut out = Vec::new();
        write_csv(&records(), &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "duyên,fate,0.750000\nphở,soup,0.000000\n"
        );
    }

    #[test]
    fn json_is_array_of_triples() {
        let mut out = Vec::new();
        write_results(&records(), OutputFormat::Json, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("duyên"));
        let parsed: Vec<(String, String, f32)> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0], ("duyên".to_string(), "fate".to_string(), 0.25));
        assert_eq!(parsed[1].2, 1.0);
    }

    #[test]
    fn format_parsing() {
        assert_eq!("CSV".parse::<OutputFormat>().unwrap(), OutputFormat::Csv);
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert!("xml".parse::<OutputFormat>().is_err());
        assert_eq!(OutputFormat::Json.to_string(), "json");
    }
}
