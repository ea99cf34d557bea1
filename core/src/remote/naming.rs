//! Grape file naming convention.
//!
//! Names are underscore-delimited: token 0 carries the date before a `T`
//! separator, token 1 is the node id and the last token carries the
//! frequency, e.g. `2021-10-28T000000Z_N0000020_G1_FN42hn_FRQ_WWV10.csv` or
//! `2021-10-28T000000Z_NODE1_FRQ10p0CHU.csv`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const EXTENSION: &str = ".csv";
pub const REQUIRED_TOKENS: [&str; 2] = ["FRQ", "T000000Z"];
/// Tags stripped from the frequency token before it is parsed.
pub const FREQUENCY_TAGS: [&str; 3] = ["FRQ", "WWV", "CHU"];
pub const DECIMAL_MARKER: char = 'p';

/// Metadata embedded in one remote filename.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteFileRecord {
    pub node_id: String,
    pub frequency_mhz: f64,
    pub filename: String,
    pub file_date: NaiveDate,
}

/// Why a filename was left out of the candidate set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameRejection {
    Convention,
    Date(String),
    Frequency(String),
}

impl fmt::Display for NameRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameRejection::Convention => write!(f, "does not follow the naming convention"),
            NameRejection::Date(token) => write!(f, "unparseable date token {:?}", token),
            NameRejection::Frequency(token) => write!(f, "non-numeric frequency token {:?}", token),
        }
    }
}

/// True when the name carries every required token and the data extension.
pub fn matches_convention(filename: &str) -> bool {
    filename.ends_with(EXTENSION) && REQUIRED_TOKENS.iter().all(|token| filename.contains(token))
}

impl RemoteFileRecord {
    pub fn parse(filename: &str) -> Result<Self, NameRejection> {
        if !matches_convention(filename) {
            return Err(NameRejection::Convention);
        }
        let tokens: Vec<&str> = filename.split('_').collect();
        if tokens.len() < 3 {
            return Err(NameRejection::Convention);
        }

        let date_token = tokens[0].split('T').next().unwrap_or_default();
        let file_date = NaiveDate::parse_from_str(date_token, "%Y-%m-%d")
            .map_err(|_| NameRejection::Date(date_token.to_string()))?;

        let frequency_token = tokens[tokens.len() - 1];
        let frequency_mhz = normalize_frequency(frequency_token)
            .ok_or_else(|| NameRejection::Frequency(frequency_token.to_string()))?;

        Ok(Self {
            node_id: tokens[1].to_string(),
            frequency_mhz,
            filename: filename.to_string(),
            file_date,
        })
    }

    pub fn matches_frequency(&self, frequency_mhz: f64) -> bool {
        (self.frequency_mhz - frequency_mhz).abs() < 1e-6
    }
}

/// Strips extension and station tags, applies the decimal marker and parses
/// the remainder; anything but digits with at most one point is rejected.
pub fn normalize_frequency(token: &str) -> Option<f64> {
    let mut value = token.trim_end_matches(EXTENSION).to_string();
    for tag in FREQUENCY_TAGS {
        value = value.replace(tag, "");
    }
    let value = value.replace(DECIMAL_MARKER, ".");

    let digits = value.chars().filter(|c| c.is_ascii_digit()).count();
    let points = value.chars().filter(|&c| c == '.').count();
    if digits == 0 || points > 1 || digits + points != value.len() {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_decimal_marker_and_station_suffix() {
        let record = RemoteFileRecord::parse("2021-10-28T000000Z_NODE1_FRQ10p0CHU.csv").unwrap();
        assert_eq!(record.node_id, "NODE1");
        assert_eq!(record.frequency_mhz, 10.0);
        assert_eq!(record.file_date, NaiveDate::from_ymd_opt(2021, 10, 28).unwrap());
    }

    #[test]
    fn parses_long_form_grape_names() {
        let record =
            RemoteFileRecord::parse("2021-10-28T000000Z_N0000020_G1_FN42hn_FRQ_WWV2p5.csv").unwrap();
        assert_eq!(record.node_id, "N0000020");
        assert_eq!(record.frequency_mhz, 2.5);
    }

    #[test]
    fn rejects_names_outside_convention() {
        assert_eq!(
            RemoteFileRecord::parse("2021-10-28T000000Z_NODE1_FRQ10.txt"),
            Err(NameRejection::Convention)
        );
        assert_eq!(
            RemoteFileRecord::parse("2021-10-28T120000Z_NODE1_FRQ10.csv"),
            Err(NameRejection::Convention)
        );
        assert_eq!(
            RemoteFileRecord::parse("README_FRQ_T000000Z.csv"),
            Err(NameRejection::Date("README".into()))
        );
    }

    #[test]
    fn rejects_non_numeric_frequency() {
        assert!(matches!(
            RemoteFileRecord::parse("2021-10-28T000000Z_NODE1_FRQ10MHz.csv"),
            Err(NameRejection::Frequency(_))
        ));
        assert_eq!(normalize_frequency("FRQ1p2p3.csv"), None);
        assert_eq!(normalize_frequency("FRQ.csv"), None);
        assert_eq!(normalize_frequency("WWV5.csv"), Some(5.0));
    }
}
