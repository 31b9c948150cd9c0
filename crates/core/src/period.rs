use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PeriodError {
    #[error("Invalid month period '{0}', expected YYYY-MM")]
    InvalidFormat(String),
    #[error("Month out of range in '{0}'")]
    MonthOutOfRange(String),
}

/// Calendar month bucket, rendered `YYYY-MM`. Ordering matches the textual
/// ordering of the rendered form for four-digit years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthPeriod {
    year: i32,
    month: u32,
}

impl MonthPeriod {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(MonthPeriod { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        MonthPeriod {
            year: date.year(),
            month: date.month(),
        }
    }

}

impl fmt::Display for MonthPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthPeriod {
    type Err = PeriodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        let well_formed = bytes.len() == 7
            && bytes[4] == b'-'
            && bytes[..4].iter().all(u8::is_ascii_digit)
            && bytes[5..].iter().all(u8::is_ascii_digit);
        if !well_formed {
            return Err(PeriodError::InvalidFormat(s.to_string()));
        }

        let year: i32 = s[..4]
            .parse()
            .map_err(|_| PeriodError::InvalidFormat(s.to_string()))?;
        let month: u32 = s[5..]
            .parse()
            .map_err(|_| PeriodError::InvalidFormat(s.to_string()))?;
        MonthPeriod::new(year, month).ok_or_else(|| PeriodError::MonthOutOfRange(s.to_string()))
    }
}

impl From<MonthPeriod> for String {
    fn from(period: MonthPeriod) -> Self {
        period.to_string()
    }
}

impl TryFrom<String> for MonthPeriod {
    type Error = PeriodError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn from_date_truncates_to_month() {
        let p = MonthPeriod::from_date(date(2024, 1, 31));
        assert_eq!(p.to_string(), "2024-01");
    }

    #[test]
    fn parse_round_trips() {
        let p: MonthPeriod = "2023-11".parse().unwrap();
        assert_eq!(p, MonthPeriod::new(2023, 11).unwrap());
        assert_eq!(p.to_string(), "2023-11");
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["2024-1", "2024/01", "24-01", "2024-01-05", "abcd-ef", ""] {
            assert!(
                matches!(bad.parse::<MonthPeriod>(), Err(PeriodError::InvalidFormat(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn parse_rejects_month_out_of_range() {
        assert!(matches!(
            "2024-13".parse::<MonthPeriod>(),
            Err(PeriodError::MonthOutOfRange(_))
        ));
        assert!(matches!(
            "2024-00".parse::<MonthPeriod>(),
            Err(PeriodError::MonthOutOfRange(_))
        ));
    }

    #[test]
    fn ordering_is_chronological() {
        let dec = MonthPeriod::new(2023, 12).unwrap();
        let jan = MonthPeriod::new(2024, 1).unwrap();
        assert!(dec < jan);
        assert!(dec.to_string() < jan.to_string());
    }

    #[test]
    fn serializes_as_text() {
        let p = MonthPeriod::new(2024, 5).unwrap();
        assert_eq!(serde_json::to_string(&p).unwrap(), "\"2024-05\"");
        let back: MonthPeriod = serde_json::from_str("\"2024-05\"").unwrap();
        assert_eq!(back, p);
    }
}
