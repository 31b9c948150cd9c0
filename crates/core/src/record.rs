use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::money::Money;
use super::period::MonthPeriod;

/// Column names of the billing export, in file order. The raw header is
/// always replaced by this one.
pub const CANONICAL_HEADER: [&str; 7] = [
    "CREDOR",
    "CAMPANHA",
    "CLIENTE",
    "DATA_CADASTRO",
    "DATA_PAGAMENTO",
    "STATUS_TITULO",
    "VALOR",
];

/// A reconstructed line, every field still raw text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BillingRecord {
    /// Zero-based index of the source line.
    pub line: usize,
    pub creditor: String,
    pub campaign: String,
    pub client: String,
    pub registration_date: String,
    pub payment_date: String,
    pub status: String,
    pub amount: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum TitleStatus {
    #[serde(rename = "Pago")]
    Paid,
    #[default]
    #[serde(rename = "Pendente")]
    Pending,
    #[serde(rename = "Vencido")]
    Overdue,
}

impl TitleStatus {
    pub const ALL: [TitleStatus; 3] = [TitleStatus::Paid, TitleStatus::Pending, TitleStatus::Overdue];

    pub fn label(self) -> &'static str {
        match self {
            TitleStatus::Paid => "Pago",
            TitleStatus::Pending => "Pendente",
            TitleStatus::Overdue => "Vencido",
        }
    }
}

impl fmt::Display for TitleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    pub creditor: String,
    pub campaign: String,
    pub client: String,
    pub registration_date: Option<NaiveDate>,
    pub payment_date: Option<NaiveDate>,
    pub status: TitleStatus,
    pub amount: Money,
}

impl NormalizedRecord {
    /// Month bucket of the registration date; `None` keeps the record out of
    /// the monthly summary.
    pub fn month(&self) -> Option<MonthPeriod> {
        self.registration_date.map(MonthPeriod::from_date)
    }
}

/// ISO date or the empty string, the export form of an optional date.
pub fn format_optional_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_serializes_as_label() {
        assert_eq!(serde_json::to_string(&TitleStatus::Overdue).unwrap(), "\"Vencido\"");
        assert_eq!(TitleStatus::default(), TitleStatus::Pending);
    }

    #[test]
    fn month_requires_registration_date() {
        let mut record = NormalizedRecord {
            creditor: "Acme".to_string(),
            campaign: "Campanha 1".to_string(),
            client: "Cliente 42".to_string(),
            registration_date: NaiveDate::from_ymd_opt(2024, 1, 5),
            payment_date: None,
            status: TitleStatus::Paid,
            amount: Money::from_cents(123_456),
        };
        assert_eq!(record.month().unwrap().to_string(), "2024-01");

        record.registration_date = None;
        assert_eq!(record.month(), None);
    }

    #[test]
    fn optional_date_formatting() {
        assert_eq!(format_optional_date(NaiveDate::from_ymd_opt(2024, 3, 9)), "2024-03-09");
        assert_eq!(format_optional_date(None), "");
    }
}
