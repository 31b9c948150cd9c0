use std::sync::OnceLock;

use billing_core::{BillingRecord, Money, NormalizationDefaults, NormalizedRecord, TitleStatus};
use chrono::{Datelike, Local, NaiveDate};
use regex::Regex;

use crate::util::title_case;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_digits, r"\d+");
re!(re_trailing_alnum, r"([A-Za-z0-9]+)$");
re!(re_time_suffix,
    r"^(\S+?)(?:[ T]\d{1,2}:\d{2}(?::\d{2}(?:\.\d+)?)?)?$");
re!(re_date_dmy,
    r"^(\d{1,2})[/\-.](\d{1,2})[/\-.](\d{2}|\d{4})$");
re!(re_date_ymd,
    r"^(\d{4})[/\-.](\d{1,2})[/\-.](\d{1,2})$");
re!(re_date_compact,
    r"^(\d{4})(\d{2})(\d{2})$");

/// Status keywords, checked in this order; the first group with a keyword
/// contained in the raw value wins.
const STATUS_KEYWORDS: &[(&[&str], TitleStatus)] = &[
    (&["pago", "paid", "liquidado"], TitleStatus::Paid),
    (&["vencido", "overdue"], TitleStatus::Overdue),
    (&["pendente", "pending"], TitleStatus::Pending),
];

/// Maps raw export fields onto canonical values. Every method is total:
/// blank or unrecognisable input yields the configured default.
#[derive(Debug, Clone, Default)]
pub struct FieldNormalizer {
    defaults: NormalizationDefaults,
}

impl FieldNormalizer {
    pub fn new(defaults: NormalizationDefaults) -> Self {
        Self { defaults }
    }

    pub fn normalize(&self, record: &BillingRecord) -> NormalizedRecord {
        NormalizedRecord {
            creditor: self.creditor(&record.creditor),
            campaign: self.campaign(&record.campaign),
            client: self.client(&record.client),
            registration_date: normalize_date(&record.registration_date),
            payment_date: normalize_date(&record.payment_date),
            status: self.status(&record.status),
            amount: Money::parse(&record.amount),
        }
    }

    pub fn normalize_all(&self, records: &[BillingRecord]) -> Vec<NormalizedRecord> {
        records.iter().map(|r| self.normalize(r)).collect()
    }

    pub fn creditor(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return self.defaults.unknown_creditor.clone();
        }
        title_case(raw)
    }

    /// `"camp 07 verão"` becomes `"Campanha 07"`; text without digits is
    /// title-cased as is.
    pub fn campaign(&self, raw: &str) -> String {
        let raw = raw.trim();
        if raw.is_empty() {
            return self.defaults.default_campaign();
        }
        let lowered = raw.to_lowercase();
        match re_digits().find(&lowered) {
            Some(m) => self.defaults.campaign(m.as_str()),
            None => title_case(&lowered),
        }
    }

    /// Numeric suffixes are kept whole (`"cliente 042"` → `"Cliente 042"`),
    /// anything else collapses to its last character upper-cased
    /// (`"cliente_ab"` → `"Cliente B"`).
    pub fn client(&self, raw: &str) -> String {
        let raw = raw.trim();
        let unprefixed = strip_prefix_ignore_case(raw, &self.defaults.client_label).trim();
        if unprefixed.is_empty() {
            return self.defaults.unknown_client();
        }

        let Some(run) = re_trailing_alnum()
            .captures(unprefixed)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str())
        else {
            return self.defaults.unknown_client();
        };

        if run.bytes().all(|b| b.is_ascii_digit()) {
            return self.defaults.client(run);
        }
        match run.chars().last() {
            Some(last) => self.defaults.client(&last.to_uppercase().to_string()),
            None => self.defaults.unknown_client(),
        }
    }

    pub fn status(&self, raw: &str) -> TitleStatus {
        normalize_status(raw).unwrap_or(self.defaults.default_status)
    }
}

fn strip_prefix_ignore_case<'a>(s: &'a str, prefix: &str) -> &'a str {
    match s.get(..prefix.len()) {
        Some(head) if !prefix.is_empty() && head.eq_ignore_ascii_case(prefix) => &s[prefix.len()..],
        _ => s,
    }
}

/// Keyword match on the lower-cased value; `None` when nothing matches.
pub fn normalize_status(raw: &str) -> Option<TitleStatus> {
    let lowered = raw.trim().to_lowercase();
    if lowered.is_empty() {
        return None;
    }
    STATUS_KEYWORDS
        .iter()
        .find(|(keywords, _)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(_, status)| *status)
}

/// Day-first date parsing. `05/01/2024` is 5 January; a reading that cannot
/// be day-first (`12/25/2024`) falls back to month-first. Year-first and
/// compact `YYYYMMDD` forms are accepted, and a trailing time of day is
/// ignored. Unparseable input yields `None`.
pub fn normalize_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    let date_part = re_time_suffix().captures(raw)?.get(1)?.as_str();

    try_date_ymd(date_part)
        .or_else(|| try_date_dmy(date_part))
        .or_else(|| try_date_compact(date_part))
}

fn try_date_dmy(text: &str) -> Option<NaiveDate> {
    let c = re_date_dmy().captures(text)?;
    let p1: u32 = c.get(1)?.as_str().parse().ok()?;
    let p2: u32 = c.get(2)?.as_str().parse().ok()?;
    let year = expand_year(c.get(3)?.as_str().parse().ok()?);
    NaiveDate::from_ymd_opt(year, p2, p1).or_else(|| NaiveDate::from_ymd_opt(year, p1, p2))
}

fn try_date_ymd(text: &str) -> Option<NaiveDate> {
    let c = re_date_ymd().captures(text)?;
    let y: i32 = c.get(1)?.as_str().parse().ok()?;
    let m: u32 = c.get(2)?.as_str().parse().ok()?;
    let d: u32 = c.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn try_date_compact(text: &str) -> Option<NaiveDate> {
    let c = re_date_compact().captures(text)?;
    let y: i32 = c.get(1)?.as_str().parse().ok()?;
    let m: u32 = c.get(2)?.as_str().parse().ok()?;
    let d: u32 = c.get(3)?.as_str().parse().ok()?;
    NaiveDate::from_ymd_opt(y, m, d)
}

fn expand_year(y: i32) -> i32 {
    if y < 100 {
        expand_year_around(y, Local::now().year())
    } else {
        y
    }
}

/// Two-digit years land within 50 years of `current`: with 2026 as the
/// reference, `99` is 1999 and `24` is 2024.
fn expand_year_around(y: i32, current: i32) -> i32 {
    let year = current - current.rem_euclid(100) + y;
    if year >= current + 50 {
        year - 100
    } else if year < current - 50 {
        year + 100
    } else {
        year
    }
}
