use std::fmt;
use std::ops::Add;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn re_non_numeric() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[^\d,.\-]").expect("invalid regex"))
}

fn re_dotted_thousands() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"^\d+\.\d{3}$").expect("invalid regex"))
}

/// Parses a locale-ambiguous amount ("1.234,56", "1,234.56", "R$ 1.200")
/// into an exact decimal. Never fails: anything unparseable becomes zero.
///
/// Separator resolution, in order:
/// 1. both `.` and `,` present: the one appearing first is the thousands
///    separator and is dropped, the other is the decimal point;
/// 2. `digits.ddd` is read as thousands (`"12.500"` is 12500, never 12.5);
/// 3. a lone `,` is the decimal point.
pub fn parse_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
        return Decimal::ZERO;
    }

    let cleaned = re_non_numeric().replace_all(trimmed, "");
    let normalized = match (cleaned.find('.'), cleaned.find(',')) {
        (Some(dot), Some(comma)) if dot < comma => cleaned.replace('.', "").replace(',', "."),
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        _ if re_dotted_thousands().is_match(&cleaned) => cleaned.replace('.', ""),
        (None, Some(_)) => cleaned.replace(',', "."),
        _ => cleaned.into_owned(),
    };

    to_decimal(&normalized).unwrap_or(Decimal::ZERO)
}

/// Accepts the loose float spellings the legacy exports contain (".5", "7.").
fn to_decimal(s: &str) -> Option<Decimal> {
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s),
    };
    if digits.is_empty() || digits.contains('-') {
        return None;
    }
    let digits = match digits.strip_suffix('.') {
        Some(head) if !head.is_empty() && !head.contains('.') => head,
        _ => digits,
    };
    let padded = if digits.starts_with('.') {
        format!("{sign}0{digits}")
    } else {
        format!("{sign}{digits}")
    };
    Decimal::from_str(&padded).ok()
}

/// Renders a value with two decimals, `.` for thousands and `,` for the
/// decimal point: `1234.5` becomes `"1.234,50"`.
pub fn format_brazilian(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    let plain = format!("{:.2}", rounded.abs());
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, c) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(c);
    }

    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    format!("{sign}{grouped},{frac_part}")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    pub fn new(amount: Decimal) -> Self {
        Money(amount)
    }

    pub fn from_cents(cents: i64) -> Self {
        Money(Decimal::new(cents, 2))
    }

    pub fn amount(self) -> Decimal {
        self.0
    }

    /// Lenient parse, see [`parse_amount`].
    pub fn parse(raw: &str) -> Self {
        Money(parse_amount(raw))
    }

    /// Half-to-even rounding to cents.
    pub fn round_cents(self) -> Self {
        Money(self.0.round_dp(2))
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_f64().unwrap_or_default()
    }

    /// Values read back from a REAL column carry binary noise; they are
    /// snapped to cents.
    pub fn from_f64(value: f64) -> Self {
        Money(Decimal::from_f64(value).unwrap_or_default().round_dp(2))
    }

    pub fn to_brazilian(self) -> String {
        format_brazilian(self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R$ {}", format_brazilian(self.0))
    }
}

/// Saturates at the decimal range instead of panicking; [`parse_amount`]
/// accepts values close to that range.
impl Add for Money {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Money(self.0.saturating_add(rhs.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ── parse_amount ──────────────────────────────────────────────────────────

    #[test]
    fn parse_amount_dot_thousands_comma_decimal() {
        assert_eq!(parse_amount("1.234,56"), dec("1234.56"));
        assert_eq!(parse_amount("1.200,50"), dec("1200.50"));
    }

    #[test]
    fn parse_amount_comma_thousands_dot_decimal() {
        assert_eq!(parse_amount("1,234.56"), dec("1234.56"));
        assert_eq!(parse_amount("1,200.50"), dec("1200.50"));
    }

    #[test]
    fn parse_amount_repeated_thousands_separators() {
        assert_eq!(parse_amount("1.234.567,89"), dec("1234567.89"));
        assert_eq!(parse_amount("1,234,567.89"), dec("1234567.89"));
    }

    #[test]
    fn parse_amount_three_decimals_read_as_thousands() {
        assert_eq!(parse_amount("1.200"), dec("1200"));
        assert_eq!(parse_amount("12.500"), dec("12500"));
    }

    #[test]
    fn parse_amount_two_decimals_with_dot() {
        assert_eq!(parse_amount("12.50"), dec("12.50"));
        assert_eq!(parse_amount("1.2345"), dec("1.2345"));
    }

    #[test]
    fn parse_amount_lone_comma_is_decimal() {
        assert_eq!(parse_amount("1000,50"), dec("1000.50"));
        assert_eq!(parse_amount("0,5"), dec("0.5"));
    }

    #[test]
    fn parse_amount_strips_currency_symbols() {
        assert_eq!(parse_amount("R$ 1.234,56"), dec("1234.56"));
        assert_eq!(parse_amount(" $99.99 "), dec("99.99"));
    }

    #[test]
    fn parse_amount_keeps_sign() {
        assert_eq!(parse_amount("-50,00"), dec("-50.00"));
    }

    #[test]
    fn parse_amount_loose_float_spellings() {
        assert_eq!(parse_amount(",5"), dec("0.5"));
        assert_eq!(parse_amount("7,"), dec("7"));
    }

    #[test]
    fn parse_amount_is_total() {
        for raw in ["", "   ", "null", "NULL", "abc", "-", ".", "1.2.3", "--5", "5-3"] {
            assert_eq!(parse_amount(raw), Decimal::ZERO, "input {raw:?}");
        }
    }

    // ── format_brazilian ──────────────────────────────────────────────────────

    #[test]
    fn format_brazilian_groups_thousands() {
        assert_eq!(format_brazilian(dec("1234.5")), "1.234,50");
        assert_eq!(format_brazilian(dec("1234567.891")), "1.234.567,89");
        assert_eq!(format_brazilian(dec("100")), "100,00");
        assert_eq!(format_brazilian(dec("0")), "0,00");
    }

    #[test]
    fn format_brazilian_negative() {
        assert_eq!(format_brazilian(dec("-1234.56")), "-1.234,56");
    }

    #[test]
    fn format_brazilian_reparses_to_same_value() {
        let value = dec("98765.43");
        assert_eq!(parse_amount(&format_brazilian(value)), value);
    }

    // ── Money ─────────────────────────────────────────────────────────────────

    #[test]
    fn money_add_and_rounding() {
        let total = Money::from_cents(10_050) + Money::from_cents(19_950);
        assert_eq!(total, Money::new(dec("300.00")));
        assert_eq!(Money::new(dec("2.345")).round_cents(), Money::new(dec("2.34")));
    }

    #[test]
    fn money_add_saturates_at_decimal_range() {
        let max = Money::parse("79228162514264337593543950335");
        assert_eq!(max.amount(), Decimal::MAX);
        assert_eq!((max + max).amount(), Decimal::MAX);
        assert_eq!((Money::new(Decimal::MIN) + Money::new(Decimal::MIN)).amount(), Decimal::MIN);
    }

    #[test]
    fn money_f64_round_trip_snaps_to_cents() {
        let m = Money::from_f64(1234.56);
        assert_eq!(m.amount(), dec("1234.56"));
        assert!((m.to_f64() - 1234.56).abs() < 1e-9);
    }

    #[test]
    fn money_display() {
        assert_eq!(Money::from_cents(123_456).to_string(), "R$ 1.234,56");
    }
}
