use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::money::Money;
use super::period::MonthPeriod;
use super::record::{NormalizedRecord, TitleStatus};

/// One row of the monthly summary, keyed by (month, creditor, status).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: MonthPeriod,
    pub creditor: String,
    pub status: TitleStatus,
    pub record_count: i64,
    pub total_amount: Money,
    pub average_amount: Money,
}

#[derive(Default)]
struct GroupAccumulator {
    count: i64,
    sum: Money,
}

/// Groups records by registration month, creditor and status.
///
/// Records without a registration date cannot be bucketed and are skipped.
/// Totals and averages are rounded to cents half-to-even; the average is
/// taken over the unrounded amounts. Rows come out in key order, but callers
/// must not rely on it.
pub fn aggregate<'a, I>(records: I) -> Vec<MonthlyAggregate>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut groups: BTreeMap<(MonthPeriod, &'a str, TitleStatus), GroupAccumulator> =
        BTreeMap::new();

    for record in records {
        let Some(month) = record.month() else {
            continue;
        };
        let acc = groups
            .entry((month, record.creditor.as_str(), record.status))
            .or_default();
        acc.count += 1;
        acc.sum = acc.sum + record.amount;
    }

    groups
        .into_iter()
        .map(|((month, creditor, status), acc)| MonthlyAggregate {
            month,
            creditor: creditor.to_string(),
            status,
            record_count: acc.count,
            total_amount: acc.sum.round_cents(),
            average_amount: Money::new(acc.sum.amount() / Decimal::from(acc.count)).round_cents(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::str::FromStr;

    fn record(creditor: &str, status: TitleStatus, date: Option<(i32, u32, u32)>, amount: &str) -> NormalizedRecord {
        NormalizedRecord {
            creditor: creditor.to_string(),
            campaign: "Campanha 1".to_string(),
            client: "Cliente X".to_string(),
            registration_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
            payment_date: None,
            status,
            amount: Money::new(Decimal::from_str(amount).unwrap()),
        }
    }

    fn money(s: &str) -> Money {
        Money::new(Decimal::from_str(s).unwrap())
    }

    #[test]
    fn groups_same_month_creditor_status() {
        let records = vec![
            record("Acme", TitleStatus::Paid, Some((2024, 1, 3)), "100.00"),
            record("Acme", TitleStatus::Paid, Some((2024, 1, 28)), "200.00"),
        ];
        let rows = aggregate(&records);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.month.to_string(), "2024-01");
        assert_eq!(row.creditor, "Acme");
        assert_eq!(row.status, TitleStatus::Paid);
        assert_eq!(row.record_count, 2);
        assert_eq!(row.total_amount, money("300.00"));
        assert_eq!(row.average_amount, money("150.00"));
    }

    #[test]
    fn records_without_registration_date_are_excluded() {
        let records = vec![
            record("Acme", TitleStatus::Paid, Some((2024, 1, 3)), "10.00"),
            record("Acme", TitleStatus::Paid, None, "999.00"),
            record("Beta", TitleStatus::Overdue, None, "5.00"),
        ];
        let rows = aggregate(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record_count, 1);
        assert_eq!(rows[0].total_amount, money("10.00"));
        assert!(rows.iter().all(|r| r.creditor != "Beta"));
    }

    #[test]
    fn splits_by_each_key_component() {
        let records = vec![
            record("Acme", TitleStatus::Paid, Some((2024, 1, 3)), "1"),
            record("Acme", TitleStatus::Pending, Some((2024, 1, 3)), "1"),
            record("Acme", TitleStatus::Paid, Some((2024, 2, 3)), "1"),
            record("Beta", TitleStatus::Paid, Some((2024, 1, 3)), "1"),
        ];
        assert_eq!(aggregate(&records).len(), 4);
    }

    #[test]
    fn average_uses_unrounded_amounts() {
        // Mean of raw amounts is 0.0074 -> 0.01; the rounded total over the
        // count would be 0.005 -> 0.00.
        let records = vec![
            record("Acme", TitleStatus::Paid, Some((2024, 1, 1)), "0.0074"),
            record("Acme", TitleStatus::Paid, Some((2024, 1, 2)), "0.0074"),
        ];
        let row = &aggregate(&records)[0];
        assert_eq!(row.total_amount, money("0.01"));
        assert_eq!(row.average_amount, money("0.01"));
    }

    #[test]
    fn average_times_count_within_rounding_tolerance() {
        let amounts = ["0.01", "3.333", "1234.565", "7.005", "19.99", "0.125", "1000", "2.5"];
        let mut records = Vec::new();
        for (i, amount) in amounts.iter().enumerate() {
            for j in 0..=i {
                let status = TitleStatus::ALL[j % 3];
                records.push(record("Acme", status, Some((2024, (i % 12) as u32 + 1, 1)), amount));
            }
        }

        let tolerance = Decimal::new(1, 2);
        for row in aggregate(&records) {
            let count = Decimal::from(row.record_count);
            let drift = (row.average_amount.amount() * count - row.total_amount.amount()).abs();
            assert!(drift < count * tolerance, "{row:?} drifted by {drift}");
        }
    }

    #[test]
    fn amounts_at_decimal_limit_saturate_the_total() {
        let limit = "79228162514264337593543950335";
        let records = vec![
            record("Acme", TitleStatus::Paid, Some((2024, 1, 1)), limit),
            record("Acme", TitleStatus::Paid, Some((2024, 1, 2)), limit),
        ];
        let rows = aggregate(&records);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].record_count, 2);
        assert_eq!(rows[0].total_amount.amount(), Decimal::MAX);
    }

    #[test]
    fn empty_input_yields_no_rows() {
        assert!(aggregate(&Vec::<NormalizedRecord>::new()).is_empty());
    }
}
