use crate::schema::{AggregateRow, GroupKey, OrderRecord, PeriodKey};
use crate::utils::round_to;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;

/// Which key records are grouped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    Company,
    Period,
    PeriodCompany,
}

impl GroupBy {
    pub fn key_for(&self, record: &OrderRecord) -> GroupKey {
        match self {
            GroupBy::Company => GroupKey::Company {
                company: record.company.clone(),
            },
            GroupBy::Period => GroupKey::Period {
                period: record.period,
            },
            GroupBy::PeriodCompany => GroupKey::PeriodCompany {
                period: record.period,
                company: record.company.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    pub qr_count: u64,
    pub amount: f64,
}

pub fn totals(records: &[OrderRecord]) -> Totals {
    records.iter().fold(Totals::default(), |acc, r| Totals {
        qr_count: acc.qr_count.saturating_add(r.qr_count),
        amount: acc.amount + r.amount,
    })
}

/// Sums QR counts and amounts per group.
///
/// Company groups are ranked by amount, highest first; equal amounts keep
/// alphabetical company order. Period groups are chronological, and
/// period-company groups are chronological then alphabetical.
pub fn aggregate_by(records: &[OrderRecord], group_by: GroupBy) -> Vec<AggregateRow> {
    let mut groups: BTreeMap<GroupKey, Totals> = BTreeMap::new();
    for record in records {
        let slot = groups.entry(group_by.key_for(record)).or_default();
        slot.qr_count = slot.qr_count.saturating_add(record.qr_count);
        slot.amount += record.amount;
    }

    let grand_total: f64 = groups.values().map(|t| t.amount).sum();

    let mut rows: Vec<AggregateRow> = groups
        .into_iter()
        .map(|(key, t)| AggregateRow {
            key,
            qr_count: t.qr_count,
            amount: t.amount,
            share: share_of_total(t.amount, grand_total),
        })
        .collect();

    if group_by == GroupBy::Company {
        rows.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    }

    debug!("Aggregated {} records into {} {:?} groups", records.len(), rows.len(), group_by);

    rows
}

/// `value` as a percentage of `total`, rounded to two decimals. Zero when the total is zero.
pub fn share_of_total(value: f64, total: f64) -> f64 {
    if total == 0.0 {
        return 0.0;
    }
    round_to(value / total * 100.0, 2)
}

/// The first `n` rows of a ranking.
pub fn top_n(rows: &[AggregateRow], n: usize) -> &[AggregateRow] {
    &rows[..n.min(rows.len())]
}

/// Percentage change from `previous` to `current`.
///
/// Returns 0 when `previous` is 0, which also covers growth from nothing.
pub fn calculate_variation(current: f64, previous: f64) -> f64 {
    if previous == 0.0 {
        return 0.0;
    }
    (current - previous) / previous * 100.0
}

/// Change between the two most recent buckets (months or years) of a record set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Variation {
    pub current: Option<String>,
    pub previous: Option<String>,
    pub qr_count: f64,
    pub amount: f64,
}

pub fn period_variation(records: &[OrderRecord]) -> Variation {
    variation_between_latest(records, |r| r.period)
}

pub fn year_variation(records: &[OrderRecord]) -> Variation {
    variation_between_latest(records, |r| r.year())
}

fn variation_between_latest<K, F>(records: &[OrderRecord], key: F) -> Variation
where
    K: Ord + Copy + Display,
    F: Fn(&OrderRecord) -> K,
{
    let buckets: BTreeSet<K> = records.iter().map(&key).collect();
    let mut latest = buckets.iter().rev();

    let (current, previous) = match (latest.next(), latest.next()) {
        (Some(current), Some(previous)) => (*current, *previous),
        _ => return Variation::default(),
    };

    let current_totals = totals_where(records, |r| key(r) == current);
    let previous_totals = totals_where(records, |r| key(r) == previous);

    Variation {
        current: Some(current.to_string()),
        previous: Some(previous.to_string()),
        qr_count: calculate_variation(
            current_totals.qr_count as f64,
            previous_totals.qr_count as f64,
        ),
        amount: calculate_variation(current_totals.amount, previous_totals.amount),
    }
}

fn totals_where<P>(records: &[OrderRecord], predicate: P) -> Totals
where
    P: Fn(&OrderRecord) -> bool,
{
    records
        .iter()
        .filter(|r| predicate(r))
        .fold(Totals::default(), |acc, r| Totals {
            qr_count: acc.qr_count.saturating_add(r.qr_count),
            amount: acc.amount + r.amount,
        })
}

/// Filtered amount as a percentage of the whole dataset's amount.
///
/// Zero when the global amount is not positive.
pub fn global_share(filtered_amount: f64, global_amount: f64) -> f64 {
    if global_amount > 0.0 {
        filtered_amount / global_amount * 100.0
    } else {
        0.0
    }
}

/// Monthly amount per company, restricted to `companies`.
pub fn company_trend(records: &[OrderRecord], companies: &[String]) -> Vec<(PeriodKey, String, f64)> {
    aggregate_by(records, GroupBy::PeriodCompany)
        .into_iter()
        .filter_map(|row| match row.key {
            GroupKey::PeriodCompany { period, company } if companies.contains(&company) => {
                Some((period, company, row.amount))
            }
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(y: i32, m: u32, d: u32, company: &str, qr: u64, amount: f64) -> OrderRecord {
        OrderRecord::new(NaiveDate::from_ymd_opt(y, m, d).unwrap(), None, company, qr, amount)
    }

    fn sample_records() -> Vec<OrderRecord> {
        vec![
            record(2023, 12, 3, "B", 4, 80.0),
            record(2024, 1, 10, "A", 5, 100.0),
            record(2024, 1, 15, "C", 2, 40.0),
            record(2024, 2, 5, "B", 15, 300.0),
            record(2024, 2, 9, "A", 1, 50.0),
        ]
    }

    #[test]
    fn test_group_by_company_ranks_by_amount() {
        let rows = aggregate_by(&sample_records(), GroupBy::Company);
        let labels: Vec<String> = rows.iter().map(|r| r.key.label()).collect();
        assert_eq!(labels, vec!["B", "A", "C"]);

        assert_eq!(rows[0].qr_count, 19);
        assert!((rows[0].amount - 380.0).abs() < 1e-9);
        assert!((rows[1].amount - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_company_ties_keep_alphabetical_order() {
        let records = vec![
            record(2024, 1, 1, "Zeta", 1, 50.0),
            record(2024, 1, 1, "Alpha", 1, 50.0),
            record(2024, 1, 1, "Mid", 1, 70.0),
        ];
        let rows = aggregate_by(&records, GroupBy::Company);
        let labels: Vec<String> = rows.iter().map(|r| r.key.label()).collect();
        assert_eq!(labels, vec!["Mid", "Alpha", "Zeta"]);
    }

    #[test]
    fn test_group_by_period_is_chronological() {
        let rows = aggregate_by(&sample_records(), GroupBy::Period);
        let labels: Vec<String> = rows.iter().map(|r| r.key.label()).collect();
        assert_eq!(labels, vec!["2023-12", "2024-01", "2024-02"]);
        assert!((rows[1].amount - 140.0).abs() < 1e-9);
        assert_eq!(rows[2].qr_count, 16);
    }

    #[test]
    fn test_group_by_period_company() {
        let rows = aggregate_by(&sample_records(), GroupBy::PeriodCompany);
        let labels: Vec<String> = rows.iter().map(|r| r.key.label()).collect();
        assert_eq!(
            labels,
            vec!["2023-12 B", "2024-01 A", "2024-01 C", "2024-02 A", "2024-02 B"]
        );
    }

    #[test]
    fn test_amount_is_conserved_across_grouping() {
        let records = sample_records();
        let expected: f64 = records.iter().map(|r| r.amount).sum();

        for group_by in [GroupBy::Company, GroupBy::Period, GroupBy::PeriodCompany] {
            let rows = aggregate_by(&records, group_by);
            let total: f64 = rows.iter().map(|r| r.amount).sum();
            assert!((total - expected).abs() < 1e-6, "{:?} lost amount", group_by);
        }
    }

    #[test]
    fn test_shares_sum_to_hundred() {
        let records = vec![
            record(2024, 1, 1, "A", 1, 1.0),
            record(2024, 1, 1, "B", 1, 1.0),
            record(2024, 1, 1, "C", 1, 1.0),
        ];
        let rows = aggregate_by(&records, GroupBy::Company);
        let total: f64 = rows.iter().map(|r| r.share).sum();
        assert!((total - 100.0).abs() <= 0.1);
        assert_eq!(rows[0].share, 33.33);
    }

    #[test]
    fn test_single_group_has_full_share() {
        let rows = aggregate_by(&[record(2024, 1, 10, "A", 5, 100.0)], GroupBy::Company);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].share, 100.0);
    }

    #[test]
    fn test_zero_total_share_is_zero() {
        let rows = aggregate_by(&[record(2024, 1, 10, "A", 5, 0.0)], GroupBy::Company);
        assert_eq!(rows[0].share, 0.0);
    }

    #[test]
    fn test_empty_input_gives_empty_aggregates() {
        assert!(aggregate_by(&[], GroupBy::Company).is_empty());
        assert!(aggregate_by(&[], GroupBy::Period).is_empty());
        assert_eq!(totals(&[]), Totals::default());
        assert_eq!(period_variation(&[]), Variation::default());
        assert_eq!(year_variation(&[]), Variation::default());
    }

    #[test]
    fn test_calculate_variation() {
        assert_eq!(calculate_variation(150.0, 100.0), 50.0);
        assert_eq!(calculate_variation(50.0, 100.0), -50.0);
        assert_eq!(calculate_variation(42.0, 42.0), 0.0);
        assert_eq!(calculate_variation(-7.5, -7.5), 0.0);
        assert_eq!(calculate_variation(10.0, 0.0), 0.0);
        assert_eq!(calculate_variation(0.0, 0.0), 0.0);
    }

    #[test]
    fn test_period_variation_uses_two_latest_periods() {
        let records = vec![
            record(2024, 1, 10, "A", 10, 100.0),
            record(2024, 2, 10, "A", 15, 150.0),
        ];
        let variation = period_variation(&records);
        assert_eq!(variation.current.as_deref(), Some("2024-02"));
        assert_eq!(variation.previous.as_deref(), Some("2024-01"));
        assert!((variation.amount - 50.0).abs() < 1e-9);
        assert!((variation.qr_count - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_period_variation_skips_gaps() {
        let variation = period_variation(&sample_records());
        // Latest two periods present are 2024-02 (350) and 2024-01 (140).
        assert!((variation.amount - 150.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_period_variation_is_zero() {
        let records = vec![record(2024, 1, 10, "A", 10, 100.0), record(2024, 1, 20, "B", 1, 5.0)];
        let variation = period_variation(&records);
        assert_eq!(variation.amount, 0.0);
        assert_eq!(variation.qr_count, 0.0);
        assert!(variation.current.is_none());
    }

    #[test]
    fn test_year_variation() {
        let variation = year_variation(&sample_records());
        assert_eq!(variation.current.as_deref(), Some("2024"));
        assert_eq!(variation.previous.as_deref(), Some("2023"));
        // 2024: 490 vs 2023: 80
        assert!((variation.amount - 512.5).abs() < 1e-9);
    }

    #[test]
    fn test_top_n_truncates() {
        let rows = aggregate_by(&sample_records(), GroupBy::Company);
        assert_eq!(top_n(&rows, 2).len(), 2);
        assert_eq!(top_n(&rows, 2)[0].key.label(), "B");
        assert_eq!(top_n(&rows, 10).len(), 3);
        assert!(top_n(&[], 5).is_empty());
    }

    #[test]
    fn test_huge_qr_counts_saturate_instead_of_overflowing() {
        let records = vec![
            record(2024, 1, 10, "A", u64::MAX, 1.0),
            record(2024, 2, 10, "A", u64::MAX, 1.0),
        ];
        assert_eq!(totals(&records).qr_count, u64::MAX);

        let rows = aggregate_by(&records, GroupBy::Company);
        assert_eq!(rows[0].qr_count, u64::MAX);

        let variation = period_variation(&records);
        assert_eq!(variation.qr_count, 0.0);
    }

    #[test]
    fn test_global_share() {
        assert_eq!(global_share(25.0, 100.0), 25.0);
        assert_eq!(global_share(25.0, 0.0), 0.0);
    }

    #[test]
    fn test_company_trend_filters_companies() {
        let trend = company_trend(&sample_records(), &["A".to_string()]);
        assert_eq!(trend.len(), 2);
        assert!(trend.iter().all(|(_, company, _)| company == "A"));
        assert_eq!(trend[0].0.to_string(), "2024-01");
    }
}
