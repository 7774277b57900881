//! AAC / PCSO share breakdowns.
//!
//! A breakdown selects percentage-style entries whose title is accepted and
//! whose operation date falls in one calendar month, then sums them.

use chrono::Datelike;
use serde::Serialize;
use std::collections::BTreeSet;

use crate::types::{ShareEntry, ShareKind};
use crate::util::stable_sum;

#[derive(Debug, Clone)]
pub struct ShareQuery<'a> {
    pub titles: &'a BTreeSet<String>,
    pub year: i32,
    pub month: u32,
}

impl ShareQuery<'_> {
    fn accepts(&self, entry: &ShareEntry) -> bool {
        if entry.kind != ShareKind::Percentage || !self.titles.contains(&entry.title) {
            return false;
        }
        // An entry without a usable date is never counted.
        matches!(entry.operation_date, Some(d) if d.year() == self.year && d.month() == self.month)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ShareBreakdown {
    pub total_percentage: f64,
    pub total_amount: f64,
    pub entries: Vec<ShareEntry>,
}

impl ShareBreakdown {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn share_breakdown(entries: &[ShareEntry], query: &ShareQuery<'_>) -> ShareBreakdown {
    let selected: Vec<ShareEntry> = entries.iter().filter(|e| query.accepts(e)).cloned().collect();
    let total_percentage = stable_sum(selected.iter().map(|e| e.percentage).collect());
    let total_amount = stable_sum(selected.iter().map(|e| e.amount).collect());
    ShareBreakdown {
        total_percentage,
        total_amount,
        entries: selected,
    }
}

/// Just the `(percentage, amount)` sums of [`share_breakdown`].
pub fn share_totals(entries: &[ShareEntry], query: &ShareQuery<'_>) -> (f64, f64) {
    let breakdown = share_breakdown(entries, query);
    (breakdown.total_percentage, breakdown.total_amount)
}

/// One breakdown per month of `year`, January first. Months without any
/// selected entry are present with zero totals.
pub fn yearly_breakdown(
    entries: &[ShareEntry],
    titles: &BTreeSet<String>,
    year: i32,
) -> Vec<(u32, ShareBreakdown)> {
    (1..=12)
        .map(|month| {
            let query = ShareQuery {
                titles,
                year,
                month,
            };
            (month, share_breakdown(entries, &query))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(
        title: &str,
        kind: ShareKind,
        date: Option<(i32, u32, u32)>,
        pct: f64,
        amount: f64,
    ) -> ShareEntry {
        ShareEntry {
            title: title.to_string(),
            percentage: pct,
            amount,
            kind,
            operation_date: date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d)),
        }
    }

    fn titles(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|t| t.to_string()).collect()
    }

    fn sample() -> Vec<ShareEntry> {
        vec![
            entry("AAC", ShareKind::Percentage, Some((2024, 3, 1)), 12.5, 1250.0),
            entry("PCSO Share", ShareKind::Percentage, Some((2024, 3, 31)), 30.0, 3000.0),
            entry("AAC", ShareKind::Fixed, Some((2024, 3, 5)), 99.0, 9900.0),
            entry("Charity", ShareKind::Percentage, Some((2024, 3, 5)), 5.0, 500.0),
            entry("AAC", ShareKind::Percentage, Some((2024, 4, 1)), 12.5, 700.0),
            entry("AAC", ShareKind::Percentage, None, 50.0, 5000.0),
            entry("AAC", ShareKind::Percentage, Some((2023, 3, 10)), 10.0, 100.0),
        ]
    }

    #[test]
    fn test_breakdown_selects_title_type_and_month() {
        let accepted = titles(&["AAC", "PCSO Share"]);
        let query = ShareQuery {
            titles: &accepted,
            year: 2024,
            month: 3,
        };
        let result = share_breakdown(&sample(), &query);
        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.total_percentage, 42.5);
        assert_eq!(result.total_amount, 4250.0);
        assert_eq!(share_totals(&sample(), &query), (42.5, 4250.0));
    }

    #[test]
    fn test_no_matches_is_exactly_zero_and_empty() {
        let accepted = titles(&["Nonexistent"]);
        let query = ShareQuery {
            titles: &accepted,
            year: 2024,
            month: 3,
        };
        let result = share_breakdown(&sample(), &query);
        assert!(result.is_empty());
        assert_eq!(result.entries, Vec::<ShareEntry>::new());
        assert_eq!(result.total_percentage.to_bits(), 0.0f64.to_bits());
        assert_eq!(result.total_amount.to_bits(), 0.0f64.to_bits());
    }

    #[test]
    fn test_title_match_is_exact() {
        let accepted = titles(&["aac"]);
        let query = ShareQuery {
            titles: &accepted,
            year: 2024,
            month: 3,
        };
        assert!(share_breakdown(&sample(), &query).is_empty());
    }

    #[test]
    fn test_month_out_of_range_selects_nothing() {
        let accepted = titles(&["AAC"]);
        let query = ShareQuery {
            titles: &accepted,
            year: 2024,
            month: 13,
        };
        assert!(share_breakdown(&sample(), &query).is_empty());
    }

    #[test]
    fn test_yearly_breakdown_zero_fills_months() {
        let accepted = titles(&["AAC", "PCSO Share"]);
        let months = yearly_breakdown(&sample(), &accepted, 2024);
        assert_eq!(months.len(), 12);
        assert_eq!(months[0].0, 1);
        assert!(months[0].1.is_empty());
        assert_eq!(months[2].1.total_amount, 4250.0);
        assert_eq!(months[3].1.total_amount, 700.0);
        assert_eq!(months[11].1.total_percentage, 0.0);
    }

    #[test]
    fn test_share_kind_parse() {
        assert_eq!(ShareKind::parse(" Percentage "), ShareKind::Percentage);
        assert_eq!(ShareKind::parse("PERCENT"), ShareKind::Percentage);
        assert_eq!(ShareKind::parse("fixed"), ShareKind::Fixed);
        assert_eq!(ShareKind::parse("bonus"), ShareKind::Other("bonus".to_string()));
    }
}
