use chrono::{DateTime, Month, NaiveDate, Utc};
use log::{debug, info};
use std::collections::BTreeSet;

use crate::config::ReportContext;
use crate::export::{to_padded_text, Column, Extract};
use crate::region::{aggregate_by_region, Metric};
use crate::shares::{share_breakdown, yearly_breakdown, ShareBreakdown, ShareQuery};
use crate::status::{classify, cutoff, StatusCounts, UserStatus};
use crate::types::{
    DrawSummaryRow, MonthlyShareRow, RegionCategoryRow, RegionStatusRow, RegionSummaryRow,
    ShareEntry, SummaryStats, TransactionRecord, UserRecord,
};
use crate::util::{format_number, stable_sum};

const BETTORS: &str = "Bettors";
const BETS: &str = "Bets";
const WINNERS: &str = "Winners";
const WINNINGS: &str = "Winnings";

fn transaction_metrics<'a>() -> Vec<Metric<'a, TransactionRecord>> {
    vec![
        Metric::new(BETTORS, |t: &TransactionRecord| t.total_bettors),
        Metric::new(BETS, |t: &TransactionRecord| t.total_bets),
        Metric::new(WINNERS, |t: &TransactionRecord| t.total_winners),
        Metric::new(WINNINGS, |t: &TransactionRecord| t.total_winnings),
    ]
}

/// Betting and winning totals for every configured region.
///
/// Returns the rows plus the number of transactions whose region was not
/// recognised.
pub fn regional_summary(
    data: &[TransactionRecord],
    ctx: &ReportContext,
) -> (Vec<RegionSummaryRow>, usize) {
    let metrics = transaction_metrics();
    let agg = aggregate_by_region(data, |t| t.region.as_str(), &ctx.regions, &metrics);
    let rows = agg
        .rows
        .iter()
        .map(|row| RegionSummaryRow {
            region: row.region.clone(),
            total_bettors: format_number(row.get(BETTORS), 0),
            total_bets: format_number(row.get(BETS), 2),
            total_winners: format_number(row.get(WINNERS), 0),
            total_winnings: format_number(row.get(WINNINGS), 2),
        })
        .collect();
    (rows, agg.unmatched)
}

/// Game categories present in `data`, sorted.
pub fn categories_in(data: &[TransactionRecord]) -> Vec<String> {
    data.iter()
        .map(|t| t.game_category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Historical summary by region and game category: one block of region rows
/// per category, blocks in `categories` order.
pub fn region_category_summary(
    data: &[TransactionRecord],
    ctx: &ReportContext,
    categories: &[String],
) -> Vec<RegionCategoryRow> {
    let metrics = transaction_metrics();
    let mut rows = Vec::with_capacity(categories.len() * ctx.regions.len());
    for category in categories {
        let subset: Vec<TransactionRecord> = data
            .iter()
            .filter(|t| &t.game_category == category)
            .cloned()
            .collect();
        let agg = aggregate_by_region(&subset, |t| t.region.as_str(), &ctx.regions, &metrics);
        rows.extend(agg.rows.into_iter().map(|row| RegionCategoryRow {
            game_category: category.clone(),
            total_bets: format_number(row.get(BETS), 2),
            total_winnings: format_number(row.get(WINNINGS), 2),
            region: row.region,
        }));
    }
    rows
}

/// The three daily draws, in schedule order.
const DRAWS: [i64; 3] = [1, 2, 3];

fn draw_label(order: i64) -> &'static str {
    match order {
        1 => "1st Draw",
        2 => "2nd Draw",
        3 => "3rd Draw",
        _ => "Unknown",
    }
}

/// Totals per draw of the day: one row for each of the three draws on every
/// draw date present (or only on `date` when given), zero-filled.
///
/// Returns the rows plus the number of transactions that could not be placed
/// because their draw date or draw order is missing.
pub fn draw_summary(
    data: &[TransactionRecord],
    date: Option<NaiveDate>,
) -> (Vec<DrawSummaryRow>, usize) {
    let in_scope: Vec<&TransactionRecord> = data
        .iter()
        .filter(|t| date.is_none() || t.draw_date == date)
        .collect();
    let dates: BTreeSet<NaiveDate> = match date {
        Some(d) => BTreeSet::from([d]),
        None => in_scope.iter().filter_map(|t| t.draw_date).collect(),
    };
    let unplaced = in_scope
        .iter()
        .filter(|t| t.draw_date.is_none() || !DRAWS.contains(&t.draw_order))
        .count();
    if unplaced > 0 {
        debug!("{} transactions have no usable draw date or draw order", unplaced);
    }

    let mut rows = Vec::with_capacity(dates.len() * DRAWS.len());
    for day in &dates {
        for order in DRAWS {
            let group: Vec<&TransactionRecord> = in_scope
                .iter()
                .copied()
                .filter(|t| t.draw_date == Some(*day) && t.draw_order == order)
                .collect();
            let total = |f: fn(&TransactionRecord) -> f64| {
                stable_sum(group.iter().map(|t| f(t)).filter(|v| v.is_finite()).collect())
            };
            rows.push(DrawSummaryRow {
                draw_date: day.format("%Y-%m-%d").to_string(),
                draw: draw_label(order).to_string(),
                transactions: group.len(),
                total_bettors: format_number(total(|t| t.total_bettors), 0),
                total_bets: format_number(total(|t| t.total_bets), 2),
                total_winners: format_number(total(|t| t.total_winners), 0),
                total_winnings: format_number(total(|t| t.total_winnings), 2),
            });
        }
    }
    (rows, unplaced)
}

/// Overall status tallies plus a per-region breakdown.
pub fn status_report(
    users: &[UserRecord],
    ctx: &ReportContext,
    now: DateTime<Utc>,
) -> (StatusCounts, Vec<RegionStatusRow>) {
    let cut = cutoff(now, ctx.inactive_after_days);
    let statuses: Vec<(&UserRecord, UserStatus)> =
        users.iter().map(|u| (u, classify(u, cut))).collect();

    let metrics: Vec<Metric<'_, (&UserRecord, UserStatus)>> = UserStatus::ALL
        .iter()
        .map(|&status| {
            Metric::new(status.as_str(), move |(_, s): &(&UserRecord, UserStatus)| {
                if *s == status {
                    1.0
                } else {
                    0.0
                }
            })
        })
        .collect();
    let agg = aggregate_by_region(
        &statuses,
        |(u, _)| u.region.as_str(),
        &ctx.regions,
        &metrics,
    );
    if agg.unmatched > 0 {
        info!("{} users have no recognised region", agg.unmatched);
    }

    let mut overall = StatusCounts::default();
    for (_, status) in &statuses {
        overall.add(*status);
    }

    let rows = agg
        .rows
        .iter()
        .map(|row| RegionStatusRow {
            region: row.region.clone(),
            active: row.get(UserStatus::Active.as_str()) as u64,
            inactive: row.get(UserStatus::Inactive.as_str()) as u64,
            suspended: row.get(UserStatus::Suspended.as_str()) as u64,
            new: row.get(UserStatus::New.as_str()) as u64,
        })
        .collect();
    (overall, rows)
}

fn user_columns(cut: DateTime<Utc>) -> Vec<Column> {
    vec![
        Column::new("UserId", "ID"),
        Column::new("Username", "Username"),
        Column::with("", "Name", Extract::With(full_name)),
        Column::new("Email", "Email"),
        Column::new("UserType", "Role"),
        Column::new("Region", "Region"),
        Column::status("Status", cut),
        Column::new("LastLogin", "Last Login"),
    ]
}

fn full_name(record: &serde_json::Value) -> String {
    let part = |key: &str| {
        record
            .get(key)
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .trim()
            .to_string()
    };
    let name = format!("{} {}", part("FirstName"), part("LastName"));
    let name = name.trim();
    if name.is_empty() {
        "N/A".to_string()
    } else {
        name.to_string()
    }
}

/// The user table export, as downloaded from the dashboard's user list.
pub fn user_export(users: &[UserRecord], ctx: &ReportContext, now: DateTime<Utc>) -> String {
    let cut = cutoff(now, ctx.inactive_after_days);
    to_padded_text(users, &user_columns(cut), &format!("{} - Users", ctx.title))
}

/// Breakdown for a single month, exported as padded text.
pub fn share_export(
    breakdown: &ShareBreakdown,
    ctx: &ReportContext,
    year: i32,
    month: u32,
) -> String {
    let columns = [
        Column::new("title", "Title"),
        Column::new("percentage", "Percentage"),
        Column::new("amount", "Amount"),
        Column::new("operation_date", "Operation Date"),
    ];
    let title = format!("{} - Share Breakdown {}", ctx.title, month_label(year, month));
    to_padded_text(&breakdown.entries, &columns, &title)
}

pub fn month_breakdown(
    entries: &[ShareEntry],
    ctx: &ReportContext,
    year: i32,
    month: u32,
) -> ShareBreakdown {
    let query = ShareQuery {
        titles: &ctx.share_titles,
        year,
        month,
    };
    share_breakdown(entries, &query)
}

/// Per-month share totals for `year`, all twelve months present.
pub fn yearly_share_rows(
    entries: &[ShareEntry],
    ctx: &ReportContext,
    year: i32,
) -> Vec<MonthlyShareRow> {
    yearly_breakdown(entries, &ctx.share_titles, year)
        .into_iter()
        .map(|(month, b)| MonthlyShareRow {
            month: month_label(year, month),
            entries: b.entries.len(),
            total_percentage: format_number(b.total_percentage, 2),
            total_amount: format_number(b.total_amount, 2),
        })
        .collect()
}

fn month_label(year: i32, month: u32) -> String {
    u8::try_from(month)
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| format!("{} {}", m.name(), year))
        .unwrap_or_else(|| format!("{}-{:02}", year, month))
}

pub fn generate_summary(
    transactions: &[TransactionRecord],
    users: &[UserRecord],
    ctx: &ReportContext,
) -> SummaryStats {
    let agg = aggregate_by_region(transactions, |t| t.region.as_str(), &ctx.regions, &[]);
    SummaryStats {
        total_transactions: transactions.len(),
        total_users: users.len(),
        total_bets: stable_sum(transactions.iter().map(|t| t.total_bets).collect()),
        total_winnings: stable_sum(transactions.iter().map(|t| t.total_winnings).collect()),
        unmatched_region_rows: agg.unmatched,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;
    use chrono::{Duration, TimeZone};

    fn ctx() -> ReportContext {
        let file = FileConfig::parse(
            "[regions]\n\
             known = [\"I\", \"NCR\", \"CAR\"]\n\
             [shares]\n\
             titles = [\"AAC\", \"PCSO Share\"]",
        )
        .unwrap();
        ReportContext::from_file(&file, None).unwrap()
    }

    fn tx(region: &str, category: &str, bettors: f64, bets: f64) -> TransactionRecord {
        TransactionRecord {
            region: region.to_string(),
            game_category: category.to_string(),
            total_bettors: bettors,
            total_bets: bets,
            ..Default::default()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_regional_summary() {
        let data = vec![
            tx("Region I", "Pares", 5.0, 1000.0),
            tx("NCR", "Pares", 3.0, 2500.5),
            tx("Region XX", "Pares", 1.0, 1.0),
        ];
        let (rows, unmatched) = regional_summary(&data, &ctx());
        let regions: Vec<&str> = rows.iter().map(|r| r.region.as_str()).collect();
        assert_eq!(regions, vec!["I", "NCR", "CAR"]);
        assert_eq!(rows[0].total_bettors, "5");
        assert_eq!(rows[1].total_bets, "2,500.50");
        assert_eq!(rows[2].total_bets, "0.00");
        assert_eq!(unmatched, 1);
    }

    #[test]
    fn test_region_category_summary() {
        let data = vec![
            tx("I", "Swer3", 1.0, 10.0),
            tx("I", "Pares", 1.0, 20.0),
            tx("CAR", "Swer3", 1.0, 5.0),
        ];
        let categories = categories_in(&data);
        assert_eq!(categories, vec!["Pares", "Swer3"]);
        let rows = region_category_summary(&data, &ctx(), &categories);
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].game_category, "Pares");
        assert_eq!(rows[0].total_bets, "20.00");
        assert_eq!(rows[3].game_category, "Swer3");
        assert_eq!(rows[3].total_bets, "10.00");
        assert_eq!(rows[5].region, "CAR");
        assert_eq!(rows[5].total_bets, "5.00");
    }

    fn drawn(date: Option<NaiveDate>, order: i64, bettors: f64, bets: f64) -> TransactionRecord {
        TransactionRecord {
            draw_date: date,
            draw_order: order,
            ..tx("I", "Pares", bettors, bets)
        }
    }

    #[test]
    fn test_draw_summary() {
        let may1 = NaiveDate::from_ymd_opt(2024, 5, 1);
        let may2 = NaiveDate::from_ymd_opt(2024, 5, 2);
        let data = vec![
            drawn(may2, 3, 4.0, 40.0),
            drawn(may1, 1, 5.0, 1000.0),
            drawn(may1, 1, 2.0, 0.5),
            drawn(may1, 3, 1.0, 10.0),
            drawn(may1, 0, 9.0, 9.0),
            drawn(None, 2, 9.0, 9.0),
        ];
        let (rows, unplaced) = draw_summary(&data, None);
        assert_eq!(unplaced, 2);
        assert_eq!(rows.len(), 6);
        let keys: Vec<(&str, &str)> = rows
            .iter()
            .map(|r| (r.draw_date.as_str(), r.draw.as_str()))
            .collect();
        assert_eq!(
            keys,
            vec![
                ("2024-05-01", "1st Draw"),
                ("2024-05-01", "2nd Draw"),
                ("2024-05-01", "3rd Draw"),
                ("2024-05-02", "1st Draw"),
                ("2024-05-02", "2nd Draw"),
                ("2024-05-02", "3rd Draw"),
            ]
        );
        assert_eq!(rows[0].transactions, 2);
        assert_eq!(rows[0].total_bettors, "7");
        assert_eq!(rows[0].total_bets, "1,000.50");
        assert_eq!(rows[1].transactions, 0);
        assert_eq!(rows[1].total_bets, "0.00");
        assert_eq!(rows[5].total_bets, "40.00");

        let (one_day, unplaced) = draw_summary(&data, may2);
        assert_eq!(unplaced, 0);
        assert_eq!(one_day.len(), 3);
        assert_eq!(one_day[2].total_bettors, "4");

        let (empty_day, _) = draw_summary(&[], NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(empty_day.len(), 3);
        assert!(empty_day.iter().all(|r| r.transactions == 0));
    }

    #[test]
    fn test_status_report() {
        let old = now() - Duration::days(8);
        let users = vec![
            UserRecord {
                region: "Region I".into(),
                is_active: Some(0),
                ..Default::default()
            },
            UserRecord {
                region: "I".into(),
                is_active: Some(1),
                last_login: Some(old),
                last_token_refresh: Some(old),
                ..Default::default()
            },
            UserRecord {
                region: "NCR".into(),
                is_active: Some(1),
                ..Default::default()
            },
            UserRecord {
                region: "Mars".into(),
                date_of_registration: Some(now()),
                ..Default::default()
            },
        ];
        let (overall, rows) = status_report(&users, &ctx(), now());
        assert_eq!(overall.total(), 4);
        assert_eq!(overall.new, 1);
        assert_eq!(rows.len(), 3);
        assert_eq!((rows[0].suspended, rows[0].inactive, rows[0].active), (1, 1, 0));
        assert_eq!(rows[1].active, 1);
        assert_eq!(rows[2].active + rows[2].new, 0);
    }

    #[test]
    fn test_user_export_falls_back_to_na_name() {
        let users = vec![UserRecord {
            user_id: "1".into(),
            username: "ana".into(),
            region: "NCR".into(),
            is_active: Some(1),
            ..Default::default()
        }];
        let text = user_export(&users, &ctx(), now());
        let header = "ID Username Name Email Role Region Status Last Login\n";
        assert!(text.starts_with(&format!("Small Town Lottery - Users\n\n{}", header)));
        assert!(text.contains("1  ana      N/A"));
        assert!(text.contains("Active"));
    }

    #[test]
    fn test_yearly_share_rows_and_export() {
        use crate::types::ShareKind;
        let entries = vec![ShareEntry {
            title: "AAC".into(),
            percentage: 12.5,
            amount: 1250.0,
            kind: ShareKind::Percentage,
            operation_date: NaiveDate::from_ymd_opt(2024, 3, 2),
        }];
        let rows = yearly_share_rows(&entries, &ctx(), 2024);
        assert_eq!(rows.len(), 12);
        assert_eq!(rows[0].month, "January 2024");
        assert_eq!(rows[2].total_amount, "1,250.00");
        assert_eq!(rows[3].entries, 0);

        let march = month_breakdown(&entries, &ctx(), 2024, 3);
        let text = share_export(&march, &ctx(), 2024, 3);
        assert!(text.starts_with("Small Town Lottery - Share Breakdown March 2024\n\n"));
        assert!(text.contains("AAC   12.5       1250.0 2024-03-02"));

        let empty = month_breakdown(&entries, &ctx(), 2024, 4);
        assert!(empty.is_empty());
        assert_eq!(share_export(&empty, &ctx(), 2024, 4).lines().count(), 3);
    }

    #[test]
    fn test_summary() {
        let data = vec![
            tx("I", "Pares", 1.0, 10.0),
            tx("Nowhere", "Pares", 1.0, 5.0),
        ];
        let summary = generate_summary(&data, &[], &ctx());
        assert_eq!(summary.total_transactions, 2);
        assert_eq!(summary.total_bets, 15.0);
        assert_eq!(summary.unmatched_region_rows, 1);
        assert_eq!(summary.total_users, 0);
    }
}
