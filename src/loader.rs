use anyhow::{Context, Result};
use csv::ReaderBuilder;
use log::{info, warn};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;

use crate::types::{
    loose_str, loose_text, Loose, RawShare, RawTransaction, RawUser, ShareEntry, ShareKind,
    TransactionRecord, UserRecord,
};
use crate::util::{parse_date_safe, parse_datetime_safe, parse_f64_safe};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
}

pub fn load_users(path: &Path) -> Result<(Vec<UserRecord>, LoadReport)> {
    let (rows, report) = read_rows::<RawUser>(path)?;
    Ok((rows.into_iter().map(clean_user).collect(), report))
}

pub fn load_transactions(path: &Path) -> Result<(Vec<TransactionRecord>, LoadReport)> {
    let (rows, report) = read_rows::<RawTransaction>(path)?;
    Ok((rows.into_iter().map(clean_transaction).collect(), report))
}

pub fn load_shares(path: &Path) -> Result<(Vec<ShareEntry>, LoadReport)> {
    let (rows, report) = read_rows::<RawShare>(path)?;
    Ok((rows.into_iter().map(clean_share).collect(), report))
}

/// Read `path` as CSV (by extension) or as a JSON array. A JSON object with a
/// `data` array, as the API wraps its list responses, is accepted too.
/// Records that are not objects are counted and skipped.
fn read_rows<R: DeserializeOwned>(path: &Path) -> Result<(Vec<R>, LoadReport)> {
    let is_csv = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"));

    let mut report = LoadReport::default();
    let items = if is_csv {
        csv_items(path, &mut report)?
    } else {
        json_items(path)?
    };

    let mut rows = Vec::with_capacity(items.len());
    for (idx, item) in items.into_iter().enumerate() {
        report.total_rows += 1;
        match serde_json::from_value::<R>(item) {
            Ok(r) => rows.push(r),
            Err(e) => {
                warn!("{}: skipping record {}: {}", path.display(), idx + 1, e);
                report.parse_errors += 1;
            }
        }
    }

    info!(
        "{}: {} rows read, {} skipped",
        path.display(),
        report.total_rows,
        report.parse_errors
    );
    Ok((rows, report))
}

/// CSV rows as JSON objects of strings keyed by header, so a cell such as
/// `007` stays text. Empty cells are left out and read as missing.
fn csv_items(path: &Path, report: &mut LoadReport) -> Result<Vec<Value>> {
    let mut rdr = ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;
    let headers = rdr
        .headers()
        .with_context(|| format!("Failed to read the header row of {}", path.display()))?
        .clone();

    let mut items = Vec::new();
    for (idx, result) in rdr.records().enumerate() {
        match result {
            Ok(record) => {
                let object: Map<String, Value> = headers
                    .iter()
                    .zip(record.iter())
                    .filter(|(_, cell)| !cell.is_empty())
                    .map(|(key, cell)| (key.to_string(), Value::String(cell.to_string())))
                    .collect();
                items.push(Value::Object(object));
            }
            Err(e) => {
                warn!("{}: skipping row {}: {}", path.display(), idx + 1, e);
                report.total_rows += 1;
                report.parse_errors += 1;
            }
        }
    }
    Ok(items)
}

fn json_items(path: &Path) -> Result<Vec<Value>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let document: Value = serde_json::from_str(&content)
        .with_context(|| format!("{} is not valid JSON", path.display()))?;
    match document {
        Value::Array(items) => Ok(items),
        Value::Object(mut obj) => match obj.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            _ => anyhow::bail!("{}: expected a JSON array of records", path.display()),
        },
        _ => anyhow::bail!("{}: expected a JSON array of records", path.display()),
    }
}

fn text_or(v: Option<String>, fallback: &str) -> String {
    v.map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| fallback.to_string())
}

fn number(v: &Option<Loose>) -> f64 {
    match v {
        Some(Loose::Int(i)) => *i as f64,
        Some(Loose::Float(f)) if f.is_finite() => *f,
        Some(Loose::Text(s)) => parse_f64_safe(Some(s.as_str())).unwrap_or(0.0),
        _ => 0.0,
    }
}

fn flag(v: &Option<Loose>) -> Option<i64> {
    v.as_ref().and_then(Loose::as_flag)
}

fn clean_user(raw: RawUser) -> UserRecord {
    UserRecord {
        user_id: text_or(loose_text(&raw.user_id), ""),
        username: text_or(loose_text(&raw.username), ""),
        first_name: text_or(loose_text(&raw.first_name), ""),
        last_name: text_or(loose_text(&raw.last_name), ""),
        email: text_or(loose_text(&raw.email), ""),
        user_type: text_or(loose_text(&raw.user_type), "Unknown"),
        region: text_or(loose_text(&raw.region), "Unknown"),
        is_active: flag(&raw.is_active),
        last_login: parse_datetime_safe(loose_str(&raw.last_login)),
        last_token_refresh: parse_datetime_safe(loose_str(&raw.last_token_refresh)),
        date_of_registration: parse_datetime_safe(loose_str(&raw.date_of_registration)),
    }
}

fn clean_transaction(raw: RawTransaction) -> TransactionRecord {
    TransactionRecord {
        region: text_or(loose_text(&raw.region), "Unknown"),
        game_category: text_or(loose_text(&raw.game_category), "Unspecified"),
        draw_date: parse_date_safe(loose_str(&raw.draw_date)),
        draw_order: flag(&raw.draw_order).unwrap_or(0),
        total_bettors: number(&raw.total_bettors),
        total_bets: number(&raw.total_bets),
        total_winners: number(&raw.total_winners),
        total_winnings: number(&raw.total_winnings),
    }
}

fn clean_share(raw: RawShare) -> ShareEntry {
    ShareEntry {
        title: text_or(loose_text(&raw.title), ""),
        percentage: number(&raw.percentage),
        amount: number(&raw.amount),
        kind: ShareKind::parse(&loose_text(&raw.share_type).unwrap_or_default()),
        operation_date: parse_date_safe(loose_str(&raw.operation_date)),
    }
}
