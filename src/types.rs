use chrono::{DateTime, NaiveDate, Utc};
use serde::de::IgnoredAny;
use serde::{Deserialize, Serialize};
use tabled::Tabled;

use crate::util::parse_i64_safe;

/// A field as the API (or a spreadsheet export of it) hands it over: the
/// same field may arrive as a number in one row and a string in the next.
/// Arrays and objects land in `Other` so one odd field never costs the row.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Other(IgnoredAny),
}

impl Loose {
    /// Scalars as text; `None` for anything structured.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Loose::Bool(b) => Some(b.to_string()),
            Loose::Int(i) => Some(i.to_string()),
            Loose::Float(f) => Some(f.to_string()),
            Loose::Text(s) => Some(s.clone()),
            Loose::Other(_) => None,
        }
    }

    /// Only string values; timestamps and dates are never read from numbers.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Loose::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// A 0/1 style flag. Booleans, integers, whole floats and their text
    /// forms count; a fractional value such as `0.5` does not.
    pub fn as_flag(&self) -> Option<i64> {
        match self {
            Loose::Bool(b) => Some(i64::from(*b)),
            Loose::Int(i) => Some(*i),
            Loose::Float(f) if f.fract() == 0.0 => Some(*f as i64),
            Loose::Text(s) => match s.trim().to_ascii_lowercase().as_str() {
                "true" => Some(1),
                "false" => Some(0),
                other => parse_i64_safe(Some(other)),
            },
            _ => None,
        }
    }
}

pub fn loose_text(v: &Option<Loose>) -> Option<String> {
    v.as_ref().and_then(Loose::to_text)
}

pub fn loose_str(v: &Option<Loose>) -> Option<&str> {
    v.as_ref().and_then(Loose::as_str)
}

#[derive(Debug, Deserialize)]
pub struct RawUser {
    #[serde(rename = "UserId", alias = "Id", default)]
    pub user_id: Option<Loose>,
    #[serde(rename = "Username", default)]
    pub username: Option<Loose>,
    #[serde(rename = "FirstName", default)]
    pub first_name: Option<Loose>,
    #[serde(rename = "LastName", default)]
    pub last_name: Option<Loose>,
    #[serde(rename = "Email", default)]
    pub email: Option<Loose>,
    #[serde(rename = "UserType", alias = "Role", default)]
    pub user_type: Option<Loose>,
    #[serde(rename = "Region", default)]
    pub region: Option<Loose>,
    #[serde(rename = "IsActive", default)]
    pub is_active: Option<Loose>,
    #[serde(rename = "LastLogin", default)]
    pub last_login: Option<Loose>,
    #[serde(rename = "LastTokenRefresh", default)]
    pub last_token_refresh: Option<Loose>,
    #[serde(rename = "DateOfRegistration", default)]
    pub date_of_registration: Option<Loose>,
}

/// A cleaned user. Serializes back to the API's field names so the text
/// export can address fields the way the dashboard does.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserRecord {
    pub user_id: String,
    pub username: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub user_type: String,
    pub region: String,
    pub is_active: Option<i64>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_token_refresh: Option<DateTime<Utc>>,
    pub date_of_registration: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
pub struct RawTransaction {
    #[serde(rename = "Region", default)]
    pub region: Option<Loose>,
    #[serde(rename = "GameCategory", alias = "GameType", default)]
    pub game_category: Option<Loose>,
    #[serde(rename = "DrawDate", default)]
    pub draw_date: Option<Loose>,
    #[serde(rename = "DrawOrder", default)]
    pub draw_order: Option<Loose>,
    #[serde(rename = "TotalBettors", default)]
    pub total_bettors: Option<Loose>,
    #[serde(rename = "TotalBets", alias = "TotalBetAmount", default)]
    pub total_bets: Option<Loose>,
    #[serde(rename = "TotalWinners", default)]
    pub total_winners: Option<Loose>,
    #[serde(rename = "TotalWinnings", alias = "TotalWinningAmount", default)]
    pub total_winnings: Option<Loose>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionRecord {
    pub region: String,
    pub game_category: String,
    pub draw_date: Option<NaiveDate>,
    /// 1, 2 or 3 for the first/second/third draw of the day; 0 when unknown.
    pub draw_order: i64,
    pub total_bettors: f64,
    pub total_bets: f64,
    pub total_winners: f64,
    pub total_winnings: f64,
}

#[derive(Debug, Deserialize)]
pub struct RawShare {
    #[serde(rename = "Title", alias = "ShareTitle", default)]
    pub title: Option<Loose>,
    #[serde(rename = "Percentage", default)]
    pub percentage: Option<Loose>,
    #[serde(rename = "Amount", default)]
    pub amount: Option<Loose>,
    #[serde(rename = "Type", alias = "ShareType", default)]
    pub share_type: Option<Loose>,
    #[serde(rename = "OperationDate", default)]
    pub operation_date: Option<Loose>,
}

/// How a share entry is expressed. Only percentage-style entries take part
/// in a breakdown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ShareKind {
    Percentage,
    Fixed,
    Other(String),
}

impl ShareKind {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" => ShareKind::Percentage,
            "fixed" | "amount" => ShareKind::Fixed,
            _ => ShareKind::Other(label.trim().to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareEntry {
    pub title: String,
    pub percentage: f64,
    pub amount: f64,
    pub kind: ShareKind,
    pub operation_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionSummaryRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "TotalBettors")]
    #[tabled(rename = "TotalBettors")]
    pub total_bettors: String,
    #[serde(rename = "TotalBets")]
    #[tabled(rename = "TotalBets")]
    pub total_bets: String,
    #[serde(rename = "TotalWinners")]
    #[tabled(rename = "TotalWinners")]
    pub total_winners: String,
    #[serde(rename = "TotalWinnings")]
    #[tabled(rename = "TotalWinnings")]
    pub total_winnings: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionCategoryRow {
    #[serde(rename = "GameCategory")]
    #[tabled(rename = "GameCategory")]
    pub game_category: String,
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "TotalBets")]
    #[tabled(rename = "TotalBets")]
    pub total_bets: String,
    #[serde(rename = "TotalWinnings")]
    #[tabled(rename = "TotalWinnings")]
    pub total_winnings: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct RegionStatusRow {
    #[serde(rename = "Region")]
    #[tabled(rename = "Region")]
    pub region: String,
    #[serde(rename = "Active")]
    #[tabled(rename = "Active")]
    pub active: u64,
    #[serde(rename = "Inactive")]
    #[tabled(rename = "Inactive")]
    pub inactive: u64,
    #[serde(rename = "Suspended")]
    #[tabled(rename = "Suspended")]
    pub suspended: u64,
    #[serde(rename = "New")]
    #[tabled(rename = "New")]
    pub new: u64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct MonthlyShareRow {
    #[serde(rename = "Month")]
    #[tabled(rename = "Month")]
    pub month: String,
    #[serde(rename = "Entries")]
    #[tabled(rename = "Entries")]
    pub entries: usize,
    #[serde(rename = "TotalPercentage")]
    #[tabled(rename = "TotalPercentage")]
    pub total_percentage: String,
    #[serde(rename = "TotalAmount")]
    #[tabled(rename = "TotalAmount")]
    pub total_amount: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct DrawSummaryRow {
    #[serde(rename = "DrawDate")]
    #[tabled(rename = "DrawDate")]
    pub draw_date: String,
    #[serde(rename = "Draw")]
    #[tabled(rename = "Draw")]
    pub draw: String,
    #[serde(rename = "Transactions")]
    #[tabled(rename = "Transactions")]
    pub transactions: usize,
    #[serde(rename = "TotalBettors")]
    #[tabled(rename = "TotalBettors")]
    pub total_bettors: String,
    #[serde(rename = "TotalBets")]
    #[tabled(rename = "TotalBets")]
    pub total_bets: String,
    #[serde(rename = "TotalWinners")]
    #[tabled(rename = "TotalWinners")]
    pub total_winners: String,
    #[serde(rename = "TotalWinnings")]
    #[tabled(rename = "TotalWinnings")]
    pub total_winnings: String,
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub total_transactions: usize,
    pub total_users: usize,
    pub total_bets: f64,
    pub total_winnings: f64,
    pub unmatched_region_rows: usize,
}
