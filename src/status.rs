//! User activity classification.
//!
//! Status is never stored: it is derived from a user's timestamps relative
//! to a cutoff instant, usually "now minus the inactivity window".

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::fmt;

use crate::types::UserRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum UserStatus {
    Active,
    Inactive,
    Suspended,
    New,
}

impl UserStatus {
    /// Display order used by every status table.
    pub const ALL: [UserStatus; 4] = [
        UserStatus::Active,
        UserStatus::Inactive,
        UserStatus::Suspended,
        UserStatus::New,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            UserStatus::Active => "Active",
            UserStatus::Inactive => "Inactive",
            UserStatus::Suspended => "Suspended",
            UserStatus::New => "New",
        }
    }
}

impl fmt::Display for UserStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// The fields the classifier looks at, borrowed from whatever record
/// carries them.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActivitySignals {
    pub is_active: Option<i64>,
    pub last_login: Option<DateTime<Utc>>,
    pub last_token_refresh: Option<DateTime<Utc>>,
    pub date_of_registration: Option<DateTime<Utc>>,
}

impl From<&UserRecord> for ActivitySignals {
    fn from(user: &UserRecord) -> Self {
        ActivitySignals {
            is_active: user.is_active,
            last_login: user.last_login,
            last_token_refresh: user.last_token_refresh,
            date_of_registration: user.date_of_registration,
        }
    }
}

/// `now` minus `window_days` days.
pub fn cutoff(now: DateTime<Utc>, window_days: u32) -> DateTime<Utc> {
    now - Duration::days(i64::from(window_days))
}

/// Classify a set of activity signals against `cutoff`.
///
/// Rules are checked in order and the first match wins; all comparisons are
/// strict, so a timestamp equal to the cutoff is neither before nor after it.
pub fn classify_signals(signals: ActivitySignals, cutoff: DateTime<Utc>) -> UserStatus {
    if signals.is_active == Some(0) {
        return UserStatus::Suspended;
    }
    if let (Some(login), Some(refresh)) = (signals.last_login, signals.last_token_refresh) {
        if login < cutoff && refresh < cutoff {
            return UserStatus::Inactive;
        }
    }
    if matches!(signals.date_of_registration, Some(registered) if registered > cutoff) {
        return UserStatus::New;
    }
    UserStatus::Active
}

pub fn classify(user: &UserRecord, cutoff: DateTime<Utc>) -> UserStatus {
    classify_signals(ActivitySignals::from(user), cutoff)
}

/// Per-status tallies for a list of users.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub active: u64,
    pub inactive: u64,
    pub suspended: u64,
    pub new: u64,
}

impl StatusCounts {
    pub fn tally(users: &[UserRecord], cutoff: DateTime<Utc>) -> Self {
        let mut counts = StatusCounts::default();
        for user in users {
            counts.add(classify(user, cutoff));
        }
        counts
    }

    pub fn add(&mut self, status: UserStatus) {
        match status {
            UserStatus::Active => self.active += 1,
            UserStatus::Inactive => self.inactive += 1,
            UserStatus::Suspended => self.suspended += 1,
            UserStatus::New => self.new += 1,
        }
    }

    pub fn get(&self, status: UserStatus) -> u64 {
        match status {
            UserStatus::Active => self.active,
            UserStatus::Inactive => self.inactive,
            UserStatus::Suspended => self.suspended,
            UserStatus::New => self.new,
        }
    }

    pub fn total(&self) -> u64 {
        self.active + self.inactive + self.suspended + self.new
    }
}
