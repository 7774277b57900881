use thiserror::Error;

/// Problems with a configuration that parsed but cannot drive a report.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("the known region list is empty")]
    EmptyRegions,
    #[error("inactive_after_days must be at least 1")]
    ZeroInactivityWindow,
    #[error("no share titles configured")]
    EmptyShareTitles,
    #[error("month {0} is out of range (expected 1-12)")]
    MonthOutOfRange(u32),
}
