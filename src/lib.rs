//! Reporting and aggregation layer for the Small Town Lottery dashboard.
//!
//! The transforms ([`status`], [`region`], [`shares`], [`export`]) are pure
//! functions over already-loaded records; [`loader`], [`config`] and
//! [`output`] handle the files around them.

pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod output;
pub mod region;
pub mod reports;
pub mod shares;
pub mod status;
pub mod types;
pub mod util;
