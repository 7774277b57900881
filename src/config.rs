//! Configuration for the report generator
//!
//! Everything a report needs besides its input records (region list,
//! inactivity window, share titles, output location) is read here once and
//! handed to the reports as a [`ReportContext`].

use anyhow::{Context, Result};
use log::info;
use serde::Deserialize;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::region::KNOWN_REGIONS;

/// Configuration loaded from config.toml. Every section is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub dashboard: DashboardConfig,
    pub regions: RegionsConfig,
    pub status: StatusConfig,
    pub shares: SharesConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// Title printed above every exported table
    pub title: String,
    /// Directory for generated files
    pub output_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        DashboardConfig {
            title: "Small Town Lottery".to_string(),
            output_dir: PathBuf::from("./output"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RegionsConfig {
    /// Regions in display order
    pub known: Vec<String>,
}

impl Default for RegionsConfig {
    fn default() -> Self {
        RegionsConfig {
            known: KNOWN_REGIONS.to_vec(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Days without login and token refresh before a user counts as inactive
    pub inactive_after_days: u32,
}

impl Default for StatusConfig {
    fn default() -> Self {
        StatusConfig {
            inactive_after_days: 7,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SharesConfig {
    /// Share titles included in a breakdown
    pub titles: Vec<String>,
}

impl Default for SharesConfig {
    fn default() -> Self {
        SharesConfig {
            titles: vec!["AAC".to_string(), "PCSO Share".to_string()],
        }
    }
}

impl FileConfig {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::parse(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn parse(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load `path` if it exists, otherwise fall back to the defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("{} not found, using default configuration", path.display());
            Ok(Self::default())
        }
    }
}

/// Validated settings passed explicitly into every report.
#[derive(Debug, Clone)]
pub struct ReportContext {
    pub title: String,
    pub output_dir: PathBuf,
    pub regions: Vec<String>,
    pub inactive_after_days: u32,
    pub share_titles: BTreeSet<String>,
}

impl ReportContext {
    /// Build the context from file config, with an optional output directory override
    pub fn from_file(file: &FileConfig, output_dir: Option<PathBuf>) -> Result<Self, ConfigError> {
        if file.regions.known.iter().all(|r| r.trim().is_empty()) {
            return Err(ConfigError::EmptyRegions);
        }
        if file.status.inactive_after_days == 0 {
            return Err(ConfigError::ZeroInactivityWindow);
        }
        let share_titles: BTreeSet<String> = file
            .shares
            .titles
            .iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        if share_titles.is_empty() {
            return Err(ConfigError::EmptyShareTitles);
        }

        Ok(ReportContext {
            title: file.dashboard.title.clone(),
            output_dir: output_dir.unwrap_or_else(|| file.dashboard.output_dir.clone()),
            regions: file
                .regions
                .known
                .iter()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty())
                .collect(),
            inactive_after_days: file.status.inactive_after_days,
            share_titles,
        })
    }
}

/// Reject months outside 1..=12 before they reach a share query.
pub fn validate_month(month: u32) -> Result<u32, ConfigError> {
    if (1..=12).contains(&month) {
        Ok(month)
    } else {
        Err(ConfigError::MonthOutOfRange(month))
    }
}
