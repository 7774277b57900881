//! Small Town Lottery reporting
//!
//! Turns exports of the dashboard API (users, betting transactions, share
//! entries) into the region, status and share reports the dashboard shows,
//! writing CSV/JSON/text files and printing markdown previews.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use log::LevelFilter;
use std::path::{Path, PathBuf};

use stl_reports::config::{validate_month, FileConfig, ReportContext};
use stl_reports::loader::{self, LoadReport};
use stl_reports::status::UserStatus;
use stl_reports::{output, reports, util};

/// Default config file path
const CONFIG_FILE: &str = "config.toml";

#[derive(Parser, Debug)]
#[command(name = "stl_reports")]
#[command(about = "Region, status and share reports for the Small Town Lottery dashboard")]
struct Args {
    /// Configuration file (defaults apply when it does not exist)
    #[arg(short, long, default_value = CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Output directory for generated files (overrides the config file)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Betting and winning totals per region, overall and per game category
    Regions {
        /// Transactions export (.json or .csv)
        #[arg(short, long)]
        input: PathBuf,

        /// Game categories to break down, in order (default: all found)
        #[arg(long, value_delimiter = ',')]
        categories: Vec<String>,
    },

    /// Totals per daily draw (1st, 2nd, 3rd) for each draw date
    Draws {
        /// Transactions export (.json or .csv)
        #[arg(short, long)]
        input: PathBuf,

        /// Only this draw date, YYYY-MM-DD (default: every date found)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// User status counts and the user table export
    Users {
        /// Users export (.json or .csv)
        #[arg(short, long)]
        input: PathBuf,

        /// Reference instant, RFC 3339 (default: current time)
        #[arg(long, value_parser = parse_now)]
        now: Option<DateTime<Utc>>,
    },

    /// AAC / PCSO share breakdown
    Shares {
        /// Share entries export (.json or .csv)
        #[arg(short, long)]
        input: PathBuf,

        #[arg(long)]
        year: i32,

        /// Month (1-12) for a detailed breakdown
        #[arg(long)]
        month: Option<u32>,
    },

    /// Summary statistics as JSON
    Summary {
        #[arg(long)]
        transactions: PathBuf,

        #[arg(long)]
        users: PathBuf,
    },
}

fn parse_now(s: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

fn init_logger(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();
}

fn print_load(path: &Path, report: &LoadReport) {
    println!(
        "Loaded {} ({} rows, {} skipped)",
        path.display(),
        util::format_int(report.total_rows),
        util::format_int(report.parse_errors)
    );
}

fn handle_regions(ctx: &ReportContext, input: &Path, categories: Vec<String>) -> Result<()> {
    let (data, load_report) = loader::load_transactions(input)?;
    print_load(input, &load_report);

    let (rows, unmatched) = reports::regional_summary(&data, ctx);
    if unmatched > 0 {
        println!(
            "Note: {} rows had an unrecognised region and were left out.",
            util::format_int(unmatched)
        );
    }
    let file1 = output::write_csv(&ctx.output_dir, "regional_summary.csv", &rows)?;
    println!();
    output::preview_table("Regional Betting Summary", None, &rows, rows.len());
    println!("(Full table exported to {})\n", file1.display());

    let categories = if categories.is_empty() {
        reports::categories_in(&data)
    } else {
        categories
    };
    let by_category = reports::region_category_summary(&data, ctx, &categories);
    let file2 = output::write_csv(&ctx.output_dir, "region_category_summary.csv", &by_category)?;
    output::preview_table(
        "Historical Summary by Region and Game Category",
        Some(categories.join(", ").as_str()),
        &by_category,
        by_category.len(),
    );
    println!("(Full table exported to {})\n", file2.display());
    Ok(())
}

fn handle_draws(ctx: &ReportContext, input: &Path, date: Option<NaiveDate>) -> Result<()> {
    let (data, load_report) = loader::load_transactions(input)?;
    print_load(input, &load_report);

    let (rows, unplaced) = reports::draw_summary(&data, date);
    if unplaced > 0 {
        println!(
            "Note: {} rows had no draw date or draw order and were left out.",
            util::format_int(unplaced)
        );
    }
    let file_name = match date {
        Some(d) => format!("draw_summary_{}.csv", d.format("%Y-%m-%d")),
        None => "draw_summary.csv".to_string(),
    };
    let path = output::write_csv(&ctx.output_dir, &file_name, &rows)?;
    println!();
    output::preview_table("Draw Summary", None, &rows, rows.len());
    println!("(Full table exported to {})\n", path.display());
    Ok(())
}

fn handle_users(ctx: &ReportContext, input: &Path, now: DateTime<Utc>) -> Result<()> {
    let (users, load_report) = loader::load_users(input)?;
    print_load(input, &load_report);

    let (overall, by_region) = reports::status_report(&users, ctx, now);
    println!(
        "\nUser Status (inactive after {} days)",
        ctx.inactive_after_days
    );
    for status in UserStatus::ALL {
        println!("  {:<10} {}", status, util::format_int(overall.get(status)));
    }
    println!("  {:<10} {}\n", "Total", util::format_int(overall.total()));

    let file1 = output::write_csv(&ctx.output_dir, "user_status_by_region.csv", &by_region)?;
    output::preview_table("User Status by Region", None, &by_region, by_region.len());
    println!("(Full table exported to {})\n", file1.display());

    let text = reports::user_export(&users, ctx, now);
    let file2 = output::write_text(&ctx.output_dir, "users.csv", &text)?;
    println!("User list exported to {}", file2.display());
    Ok(())
}

fn handle_shares(ctx: &ReportContext, input: &Path, year: i32, month: Option<u32>) -> Result<()> {
    let (entries, load_report) = loader::load_shares(input)?;
    print_load(input, &load_report);
    println!();

    if let Some(month) = month {
        let month = validate_month(month)?;
        let breakdown = reports::month_breakdown(&entries, ctx, year, month);
        if breakdown.is_empty() {
            println!("No breakdown available for {}-{:02}.\n", year, month);
        } else {
            println!(
                "Share breakdown {}-{:02}: {}% totalling {}",
                year,
                month,
                util::format_number(breakdown.total_percentage, 2),
                util::format_number(breakdown.total_amount, 2)
            );
            let text = reports::share_export(&breakdown, ctx, year, month);
            let path = output::write_text(
                &ctx.output_dir,
                &format!("share_breakdown_{}_{:02}.csv", year, month),
                &text,
            )?;
            println!("(Breakdown exported to {})\n", path.display());
        }
    }

    let rows = reports::yearly_share_rows(&entries, ctx, year);
    let path = output::write_csv(&ctx.output_dir, &format!("share_totals_{}.csv", year), &rows)?;
    let titles: Vec<&str> = ctx.share_titles.iter().map(String::as_str).collect();
    output::preview_table(
        &format!("Share Totals {}", year),
        Some(titles.join(", ").as_str()),
        &rows,
        rows.len(),
    );
    println!("(Full table exported to {})\n", path.display());
    Ok(())
}

fn handle_summary(ctx: &ReportContext, transactions: &Path, users_path: &Path) -> Result<()> {
    let (data, tx_report) = loader::load_transactions(transactions)?;
    print_load(transactions, &tx_report);
    let (users, user_report) = loader::load_users(users_path)?;
    print_load(users_path, &user_report);

    let summary = reports::generate_summary(&data, &users, ctx);
    let path = output::write_json(&ctx.output_dir, "summary.json", &summary)?;
    println!("\nSummary Stats ({}):", path.display());
    println!(
        "{{\"total_bets\": {}, \"total_winnings\": {}, \"unmatched_region_rows\": {}}}\n",
        util::format_number(summary.total_bets, 2),
        util::format_number(summary.total_winnings, 2),
        summary.unmatched_region_rows
    );
    Ok(())
}

fn run(args: Args) -> Result<()> {
    let file_config = FileConfig::load_or_default(&args.config)?;
    let ctx = ReportContext::from_file(&file_config, args.output_dir)
        .with_context(|| format!("Invalid configuration in {}", args.config.display()))?;

    match args.command {
        Command::Regions { input, categories } => handle_regions(&ctx, &input, categories),
        Command::Draws { input, date } => handle_draws(&ctx, &input, date),
        Command::Users { input, now } => handle_users(&ctx, &input, now.unwrap_or_else(Utc::now)),
        Command::Shares { input, year, month } => handle_shares(&ctx, &input, year, month),
        Command::Summary { transactions, users } => handle_summary(&ctx, &transactions, &users),
    }
}

fn main() {
    let args = Args::parse();
    init_logger(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
