// Only compile UI module when TUI feature is enabled
#[cfg(feature = "tui")]
mod ui;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fund_catalog::config::AppConfig;
use fund_catalog::logging::init_logging;
use fund_catalog::{
    count_funds, create_fund, get_fund, ingest, list_funds, open_database, sum_aum,
    CandidateRecord, Fund, Strategy,
};
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use uuid::Uuid;

#[derive(Parser)]
#[command(version, about = "Browse and maintain a catalog of investment funds")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge a CSV file (Name, Strategy, AUM (USD), Inception Date) into the catalog
    Import {
        /// CSV file to ingest
        file: PathBuf,
    },
    /// List funds ordered by name
    List {
        /// Only show funds with this strategy (exact match)
        #[arg(short, long)]
        strategy: Option<String>,
    },
    /// Show a single fund
    Show {
        /// Fund ID
        id: Uuid,
    },
    /// Add a single fund
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        strategy: String,
        /// Assets under management (USD)
        #[arg(long)]
        aum: Option<String>,
        /// Inception date (YYYY-MM-DD)
        #[arg(long)]
        inception_date: Option<String>,
    },
    /// Browse funds in the terminal (default)
    Ui,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = AppConfig::load(cli.config.as_deref())?;
    let mut conn = open_database(&config.database_path).with_context(|| {
        format!("Failed to open database: {}", config.database_path.display())
    })?;

    let result = match cli.command {
        Some(Commands::Import { file }) => run_import(&mut conn, &file),
        Some(Commands::List { strategy }) => run_list(&conn, strategy.as_deref()),
        Some(Commands::Show { id }) => run_show(&conn, id),
        Some(Commands::Add {
            name,
            strategy,
            aum,
            inception_date,
        }) => run_add(&conn, &name, &strategy, aum.as_deref(), inception_date.as_deref()),
        Some(Commands::Ui) | None => run_ui_mode(&conn),
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Command failed");
    }
    result
}

fn run_import(conn: &mut Connection, file: &Path) -> Result<()> {
    let bytes =
        std::fs::read(file).with_context(|| format!("Failed to read {}", file.display()))?;

    let report = ingest(conn, &bytes)
        .with_context(|| format!("Failed to import {}", file.display()))?;

    println!("✓ Processed: {} funds", report.processed());
    println!("✓ Created:   {}", report.created);
    println!("✓ Updated:   {}", report.updated);
    println!("✓ Catalog now holds {} funds", count_funds(conn)?);

    Ok(())
}

fn run_list(conn: &Connection, strategy: Option<&str>) -> Result<()> {
    let strategy = match strategy {
        None | Some("") => None,
        Some(raw) => Some(raw.parse::<Strategy>()?),
    };

    let funds = list_funds(conn, strategy)?;
    let total = sum_aum(conn, strategy)?;

    println!(
        "{:<40} {:<20} {:>15} {:<10}",
        "Name", "Strategy", "AUM (USD)", "Inception"
    );
    for fund in &funds {
        println!(
            "{:<40} {:<20} {:>15} {:<10}",
            fund.name,
            fund.strategy,
            fund.aum.map(|a| a.to_string()).unwrap_or_default(),
            fund.inception_date.map(|d| d.to_string()).unwrap_or_default(),
        );
    }
    println!();
    println!(
        "{} funds, total AUM: {}",
        funds.len(),
        total.map(|t| t.to_string()).unwrap_or_else(|| "-".to_string())
    );

    Ok(())
}

fn run_show(conn: &Connection, id: Uuid) -> Result<()> {
    let fund = get_fund(conn, id)?;
    print_fund(&fund);
    Ok(())
}

fn run_add(
    conn: &Connection,
    name: &str,
    strategy: &str,
    aum: Option<&str>,
    inception_date: Option<&str>,
) -> Result<()> {
    let candidate = CandidateRecord::new(
        name,
        strategy,
        aum.unwrap_or_default(),
        inception_date.unwrap_or_default(),
    );

    let fund = create_fund(conn, &candidate.validate()?)?;
    println!("✓ Created fund");
    print_fund(&fund);
    Ok(())
}

fn print_fund(fund: &Fund) {
    println!("ID:             {}", fund.id);
    println!("Name:           {}", fund.name);
    println!("Strategy:       {}", fund.strategy);
    println!(
        "AUM (USD):      {}",
        fund.aum.map(|a| a.to_string()).unwrap_or_else(|| "-".to_string())
    );
    println!(
        "Inception Date: {}",
        fund.inception_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "-".to_string())
    );
}

#[cfg(feature = "tui")]
fn run_ui_mode(conn: &Connection) -> Result<()> {
    let funds = list_funds(conn, None)?;

    let mut app = ui::App::new(funds);
    ui::run_ui(&mut app)?;

    Ok(())
}

#[cfg(not(feature = "tui"))]
fn run_ui_mode(_conn: &Connection) -> Result<()> {
    anyhow::bail!(
        "TUI mode not available; rebuild with `--features tui` or use the `list` command"
    )
}
