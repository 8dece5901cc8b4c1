use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use saldo_core::Period;
use tracing_subscriber::EnvFilter;

mod commands;

use commands::FileArg;

#[derive(Debug, Parser)]
#[command(name = "saldo", version, about = "Department KPIs from monthly trial-balance exports")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Chart of accounts with area, flow type and KPI category
    Accounts(ReportArgs),
    /// Per-account comparison against prior month and prior year
    Compare(ReportArgs),
    /// Totals by area and flow type, account class and KPI category
    Areas(ReportArgs),
    /// Contribution margins per department and the operating total
    Kpis(ReportArgs),
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Rule file replacing the built-in classification rules
    #[arg(long)]
    pub rules: Option<PathBuf>,
    /// Reporting month as YYYY-MM (default: latest imported month)
    #[arg(long)]
    pub period: Option<Period>,
    /// Exports named Saldenliste-MM-YYYY.csv, or FILE@YYYY-MM
    #[arg(required = true)]
    pub files: Vec<FileArg>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let report = commands::run(cli.command)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
