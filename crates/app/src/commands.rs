use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context};
use saldo_core::{
    aggregate_by_account_class, aggregate_by_area, aggregate_by_kpi_category, compare,
    compute_department_kpis, compute_kpi_totals, Aggregation, AreaAggregation, Classifier,
    ComparisonRecord, DepartmentKpi, KpiCategory, KpiTotals, KpiVariance, Ledger, Period,
};
use saldo_import::import::{import_file, ImportOutcome};
use serde::Serialize;

use crate::{Command, ReportArgs};

/// An input file, optionally pinned to a period with `path@YYYY-MM`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileArg {
    pub path: PathBuf,
    pub period: Option<Period>,
}

impl FromStr for FileArg {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.rsplit_once('@') {
            Some((path, period)) if !path.is_empty() => {
                let period = period.parse::<Period>().map_err(|e| e.to_string())?;
                Ok(FileArg {
                    path: PathBuf::from(path),
                    period: Some(period),
                })
            }
            _ => Ok(FileArg {
                path: PathBuf::from(s),
                period: None,
            }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ComparisonReport {
    pub period: Period,
    pub records: Vec<ComparisonRecord>,
}

#[derive(Debug, Serialize)]
pub struct AreaReport {
    pub period: Period,
    pub areas: Vec<AreaAggregation>,
    pub account_classes: Vec<Aggregation<Option<u8>>>,
    pub kpi_categories: Vec<Aggregation<KpiCategory>>,
}

#[derive(Debug, Serialize)]
pub struct DepartmentReport {
    #[serde(flatten)]
    pub kpi: DepartmentKpi,
    pub variance: KpiVariance,
}

#[derive(Debug, Serialize)]
pub struct KpiReport {
    pub period: Period,
    pub departments: Vec<DepartmentReport>,
    pub totals: KpiTotals,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum Report {
    Accounts(Vec<saldo_core::Account>),
    Compare(ComparisonReport),
    Areas(AreaReport),
    Kpis(KpiReport),
}

fn default_rules_path() -> Option<PathBuf> {
    let dirs = directories::ProjectDirs::from("com", "saldo", "Saldo")?;
    let path = dirs.config_dir().join("rules.toml");
    path.exists().then_some(path)
}

pub fn load_classifier(rules: Option<&Path>) -> anyhow::Result<Classifier> {
    let path = match rules {
        Some(path) => path.to_path_buf(),
        None => match default_rules_path() {
            Some(path) => path,
            None => return Ok(Classifier::standard()),
        },
    };
    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read rule file {}", path.display()))?;
    let classifier = Classifier::from_toml(&content)
        .with_context(|| format!("Invalid rule file {}", path.display()))?;
    tracing::info!(rules = %path.display(), "Loaded classification rules");
    Ok(classifier)
}

pub fn load_ledger(files: &[FileArg], classifier: &Classifier) -> anyhow::Result<Ledger> {
    let mut ledger = Ledger::new();
    for file in files {
        let outcome: ImportOutcome = import_file(&mut ledger, &file.path, classifier, file.period)
            .with_context(|| format!("Failed to import {}", file.path.display()))?;
        if outcome.rows == 0 {
            tracing::warn!(file = %file.path.display(), "No data rows found");
        }
    }
    Ok(ledger)
}

fn resolve_period(requested: Option<Period>, ledger: &Ledger) -> anyhow::Result<Period> {
    if let Some(period) = requested {
        return Ok(period);
    }
    match ledger.periods().last() {
        Some(period) => Ok(*period),
        None => bail!("No balances imported, cannot pick a reporting month"),
    }
}

pub fn run(command: Command) -> anyhow::Result<Report> {
    let args: &ReportArgs = match &command {
        Command::Accounts(args)
        | Command::Compare(args)
        | Command::Areas(args)
        | Command::Kpis(args) => args,
    };
    let classifier = load_classifier(args.rules.as_deref())?;
    let ledger = load_ledger(&args.files, &classifier)?;
    let period = resolve_period(args.period, &ledger)?;

    let report = match command {
        Command::Accounts(_) => Report::Accounts(ledger.accounts().to_vec()),
        Command::Compare(_) => Report::Compare(ComparisonReport {
            period,
            records: compare(ledger.accounts(), ledger.balances(), period),
        }),
        Command::Areas(_) => {
            let records = compare(ledger.accounts(), ledger.balances(), period);
            Report::Areas(AreaReport {
                period,
                areas: aggregate_by_area(&records),
                account_classes: aggregate_by_account_class(&records),
                kpi_categories: aggregate_by_kpi_category(&records),
            })
        }
        Command::Kpis(_) => {
            let kpis = compute_department_kpis(ledger.accounts(), ledger.balances(), period);
            let totals = compute_kpi_totals(&kpis, period);
            Report::Kpis(KpiReport {
                period,
                departments: kpis
                    .into_iter()
                    .map(|kpi| DepartmentReport {
                        variance: kpi.variance(),
                        kpi,
                    })
                    .collect(),
                totals,
            })
        }
    };
    Ok(report)
}
