pub mod delimited;
pub mod extract;
pub mod filename;

pub use delimited::{parse_delimited_text, parse_german_number, Cell, CellValue, Row};
pub use extract::{
    extract_accounts, extract_monthly_balances, locate_period_columns, ColumnMatch, PeriodColumns,
    ACCOUNT_CLASS_COLUMN, ACCOUNT_NUMBER_COLUMN, LABEL_COLUMN,
};
pub use filename::parse_file_name_to_period;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot determine period for '{0}', expected a name like Saldenliste-MM-YYYY.csv")]
    UnknownPeriod(String),
}

pub mod import {
    use std::path::Path;

    use saldo_core::{Classifier, ImportSummary, Ledger, Period};
    use serde::Serialize;

    use crate::*;

    /// What one trial-balance export contributed to the ledger.
    #[derive(Debug, Clone, Serialize)]
    pub struct ImportOutcome {
        pub period: Period,
        pub rows: usize,
        pub columns: Option<PeriodColumns>,
        pub summary: ImportSummary,
    }

    /// Parses `text` as the export for `period` and records it in `ledger`.
    pub fn import_text(
        ledger: &mut Ledger,
        text: &str,
        period: Period,
        classifier: &Classifier,
    ) -> ImportOutcome {
        let rows = parse_delimited_text(text);
        let columns = rows
            .first()
            .map(|row| locate_period_columns(row.headers(), period));
        let accounts = extract_accounts(&rows, classifier);
        let balances = extract_monthly_balances(&rows, period);
        let summary = ledger.record(accounts, balances);

        tracing::info!(
            %period,
            rows = rows.len(),
            accounts_added = summary.accounts_added,
            balances_added = summary.balances_added,
            "Imported trial balance"
        );

        ImportOutcome {
            period,
            rows: rows.len(),
            columns,
            summary,
        }
    }

    /// Reads a file and imports it. The period comes from `period_override`,
    /// else from the file name.
    pub fn import_file(
        ledger: &mut Ledger,
        path: &Path,
        classifier: &Classifier,
        period_override: Option<Period>,
    ) -> Result<ImportOutcome, ImportError> {
        let name = path.display().to_string();
        let period = period_override
            .or_else(|| parse_file_name_to_period(&name))
            .ok_or_else(|| ImportError::UnknownPeriod(name.clone()))?;

        // Exports are not always clean UTF-8.
        let bytes = std::fs::read(path)?;
        let text = String::from_utf8_lossy(&bytes);

        tracing::debug!(file = %name, %period, "Reading trial balance");
        Ok(import_text(ledger, &text, period, classifier))
    }
}
