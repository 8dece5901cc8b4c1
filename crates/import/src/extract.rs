use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::prelude::ToPrimitive;
use saldo_core::{Account, Classifier, Money, MonthlyBalance, Period};
use serde::Serialize;

use crate::delimited::Row;

pub const ACCOUNT_NUMBER_COLUMN: &str = "KontoNr";
pub const LABEL_COLUMN: &str = "Kontobezeichnung";
pub const ACCOUNT_CLASS_COLUMN: &str = "Kontoklasse";

fn re_header_period() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"\b(\d{1,2})/(\d{2})\b").expect("invalid regex")
    })
}

/// How a debit or credit column was chosen for the requested period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnMatch {
    /// The header names the requested month.
    Exact,
    /// No header names the month; the first debit/credit column was used.
    Fallback,
    Missing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PeriodColumns {
    pub debit: Option<String>,
    pub debit_match: ColumnMatch,
    pub credit: Option<String>,
    pub credit_match: ColumnMatch,
}

impl PeriodColumns {
    pub fn is_exact(&self) -> bool {
        self.debit_match == ColumnMatch::Exact && self.credit_match == ColumnMatch::Exact
    }
}

fn is_debit_header(header: &str) -> bool {
    header.to_lowercase().contains("soll")
}

fn is_credit_header(header: &str) -> bool {
    header.to_lowercase().contains("haben")
}

/// Periods named in a header via `M/YY` or `MM/YY`.
fn header_periods(header: &str) -> impl Iterator<Item = Period> + '_ {
    re_header_period().captures_iter(header).filter_map(|caps| {
        let month = caps[1].parse().ok()?;
        let year = caps[2].parse().ok()?;
        Period::from_short(month, year)
    })
}

fn pick_column<'a>(
    headers: &[&'a str],
    period: Period,
    is_kind: fn(&str) -> bool,
) -> (Option<&'a str>, ColumnMatch) {
    let Some(first) = headers.iter().copied().find(|h| is_kind(h)) else {
        return (None, ColumnMatch::Missing);
    };
    let exact = headers
        .iter()
        .copied()
        .filter(|h| is_kind(h))
        .find(|h| header_periods(h).any(|p| p == period));
    match exact {
        Some(exact) => (Some(exact), ColumnMatch::Exact),
        None => (Some(first), ColumnMatch::Fallback),
    }
}

/// Finds the debit (`Soll`) and credit (`Haben`) columns for `period`.
///
/// Falls back to the first column of each kind when none names the period.
/// The fallback may attribute another month's figures to `period`; check
/// [`PeriodColumns::is_exact`] when that matters.
pub fn locate_period_columns<'a>(
    headers: impl IntoIterator<Item = &'a str>,
    period: Period,
) -> PeriodColumns {
    let headers: Vec<&str> = headers.into_iter().collect();
    let (debit, debit_match) = pick_column(&headers, period, is_debit_header);
    let (credit, credit_match) = pick_column(&headers, period, is_credit_header);
    PeriodColumns {
        debit: debit.map(str::to_string),
        debit_match,
        credit: credit.map(str::to_string),
        credit_match,
    }
}

/// One account per distinct account number; the first row wins.
pub fn extract_accounts(rows: &[Row], classifier: &Classifier) -> Vec<Account> {
    let mut seen = HashSet::new();
    let mut accounts = Vec::new();
    for row in rows {
        let Some(number) = row.text(ACCOUNT_NUMBER_COLUMN) else {
            continue;
        };
        if !seen.insert(number) {
            continue;
        }
        let label = row.text(LABEL_COLUMN).unwrap_or_default();
        let mut account = Account::new(number, label, classifier);
        if account.account_class.is_none() {
            account.account_class = row
                .number(ACCOUNT_CLASS_COLUMN)
                .and_then(|d| d.to_u8())
                .filter(|d| *d <= 9);
        }
        accounts.push(account);
    }
    accounts
}

/// One balance per account number for `period`, read from the matching
/// debit/credit columns. Cells that are not numbers count as zero. Without
/// any debit or credit column there are no balances at all.
pub fn extract_monthly_balances(rows: &[Row], period: Period) -> Vec<MonthlyBalance> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let columns = locate_period_columns(first.headers(), period);
    if columns.debit.is_none() && columns.credit.is_none() {
        // a month without amounts is no data, not a zero balance
        tracing::warn!(%period, "No debit or credit column found, no balances read");
        return Vec::new();
    }
    if !columns.is_exact() {
        tracing::warn!(
            %period,
            debit = ?columns.debit,
            credit = ?columns.credit,
            "No debit/credit column names the period, amounts may belong to another month"
        );
    }

    let amount = |row: &Row, column: &Option<String>| -> Money {
        let Some(column) = column.as_deref() else {
            return Money::zero();
        };
        match row.number(column) {
            Some(n) => Money::from_decimal(n),
            None => {
                tracing::debug!(column, raw = ?row.text(column), "Non-numeric amount counted as zero");
                Money::zero()
            }
        }
    };

    let mut seen = HashSet::new();
    let mut balances = Vec::new();
    for row in rows {
        let Some(number) = row.text(ACCOUNT_NUMBER_COLUMN) else {
            continue;
        };
        if !seen.insert(number) {
            tracing::warn!(account = number, "Account listed twice, keeping first row");
            continue;
        }
        balances.push(MonthlyBalance::new(
            number,
            period,
            amount(row, &columns.debit),
            amount(row, &columns.credit),
        ));
    }
    balances
}
