use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet};

use crate::account::{Account, MonthlyBalance};
use crate::period::Period;

/// Outcome of recording one import into the [`Ledger`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    pub accounts_added: usize,
    pub accounts_known: usize,
    pub balances_added: usize,
    pub balances_duplicate: usize,
}

/// Accumulates accounts and monthly balances across imports.
///
/// Append-only: an account keeps the label and tags of its first import, and a
/// balance for an (account, period) pair that is already present is skipped.
#[derive(Debug, Clone, Default)]
pub struct Ledger {
    accounts: Vec<Account>,
    account_index: HashMap<String, usize>,
    balances: Vec<MonthlyBalance>,
    balance_keys: HashSet<(String, Period)>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(
        &mut self,
        accounts: impl IntoIterator<Item = Account>,
        balances: impl IntoIterator<Item = MonthlyBalance>,
    ) -> ImportSummary {
        let mut summary = ImportSummary::default();

        for account in accounts {
            if self.account_index.contains_key(&account.number) {
                summary.accounts_known += 1;
                continue;
            }
            self.account_index
                .insert(account.number.clone(), self.accounts.len());
            self.accounts.push(account);
            summary.accounts_added += 1;
        }

        for balance in balances {
            let key = (balance.account_number.clone(), balance.period);
            if !self.balance_keys.insert(key) {
                tracing::warn!(
                    account = %balance.account_number,
                    period = %balance.period,
                    "Balance already recorded, skipping"
                );
                summary.balances_duplicate += 1;
                continue;
            }
            self.balances.push(balance);
            summary.balances_added += 1;
        }

        summary
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn balances(&self) -> &[MonthlyBalance] {
        &self.balances
    }

    pub fn account(&self, number: &str) -> Option<&Account> {
        self.account_index
            .get(number.trim())
            .map(|&idx| &self.accounts[idx])
    }

    /// Distinct periods with at least one balance, oldest first.
    pub fn periods(&self) -> Vec<Period> {
        self.balances
            .iter()
            .map(|b| b.period)
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }
}
