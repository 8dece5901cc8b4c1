use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::account::{Account, Area, FlowType, KpiCategory, MonthlyBalance};
use crate::money::{change, percent_change, Money};
use crate::period::Period;

/// One account's balance for a period next to its prior-month and prior-year values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord {
    pub account_number: String,
    pub label: String,
    pub account_class: Option<u8>,
    pub area: Area,
    pub flow_type: FlowType,
    pub kpi_category: KpiCategory,
    pub period: Period,
    pub current_amount: Money,
    pub prior_month_amount: Option<Money>,
    pub prior_year_amount: Option<Money>,
    pub prior_month_diff: Option<Money>,
    pub prior_month_diff_percent: Option<Decimal>,
    pub prior_year_diff: Option<Money>,
    pub prior_year_diff_percent: Option<Decimal>,
}

/// Lookup of net amounts by (account number, period).
pub(crate) struct BalanceIndex<'a> {
    by_key: HashMap<(&'a str, Period), &'a MonthlyBalance>,
}

impl<'a> BalanceIndex<'a> {
    pub(crate) fn new(balances: &'a [MonthlyBalance]) -> Self {
        let mut by_key = HashMap::with_capacity(balances.len());
        for balance in balances {
            // first record wins if the caller passed duplicates
            by_key
                .entry((balance.account_number.as_str(), balance.period))
                .or_insert(balance);
        }
        Self { by_key }
    }

    pub(crate) fn net(&self, account_number: &str, period: Period) -> Option<Money> {
        self.by_key.get(&(account_number, period)).map(|b| b.net)
    }
}

/// Builds comparison records for every account with a balance in `period`.
///
/// Accounts without a current balance are left out, and an account number
/// listed twice yields one record. Prior values are `None`
/// when no balance exists for that month; they are never assumed to be zero.
pub fn compare(
    accounts: &[Account],
    balances: &[MonthlyBalance],
    period: Period,
) -> Vec<ComparisonRecord> {
    let index = BalanceIndex::new(balances);
    let prior_month = period.prior_month();
    let prior_year = period.prior_year();
    let mut seen = HashSet::new();

    accounts
        .iter()
        .filter(|account| seen.insert(account.number.as_str()))
        .filter_map(|account| {
            let current = index.net(&account.number, period)?;
            let prior_month_amount = index.net(&account.number, prior_month);
            let prior_year_amount = index.net(&account.number, prior_year);

            Some(ComparisonRecord {
                account_number: account.number.clone(),
                label: account.label.clone(),
                account_class: account.account_class,
                area: account.area,
                flow_type: account.flow_type,
                kpi_category: account.kpi_category,
                period,
                current_amount: current,
                prior_month_amount,
                prior_year_amount,
                prior_month_diff: change(current, prior_month_amount),
                prior_month_diff_percent: percent_change(current, prior_month_amount),
                prior_year_diff: change(current, prior_year_amount),
                prior_year_diff_percent: percent_change(current, prior_year_amount),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn bal(number: &str, period: Period, cents: i64) -> MonthlyBalance {
        MonthlyBalance::new(number, period, Money::from_cents(cents), Money::zero())
    }

    fn accounts() -> Vec<Account> {
        let c = Classifier::standard();
        vec![
            Account::new("4008", "Zimmererlöse", &c),
            Account::new("6450", "Strom", &c),
            Account::new("6600", "Werbung", &c),
        ]
    }

    #[test]
    fn january_compares_against_december_of_previous_year() {
        let balances = vec![
            bal("4008", p(2025, 1), 15_000),
            bal("4008", p(2024, 12), 10_000),
            bal("4008", p(2024, 1), 20_000),
        ];
        let records = compare(&accounts(), &balances, p(2025, 1));
        assert_eq!(records.len(), 1);
        let r = &records[0];
        assert_eq!(r.prior_month_amount, Some(Money::from_cents(10_000)));
        assert_eq!(r.prior_year_amount, Some(Money::from_cents(20_000)));
        assert_eq!(r.prior_month_diff, Some(Money::from_cents(5_000)));
        assert_eq!(r.prior_month_diff_percent, Some(Decimal::from(50)));
        assert_eq!(r.prior_year_diff, Some(Money::from_cents(-5_000)));
        assert_eq!(r.prior_year_diff_percent, Some(Decimal::from(-25)));
    }

    #[test]
    fn accounts_without_current_balance_are_omitted() {
        let balances = vec![bal("4008", p(2024, 9), 100), bal("6450", p(2024, 10), 100)];
        let records = compare(&accounts(), &balances, p(2024, 10));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].account_number, "6450");
        assert_eq!(records[0].area, Area::Energy);
    }

    #[test]
    fn missing_or_zero_baseline_yields_no_delta() {
        let balances = vec![
            bal("4008", p(2024, 10), 500),
            bal("6450", p(2024, 10), 500),
            bal("6450", p(2024, 9), 0),
        ];
        let records = compare(&accounts(), &balances, p(2024, 10));
        assert_eq!(records.len(), 2);

        let missing = &records[0];
        assert_eq!(missing.prior_month_amount, None);
        assert_eq!(missing.prior_month_diff, None);
        assert_eq!(missing.prior_month_diff_percent, None);

        let zero = &records[1];
        assert_eq!(zero.prior_month_amount, Some(Money::zero()));
        assert_eq!(zero.prior_month_diff_percent, None);
        assert_eq!(zero.prior_year_amount, None);
        assert_eq!(zero.prior_year_diff_percent, None);
    }

    #[test]
    fn records_follow_account_order_and_carry_tags() {
        let balances = vec![bal("6600", p(2024, 10), 1), bal("4008", p(2024, 10), 1)];
        let records = compare(&accounts(), &balances, p(2024, 10));
        let numbers: Vec<_> = records.iter().map(|r| r.account_number.as_str()).collect();
        assert_eq!(numbers, ["4008", "6600"]);
        assert_eq!(records[0].flow_type, FlowType::Revenue);
        assert_eq!(records[1].kpi_category, KpiCategory::Marketing);
        assert_eq!(records[0].account_class, Some(4));
    }

    #[test]
    fn repeated_account_yields_one_record() {
        let c = Classifier::standard();
        let accounts = vec![
            Account::new("4008", "Zimmererlöse", &c),
            Account::new("4008", "Logis", &c),
        ];
        let balances = vec![bal("4008", p(2024, 10), 100)];
        let records = compare(&accounts, &balances, p(2024, 10));
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].label, "Zimmererlöse");
        assert_eq!(crate::aggregate::aggregate_by_area(&records)[0].account_count, 1);
    }
}
