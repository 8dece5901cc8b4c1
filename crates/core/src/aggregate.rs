use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::account::{Area, FlowType, KpiCategory};
use crate::compare::ComparisonRecord;
use crate::money::{change, percent_change, Money};

/// Summed comparison values for one group key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aggregation<K> {
    pub key: K,
    pub account_count: usize,
    pub current_amount: Money,
    /// `None` unless every member has a prior-month value.
    pub prior_month_amount: Option<Money>,
    /// `None` unless every member has a prior-year value.
    pub prior_year_amount: Option<Money>,
    pub prior_month_diff: Option<Money>,
    pub prior_month_diff_percent: Option<Decimal>,
    pub prior_year_diff: Option<Money>,
    pub prior_year_diff_percent: Option<Decimal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AreaKey {
    pub area: Area,
    pub flow_type: FlowType,
}

pub type AreaAggregation = Aggregation<AreaKey>;

struct Accumulator {
    count: usize,
    current: Money,
    prior_month: Option<Money>,
    prior_year: Option<Money>,
}

impl Accumulator {
    fn new() -> Self {
        Self {
            count: 0,
            current: Money::zero(),
            prior_month: Some(Money::zero()),
            prior_year: Some(Money::zero()),
        }
    }

    fn add(&mut self, record: &ComparisonRecord) {
        self.count += 1;
        self.current += record.current_amount;
        // once a member is missing the group value stays missing
        self.prior_month = self.prior_month.zip(record.prior_month_amount).map(|(a, b)| a + b);
        self.prior_year = self.prior_year.zip(record.prior_year_amount).map(|(a, b)| a + b);
    }

    fn finish<K>(self, key: K) -> Aggregation<K> {
        Aggregation {
            key,
            account_count: self.count,
            current_amount: self.current,
            prior_month_amount: self.prior_month,
            prior_year_amount: self.prior_year,
            prior_month_diff: change(self.current, self.prior_month),
            prior_month_diff_percent: percent_change(self.current, self.prior_month),
            prior_year_diff: change(self.current, self.prior_year),
            prior_year_diff_percent: percent_change(self.current, self.prior_year),
        }
    }
}

/// Groups records by `key`, returned in key order.
pub fn aggregate_by<K, F>(comparisons: &[ComparisonRecord], key: F) -> Vec<Aggregation<K>>
where
    K: Ord,
    F: Fn(&ComparisonRecord) -> K,
{
    let mut groups: BTreeMap<K, Accumulator> = BTreeMap::new();
    for record in comparisons {
        groups
            .entry(key(record))
            .or_insert_with(Accumulator::new)
            .add(record);
    }
    groups
        .into_iter()
        .map(|(key, acc)| acc.finish(key))
        .collect()
}

pub fn aggregate_by_area(comparisons: &[ComparisonRecord]) -> Vec<AreaAggregation> {
    aggregate_by(comparisons, |r| AreaKey {
        area: r.area,
        flow_type: r.flow_type,
    })
}

/// Groups by leading account digit. Accounts without one land under `None`.
pub fn aggregate_by_account_class(
    comparisons: &[ComparisonRecord],
) -> Vec<Aggregation<Option<u8>>> {
    aggregate_by(comparisons, |r| r.account_class)
}

pub fn aggregate_by_kpi_category(
    comparisons: &[ComparisonRecord],
) -> Vec<Aggregation<KpiCategory>> {
    aggregate_by(comparisons, |r| r.kpi_category)
}
