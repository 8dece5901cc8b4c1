use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::account::{Account, Area, KpiCategory, MonthlyBalance};
use crate::compare::BalanceIndex;
use crate::money::{change, percent_change, Money};
use crate::period::Period;

/// Department figures for one month. All category totals are magnitudes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiFigures {
    pub revenue: Money,
    pub cost_of_goods: Money,
    pub personnel: Money,
    pub energy: Money,
    pub marketing: Money,
    pub operating_expense: Money,
    /// Revenue minus cost of goods (DB I).
    pub contribution_margin_1: Money,
    /// DB I minus personnel (DB II).
    pub contribution_margin_2: Money,
}

impl KpiFigures {
    fn from_category_totals(totals: &HashMap<KpiCategory, Money>) -> Self {
        let get = |category: KpiCategory| {
            totals.get(&category).copied().unwrap_or_default().abs()
        };
        let revenue = get(KpiCategory::Revenue);
        let cost_of_goods = get(KpiCategory::CostOfGoods);
        let personnel = get(KpiCategory::Personnel);
        let contribution_margin_1 = revenue - cost_of_goods;
        KpiFigures {
            revenue,
            cost_of_goods,
            personnel,
            energy: get(KpiCategory::Energy),
            marketing: get(KpiCategory::Marketing),
            operating_expense: get(KpiCategory::OperatingExpense),
            contribution_margin_1,
            contribution_margin_2: contribution_margin_1 - personnel,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentKpi {
    pub area: Area,
    pub period: Period,
    pub current: KpiFigures,
    pub prior_year: KpiFigures,
}

/// Year-over-year movement of the headline figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiVariance {
    pub revenue_diff: Option<Money>,
    pub revenue_diff_percent: Option<Decimal>,
    pub contribution_margin_1_diff: Option<Money>,
    pub contribution_margin_1_diff_percent: Option<Decimal>,
    pub contribution_margin_2_diff: Option<Money>,
    pub contribution_margin_2_diff_percent: Option<Decimal>,
}

impl DepartmentKpi {
    pub fn variance(&self) -> KpiVariance {
        let (cur, prev) = (&self.current, &self.prior_year);
        KpiVariance {
            revenue_diff: change(cur.revenue, Some(prev.revenue)),
            revenue_diff_percent: percent_change(cur.revenue, Some(prev.revenue)),
            contribution_margin_1_diff: change(
                cur.contribution_margin_1,
                Some(prev.contribution_margin_1),
            ),
            contribution_margin_1_diff_percent: percent_change(
                cur.contribution_margin_1,
                Some(prev.contribution_margin_1),
            ),
            contribution_margin_2_diff: change(
                cur.contribution_margin_2,
                Some(prev.contribution_margin_2),
            ),
            contribution_margin_2_diff_percent: percent_change(
                cur.contribution_margin_2,
                Some(prev.contribution_margin_2),
            ),
        }
    }
}

/// Roll-up over the operating departments only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalFigures {
    pub revenue: Money,
    pub cost_of_goods: Money,
    pub personnel: Money,
    pub contribution_margin_1: Money,
    pub contribution_margin_2: Money,
}

impl TotalFigures {
    fn add(&mut self, figures: &KpiFigures) {
        self.revenue += figures.revenue;
        self.cost_of_goods += figures.cost_of_goods;
        self.personnel += figures.personnel;
        self.contribution_margin_1 += figures.contribution_margin_1;
        self.contribution_margin_2 += figures.contribution_margin_2;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiTotals {
    pub period: Period,
    pub current: TotalFigures,
    pub prior_year: TotalFigures,
}

fn category_totals(
    accounts: &[&Account],
    index: &BalanceIndex<'_>,
    period: Period,
) -> HashMap<KpiCategory, Money> {
    let mut totals: HashMap<KpiCategory, Money> = HashMap::new();
    for account in accounts {
        if let Some(net) = index.net(&account.number, period) {
            *totals.entry(account.kpi_category).or_default() += net;
        }
    }
    totals
}

/// KPIs for every operating and service department, operating first.
pub fn compute_department_kpis(
    accounts: &[Account],
    balances: &[MonthlyBalance],
    period: Period,
) -> Vec<DepartmentKpi> {
    let index = BalanceIndex::new(balances);
    let prior_year = period.prior_year();

    Area::OPERATING
        .iter()
        .chain(Area::SERVICE.iter())
        .map(|&area| {
            let members: Vec<&Account> = accounts.iter().filter(|a| a.area == area).collect();
            let current = category_totals(&members, &index, period);
            let previous = category_totals(&members, &index, prior_year);
            DepartmentKpi {
                area,
                period,
                current: KpiFigures::from_category_totals(&current),
                prior_year: KpiFigures::from_category_totals(&previous),
            }
        })
        .collect()
}

/// Sums the operating departments of `kpis`. Service departments are ignored.
pub fn compute_kpi_totals(kpis: &[DepartmentKpi], period: Period) -> KpiTotals {
    let mut totals = KpiTotals {
        period,
        current: TotalFigures::default(),
        prior_year: TotalFigures::default(),
    };
    for kpi in kpis.iter().filter(|k| k.area.is_operating()) {
        totals.current.add(&kpi.current);
        totals.prior_year.add(&kpi.prior_year);
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::Classifier;

    fn p(year: i32, month: u32) -> Period {
        Period::new(year, month).unwrap()
    }

    fn debit(number: &str, period: Period, cents: i64) -> MonthlyBalance {
        MonthlyBalance::new(number, period, Money::from_cents(cents), Money::zero())
    }

    fn credit(number: &str, period: Period, cents: i64) -> MonthlyBalance {
        MonthlyBalance::new(number, period, Money::zero(), Money::from_cents(cents))
    }

    fn setup() -> (Vec<Account>, Vec<MonthlyBalance>) {
        let c = Classifier::standard();
        let accounts = vec![
            Account::new("4100", "Erlöse Speisen", &c),
            Account::new("5100", "Wareneinsatz Speisen", &c),
            Account::new("6230", "Löhne Küche", &c),
            Account::new("4008", "Zimmererlöse", &c),
            Account::new("6450", "Strom", &c),
        ];
        let now = p(2024, 10);
        let last_year = p(2023, 10);
        let balances = vec![
            credit("4100", now, 100_000),
            debit("5100", now, 30_000),
            debit("6230", now, 25_000),
            credit("4008", now, 200_000),
            debit("6450", now, 12_000),
            credit("4100", last_year, 80_000),
            debit("5100", last_year, 20_000),
        ];
        (accounts, balances)
    }

    fn find(kpis: &[DepartmentKpi], area: Area) -> &DepartmentKpi {
        kpis.iter().find(|k| k.area == area).unwrap()
    }

    #[test]
    fn covers_operating_then_service_areas() {
        let (accounts, balances) = setup();
        let kpis = compute_department_kpis(&accounts, &balances, p(2024, 10));
        let areas: Vec<_> = kpis.iter().map(|k| k.area).collect();
        let expected: Vec<_> = Area::OPERATING.iter().chain(Area::SERVICE.iter()).copied().collect();
        assert_eq!(areas, expected);
    }

    #[test]
    fn department_figures_use_magnitudes() {
        let (accounts, balances) = setup();
        let kpis = compute_department_kpis(&accounts, &balances, p(2024, 10));

        let fb = find(&kpis, Area::FoodBeverage);
        assert_eq!(fb.current.revenue, Money::from_cents(100_000));
        assert_eq!(fb.current.cost_of_goods, Money::from_cents(30_000));
        assert_eq!(fb.current.contribution_margin_1, Money::from_cents(70_000));
        assert_eq!(fb.prior_year.revenue, Money::from_cents(80_000));
        assert_eq!(fb.prior_year.contribution_margin_1, Money::from_cents(60_000));

        // Löhne Küche is classified as personnel area, not F&B
        let personnel = find(&kpis, Area::Personnel);
        assert_eq!(personnel.current.personnel, Money::from_cents(25_000));
        assert_eq!(personnel.current.contribution_margin_2, Money::from_cents(-25_000));

        let energy = find(&kpis, Area::Energy);
        assert_eq!(energy.current.energy, Money::from_cents(12_000));
    }

    #[test]
    fn contribution_margin_identity_holds() {
        let (accounts, balances) = setup();
        for kpi in compute_department_kpis(&accounts, &balances, p(2024, 10)) {
            for f in [kpi.current, kpi.prior_year] {
                assert_eq!(f.contribution_margin_1, f.revenue - f.cost_of_goods);
                assert_eq!(f.contribution_margin_2, f.contribution_margin_1 - f.personnel);
            }
        }
    }

    #[test]
    fn totals_only_count_operating_areas() {
        let (accounts, balances) = setup();
        let kpis = compute_department_kpis(&accounts, &balances, p(2024, 10));
        let totals = compute_kpi_totals(&kpis, p(2024, 10));
        assert_eq!(totals.current.revenue, Money::from_cents(300_000));
        assert_eq!(totals.current.cost_of_goods, Money::from_cents(30_000));
        // personnel sits in a service area
        assert_eq!(totals.current.personnel, Money::zero());
        assert_eq!(totals.current.contribution_margin_1, Money::from_cents(270_000));
        assert_eq!(totals.current.contribution_margin_2, Money::from_cents(270_000));
        assert_eq!(totals.prior_year.revenue, Money::from_cents(80_000));
    }

    #[test]
    fn variance_against_prior_year() {
        let (accounts, balances) = setup();
        let kpis = compute_department_kpis(&accounts, &balances, p(2024, 10));
        let v = find(&kpis, Area::FoodBeverage).variance();
        assert_eq!(v.revenue_diff, Some(Money::from_cents(20_000)));
        assert_eq!(v.revenue_diff_percent, Some(Decimal::from(25)));

        // lodging had no revenue last year
        let lodging = find(&kpis, Area::Lodging).variance();
        assert_eq!(lodging.revenue_diff_percent, None);
    }
}
