use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classify::Classifier;
use crate::money::Money;
use crate::period::Period;

/// Organisational area (Bereich) an account's activity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Lodging,
    FoodBeverage,
    Spa,
    Medical,
    Retail,
    Administration,
    Technical,
    Energy,
    Marketing,
    Personnel,
    Financing,
    Other,
}

impl Area {
    pub const ALL: [Area; 12] = [
        Area::Lodging,
        Area::FoodBeverage,
        Area::Spa,
        Area::Medical,
        Area::Retail,
        Area::Administration,
        Area::Technical,
        Area::Energy,
        Area::Marketing,
        Area::Personnel,
        Area::Financing,
        Area::Other,
    ];

    /// Revenue-generating departments. Only these enter the overall KPI total.
    pub const OPERATING: [Area; 5] = [
        Area::Lodging,
        Area::FoodBeverage,
        Area::Spa,
        Area::Medical,
        Area::Retail,
    ];

    pub const SERVICE: [Area; 5] = [
        Area::Administration,
        Area::Technical,
        Area::Energy,
        Area::Marketing,
        Area::Personnel,
    ];

    pub fn is_operating(self) -> bool {
        Area::OPERATING.contains(&self)
    }
}

impl fmt::Display for Area {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Area::Lodging => "Logis",
            Area::FoodBeverage => "F&B",
            Area::Spa => "Spa & Wellness",
            Area::Medical => "Medizin",
            Area::Retail => "Shop",
            Area::Administration => "Verwaltung",
            Area::Technical => "Technik",
            Area::Energy => "Energie",
            Area::Marketing => "Marketing",
            Area::Personnel => "Personal",
            Area::Financing => "Finanzierung",
            Area::Other => "Sonstiges",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlowType {
    Revenue,
    Expense,
    Neutral,
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlowType::Revenue => write!(f, "revenue"),
            FlowType::Expense => write!(f, "expense"),
            FlowType::Neutral => write!(f, "neutral"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KpiCategory {
    Revenue,
    CostOfGoods,
    Personnel,
    Energy,
    Marketing,
    OperatingExpense,
    Depreciation,
    Interest,
    Other,
}

impl fmt::Display for KpiCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KpiCategory::Revenue => write!(f, "revenue"),
            KpiCategory::CostOfGoods => write!(f, "cost_of_goods"),
            KpiCategory::Personnel => write!(f, "personnel"),
            KpiCategory::Energy => write!(f, "energy"),
            KpiCategory::Marketing => write!(f, "marketing"),
            KpiCategory::OperatingExpense => write!(f, "operating_expense"),
            KpiCategory::Depreciation => write!(f, "depreciation"),
            KpiCategory::Interest => write!(f, "interest"),
            KpiCategory::Other => write!(f, "other"),
        }
    }
}

/// An entry of the chart of accounts as first seen in an import.
///
/// The classification tags are computed once on construction and never change,
/// even if a later import carries a different label for the same number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub number: String,
    pub label: String,
    /// Leading digit of the account number (0–9), if it has one.
    pub account_class: Option<u8>,
    pub area: Area,
    pub flow_type: FlowType,
    pub kpi_category: KpiCategory,
}

impl Account {
    pub fn new(number: &str, label: &str, classifier: &Classifier) -> Self {
        let number = number.trim();
        let label = label.trim();
        Account {
            number: number.to_string(),
            label: label.to_string(),
            account_class: leading_class_digit(number),
            area: classifier.area(number, label),
            flow_type: Classifier::flow_type(number),
            kpi_category: classifier.kpi_category(number, label),
        }
    }
}

fn leading_class_digit(number: &str) -> Option<u8> {
    number
        .chars()
        .next()
        .and_then(|c| c.to_digit(10))
        .map(|d| d as u8)
}

/// Debit and credit totals of one account for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyBalance {
    pub account_number: String,
    pub period: Period,
    pub debit: Money,
    pub credit: Money,
    pub net: Money,
}

impl MonthlyBalance {
    /// `net` is always debit minus credit.
    pub fn new(account_number: &str, period: Period, debit: Money, credit: Money) -> Self {
        MonthlyBalance {
            account_number: account_number.trim().to_string(),
            period,
            debit,
            credit,
            net: debit - credit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_class_is_leading_digit() {
        let classifier = Classifier::standard();
        assert_eq!(Account::new("4008", "Zimmererlöse", &classifier).account_class, Some(4));
        assert_eq!(Account::new("0480", "BGA", &classifier).account_class, Some(0));
        assert_eq!(Account::new("K-12", "Kasse", &classifier).account_class, None);
    }

    #[test]
    fn account_new_trims_and_classifies() {
        let classifier = Classifier::standard();
        let account = Account::new(" 4008 ", " Zimmererlöse ", &classifier);
        assert_eq!(account.number, "4008");
        assert_eq!(account.label, "Zimmererlöse");
        assert_eq!(account.area, Area::Lodging);
        assert_eq!(account.flow_type, FlowType::Revenue);
        assert_eq!(account.kpi_category, KpiCategory::Revenue);
    }

    #[test]
    fn net_is_debit_minus_credit() {
        let period = Period::new(2024, 10).unwrap();
        let b = MonthlyBalance::new("4008", period, Money::from_cents(10_000), Money::from_cents(25_050));
        assert_eq!(b.net, Money::from_cents(-15_050));
    }

    #[test]
    fn operating_and_service_areas_are_disjoint() {
        for area in Area::OPERATING {
            assert!(!Area::SERVICE.contains(&area));
            assert!(area.is_operating());
        }
        assert!(!Area::Financing.is_operating());
    }

    #[test]
    fn serde_uses_snake_case() {
        assert_eq!(serde_json::to_string(&Area::FoodBeverage).unwrap(), "\"food_beverage\"");
        assert_eq!(
            serde_json::from_str::<KpiCategory>("\"cost_of_goods\"").unwrap(),
            KpiCategory::CostOfGoods
        );
    }
}
