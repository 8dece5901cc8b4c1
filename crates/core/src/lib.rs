pub mod account;
pub mod aggregate;
pub mod classify;
pub mod compare;
pub mod kpi;
pub mod ledger;
pub mod money;
pub mod period;

pub use account::{Account, Area, FlowType, KpiCategory, MonthlyBalance};
pub use aggregate::{
    aggregate_by, aggregate_by_account_class, aggregate_by_area, aggregate_by_kpi_category,
    Aggregation, AreaAggregation, AreaKey,
};
pub use classify::{account_digits, ClassificationRules, Classifier, ClassifyError, RuleSpec};
pub use compare::{compare, ComparisonRecord};
pub use kpi::{
    compute_department_kpis, compute_kpi_totals, DepartmentKpi, KpiFigures, KpiTotals,
    KpiVariance, TotalFigures,
};
pub use ledger::{ImportSummary, Ledger};
pub use money::Money;
pub use period::{ParsePeriodError, Period};
