use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

use crate::account::{Area, FlowType, KpiCategory};

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("Failed to parse rule file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid rule #{index} for area {area}: {reason}")]
    InvalidRule {
        index: usize,
        area: Area,
        reason: String,
    },
}

/// How a single area rule inspects an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleSpec {
    /// Regex on the account number as written.
    Account(&'static str),
    /// Closed range on the digits of the account number.
    Range(u64, u64),
    /// Case-insensitive regex on the account label.
    Label(&'static str),
}

/// Known exceptions to the range scheme. Checked before any rule.
pub const DEFAULT_AREA_OVERRIDES: &[(&str, Area)] = &[
    // Strom an E-Ladesäulen and Nebenkostenumlage are booked as revenue
    // but belong to the energy budget.
    ("4068", Area::Energy),
    ("4069", Area::Energy),
    ("4830", Area::Financing),
    ("6390", Area::Administration),
];

/// Area rules in evaluation order. The first matching rule wins.
pub const DEFAULT_AREA_RULES: &[(Area, RuleSpec)] = &[
    (Area::Financing, RuleSpec::Account(r"^7[0-4]\d{2}$")),
    // Erlöse
    (Area::Lodging, RuleSpec::Range(4000, 4099)),
    (Area::FoodBeverage, RuleSpec::Range(4100, 4299)),
    (Area::Spa, RuleSpec::Range(4300, 4399)),
    (Area::Medical, RuleSpec::Range(4400, 4449)),
    (Area::Retail, RuleSpec::Range(4450, 4499)),
    // Wareneinsatz
    (Area::FoodBeverage, RuleSpec::Range(5000, 5199)),
    (Area::Spa, RuleSpec::Range(5200, 5299)),
    (Area::Medical, RuleSpec::Range(5300, 5349)),
    (Area::Retail, RuleSpec::Range(5350, 5399)),
    // Betriebliche Aufwendungen
    (Area::Personnel, RuleSpec::Range(6200, 6399)),
    (Area::Energy, RuleSpec::Range(6400, 6499)),
    (Area::Technical, RuleSpec::Range(6500, 6599)),
    (Area::Marketing, RuleSpec::Range(6600, 6699)),
    (Area::Administration, RuleSpec::Range(6700, 6899)),
    (
        Area::Lodging,
        RuleSpec::Label(r"zimmer|logis|übernachtung|uebernachtung|beherbergung|unterkunft"),
    ),
    (
        Area::FoodBeverage,
        RuleSpec::Label(
            r"küche|kueche|speisen|getränke|getraenke|restaurant|frühstück|fruehstueck|lebensmittel|bankett",
        ),
    ),
    (
        Area::Spa,
        RuleSpec::Label(r"\bspa\b|wellness|massage|sauna|kosmetik|beauty|therme"),
    ),
    (
        Area::Medical,
        RuleSpec::Label(r"arzt|ärzt|medizin|physio|therapie|labor"),
    ),
    (Area::Retail, RuleSpec::Label(r"shop|boutique|handelsware")),
    (
        Area::Personnel,
        RuleSpec::Label(r"lohn|löhne|gehalt|gehälter|personal|sozialversicherung|sozialabgaben"),
    ),
    (
        Area::Energy,
        RuleSpec::Label(r"strom|energie|heizöl|heizoel|fernwärme|\bgas\b|wasser"),
    ),
    (
        Area::Marketing,
        RuleSpec::Label(r"werbung|marketing|anzeige|prospekt|messe"),
    ),
    (
        Area::Technical,
        RuleSpec::Label(r"instandhaltung|reparatur|wartung|technik"),
    ),
    (
        Area::Administration,
        RuleSpec::Label(
            r"verwaltung|büro|buero|buchführung|steuerberatung|rechtsberatung|versicherung|edv|telefon|porto",
        ),
    ),
    (
        Area::Financing,
        RuleSpec::Label(r"zins|darlehen|kredit|bankgebühr|bankgebuehr"),
    ),
];

/// Label checks for KPI categories, in priority order. Depreciation and
/// interest come first so that e.g. "Zinsen Energiedarlehen" is interest.
const KPI_LABEL_PATTERNS: &[(KpiCategory, &str)] = &[
    (KpiCategory::Depreciation, r"abschreibung|\bafa\b"),
    (KpiCategory::Interest, r"zins"),
    (
        KpiCategory::Energy,
        r"strom|energie|heizöl|heizoel|fernwärme|\bgas\b|wasser",
    ),
    (
        KpiCategory::Marketing,
        r"werbung|marketing|anzeige|prospekt|messe",
    ),
];

#[derive(Debug, Clone)]
enum Matcher {
    AccountPattern(Regex),
    Range { from: u64, to: u64 },
    LabelPattern(Regex),
}

#[derive(Debug, Clone)]
struct AreaRule {
    area: Area,
    matcher: Matcher,
}

impl AreaRule {
    fn matches(&self, number: &str, digits: Option<u64>, label: &str) -> bool {
        match &self.matcher {
            Matcher::AccountPattern(re) => re.is_match(number),
            Matcher::Range { from, to } => digits.is_some_and(|n| (*from..=*to).contains(&n)),
            Matcher::LabelPattern(re) => re.is_match(label),
        }
    }
}

/// On-disk form of a rule set.
#[derive(Debug, Deserialize)]
struct RuleSetConfig {
    #[serde(default)]
    overrides: BTreeMap<String, Area>,
    #[serde(default)]
    rules: Vec<RuleConfig>,
}

#[derive(Debug, Deserialize)]
struct RuleConfig {
    area: Area,
    account: Option<String>,
    range: Option<[u64; 2]>,
    label: Option<String>,
}

/// Immutable area rule set: override table plus ordered rules.
#[derive(Debug, Clone)]
pub struct ClassificationRules {
    overrides: HashMap<String, Area>,
    rules: Vec<AreaRule>,
}

impl ClassificationRules {
    /// The built-in chart of accounts for the resort.
    pub fn standard() -> Self {
        let overrides = DEFAULT_AREA_OVERRIDES
            .iter()
            .map(|(number, area)| (number.to_string(), *area))
            .collect();
        let rules = DEFAULT_AREA_RULES
            .iter()
            .map(|(area, spec)| {
                let matcher = match *spec {
                    RuleSpec::Account(p) => Matcher::AccountPattern(
                        Regex::new(p).expect("built-in account pattern is valid"),
                    ),
                    RuleSpec::Range(from, to) => Matcher::Range { from, to },
                    RuleSpec::Label(p) => Matcher::LabelPattern(
                        label_regex(p).expect("built-in label pattern is valid"),
                    ),
                };
                AreaRule { area: *area, matcher }
            })
            .collect();
        Self { overrides, rules }
    }

    /// Parses a rule set from TOML:
    ///
    /// ```toml
    /// [overrides]
    /// "4068" = "energy"
    ///
    /// [[rules]]
    /// area = "lodging"
    /// range = [4000, 4099]
    ///
    /// [[rules]]
    /// area = "spa"
    /// label = "wellness|sauna"
    /// ```
    pub fn from_toml(toml_content: &str) -> Result<Self, ClassifyError> {
        let config: RuleSetConfig = toml::from_str(toml_content)?;

        let overrides = config
            .overrides
            .into_iter()
            .map(|(number, area)| (number.trim().to_string(), area))
            .collect();

        let rules = config
            .rules
            .into_iter()
            .enumerate()
            .map(|(index, rule)| compile_rule(index, rule))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { overrides, rules })
    }

    pub fn override_for(&self, number: &str) -> Option<Area> {
        self.overrides.get(number.trim()).copied()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

fn compile_rule(index: usize, rule: RuleConfig) -> Result<AreaRule, ClassifyError> {
    let invalid = |reason: &str| ClassifyError::InvalidRule {
        index,
        area: rule.area,
        reason: reason.to_string(),
    };

    let matcher = match (&rule.account, rule.range, &rule.label) {
        (Some(pattern), None, None) => {
            Matcher::AccountPattern(Regex::new(pattern).map_err(|source| {
                ClassifyError::InvalidPattern {
                    pattern: pattern.clone(),
                    source,
                }
            })?)
        }
        (None, Some([from, to]), None) => {
            if from > to {
                return Err(invalid("range start is greater than range end"));
            }
            Matcher::Range { from, to }
        }
        (None, None, Some(pattern)) => Matcher::LabelPattern(label_regex(pattern)?),
        (None, None, None) => return Err(invalid("no matcher set")),
        _ => return Err(invalid("only one of account, range, label may be set")),
    };

    Ok(AreaRule {
        area: rule.area,
        matcher,
    })
}

fn label_regex(pattern: &str) -> Result<Regex, ClassifyError> {
    RegexBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map_err(|source| ClassifyError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Digits of an account number read as an integer. `None` if there are no
/// digits or the value overflows.
pub fn account_digits(number: &str) -> Option<u64> {
    let digits: String = number.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Pure tagging of accounts into area, flow type and KPI category.
///
/// Every input yields a result for all three tags; unmatched accounts fall
/// into [`Area::Other`], [`FlowType::Neutral`] and [`KpiCategory::Other`].
#[derive(Debug, Clone)]
pub struct Classifier {
    rules: ClassificationRules,
    kpi_labels: Vec<(KpiCategory, Regex)>,
}

impl Classifier {
    pub fn new(rules: ClassificationRules) -> Self {
        let kpi_labels = KPI_LABEL_PATTERNS
            .iter()
            .map(|(category, pattern)| {
                (
                    *category,
                    label_regex(pattern).expect("built-in KPI pattern is valid"),
                )
            })
            .collect();
        Self { rules, kpi_labels }
    }

    pub fn standard() -> Self {
        Self::new(ClassificationRules::standard())
    }

    pub fn from_toml(toml_content: &str) -> Result<Self, ClassifyError> {
        Ok(Self::new(ClassificationRules::from_toml(toml_content)?))
    }

    /// Override table, then ordered rules, then [`Area::Other`].
    pub fn area(&self, number: &str, label: &str) -> Area {
        let number = number.trim();
        if let Some(area) = self.rules.override_for(number) {
            return area;
        }
        let digits = account_digits(number);
        self.rules
            .rules
            .iter()
            .find(|rule| rule.matches(number, digits, label))
            .map_or(Area::Other, |rule| rule.area)
    }

    /// Depends on the account number only: 4000–4999 revenue, 5000–8999 expense.
    pub fn flow_type(number: &str) -> FlowType {
        match account_digits(number) {
            Some(4000..=4999) => FlowType::Revenue,
            Some(5000..=8999) => FlowType::Expense,
            _ => FlowType::Neutral,
        }
    }

    pub fn kpi_category(&self, number: &str, label: &str) -> KpiCategory {
        let digits = account_digits(number);
        match digits {
            Some(4000..=4999) => return KpiCategory::Revenue,
            Some(5000..=5999) => return KpiCategory::CostOfGoods,
            Some(6200..=6399) => return KpiCategory::Personnel,
            _ => {}
        }

        if let Some((category, _)) = self.kpi_labels.iter().find(|(_, re)| re.is_match(label)) {
            return *category;
        }

        match digits {
            Some(6000..=7999) => KpiCategory::OperatingExpense,
            _ => KpiCategory::Other,
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── area ──────────────────────────────────────────────────────────────────

    #[test]
    fn override_beats_range_rule() {
        let c = Classifier::standard();
        // 4068 sits inside the lodging revenue range
        assert_eq!(c.area("4060", "Zimmererlöse Gruppen"), Area::Lodging);
        assert_eq!(c.area("4068", "Erlöse Ladestrom"), Area::Energy);
    }

    #[test]
    fn range_rules() {
        let c = Classifier::standard();
        assert_eq!(c.area("4008", "Zimmererlöse"), Area::Lodging);
        assert_eq!(c.area("4150", "Erlöse"), Area::FoodBeverage);
        assert_eq!(c.area("4310", "Erlöse"), Area::Spa);
        assert_eq!(c.area("5100", "Wareneinsatz"), Area::FoodBeverage);
        assert_eq!(c.area("6210", "Gehälter"), Area::Personnel);
        assert_eq!(c.area("6520", "Aufwand"), Area::Technical);
    }

    #[test]
    fn account_pattern_rule() {
        let c = Classifier::standard();
        assert_eq!(c.area("7310", "Aufwand"), Area::Financing);
    }

    #[test]
    fn label_rules_are_case_insensitive() {
        let c = Classifier::standard();
        assert_eq!(c.area("1800", "SAUNA Zubehör"), Area::Spa);
        assert_eq!(c.area("8100", "Physiotherapie Praxis"), Area::Medical);
        assert_eq!(c.area("9000", "Fernwärme"), Area::Energy);
    }

    #[test]
    fn unmatched_falls_back_to_other() {
        let c = Classifier::standard();
        assert_eq!(c.area("4500", "Lieferantenreklamation"), Area::Other);
        assert_eq!(c.area("", ""), Area::Other);
        assert_eq!(c.area("abc", "xyz"), Area::Other);
    }

    #[test]
    fn classification_is_idempotent() {
        let c = Classifier::standard();
        for (number, label) in [("4068", "Strom"), ("6450", "Gas"), ("X1", ""), ("6810", "Zinsen")] {
            assert_eq!(c.area(number, label), c.area(number, label));
            assert_eq!(Classifier::flow_type(number), Classifier::flow_type(number));
            assert_eq!(c.kpi_category(number, label), c.kpi_category(number, label));
        }
    }

    // ── flow type ─────────────────────────────────────────────────────────────

    #[test]
    fn flow_type_ignores_label() {
        assert_eq!(Classifier::flow_type("4500"), FlowType::Revenue);
        assert_eq!(Classifier::flow_type("4999"), FlowType::Revenue);
        assert_eq!(Classifier::flow_type("5000"), FlowType::Expense);
        assert_eq!(Classifier::flow_type("8999"), FlowType::Expense);
        assert_eq!(Classifier::flow_type("9000"), FlowType::Neutral);
        assert_eq!(Classifier::flow_type("3999"), FlowType::Neutral);
        assert_eq!(Classifier::flow_type("K-4.100"), FlowType::Revenue);
        assert_eq!(Classifier::flow_type("n/a"), FlowType::Neutral);
    }

    // ── kpi category ──────────────────────────────────────────────────────────

    #[test]
    fn kpi_ranges_come_first() {
        let c = Classifier::standard();
        assert_eq!(c.kpi_category("4068", "Erlöse Ladestrom"), KpiCategory::Revenue);
        assert_eq!(c.kpi_category("5100", "Wareneinsatz Werbemittel"), KpiCategory::CostOfGoods);
        assert_eq!(c.kpi_category("6300", "Sozialabgaben"), KpiCategory::Personnel);
        assert_eq!(c.kpi_category("6220", "AfA Photovoltaik"), KpiCategory::Personnel);
    }

    #[test]
    fn kpi_depreciation_and_interest_precede_energy() {
        let c = Classifier::standard();
        assert_eq!(c.kpi_category("6800", "Abschreibung Energieanlage"), KpiCategory::Depreciation);
        assert_eq!(c.kpi_category("7300", "Zinsen Energiedarlehen"), KpiCategory::Interest);
        assert_eq!(c.kpi_category("6450", "Strom"), KpiCategory::Energy);
        assert_eq!(c.kpi_category("6600", "Werbung Print"), KpiCategory::Marketing);
    }

    #[test]
    fn kpi_operating_expense_fallback() {
        let c = Classifier::standard();
        assert_eq!(c.kpi_category("6500", "Reparaturen"), KpiCategory::OperatingExpense);
        assert_eq!(c.kpi_category("7999", "Sonstiges"), KpiCategory::OperatingExpense);
        assert_eq!(c.kpi_category("8000", "Sonstiges"), KpiCategory::Other);
        assert_eq!(c.kpi_category("1200", "Bank"), KpiCategory::Other);
    }

    // ── rule files ────────────────────────────────────────────────────────────

    #[test]
    fn from_toml_substitutes_rule_set() {
        let c = Classifier::from_toml(
            r#"
            [overrides]
            "4001" = "spa"

            [[rules]]
            area = "lodging"
            range = [4000, 4999]

            [[rules]]
            area = "marketing"
            label = "werbung"

            [[rules]]
            area = "financing"
            account = "^7"
            "#,
        )
        .unwrap();
        assert_eq!(c.area("4001", "Zimmer"), Area::Spa);
        assert_eq!(c.area("4300", "Massagen"), Area::Lodging);
        assert_eq!(c.area("9000", "WERBUNG"), Area::Marketing);
        assert_eq!(c.area("7100", ""), Area::Financing);
        assert_eq!(c.area("6000", ""), Area::Other);
    }

    #[test]
    fn from_toml_rejects_ambiguous_rule() {
        let result = ClassificationRules::from_toml(
            r#"
            [[rules]]
            area = "spa"
            range = [1, 2]
            label = "spa"
            "#,
        );
        assert!(matches!(result, Err(ClassifyError::InvalidRule { index: 0, .. })));
    }

    #[test]
    fn from_toml_rejects_empty_rule_and_reversed_range() {
        let empty = ClassificationRules::from_toml("[[rules]]\narea = \"spa\"\n");
        assert!(matches!(empty, Err(ClassifyError::InvalidRule { .. })));

        let reversed = ClassificationRules::from_toml("[[rules]]\narea = \"spa\"\nrange = [10, 1]\n");
        assert!(matches!(reversed, Err(ClassifyError::InvalidRule { .. })));
    }

    #[test]
    fn from_toml_reports_bad_pattern() {
        let result = ClassificationRules::from_toml("[[rules]]\narea = \"spa\"\nlabel = \"(\"\n");
        assert!(matches!(result, Err(ClassifyError::InvalidPattern { .. })));
    }

    #[test]
    fn from_toml_rejects_unknown_area() {
        let result = ClassificationRules::from_toml("[overrides]\n\"4000\" = \"casino\"\n");
        assert!(matches!(result, Err(ClassifyError::Toml(_))));
    }

    #[test]
    fn standard_rules_compile() {
        let rules = ClassificationRules::standard();
        assert_eq!(rules.rule_count(), DEFAULT_AREA_RULES.len());
        assert_eq!(rules.override_for("4068"), Some(Area::Energy));
        assert_eq!(rules.override_for("4000"), None);
    }

    #[test]
    fn account_digits_strips_non_digits() {
        assert_eq!(account_digits("K-4.100"), Some(4100));
        assert_eq!(account_digits("abc"), None);
        assert_eq!(account_digits("99999999999999999999999"), None);
    }
}
