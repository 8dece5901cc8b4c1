use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use saldo_core::Period;

fn re_file_period() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(?i)^saldenliste-(\d{2})-(\d{4})\.csv$").expect("invalid regex")
    })
}

/// Reads the period from an export named `Saldenliste-MM-YYYY.csv`.
///
/// Directory components are ignored. Returns `None` for any other name.
pub fn parse_file_name_to_period(name: &str) -> Option<Period> {
    let file_name = Path::new(name).file_name()?.to_str()?;
    let caps = re_file_period().captures(file_name)?;
    let month = caps[1].parse().ok()?;
    let year = caps[2].parse().ok()?;
    Period::new(year, month)
}
