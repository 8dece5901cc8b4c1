use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

/// A cell after numeric coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(Decimal),
    /// Anything that did not survive German number normalisation, verbatim.
    Text(String),
}

impl CellValue {
    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Text(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Cell {
    /// Trimmed field text as it appeared in the file.
    pub raw: String,
    pub value: CellValue,
}

impl Cell {
    pub fn new(raw: &str) -> Self {
        let raw = raw.trim();
        Cell {
            raw: raw.to_string(),
            value: coerce(raw),
        }
    }
}

/// One data line keyed by the header tokens, in header order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Row {
    cells: Vec<(String, Cell)>,
}

impl Row {
    pub fn headers(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(h, _)| h.as_str())
    }

    pub fn get(&self, header: &str) -> Option<&Cell> {
        self.cells
            .iter()
            .find(|(h, _)| h == header)
            .map(|(_, cell)| cell)
    }

    pub fn value(&self, header: &str) -> Option<&CellValue> {
        self.get(header).map(|c| &c.value)
    }

    /// Raw text of a cell; `None` if the column is absent or the cell is empty.
    pub fn text(&self, header: &str) -> Option<&str> {
        self.get(header)
            .map(|c| c.raw.as_str())
            .filter(|s| !s.is_empty())
    }

    pub fn number(&self, header: &str) -> Option<Decimal> {
        self.value(header).and_then(CellValue::as_number)
    }
}

/// Amounts at or above this magnitude are not read as numbers, so sums over
/// them cannot overflow.
const MAX_MAGNITUDE: i64 = 1_000_000_000_000_000;

/// Parses a number written with German conventions (`1.234,56`).
///
/// Thousands dots are dropped, the decimal comma becomes a dot, and any
/// character other than digits, signs and dots is stripped before parsing.
/// Values of a quadrillion or more are rejected.
pub fn parse_german_number(raw: &str) -> Option<Decimal> {
    let normalized: String = raw
        .replace('.', "")
        .replace(',', ".")
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, '-' | '+' | '.'))
        .collect();
    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized)
        .ok()
        .filter(|n| n.abs() < Decimal::from(MAX_MAGNITUDE))
}

fn coerce(raw: &str) -> CellValue {
    match parse_german_number(raw) {
        Some(n) => CellValue::Number(n),
        None => CellValue::Text(raw.to_string()),
    }
}

/// Splits one line, honouring double quotes. The separator is `;` when the
/// line contains one, `,` otherwise.
fn split_line(line: &str) -> Option<Vec<String>> {
    let delimiter = if line.contains(';') { b';' } else { b',' };
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(line.as_bytes());

    let mut record = csv::StringRecord::new();
    match reader.read_record(&mut record) {
        Ok(true) => Some(record.iter().map(|f| f.trim().to_string()).collect()),
        Ok(false) => None,
        Err(err) => {
            tracing::debug!(%err, line, "Unreadable line skipped");
            None
        }
    }
}

/// Turns delimited text into rows keyed by the first non-blank line.
///
/// Never fails: blank lines are skipped and lines with fewer fields than the
/// header are dropped. Callers should check the row count.
pub fn parse_delimited_text(text: &str) -> Vec<Row> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = text.lines().filter(|l| !l.trim().is_empty());

    let Some(headers) = lines.by_ref().find_map(split_line) else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for line in lines {
        let Some(fields) = split_line(line) else {
            dropped += 1;
            continue;
        };
        if fields.len() < headers.len() {
            dropped += 1;
            continue;
        }
        let cells = headers
            .iter()
            .zip(fields.iter())
            .map(|(h, f)| (h.clone(), Cell::new(f)))
            .collect();
        rows.push(Row { cells });
    }

    if dropped > 0 {
        tracing::debug!(dropped, kept = rows.len(), "Dropped malformed rows");
    }
    rows
}
