use crate::error::{AnalysisError, Result};
use std::path::Path;

/// Sampling rate assumed for ECG/EMG exports without a header hint, Hz.
pub const DEFAULT_SAMPLE_RATE: f64 = 1000.0;

/// How the tokens of each line map onto numeric columns.
#[derive(Debug, Clone, Copy)]
pub enum ColumnRule {
    /// Keep the first float-parseable token per line; drop lines with none.
    FirstNumeric,
    /// Take up to N leading tokens, substituting 0 for unparsable ones;
    /// drop lines with no tokens at all.
    Leading(usize),
}

/// A parsed numeric table plus whatever the header line told us.
#[derive(Debug, Clone)]
pub struct NumericTable {
    pub rows: Vec<Vec<f64>>,
    /// Sampling rate from a "rate ... <integer>" header hint, if any.
    pub rate_hint: Option<f64>,
}

impl NumericTable {
    pub fn sample_rate(&self) -> f64 {
        self.rate_hint.unwrap_or(DEFAULT_SAMPLE_RATE)
    }

    /// The n-th column as a contiguous series, skipping shorter rows.
    pub fn column(&self, n: usize) -> Vec<f64> {
        self.rows.iter().filter_map(|r| r.get(n).copied()).collect()
    }
}

/// Split a line on any run of commas/whitespace.
pub fn split_tokens(line: &str) -> impl Iterator<Item = &str> {
    line.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|t| !t.is_empty())
}

fn parse_token(token: &str) -> Option<f64> {
    token.parse::<f64>().ok().filter(|v| !v.is_nan())
}

/// A first line with any alphabetic content is a header, not data.
fn is_header(line: &str) -> bool {
    line.chars().any(|c| c.is_ascii_alphabetic())
}

/// Scan a header line for a "rate ... <integer>" hint, case-insensitively.
/// The first integer after the first occurrence of "rate" wins.
fn rate_hint(header: &str) -> Option<f64> {
    let lower = header.to_ascii_lowercase();
    let tail = &lower[lower.find("rate")? + "rate".len()..];
    let start = tail.find(|c: char| c.is_ascii_digit())?;
    let digits: &str = tail[start..]
        .split(|c: char| !c.is_ascii_digit())
        .next()
        .unwrap_or("");
    digits.parse::<f64>().ok().filter(|r| *r > 0.0)
}

/// Parse raw text into numeric rows. Malformed individual tokens never abort
/// the parse; the only failure is an empty resulting dataset.
pub fn parse_table(text: &str, rule: ColumnRule) -> Result<NumericTable> {
    let mut lines = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .peekable();

    let mut hint = None;
    if let Some(first) = lines.peek() {
        if is_header(first) {
            hint = rate_hint(first);
            lines.next();
        }
    }

    let mut rows = Vec::new();
    for line in lines {
        match rule {
            ColumnRule::FirstNumeric => {
                if let Some(v) = split_tokens(line).find_map(parse_token) {
                    rows.push(vec![v]);
                }
            }
            ColumnRule::Leading(n) => {
                let row: Vec<f64> = split_tokens(line)
                    .take(n)
                    .map(|t| parse_token(t).unwrap_or(0.0))
                    .collect();
                if !row.is_empty() {
                    rows.push(row);
                }
            }
        }
    }

    if rows.is_empty() {
        return Err(AnalysisError::NoValidData);
    }
    Ok(NumericTable {
        rows,
        rate_hint: hint,
    })
}

/// Read and parse one whole file.
pub fn read_table(path: &Path, rule: ColumnRule) -> Result<NumericTable> {
    let text = read_text(path)?;
    parse_table(&text, rule)
}

pub(crate) fn read_text(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(AnalysisError::FileNotFound(path.to_path_buf()));
    }
    std::fs::read_to_string(path).map_err(|source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    })
}
