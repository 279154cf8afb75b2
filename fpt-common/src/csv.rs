//! CSV ingestion and export for the matrix
//!
//! Parsing is deliberately forgiving: line endings may be LF, CRLF or CR,
//! blank lines are skipped, unquoted values are trimmed, short rows are
//! dropped and surplus values beyond the header are ignored. Quoted values
//! may contain commas, newlines and `""` for a literal quote.

use tracing::{debug, info};

use crate::model::{self, Row, Table};
use crate::{Error, Result};

/// Columns an uploaded matrix must carry (evidence type is optional)
pub const REQUIRED_COLUMNS: [&str; 6] = [
    model::PRIORITY,
    model::RISK,
    model::CONFIDENCE,
    model::SIZE,
    model::TIMING,
    model::RECOMMENDATION,
];

#[derive(Default)]
struct Field {
    text: String,
    quoted: bool,
    closed: bool,
}

impl Field {
    fn finish(self) -> String {
        if self.quoted {
            self.text
        } else {
            self.text.trim().to_string()
        }
    }
}

/// Split CSV text into records of raw values
fn records(text: &str) -> Vec<Vec<String>> {
    let mut records = Vec::new();
    let mut record: Vec<String> = Vec::new();
    let mut field = Field::default();
    let mut in_quotes = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.text.push('"');
                } else {
                    in_quotes = false;
                    field.closed = field.quoted;
                }
            }
            '"' => {
                if !field.quoted && field.text.trim().is_empty() {
                    field.text.clear();
                    field.quoted = true;
                }
                in_quotes = true;
            }
            ',' if !in_quotes => {
                record.push(std::mem::take(&mut field).finish());
            }
            '\r' | '\n' if !in_quotes => {
                if c == '\r' && chars.peek() == Some(&'\n') {
                    chars.next();
                }
                record.push(std::mem::take(&mut field).finish());
                records.push(std::mem::take(&mut record));
            }
            c if field.closed && c.is_whitespace() => {}
            c => field.text.push(c),
        }
    }

    record.push(field.finish());
    records.push(record);

    // A line holding nothing but whitespace is not a record
    records
        .into_iter()
        .filter(|r| !(r.len() == 1 && r[0].is_empty()))
        .collect()
}

/// Parse CSV text (header line plus data lines) into rows keyed by header
pub fn parse_csv(text: &str) -> Table {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let mut lines = records(text).into_iter();
    let Some(headers) = lines.next() else {
        return Vec::new();
    };

    let mut rows = Vec::new();
    for (index, values) in lines.enumerate() {
        if values.len() < 2 {
            debug!("Skipping CSV row {}: not enough values", index + 2);
            continue;
        }

        let row: Row = headers
            .iter()
            .zip(values)
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value))
            .collect();

        if !row.is_empty() {
            rows.push(row);
        }
    }

    rows
}

fn squash(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !matches!(c, '_' | ' ' | '-'))
        .collect()
}

/// Required columns absent from the first row's headers
pub fn missing_required_columns(table: &[Row]) -> Vec<&'static str> {
    let available: Vec<String> = model::table_columns(table).iter().map(|c| squash(c)).collect();

    REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|required| !available.contains(&squash(required)))
        .collect()
}

/// Rename columns by position: the first header becomes `Priority`, the
/// second `Risk`, and so on through the required columns. Later columns
/// keep their names.
pub fn force_map(table: Table) -> Table {
    let available = model::table_columns(&table);
    let mapping: Vec<(String, &str)> = available
        .into_iter()
        .zip(REQUIRED_COLUMNS)
        .collect();
    debug!("Force-mapping CSV columns: {:?}", mapping);

    table
        .into_iter()
        .map(|row| {
            row.iter()
                .map(|(col, value)| {
                    let target = mapping
                        .iter()
                        .find(|(from, _)| from == col)
                        .map(|(_, to)| to.to_string())
                        .unwrap_or_else(|| col.to_string());
                    (target, value.to_string())
                })
                .collect()
        })
        .collect()
}

/// Turn uploaded CSV text into a table ready to replace the matrix.
///
/// Fails on empty input, on input without data rows, and (unless
/// `force_load`) when a required column is missing.
pub fn ingest(text: &str, force_load: bool) -> Result<Table> {
    if text.trim().is_empty() {
        return Err(Error::Csv("CSV input is empty".to_string()));
    }

    let table = parse_csv(text);
    if table.is_empty() {
        return Err(Error::Csv("No valid data found in CSV".to_string()));
    }

    if force_load {
        let table = force_map(table);
        info!("Loaded {} CSV rows with positional column mapping", table.len());
        return Ok(table);
    }

    let missing = missing_required_columns(&table);
    if !missing.is_empty() {
        return Err(Error::Csv(format!(
            "CSV is missing required columns: {}",
            missing.join(", ")
        )));
    }

    info!("Loaded {} CSV rows", table.len());
    Ok(table)
}

fn escape(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Export a table as CSV; the header is every column in first-seen order
pub fn to_csv(table: &[Row]) -> String {
    let mut headers: Vec<&str> = Vec::new();
    for row in table {
        for col in row.columns() {
            if !headers.contains(&col) {
                headers.push(col);
            }
        }
    }

    let mut out = headers.iter().map(|h| escape(h)).collect::<Vec<_>>().join(",");
    out.push('\n');
    for row in table {
        let line = headers
            .iter()
            .map(|h| escape(row.value(h)))
            .collect::<Vec<_>>()
            .join(",");
        out.push_str(&line);
        out.push('\n');
    }
    out
}
