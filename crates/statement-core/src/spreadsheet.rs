//! Spreadsheet input: the first worksheet (or a CSV file) as statement rows.
//!
//! The first row is a header and is skipped. Columns 1-6 map positionally to
//! date, document number, description, debit, credit and balance.

use std::io::Read;
use std::path::Path;

use calamine::{Data, Range, Reader, open_workbook_auto};

use crate::error::{Result, StatementError};

/// Number of positional columns read from each row.
pub const COLUMN_COUNT: usize = 6;

/// A numeric statement cell.
///
/// Text that does not parse as a number is kept so it can still be printed,
/// but it never contributes to a sum.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Amount {
    #[default]
    Missing,
    Value(f64),
    Text(String),
}

impl Amount {
    /// Parse free-form text the way a spreadsheet user typed it.
    pub fn parse(text: &str) -> Self {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Amount::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(v) if v.is_finite() => Amount::Value(v),
            _ => Amount::Text(trimmed.to_string()),
        }
    }

    /// Numeric value, if there is one.
    pub fn value(&self) -> Option<f64> {
        match self {
            Amount::Value(v) => Some(*v),
            _ => None,
        }
    }

    /// Contribution to a column sum (missing and non-numeric count as zero).
    pub fn or_zero(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn display(&self) -> String {
        match self {
            Amount::Missing => String::new(),
            Amount::Value(v) => format_number(*v),
            Amount::Text(s) => s.clone(),
        }
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        Amount::Value(v)
    }
}

impl From<Option<f64>> for Amount {
    fn from(v: Option<f64>) -> Self {
        v.map_or(Amount::Missing, Amount::Value)
    }
}

/// One spreadsheet line of the statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatementRow {
    pub date: String,
    pub document_number: String,
    pub description: String,
    pub debit: Amount,
    pub credit: Amount,
    pub balance: Amount,
}

impl StatementRow {
    pub fn new(
        date: impl Into<String>,
        document_number: impl Into<String>,
        description: impl Into<String>,
        debit: impl Into<Amount>,
        credit: impl Into<Amount>,
        balance: impl Into<Amount>,
    ) -> Self {
        Self {
            date: date.into(),
            document_number: document_number.into(),
            description: description.into(),
            debit: debit.into(),
            credit: credit.into(),
            balance: balance.into(),
        }
    }

    /// Display text for each column, in column order.
    pub fn cells(&self) -> [String; COLUMN_COUNT] {
        [
            self.date.clone(),
            self.document_number.clone(),
            self.description.clone(),
            self.debit.display(),
            self.credit.display(),
            self.balance.display(),
        ]
    }

    fn is_blank(&self) -> bool {
        self.cells().iter().all(|c| c.is_empty())
    }
}

/// Sum of the debit column. Missing or non-numeric cells count as zero.
pub fn debit_total(rows: &[StatementRow]) -> f64 {
    rows.iter().map(|r| r.debit.or_zero()).sum()
}

/// Shortest text that reads back as the same number (`100`, `50.5`).
pub fn format_number(v: f64) -> String {
    if v == 0.0 {
        // Avoid printing "-0".
        return "0".to_string();
    }
    v.to_string()
}

/// Read statement rows from a workbook or CSV file, chosen by extension.
pub fn read_rows(path: &Path) -> Result<Vec<StatementRow>> {
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => rows_from_csv(std::fs::File::open(path)?)?,
        "xlsx" | "xlsm" | "xlsb" | "xls" | "ods" => read_workbook_rows(path)?,
        _ => return Err(StatementError::UnsupportedFormat(path.to_path_buf())),
    };

    let skipped = rows.iter().filter(|r| matches!(r.debit, Amount::Text(_))).count();
    if skipped > 0 {
        tracing::warn!(path = %path.display(), skipped, "non-numeric debit cells count as zero");
    }
    tracing::debug!(path = %path.display(), rows = rows.len(), "read statement rows");
    Ok(rows)
}

/// Rows of the first worksheet of an Excel/ODS workbook.
pub fn read_workbook_rows(path: &Path) -> Result<Vec<StatementRow>> {
    let mut workbook = open_workbook_auto(path)?;
    let first_sheet = first_sheet_name(&workbook.sheet_names(), path)?;
    let range = workbook.worksheet_range(&first_sheet)?;
    Ok(rows_from_range(&range))
}

/// Name of the sheet statements are read from: the first in workbook order.
fn first_sheet_name(names: &[String], path: &Path) -> Result<String> {
    names
        .first()
        .cloned()
        .ok_or_else(|| StatementError::MalformedInput(format!("{} has no worksheets", path.display())))
}

/// Convert a worksheet range into rows, skipping absolute row 1 (the header).
///
/// Blank rows between data rows are kept so every sheet line keeps its slot in
/// the table; blank rows after the last data row are dropped.
pub fn rows_from_range(range: &Range<Data>) -> Vec<StatementRow> {
    let Some((end_row, _)) = range.end() else {
        return Vec::new();
    };

    let cell = |row: u32, col: u32| range.get_value((row, col));

    let mut rows: Vec<StatementRow> = (1..=end_row)
        .map(|r| StatementRow {
            date: cell_text(cell(r, 0)),
            document_number: cell_text(cell(r, 1)),
            description: cell_text(cell(r, 2)),
            debit: cell_amount(cell(r, 3)),
            credit: cell_amount(cell(r, 4)),
            balance: cell_amount(cell(r, 5)),
        })
        .collect();

    while rows.last().is_some_and(StatementRow::is_blank) {
        rows.pop();
    }
    rows
}

/// Rows of a CSV file whose first record is the header.
pub fn rows_from_csv<R: Read>(reader: R) -> Result<Vec<StatementRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let field = |i: usize| record.get(i).unwrap_or_default().trim().to_string();
        rows.push(StatementRow {
            date: field(0),
            document_number: field(1),
            description: field(2),
            debit: Amount::parse(&field(3)),
            credit: Amount::parse(&field(4)),
            balance: Amount::parse(&field(5)),
        });
    }
    Ok(rows)
}

fn cell_text(cell: Option<&Data>) -> String {
    match cell {
        None | Some(Data::Empty) => String::new(),
        Some(Data::String(s)) => s.clone(),
        Some(Data::Float(f)) => format_number(*f),
        Some(Data::Int(i)) => i.to_string(),
        Some(Data::DateTime(dt)) => dt
            .as_datetime()
            .map(|d| d.format("%d/%m/%Y").to_string())
            .unwrap_or_else(|| dt.to_string()),
        Some(other) => other.to_string(),
    }
}

fn cell_amount(cell: Option<&Data>) -> Amount {
    match cell {
        None | Some(Data::Empty) => Amount::Missing,
        Some(Data::Float(f)) => Amount::Value(*f),
        Some(Data::Int(i)) => Amount::Value(*i as f64),
        Some(Data::String(s)) => Amount::parse(s),
        Some(other) => Amount::Text(cell_text(Some(other))),
    }
}
