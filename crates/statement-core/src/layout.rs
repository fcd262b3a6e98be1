//! Fixed single-page statement template.
//!
//! Positions are in PDF points measured from the top-left corner of an A4
//! page. The flowing part (header, salutation, notice) advances a cursor by
//! whole line heights; the table is anchored at fixed coordinates and its
//! columns come from one declarative column list shared by the header row and
//! every data row.
//!
//! There is no overflow handling: long tables run into the total and off the
//! bottom of the page.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::fonts::Font;
use crate::metadata::StatementMetadata;
use crate::spreadsheet::{COLUMN_COUNT, StatementRow, debit_total, format_number};

pub const PAGE_WIDTH: f32 = 595.28;
pub const PAGE_HEIGHT: f32 = 841.89;
pub const MARGIN: f32 = 50.0;

/// Left edge of the header, salutation and notice blocks.
pub const BLOCK_X: f32 = 100.0;
/// Top of the table header row.
pub const HEADER_TOP: f32 = 300.0;
/// Vertical distance between table lines.
pub const ROW_HEIGHT: f32 = 20.0;
/// Top of the first data row.
pub const TABLE_TOP: f32 = HEADER_TOP + ROW_HEIGHT;
/// Left edge of the box the total is right-aligned in.
pub const TOTAL_X: f32 = 400.0;

const HEADER_FONT_SIZE: f32 = 10.0;
const ROW_FONT_SIZE: f32 = 6.0;
const TOTAL_FONT_SIZE: f32 = 12.0;

/// Column left edges; each column runs to the next one (the last to the margin).
const COLUMN_X: [f32; COLUMN_COUNT] = [55.0, 200.0, 275.0, 350.0, 400.0, 500.0];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Right,
}

/// One table column: label plus horizontal placement.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub label: String,
    pub x: f32,
    pub width: f32,
    pub align: Align,
}

/// Printed wording of the template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Labels {
    pub salutation: String,
    /// Notice sentence; `{date}` is replaced with the statement date.
    pub notice: String,
    pub columns: [String; COLUMN_COUNT],
    pub total: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            salutation: "Dear".to_string(),
            notice: "The account statement dated {date} is attached.".to_string(),
            columns: ["Date", "Document No.", "Description", "Debit", "Credit", "Balance"].map(String::from),
            total: "TOTAL".to_string(),
        }
    }
}

impl Labels {
    pub fn notice_line(&self, as_of: NaiveDate) -> String {
        self.notice.replace("{date}", &format_date(as_of))
    }

    pub fn column_specs(&self) -> Vec<ColumnSpec> {
        COLUMN_X
            .iter()
            .enumerate()
            .map(|(i, &x)| {
                let right = COLUMN_X.get(i + 1).copied().unwrap_or(PAGE_WIDTH - MARGIN);
                ColumnSpec {
                    label: self.columns[i].clone(),
                    x,
                    width: right - x,
                    align: Align::Left,
                }
            })
            .collect()
    }
}

/// `DD/MM/YYYY`, zero padded.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%d/%m/%Y").to_string()
}

/// A single line of text at a fixed position.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    /// Top of the line box.
    pub y: f32,
    /// Width of the box the text is aligned in.
    pub width: f32,
    pub font: Font,
    pub size: f32,
    pub align: Align,
}

impl TextRun {
    /// Left edge where the glyphs actually start.
    pub fn origin_x(&self) -> f32 {
        match self.align {
            Align::Left => self.x,
            Align::Right => self.x + self.width - self.font.text_width(&self.text, self.size),
        }
    }

    /// Baseline position measured from the top of the page.
    pub fn baseline(&self) -> f32 {
        self.y + self.font.ascent() * self.size
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Header,
    Salutation,
    Notice,
    TableHeader,
    /// Data row, 0-based among data rows.
    TableRow(usize),
    Total,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub kind: BlockKind,
    pub runs: Vec<TextRun>,
}

/// A laid-out statement, ready to be encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct StatementDocument {
    pub width: f32,
    pub height: f32,
    pub blocks: Vec<Block>,
    pub total: f64,
}

impl StatementDocument {
    pub fn block(&self, kind: BlockKind) -> Option<&Block> {
        self.blocks.iter().find(|b| b.kind == kind)
    }

    pub fn table_rows(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|b| matches!(b.kind, BlockKind::TableRow(_)))
    }

    pub fn runs(&self) -> impl Iterator<Item = &TextRun> {
        self.blocks.iter().flat_map(|b| b.runs.iter())
    }
}

/// Text cursor that moves down the page one line box at a time.
struct Cursor {
    y: f32,
    font: Font,
    size: f32,
}

impl Cursor {
    fn new() -> Self {
        Self {
            y: MARGIN,
            font: Font::Helvetica,
            size: 12.0,
        }
    }

    fn set_font(&mut self, font: Font, size: f32) {
        self.font = font;
        self.size = size;
    }

    fn move_down(&mut self, lines: f32) {
        self.y += self.font.line_height(self.size) * lines;
    }

    /// Place left-aligned text at the cursor, one run per line break, and
    /// advance past it. Empty text still takes up one line.
    fn line(&mut self, text: &str) -> Vec<TextRun> {
        text.split('\n')
            .map(|line| {
                let width = PAGE_WIDTH - MARGIN - BLOCK_X;
                let run = self.run_at(line.trim_end_matches('\r'), BLOCK_X, width, Align::Left);
                self.advance();
                run
            })
            .collect()
    }

    fn run_at(&self, text: &str, x: f32, width: f32, align: Align) -> TextRun {
        TextRun {
            text: text.to_string(),
            x,
            y: self.y,
            width,
            font: self.font,
            size: self.size,
            align,
        }
    }

    fn advance(&mut self) {
        self.y += self.font.line_height(self.size);
    }
}

/// Lay out the statement for `rows` (data rows only, header already skipped).
pub fn layout_statement(
    rows: &[StatementRow],
    metadata: &StatementMetadata,
    as_of: NaiveDate,
    labels: &Labels,
) -> StatementDocument {
    let mut blocks = Vec::with_capacity(rows.len() + 5);
    let mut cursor = Cursor::new();

    // Sender.
    cursor.move_down(3.0);
    cursor.set_font(Font::Helvetica, 10.0);
    let mut runs = cursor.line(&metadata.sender_name);
    cursor.set_font(Font::Helvetica, 8.0);
    cursor.y += 10.0;
    runs.extend(cursor.line(&metadata.sender_address));
    blocks.push(Block {
        kind: BlockKind::Header,
        runs,
    });

    // Recipient.
    cursor.move_down(3.0);
    cursor.set_font(Font::Helvetica, 12.0);
    let mut runs = cursor.line(&labels.salutation);
    cursor.set_font(Font::HelveticaBold, 14.0);
    runs.extend(cursor.line(&metadata.recipient_name));
    cursor.set_font(Font::Helvetica, 10.0);
    runs.extend(cursor.line(&metadata.recipient_address));
    blocks.push(Block {
        kind: BlockKind::Salutation,
        runs,
    });

    cursor.move_down(1.0);
    cursor.set_font(Font::Helvetica, 12.0);
    let runs = cursor.line(&labels.notice_line(as_of));
    blocks.push(Block {
        kind: BlockKind::Notice,
        runs,
    });

    // Table.
    let columns = labels.column_specs();
    cursor.set_font(Font::HelveticaBold, HEADER_FONT_SIZE);
    cursor.y = HEADER_TOP;
    blocks.push(Block {
        kind: BlockKind::TableHeader,
        runs: columns
            .iter()
            .map(|c| cursor.run_at(&c.label, c.x, c.width, c.align))
            .collect(),
    });
    cursor.advance();

    cursor.set_font(Font::Helvetica, ROW_FONT_SIZE);
    for (i, row) in rows.iter().enumerate() {
        cursor.y = TABLE_TOP + i as f32 * ROW_HEIGHT;
        let runs = columns
            .iter()
            .zip(row.cells())
            .map(|(c, text)| cursor.run_at(&text, c.x, c.width, c.align))
            .collect();
        blocks.push(Block {
            kind: BlockKind::TableRow(i),
            runs,
        });
        cursor.advance();
    }

    // Total, two lines under whatever was drawn last.
    let total = debit_total(rows);
    let total_width = PAGE_WIDTH - MARGIN - TOTAL_X;
    cursor.move_down(2.0);
    cursor.set_font(Font::HelveticaBold, TOTAL_FONT_SIZE);
    let label = cursor.run_at(&labels.total, TOTAL_X, total_width, Align::Right);
    cursor.advance();
    cursor.set_font(Font::Helvetica, TOTAL_FONT_SIZE);
    let amount = cursor.run_at(&format_number(total), TOTAL_X, total_width, Align::Right);
    blocks.push(Block {
        kind: BlockKind::Total,
        runs: vec![label, amount],
    });

    StatementDocument {
        width: PAGE_WIDTH,
        height: PAGE_HEIGHT,
        blocks,
        total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::spreadsheet::Amount;

    fn metadata() -> StatementMetadata {
        StatementMetadata::new("Acme", "1 Main St", "Beta Co", "2 Side St")
    }

    fn rows() -> Vec<StatementRow> {
        vec![
            StatementRow::new("01/01/2024", "D1", "Sale", 100.0, 0.0, 100.0),
            StatementRow::new("02/01/2024", "D2", "Refund", 0.0, 50.0, 50.0),
        ]
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn date_is_zero_padded() {
        assert_eq!(format_date(date(2024, 1, 3)), "03/01/2024");
        assert_eq!(format_date(date(2024, 12, 31)), "31/12/2024");
    }

    #[test]
    fn one_line_per_row_at_fixed_spacing() {
        let rows: Vec<StatementRow> = (0..7)
            .map(|i| StatementRow::new(format!("{i}"), "", "", i as f64, Amount::Missing, Amount::Missing))
            .collect();
        let doc = layout_statement(&rows, &metadata(), date(2024, 1, 3), &Labels::default());

        let lines: Vec<&Block> = doc.table_rows().collect();
        assert_eq!(lines.len(), 7);
        for (i, block) in lines.iter().enumerate() {
            assert_eq!(block.kind, BlockKind::TableRow(i));
            assert_eq!(block.runs.len(), COLUMN_COUNT);
            for run in &block.runs {
                assert_eq!(run.y, TABLE_TOP + i as f32 * 20.0);
            }
            assert_eq!(block.runs[0].text, i.to_string());
        }
    }

    #[test]
    fn header_and_rows_share_column_positions() {
        let doc = layout_statement(&rows(), &metadata(), date(2024, 1, 3), &Labels::default());
        let header = doc.block(BlockKind::TableHeader).unwrap();
        let xs: Vec<f32> = header.runs.iter().map(|r| r.x).collect();
        assert_eq!(xs, COLUMN_X.to_vec());
        assert!(header.runs.iter().all(|r| r.y == HEADER_TOP && r.font == Font::HelveticaBold));

        for row in doc.table_rows() {
            let row_xs: Vec<f32> = row.runs.iter().map(|r| r.x).collect();
            assert_eq!(row_xs, xs);
        }
        let labels: Vec<&str> = header.runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(labels, ["Date", "Document No.", "Description", "Debit", "Credit", "Balance"]);
    }

    #[test]
    fn end_to_end_scenario() {
        let doc = layout_statement(&rows(), &metadata(), date(2024, 1, 3), &Labels::default());
        assert_eq!(doc.total, 100.0);

        let descriptions: Vec<&str> = doc.table_rows().map(|b| b.runs[2].text.as_str()).collect();
        assert_eq!(descriptions, ["Sale", "Refund"]);

        let header = doc.block(BlockKind::Header).unwrap();
        assert_eq!(header.runs[0].text, "Acme");
        assert_eq!(header.runs[1].text, "1 Main St");

        let salutation = doc.block(BlockKind::Salutation).unwrap();
        assert_eq!(salutation.runs[0].text, "Dear");
        assert_eq!(salutation.runs[1].text, "Beta Co");
        assert_eq!(salutation.runs[1].font, Font::HelveticaBold);
        assert_eq!(salutation.runs[2].text, "2 Side St");

        let notice = doc.block(BlockKind::Notice).unwrap();
        assert!(notice.runs[0].text.contains("03/01/2024"));
    }

    #[test]
    fn multi_line_addresses_get_one_run_per_line() {
        let meta = StatementMetadata::new("Acme", "1 Main St\r\nIstanbul", "Beta Co", "2 Side St\nAnkara\n06100");
        let doc = layout_statement(&rows(), &meta, date(2024, 1, 3), &Labels::default());

        let header: Vec<&str> = doc.block(BlockKind::Header).unwrap().runs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(header, ["Acme", "1 Main St", "Istanbul"]);

        let salutation = &doc.block(BlockKind::Salutation).unwrap().runs;
        let texts: Vec<&str> = salutation.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(texts, ["Dear", "Beta Co", "2 Side St", "Ankara", "06100"]);
        assert!(salutation.windows(2).all(|w| w[1].y > w[0].y));

        // The extra lines push the notice down.
        let single = layout_statement(&rows(), &metadata(), date(2024, 1, 3), &Labels::default());
        let notice_y = |d: &StatementDocument| d.block(BlockKind::Notice).unwrap().runs[0].y;
        assert!(notice_y(&doc) > notice_y(&single));
    }

    #[test]
    fn blocks_come_in_template_order() {
        let doc = layout_statement(&rows(), &metadata(), date(2024, 1, 3), &Labels::default());
        let kinds: Vec<BlockKind> = doc.blocks.iter().map(|b| b.kind).collect();
        assert_eq!(
            kinds,
            [
                BlockKind::Header,
                BlockKind::Salutation,
                BlockKind::Notice,
                BlockKind::TableHeader,
                BlockKind::TableRow(0),
                BlockKind::TableRow(1),
                BlockKind::Total,
            ]
        );

        // The flowing blocks stay above the fixed table.
        let notice = doc.block(BlockKind::Notice).unwrap();
        assert!(notice.runs[0].y < HEADER_TOP);
    }

    #[test]
    fn total_is_right_aligned_below_last_row() {
        let doc = layout_statement(&rows(), &metadata(), date(2024, 1, 3), &Labels::default());
        let total = doc.block(BlockKind::Total).unwrap();
        let last_row_y = TABLE_TOP + ROW_HEIGHT;

        assert_eq!(total.runs[0].text, "TOTAL");
        assert_eq!(total.runs[1].text, "100");
        assert!(total.runs[0].y > last_row_y);
        assert!(total.runs[1].y > total.runs[0].y);

        let right_edge = PAGE_WIDTH - MARGIN;
        for run in &total.runs {
            let end = run.origin_x() + run.font.text_width(&run.text, run.size);
            assert!((end - right_edge).abs() < 1e-3);
            assert!(run.origin_x() >= TOTAL_X);
        }
    }

    #[test]
    fn missing_debits_count_as_zero() {
        let rows = vec![
            StatementRow::new("", "", "a", 100.0, Amount::Missing, Amount::Missing),
            StatementRow::new("", "", "b", Amount::Missing, Amount::Missing, Amount::Missing),
            StatementRow::new("", "", "c", 50.0, Amount::Missing, Amount::Missing),
        ];
        let doc = layout_statement(&rows, &metadata(), date(2024, 1, 3), &Labels::default());
        assert_eq!(doc.total, 150.0);
        assert_eq!(doc.block(BlockKind::Total).unwrap().runs[1].text, "150");
        assert_eq!(doc.table_rows().nth(1).unwrap().runs[3].text, "");
    }

    #[test]
    fn empty_metadata_and_no_rows_still_lay_out() {
        let doc = layout_statement(&[], &StatementMetadata::default(), date(2024, 1, 3), &Labels::default());
        assert_eq!(doc.table_rows().count(), 0);
        assert_eq!(doc.total, 0.0);
        assert_eq!(doc.block(BlockKind::Header).unwrap().runs[0].text, "");
        assert_eq!(doc.block(BlockKind::Total).unwrap().runs[1].text, "0");
    }

    #[test]
    fn labels_are_configurable() {
        let labels = Labels {
            salutation: "Sayin".into(),
            notice: "{date} tarihli hesap ozeti ektedir".into(),
            total: "TOPLAM".into(),
            ..Labels::default()
        };
        let doc = layout_statement(&rows(), &metadata(), date(2024, 5, 9), &labels);
        assert_eq!(doc.block(BlockKind::Salutation).unwrap().runs[0].text, "Sayin");
        assert_eq!(
            doc.block(BlockKind::Notice).unwrap().runs[0].text,
            "09/05/2024 tarihli hesap ozeti ektedir"
        );
        assert_eq!(doc.block(BlockKind::Total).unwrap().runs[0].text, "TOPLAM");
    }

    #[test]
    fn column_widths_reach_the_margin() {
        let specs = Labels::default().column_specs();
        assert_eq!(specs.len(), COLUMN_COUNT);
        assert_eq!(specs[0].width, 145.0);
        let last = specs.last().unwrap();
        assert!((last.x + last.width - (PAGE_WIDTH - MARGIN)).abs() < 1e-3);
    }
}
