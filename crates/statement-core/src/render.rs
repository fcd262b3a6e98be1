//! The rendering pipeline: rows + metadata -> layout -> PDF bytes -> store.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;

use crate::error::Result;
use crate::layout::{Labels, StatementDocument, layout_statement};
use crate::metadata::StatementMetadata;
use crate::pdf;
use crate::spreadsheet::{StatementRow, read_rows};
use crate::store::{RequestId, StatementStore};

/// Render with the default wording.
pub fn render(rows: &[StatementRow], metadata: &StatementMetadata, as_of: NaiveDate) -> Result<Vec<u8>> {
    StatementRenderer::default().render(rows, metadata, as_of)
}

/// Summary of one persisted statement.
#[derive(Debug, Clone)]
pub struct RenderedStatement {
    pub id: RequestId,
    pub path: PathBuf,
    pub rows: usize,
    pub total: f64,
}

#[derive(Debug, Clone, Default)]
pub struct StatementRenderer {
    labels: Labels,
}

impl StatementRenderer {
    pub fn new(labels: Labels) -> Self {
        Self { labels }
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn layout(&self, rows: &[StatementRow], metadata: &StatementMetadata, as_of: NaiveDate) -> StatementDocument {
        layout_statement(rows, metadata, as_of, &self.labels)
    }

    pub fn render(&self, rows: &[StatementRow], metadata: &StatementMetadata, as_of: NaiveDate) -> Result<Vec<u8>> {
        pdf::encode(&self.layout(rows, metadata, as_of))
    }

    /// Read `spreadsheet` and render it.
    pub fn render_file(&self, spreadsheet: &Path, metadata: &StatementMetadata, as_of: NaiveDate) -> Result<Vec<u8>> {
        let rows = read_rows(spreadsheet)?;
        self.render(&rows, metadata, as_of)
    }

    /// Render the spreadsheet and metadata stored under `id` and persist the PDF
    /// under the same id.
    pub fn render_request(&self, store: &StatementStore, id: &RequestId, as_of: NaiveDate) -> Result<RenderedStatement> {
        let spreadsheet = store.spreadsheet_path(id)?;
        let metadata = store.load_metadata(id)?;
        self.render_and_store(store, id.clone(), &spreadsheet, &metadata, as_of)
    }

    /// Legacy pairing: newest spreadsheet with newest metadata record.
    ///
    /// The two are matched only by modification time, so a concurrent upload
    /// can pair files from different requests.
    pub fn render_latest(&self, store: &StatementStore, as_of: NaiveDate) -> Result<RenderedStatement> {
        let spreadsheet = store.latest_spreadsheet()?;
        let metadata = store.metadata_resolver().resolve()?;
        tracing::info!(spreadsheet = %spreadsheet.display(), "rendering latest upload");
        self.render_and_store(store, RequestId::generate(), &spreadsheet, &metadata, as_of)
    }

    fn render_and_store(
        &self,
        store: &StatementStore,
        id: RequestId,
        spreadsheet: &Path,
        metadata: &StatementMetadata,
        as_of: NaiveDate,
    ) -> Result<RenderedStatement> {
        let rows = read_rows(spreadsheet)?;
        let layout = self.layout(&rows, metadata, as_of);
        let bytes = pdf::encode(&layout)?;
        let path = store.write_output(&id, &bytes)?;

        tracing::info!(
            request = %id,
            rows = rows.len(),
            total = layout.total,
            bytes = bytes.len(),
            "statement rendered"
        );

        Ok(RenderedStatement {
            id,
            path,
            rows: rows.len(),
            total: layout.total,
        })
    }
}
