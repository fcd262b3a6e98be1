//! Account statement rendering.
//!
//! Reads the rows of an uploaded spreadsheet, pairs them with the sender and
//! recipient identity captured by the upload form, and produces a fixed-layout
//! single-page PDF statement with a debit total.

pub mod error;
pub mod fonts;
pub mod layout;
pub mod metadata;
pub mod pdf;
pub mod render;
pub mod spreadsheet;
pub mod store;

pub use error::{ErrorKind, Result, StatementError};
pub use layout::{Labels, StatementDocument, format_date, layout_statement};
pub use metadata::{MetadataResolver, StatementMetadata, latest_file};
pub use render::{RenderedStatement, StatementRenderer, render};
pub use spreadsheet::{Amount, StatementRow, debit_total, read_rows};
pub use store::{RequestId, StatementStore, write_atomic};
