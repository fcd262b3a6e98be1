//! On-disk store keyed by request id.
//!
//! Layout under the data directory:
//!
//! ```text
//! excel_datas/<id>.<ext>   uploaded spreadsheet
//! input_datas/<id>.json    metadata record
//! pdf_output/<id>.pdf      rendered statement
//! ```
//!
//! Every file is written to a temporary name in its target directory and
//! renamed into place, so readers never observe a half-written file.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;

use crate::error::{Result, StatementError};
use crate::metadata::{MetadataResolver, StatementMetadata, latest_file};

pub const SPREADSHEET_DIR: &str = "excel_datas";
pub const METADATA_DIR: &str = "input_datas";
pub const OUTPUT_DIR: &str = "pdf_output";

/// Spreadsheet extensions accepted for upload.
pub const SPREADSHEET_EXTENSIONS: [&str; 6] = ["xlsx", "xlsm", "xlsb", "xls", "ods", "csv"];

static SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Time-derived identifier pairing one upload's files.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// `<unix millis>-<process sequence>`; unique within one process.
    pub fn generate() -> Self {
        let seq = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        RequestId(format!("{}-{:04}", Utc::now().timestamp_millis(), seq % 10_000))
    }

    /// Accept only ids this store could have produced (digits and dashes).
    pub fn parse(s: &str) -> Option<Self> {
        let valid = !s.is_empty() && s.len() <= 64 && s.bytes().all(|b| b.is_ascii_digit() || b == b'-');
        valid.then(|| RequestId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone)]
pub struct StatementStore {
    root: PathBuf,
}

impl StatementStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let store = Self { root: root.into() };
        for dir in [SPREADSHEET_DIR, METADATA_DIR, OUTPUT_DIR] {
            fs::create_dir_all(store.root.join(dir))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn spreadsheet_dir(&self) -> PathBuf {
        self.root.join(SPREADSHEET_DIR)
    }

    pub fn metadata_dir(&self) -> PathBuf {
        self.root.join(METADATA_DIR)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.root.join(OUTPUT_DIR)
    }

    /// Store an uploaded spreadsheet. `file_name` only supplies the extension.
    pub fn save_spreadsheet(&self, id: &RequestId, file_name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let ext = Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .filter(|e| SPREADSHEET_EXTENSIONS.contains(&e.as_str()))
            .ok_or_else(|| StatementError::UnsupportedFormat(PathBuf::from(file_name)))?;

        let path = self.spreadsheet_dir().join(format!("{id}.{ext}"));
        write_atomic(&path, bytes)?;
        tracing::debug!(request = %id, path = %path.display(), bytes = bytes.len(), "stored spreadsheet");
        Ok(path)
    }

    pub fn save_metadata(&self, id: &RequestId, metadata: &StatementMetadata) -> Result<PathBuf> {
        let path = self.metadata_path(id);
        write_atomic(&path, metadata.to_json()?.as_bytes())?;
        tracing::debug!(request = %id, path = %path.display(), "stored metadata record");
        Ok(path)
    }

    /// Path of the spreadsheet uploaded under `id`, whatever its extension.
    pub fn spreadsheet_path(&self, id: &RequestId) -> Result<PathBuf> {
        SPREADSHEET_EXTENSIONS
            .iter()
            .map(|ext| self.spreadsheet_dir().join(format!("{id}.{ext}")))
            .find(|p| p.is_file())
            .ok_or_else(|| StatementError::NotFound(format!("spreadsheet for request {id}")))
    }

    pub fn metadata_path(&self, id: &RequestId) -> PathBuf {
        self.metadata_dir().join(format!("{id}.json"))
    }

    pub fn load_metadata(&self, id: &RequestId) -> Result<StatementMetadata> {
        let path = self.metadata_path(id);
        if !path.is_file() {
            return Err(StatementError::NotFound(format!("metadata for request {id}")));
        }
        StatementMetadata::load(&path)
    }

    pub fn output_path(&self, id: &RequestId) -> PathBuf {
        self.output_dir().join(format!("{id}.pdf"))
    }

    /// Persist a rendered statement. The file appears only once fully written.
    pub fn write_output(&self, id: &RequestId, pdf: &[u8]) -> Result<PathBuf> {
        let path = self.output_path(id);
        write_atomic(&path, pdf)?;
        Ok(path)
    }

    /// Bytes of a previously rendered statement.
    pub fn read_output(&self, id: &RequestId) -> Result<Vec<u8>> {
        fs::read(self.output_path(id)).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => StatementError::NotFound(format!("statement {id}")),
            _ => StatementError::Io(e),
        })
    }

    /// Most recently modified spreadsheet, regardless of request.
    pub fn latest_spreadsheet(&self) -> Result<PathBuf> {
        latest_file(&self.spreadsheet_dir())?
            .ok_or_else(|| StatementError::NotFound(format!("no spreadsheet in {}", self.spreadsheet_dir().display())))
    }

    /// Resolver over this store's metadata directory.
    pub fn metadata_resolver(&self) -> MetadataResolver {
        MetadataResolver::new(self.metadata_dir())
    }
}

/// Write `bytes` to a temp file next to `path`, then rename over `path`.
/// On any error the temp file is removed when dropped.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| StatementError::NotFound(format!("parent directory of {}", path.display())))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path)?;
    Ok(())
}
