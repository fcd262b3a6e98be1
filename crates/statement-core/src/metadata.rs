//! Company-identity records and latest-file resolution.
//!
//! A metadata record is the four form fields captured with an upload, stored
//! as a small JSON file. The legacy lookup picks whichever record in a
//! directory was modified last; [`crate::store::StatementStore`] pairs
//! records with spreadsheets by request id instead.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, StatementError};

/// Sender and recipient identity printed at the top of a statement.
///
/// Every field defaults to an empty string so that an incomplete record still
/// renders (the missing line is simply blank).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatementMetadata {
    #[serde(alias = "companyName", deserialize_with = "null_as_empty")]
    pub sender_name: String,
    #[serde(alias = "companyAddress", deserialize_with = "null_as_empty")]
    pub sender_address: String,
    #[serde(alias = "targetCompanyName", deserialize_with = "null_as_empty")]
    pub recipient_name: String,
    #[serde(alias = "targetCompanyAddress", deserialize_with = "null_as_empty")]
    pub recipient_address: String,
}

impl StatementMetadata {
    pub fn new(
        sender_name: impl Into<String>,
        sender_address: impl Into<String>,
        recipient_name: impl Into<String>,
        recipient_address: impl Into<String>,
    ) -> Self {
        Self {
            sender_name: sender_name.into(),
            sender_address: sender_address.into(),
            recipient_name: recipient_name.into(),
            recipient_address: recipient_address.into(),
        }
    }

    /// Read a record from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Pretty-printed JSON, as written next to each upload.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Treat an explicit `null` like an absent key.
fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Return the regular file in `dir` with the greatest modification time.
///
/// Ties keep the entry seen first in directory iteration order. An empty
/// directory yields `Ok(None)`; a missing directory is `NotFound`.
pub fn latest_file(dir: &Path) -> Result<Option<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => StatementError::NotFound(format!("directory {}", dir.display())),
        _ => StatementError::Io(e),
    })?;

    let mut latest: Option<(SystemTime, PathBuf)> = None;
    for entry in entries {
        let entry = entry?;
        let meta = entry.metadata()?;
        if !meta.is_file() {
            continue;
        }
        let modified = meta.modified()?;
        let newer = match &latest {
            Some((best, _)) => modified > *best,
            None => true,
        };
        if newer {
            latest = Some((modified, entry.path()));
        }
    }

    Ok(latest.map(|(_, path)| path))
}

/// Loads the most recently written metadata record from one directory.
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    dir: PathBuf,
}

impl MetadataResolver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn resolve(&self) -> Result<StatementMetadata> {
        let path = latest_file(&self.dir)?
            .ok_or_else(|| StatementError::NotFound(format!("no metadata record in {}", self.dir.display())))?;
        tracing::debug!(path = %path.display(), "resolved latest metadata record");
        StatementMetadata::load(&path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use std::fs::File;
    use std::time::Duration;

    fn touch(path: &Path, contents: &str, age_secs: u64) {
        fs::write(path, contents).unwrap();
        let when = SystemTime::now() - Duration::from_secs(age_secs);
        File::options().write(true).open(path).unwrap().set_modified(when).unwrap();
    }

    #[test]
    fn legacy_keys_are_accepted() {
        let json = r#"{
            "companyName": "Acme",
            "companyAddress": "1 Main St",
            "targetCompanyName": "Beta Co",
            "targetCompanyAddress": "2 Side St"
        }"#;
        let meta: StatementMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta, StatementMetadata::new("Acme", "1 Main St", "Beta Co", "2 Side St"));
    }

    #[test]
    fn null_fields_become_empty() {
        let json = r#"{"senderName":"Acme","recipientName":null,"companyAddress":null}"#;
        let meta: StatementMetadata = serde_json::from_str(json).unwrap();
        assert_eq!(meta, StatementMetadata::new("Acme", "", "", ""));
    }

    #[test]
    fn missing_fields_become_empty() {
        let meta: StatementMetadata = serde_json::from_str(r#"{"senderName":"Acme"}"#).unwrap();
        assert_eq!(meta.sender_name, "Acme");
        assert_eq!(meta.recipient_name, "");
        assert_eq!(meta.recipient_address, "");
    }

    #[test]
    fn json_uses_camel_case() {
        let json = StatementMetadata::new("A", "B", "C", "D").to_json().unwrap();
        assert!(json.contains("\"senderName\": \"A\""));
        assert!(json.contains("\"recipientAddress\": \"D\""));
    }

    #[test]
    fn latest_file_picks_max_mtime_regardless_of_names() {
        let dir = tempfile::tempdir().unwrap();
        // Names sort opposite to age so listing order cannot decide.
        touch(&dir.path().join("a.json"), "{}", 10);
        touch(&dir.path().join("b.json"), "{}", 300);
        touch(&dir.path().join("c.json"), "{}", 120);
        fs::create_dir(dir.path().join("zz-subdir")).unwrap();

        let latest = latest_file(dir.path()).unwrap().unwrap();
        assert_eq!(latest.file_name().unwrap(), "a.json");
    }

    #[test]
    fn latest_file_empty_and_missing() {
        let dir = tempfile::tempdir().unwrap();
        assert!(latest_file(dir.path()).unwrap().is_none());

        let err = latest_file(&dir.path().join("nope")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn resolve_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        touch(
            &dir.path().join("1.json"),
            &StatementMetadata::new("Old", "", "", "").to_json().unwrap(),
            600,
        );
        touch(
            &dir.path().join("2.json"),
            &StatementMetadata::new("Acme", "1 Main St", "Beta Co", "2 Side St")
                .to_json()
                .unwrap(),
            5,
        );

        let resolver = MetadataResolver::new(dir.path());
        let first = resolver.resolve().unwrap();
        let second = resolver.resolve().unwrap();
        assert_eq!(first, second);
        assert_eq!(first.sender_name, "Acme");
    }

    #[test]
    fn resolve_without_records_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = MetadataResolver::new(dir.path()).resolve().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
