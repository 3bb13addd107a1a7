//! Introspection boundary.
//!
//! The diff engine never talks to a database. An [`Inspector`] turns an
//! opaque handle into a [`Snapshot`]; [`JsonInspector`] reads snapshots
//! that were serialized to JSON files.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use tracing::debug;

use crate::snapshot::{SchemaFilter, Snapshot};

/// Locator that stands for an empty database.
pub const EMPTY: &str = "EMPTY";

/// Errors reported by an inspector.
#[derive(Debug, thiserror::Error)]
pub enum InspectError {
    /// IO error while reading a snapshot.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The snapshot is not valid JSON for the catalog model.
    #[error("Invalid snapshot: {0}")]
    Json(#[from] serde_json::Error),

    /// The data source does not exist.
    #[error("Data source not found: {0}")]
    MissingSource(PathBuf),
}

/// Produces snapshots from handles.
pub trait Inspector {
    /// Opaque handle identifying one database state.
    type Handle;

    /// Inspects the state behind `handle`, keeping only what `filter` allows.
    fn inspect(&self, handle: &Self::Handle, filter: &SchemaFilter)
        -> Result<Snapshot, InspectError>;
}

/// Where a snapshot comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// An empty database.
    Empty,
    /// A JSON snapshot file.
    File(PathBuf),
}

impl From<&str> for DataSource {
    fn from(locator: &str) -> Self {
        if locator == EMPTY {
            Self::Empty
        } else {
            Self::File(PathBuf::from(locator))
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str(EMPTY),
            Self::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Reads snapshots from JSON files.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonInspector;

impl JsonInspector {
    /// Creates a new JSON inspector.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Inspector for JsonInspector {
    type Handle = DataSource;

    fn inspect(
        &self,
        handle: &DataSource,
        filter: &SchemaFilter,
    ) -> Result<Snapshot, InspectError> {
        let snapshot = match handle {
            DataSource::Empty => Snapshot::new(),
            DataSource::File(path) => {
                if !path.exists() {
                    return Err(InspectError::MissingSource(path.clone()));
                }
                let text = fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
        };
        let snapshot = snapshot.filtered(filter);
        debug!(source = %handle, objects = snapshot.len(), "Inspected snapshot");
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_data_source_from_locator() {
        assert_eq!(DataSource::from("EMPTY"), DataSource::Empty);
        assert_eq!(
            DataSource::from("db.json"),
            DataSource::File(PathBuf::from("db.json"))
        );
        assert_eq!(DataSource::Empty.to_string(), "EMPTY");
    }

    #[test]
    fn test_inspect_empty() {
        let snapshot = JsonInspector::new()
            .inspect(&DataSource::Empty, &SchemaFilter::new())
            .unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn test_inspect_file_applies_filter() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"tables": [{{"schema": "public", "name": "a"}}, {{"schema": "audit", "name": "b"}}]}}"#
        )
        .unwrap();

        let source = DataSource::File(file.path().to_path_buf());
        let snapshot = JsonInspector::new()
            .inspect(&source, &SchemaFilter::new().exclude("audit"))
            .unwrap();
        assert_eq!(snapshot.tables.len(), 1);
        assert!(snapshot.tables.contains_key("\"public\".\"a\""));
    }

    #[test]
    fn test_inspect_missing_file() {
        let source = DataSource::File(PathBuf::from("/nonexistent/snapshot.json"));
        let result = JsonInspector::new().inspect(&source, &SchemaFilter::new());
        assert!(matches!(result, Err(InspectError::MissingSource(_))));
    }

    #[test]
    fn test_inspect_invalid_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        let source = DataSource::File(file.path().to_path_buf());
        let result = JsonInspector::new().inspect(&source, &SchemaFilter::new());
        assert!(matches!(result, Err(InspectError::Json(_))));
    }
}
