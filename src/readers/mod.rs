//! Declarative metadata readers.
//!
//! Each reader turns one file into quads (overlay readers) or entity
//! records (entity-list reader). Readers that don't recognize a file's
//! layout report [`ReaderError::UnrecognizedLayout`]; [`Readers`] turns that
//! into a debug note and an empty contribution, and any other failure into a
//! warning. No reader ever admits part of a file it failed on.

mod entity_list;
mod rdf;
mod sheet;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::ids::FileId;
use crate::models::{EntityRecord, Ontology, Quad};
use crate::schema::Schema;

pub use entity_list::EntityListReader;
pub use rdf::NTriplesReader;
pub use sheet::{HorizontalSheetReader, VerticalSheetReader};

/// Extensions read as tabular sheets.
pub const SHEET_EXTENSIONS: &[&str] = &["csv"];

/// Reader-local failures.
#[derive(Error, Debug)]
pub enum ReaderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },

    #[error("unrecognized layout")]
    UnrecognizedLayout,

    #[error("{0}")]
    Rejected(String),
}

/// Produces ordinary metadata quads from a file.
pub trait MetadataReader {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    fn read_quads(&self, path: &Path) -> Result<Vec<Quad>, ReaderError>;
}

/// Produces named-entity records from a file.
pub trait EntityReader {
    fn read_entities(&self, path: &Path) -> Result<Vec<EntityRecord>, ReaderError>;
}

/// Kind of declarative source, decided by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Sheet,
    Rdf,
}

impl SourceKind {
    pub fn of(path: &Path) -> Self {
        let ext = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if SHEET_EXTENSIONS.contains(&ext.as_str()) {
            SourceKind::Sheet
        } else {
            SourceKind::Rdf
        }
    }
}

/// The full set of readers sharing one ontology and id generator.
pub struct Readers {
    entity_list: EntityListReader,
    vertical: VerticalSheetReader,
    horizontal: HorizontalSheetReader,
    rdf: NTriplesReader,
}

impl Readers {
    pub fn new(
        ontology: Arc<Ontology>,
        schema: Arc<Schema>,
        ids: FileId,
        default_lang: &str,
    ) -> Self {
        Self {
            entity_list: EntityListReader::new(ontology.clone(), schema.clone(), default_lang),
            vertical: VerticalSheetReader::new(ontology.clone(), ids, default_lang),
            horizontal: HorizontalSheetReader::new(ontology, schema, default_lang),
            rdf: NTriplesReader,
        }
    }

    /// Named entities declared in a sheet; empty for other sources.
    pub fn entities(&self, path: &Path) -> Vec<EntityRecord> {
        if SourceKind::of(path) != SourceKind::Sheet {
            return Vec::new();
        }
        tracing::debug!("Trying to map {} as an entities list", path.display());
        match self.entity_list.read_entities(path) {
            Ok(entities) => entities,
            Err(ReaderError::UnrecognizedLayout) => {
                tracing::debug!("\t{} is not an entities list", path.display());
                Vec::new()
            }
            Err(e) => {
                tracing::warn!("Failed to read entities from {}: {}", path.display(), e);
                Vec::new()
            }
        }
    }

    pub fn vertical(&self, path: &Path) -> Vec<Quad> {
        read_with(&self.vertical, path)
    }

    pub fn horizontal(&self, path: &Path) -> Vec<Quad> {
        read_with(&self.horizontal, path)
    }

    pub fn rdf(&self, path: &Path) -> Vec<Quad> {
        read_with(&self.rdf, path)
    }

    /// All ordinary quads a declarative source contributes.
    pub fn overlay(&self, path: &Path) -> Vec<Quad> {
        match SourceKind::of(path) {
            SourceKind::Sheet => {
                let mut quads = self.vertical(path);
                quads.extend(self.horizontal(path));
                quads
            }
            SourceKind::Rdf => self.rdf(path),
        }
    }
}

fn read_with(reader: &dyn MetadataReader, path: &Path) -> Vec<Quad> {
    tracing::debug!("Trying to map {} as {}", path.display(), reader.name());
    match reader.read_quads(path) {
        Ok(quads) => {
            tracing::info!(
                "Read {} as {}: {} triples",
                path.display(),
                reader.name(),
                quads.len()
            );
            quads
        }
        Err(ReaderError::UnrecognizedLayout) => {
            tracing::debug!("\tFailed to find required columns in {}", path.display());
            Vec::new()
        }
        Err(e) => {
            tracing::warn!(
                "Failed to parse {} as {}: {}",
                path.display(),
                reader.name(),
                e
            );
            Vec::new()
        }
    }
}

/// Reads a CSV file into rows of trimmed cells.
pub(crate) fn read_rows(path: &Path) -> Result<Vec<Vec<String>>, ReaderError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|c| c.trim().to_string()).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_kind_by_extension() {
        assert_eq!(SourceKind::of(Path::new("__meta.CSV")), SourceKind::Sheet);
        assert_eq!(SourceKind::of(Path::new("__meta.nt")), SourceKind::Rdf);
        assert_eq!(SourceKind::of(Path::new("__meta")), SourceKind::Rdf);
    }
}
