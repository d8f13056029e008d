//! Filesystem inventory import.
//!
//! The inventory is a JSON array produced by a file checker, one record per
//! file below the base path:
//!
//! ```json
//! [{"directory": "/data/proj/a", "filename": "f.txt", "size": 120,
//!   "mime": "text/plain", "class": null, "hasCategory": null}]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use crate::error::AppError;
use crate::ids::FileId;
use crate::models::{Dataset, Iri, Quad, Term};
use crate::schema::{Schema, XSD_NON_NEGATIVE_INTEGER};

/// A single inventory entry.
#[derive(Debug, Clone, Deserialize)]
pub struct InventoryRecord {
    pub directory: String,
    pub filename: String,
    #[serde(default)]
    pub size: Option<serde_json::Value>,
    #[serde(default)]
    pub mime: Option<String>,
    #[serde(default)]
    pub class: Option<String>,
    #[serde(default, rename = "hasCategory")]
    pub has_category: Option<String>,
}

impl InventoryRecord {
    /// Record path with the trailing slash removed.
    fn path(&self) -> String {
        let path = if self.directory.is_empty() {
            self.filename.clone()
        } else {
            format!("{}/{}", self.directory.trim_end_matches('/'), self.filename)
        };
        path.trim_end_matches('/').to_string()
    }

    fn size(&self) -> Option<String> {
        match self.size.as_ref()? {
            serde_json::Value::Number(n) => Some(n.to_string()),
            serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }
}

/// Primary graph built from the inventory.
#[derive(Debug, Clone)]
pub struct Inventory {
    base_id: Iri,
    quads: Dataset,
}

impl Inventory {
    /// Reads and imports the inventory file. A missing or malformed file is
    /// fatal.
    pub fn load(
        path: &Path,
        ids: &FileId,
        schema: &Schema,
        map_binary_size: bool,
    ) -> Result<Self, AppError> {
        if !path.is_file() {
            return Err(AppError::MissingInventory(path.display().to_string()));
        }
        tracing::info!("Importing inventory file {}", path.display());
        let invalid = |message: String| AppError::InvalidInventory {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| invalid(e.to_string()))?;
        let records: Vec<InventoryRecord> =
            serde_json::from_str(&content).map_err(|e| invalid(e.to_string()))?;
        Ok(Self::from_records(&records, ids, schema, map_binary_size))
    }

    pub fn from_records(
        records: &[InventoryRecord],
        ids: &FileId,
        schema: &Schema,
        map_binary_size: bool,
    ) -> Self {
        let rdf_type = Schema::rdf_type();
        let base = ids.base();
        let base_id = ids.id(base);
        let mut quads = Dataset::new();
        quads.add(Quad::new(
            base_id.clone(),
            rdf_type.clone(),
            schema.classes.top_collection.clone(),
        ));
        quads.add(Quad::new(base_id.clone(), schema.id.clone(), base_id.clone()));
        let mut n = 1;

        let mut dirs: HashSet<String> = HashSet::new();
        for record in records {
            if !base.is_empty()
                && !format!("{}/", record.directory).starts_with(&format!("{}/", base))
            {
                tracing::warn!(
                    "Skipping {}/{} because it's out of the base path ({})",
                    record.directory,
                    record.filename,
                    base
                );
                continue;
            }
            let path = record.path();

            let mut dir = dirname(&path);
            while !dir.is_empty() && dir != base && !dirs.contains(dir) {
                dirs.insert(dir.to_string());
                let id = ids.id(dir);
                quads.add(Quad::new(id.clone(), rdf_type.clone(), schema.classes.collection.clone()));
                quads.add(Quad::new(id.clone(), schema.id.clone(), id.clone()));
                quads.add(Quad::new(id.clone(), schema.parent.clone(), ids.id(dirname(dir))));
                quads.add(Quad::new(id, schema.file_name.clone(), Term::literal(basename(dir))));
                n += 1;
                dir = dirname(dir);
            }

            let id = ids.id(&path);
            let class = record
                .class
                .as_deref()
                .map(Iri::from)
                .unwrap_or_else(|| schema.classes.resource.clone());
            quads.add(Quad::new(id.clone(), rdf_type.clone(), class));
            quads.add(Quad::new(id.clone(), schema.id.clone(), id.clone()));
            quads.add(Quad::new(id.clone(), schema.parent.clone(), ids.id(dirname(&path))));
            quads.add(Quad::new(
                id.clone(),
                schema.file_name.clone(),
                Term::literal(record.filename.as_str()),
            ));
            if map_binary_size {
                if let Some(size) = record.size() {
                    quads.add(Quad::new(
                        id.clone(),
                        schema.binary_size.clone(),
                        Term::typed_literal(size, XSD_NON_NEGATIVE_INTEGER),
                    ));
                }
            }
            if let Some(mime) = record.mime.as_deref().filter(|m| !m.is_empty()) {
                quads.add(Quad::new(id.clone(), schema.mime.clone(), Term::literal(mime)));
            }
            if let Some(category) = record.has_category.as_deref().filter(|c| !c.is_empty()) {
                quads.add(Quad::new(id, schema.category.clone(), Iri::from(category)));
            }
            n += 1;
        }
        tracing::info!("\tData on {} files and directories imported", n);

        Self { base_id, quads }
    }

    /// Identifier of the top collection.
    pub fn base_id(&self) -> &Iri {
        &self.base_id
    }

    pub fn quads(&self) -> &Dataset {
        &self.quads
    }

    pub fn contains(&self, subject: &Iri) -> bool {
        self.quads.has_subject(subject)
    }

    /// Inventory quads describing `subject`.
    pub fn about(&self, subject: &Iri) -> impl Iterator<Item = &Quad> + '_ {
        self.quads.about(subject)
    }
}

fn dirname(path: &str) -> &str {
    path.rsplit_once('/').map(|(dir, _)| dir).unwrap_or("")
}

fn basename(path: &str) -> &str {
    path.rsplit_once('/').map(|(_, name)| name).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::capture_logs;

    fn record(directory: &str, filename: &str) -> InventoryRecord {
        InventoryRecord {
            directory: directory.to_string(),
            filename: filename.to_string(),
            size: Some(serde_json::json!(42)),
            mime: Some("text/plain".to_string()),
            class: None,
            has_category: None,
        }
    }

    fn ids() -> FileId {
        FileId::new("https://id.example.org/proj/", "/data/proj").unwrap()
    }

    #[test]
    fn test_collections_and_resources() {
        let schema = Schema::default();
        let inventory = Inventory::from_records(
            &[record("/data/proj/a/b", "f.txt"), record("/data/proj/a", "g.txt")],
            &ids(),
            &schema,
            true,
        );
        let quads = inventory.quads();
        let base = Iri::new("https://id.example.org/proj");
        assert_eq!(inventory.base_id(), &base);
        assert!(quads.contains(&Quad::new(
            base.clone(),
            Schema::rdf_type(),
            schema.classes.top_collection.clone()
        )));

        let a = Iri::new("https://id.example.org/proj/a");
        let b = Iri::new("https://id.example.org/proj/a/b");
        assert_eq!(
            quads.objects(&a, &Schema::rdf_type()),
            vec![&Term::from(schema.classes.collection.clone())]
        );
        assert_eq!(quads.objects(&a, &schema.parent), vec![&Term::from(base)]);
        assert_eq!(quads.objects(&b, &schema.parent), vec![&Term::from(a.clone())]);
        assert_eq!(quads.objects(&b, &schema.file_name), vec![&Term::literal("b")]);

        let f = Iri::new("https://id.example.org/proj/a/b/f.txt");
        assert_eq!(
            quads.objects(&f, &Schema::rdf_type()),
            vec![&Term::from(schema.classes.resource.clone())]
        );
        assert_eq!(
            quads.objects(&f, &schema.binary_size),
            vec![&Term::typed_literal("42", XSD_NON_NEGATIVE_INTEGER)]
        );
        assert_eq!(quads.objects(&f, &schema.mime), vec![&Term::literal("text/plain")]);
        // "a" is declared once even though two records live below it
        assert_eq!(quads.objects(&a, &schema.file_name).len(), 1);
    }

    #[test]
    fn test_class_category_and_size_switch() {
        let schema = Schema::default();
        let mut r = record("/data/proj", "x.xml");
        r.class = Some("https://example.org/Metadata".to_string());
        r.has_category = Some("https://vocabs.example.org/cat/text".to_string());
        r.mime = Some(String::new());
        let inventory = Inventory::from_records(&[r], &ids(), &schema, false);
        let x = Iri::new("https://id.example.org/proj/x.xml");
        let quads = inventory.quads();
        assert_eq!(
            quads.objects(&x, &Schema::rdf_type()),
            vec![&Term::iri("https://example.org/Metadata")]
        );
        assert_eq!(
            quads.objects(&x, &schema.category),
            vec![&Term::iri("https://vocabs.example.org/cat/text")]
        );
        assert!(!quads.has(&x, &schema.binary_size));
        assert!(!quads.has(&x, &schema.mime));
    }

    #[test]
    fn test_records_outside_base_are_skipped() {
        let schema = Schema::default();
        let (logs, inventory) = capture_logs(|| {
            Inventory::from_records(
                &[record("/data/other", "f.txt"), record("/data/project", "g.txt")],
                &ids(),
                &schema,
                true,
            )
        });
        // only the top collection remains
        assert_eq!(inventory.quads().subjects().len(), 1);
        assert_eq!(logs.matches("out of the base path").count(), 2);
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let result = Inventory::load(
            &dir.path().join("fileList.json"),
            &ids(),
            &Schema::default(),
            true,
        );
        assert!(matches!(result, Err(AppError::MissingInventory(_))));
    }

    #[test]
    fn test_load_from_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fileList.json");
        std::fs::write(
            &path,
            r#"[{"directory": "/data/proj", "filename": "f.txt", "size": "7", "mime": "text/plain"}]"#,
        )
        .unwrap();
        let inventory = Inventory::load(&path, &ids(), &Schema::default(), true).unwrap();
        assert!(inventory.contains(&Iri::new("https://id.example.org/proj/f.txt")));

        std::fs::write(&path, "not json").unwrap();
        let result = Inventory::load(&path, &ids(), &Schema::default(), true);
        assert!(matches!(result, Err(AppError::InvalidInventory { .. })));
    }
}
