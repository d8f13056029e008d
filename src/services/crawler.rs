//! Directory tree walk with hierarchical metadata overlays.
//!
//! Every directory may hold declarative metadata sources: files whose name
//! starts with the special prefix (`__` by default). Their quads form an
//! overlay frame that applies to the directory and everything below it.
//! Frames are kept on a [`ScopeStack`] while the walk is inside the
//! directory.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::AppError;
use crate::ids::FileId;
use crate::models::{Dataset, Iri, Ontology, Quad, Term};
use crate::readers::Readers;
use crate::repositories::EntitiesDatabase;
use crate::schema::{Schema, NEUTRAL_LANG};
use crate::services::inventory::Inventory;
use crate::services::merger::map_vocabularies;

/// One overlay level: the quads declared by a directory's metadata sources,
/// tagged with the directory identifier.
#[derive(Debug, Clone)]
pub struct Frame {
    scope: Iri,
    quads: Dataset,
}

impl Frame {
    pub fn new(scope: Iri, quads: impl IntoIterator<Item = Quad>) -> Self {
        let quads = quads.into_iter().map(|q| q.in_scope(&scope)).collect();
        Self { scope, quads }
    }

    pub fn scope(&self) -> &Iri {
        &self.scope
    }

    pub fn quads(&self) -> &Dataset {
        &self.quads
    }
}

/// Append/pop-only stack of overlay frames. Index 0 is the root default
/// scope and is never popped; deeper frames take precedence.
#[derive(Debug, Clone)]
pub struct ScopeStack {
    frames: Vec<Frame>,
}

impl ScopeStack {
    pub fn new(root: Frame) -> Self {
        Self { frames: vec![root] }
    }

    pub fn push(&mut self, frame: Frame) {
        self.frames.push(frame);
    }

    /// Removes the deepest frame. The root default frame stays.
    pub fn pop(&mut self) -> Option<Frame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Merges the overlays into the metadata of `subject`.
    ///
    /// Quads addressed to the subject itself are taken from every level
    /// first. Then, level by level from the root, placeholder quads and
    /// class-level quads only fill predicates the subject has no value for
    /// yet. Predicates introduced at one level are visible to the next.
    pub fn merge(&self, subject: &Iri, base: Dataset, schema: &Schema) -> Dataset {
        let rdf_type = Schema::rdf_type();
        let mut meta = base;
        for frame in &self.frames {
            meta.extend(frame.quads.about(subject).cloned());
        }

        for frame in &self.frames {
            let present = owned_predicates(&meta, subject);
            meta.extend(
                frame
                    .quads
                    .about(&schema.any_resource)
                    .filter(|q| !present.contains(&q.predicate))
                    .map(|q| q.with_subject(subject)),
            );

            let present = owned_predicates(&meta, subject);
            let classes: Vec<Iri> = meta
                .objects(subject, &rdf_type)
                .into_iter()
                .filter_map(|c| c.as_iri().cloned())
                .collect();
            for class in &classes {
                meta.extend(
                    frame
                        .quads
                        .about(class)
                        .filter(|q| !present.contains(&q.predicate))
                        .map(|q| q.with_subject(subject)),
                );
            }
        }
        meta
    }
}

fn owned_predicates(meta: &Dataset, subject: &Iri) -> HashSet<Iri> {
    meta.predicates(subject).into_iter().cloned().collect()
}

/// Walks a directory tree and emits merged metadata for every directory and
/// file in it.
pub struct DirectoryCrawler {
    ontology: Arc<Ontology>,
    schema: Arc<Schema>,
    readers: Readers,
    ids: FileId,
    special_prefix: String,
    inventory: Option<Inventory>,
    entities: EntitiesDatabase,
    stack: ScopeStack,
}

enum NodeKind {
    Root,
    Directory,
    File,
}

impl DirectoryCrawler {
    pub fn new(
        ontology: Arc<Ontology>,
        schema: Arc<Schema>,
        readers: Readers,
        ids: FileId,
        special_prefix: &str,
    ) -> Self {
        let root_scope = ids.id("");
        Self {
            entities: EntitiesDatabase::new(schema.clone()),
            stack: ScopeStack::new(Frame::new(root_scope, Vec::new())),
            ontology,
            schema,
            readers,
            ids,
            special_prefix: special_prefix.to_string(),
            inventory: None,
        }
    }

    /// Uses inventory records as the base metadata of the nodes they describe.
    pub fn with_inventory(mut self, inventory: Inventory) -> Self {
        self.inventory = Some(inventory);
        self
    }

    pub fn into_entities(self) -> EntitiesDatabase {
        self.entities
    }

    /// Walks the tree below `root`. The returned quads keep the scope of
    /// the overlay that contributed them.
    pub fn crawl(&mut self, root: &Path) -> Result<Dataset, AppError> {
        let root = root.canonicalize().map_err(|e| AppError::Directory {
            path: root.display().to_string(),
            message: e.to_string(),
        })?;
        if !root.is_dir() {
            return Err(AppError::Directory {
                path: root.display().to_string(),
                message: "not a directory".to_string(),
            });
        }
        tracing::info!("Crawling {}", root.display());
        let mut meta = Dataset::new();
        self.crawl_dir(&root, &root, &mut meta);
        tracing::info!(
            "\tMetadata of {} subjects collected",
            meta.subjects().len()
        );
        Ok(meta)
    }

    fn crawl_dir(&mut self, root: &Path, dir: &Path, meta: &mut Dataset) {
        let mut dirs = Vec::new();
        let mut files = Vec::new();
        let mut special = Vec::new();
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };
            if entry.path_is_symlink() {
                tracing::warn!("Skipping symbolic link {}", entry.path().display());
                continue;
            }
            let is_special = entry
                .file_name()
                .to_string_lossy()
                .starts_with(&self.special_prefix);
            if entry.file_type().is_dir() {
                dirs.push(entry.into_path());
            } else if is_special {
                special.push(entry.into_path());
            } else {
                files.push(entry.into_path());
            }
        }

        let scope = self.ids.id_for_path(root, dir);
        let mut overlay = Vec::new();
        for path in &special {
            let n = self.entities.add(self.readers.entities(path));
            if n > 0 {
                tracing::info!("\t{} named entities read from {}", n, path.display());
            }
            overlay.extend(self.readers.overlay(path));
        }
        let mut frame = Frame::new(scope.clone(), overlay);
        map_vocabularies(&self.ontology, &mut frame.quads);
        self.stack.push(frame);

        let kind = if dir == root {
            NodeKind::Root
        } else {
            NodeKind::Directory
        };
        meta.extend(self.node_metadata(root, dir, kind));
        for sub in &dirs {
            self.crawl_dir(root, sub, meta);
        }
        for file in &files {
            meta.extend(self.node_metadata(root, file, NodeKind::File));
        }
        self.stack.pop();
    }

    fn node_metadata(&self, root: &Path, path: &Path, kind: NodeKind) -> Dataset {
        let schema = &self.schema;
        let subject = self.ids.id_for_path(root, path);
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut base = Dataset::new();
        base.add(Quad::new(subject.clone(), schema.id.clone(), subject.clone()));
        match self.inventory.as_ref().filter(|inv| inv.contains(&subject)) {
            Some(inventory) => base.extend(inventory.about(&subject).cloned()),
            None => {
                let parent = path.parent().map(|p| self.ids.id_for_path(root, p));
                match kind {
                    NodeKind::Root => {
                        base.add(Quad::new(
                            subject.clone(),
                            Schema::rdf_type(),
                            schema.classes.top_collection.clone(),
                        ));
                    }
                    NodeKind::Directory => {
                        base.add(Quad::new(
                            subject.clone(),
                            Schema::rdf_type(),
                            schema.classes.collection.clone(),
                        ));
                    }
                    NodeKind::File => {}
                }
                if !matches!(kind, NodeKind::Root) {
                    if let Some(parent) = parent {
                        base.add(Quad::new(subject.clone(), schema.parent.clone(), parent));
                    }
                    base.add(Quad::new(
                        subject.clone(),
                        schema.file_name.clone(),
                        Term::literal(file_name.as_str()),
                    ));
                }
            }
        }

        let mut merged = self.stack.merge(&subject, base, schema);
        if !merged.has(&subject, &schema.label) {
            merged.add(Quad::new(
                subject.clone(),
                schema.label.clone(),
                Term::lang_literal(file_name, NEUTRAL_LANG),
            ));
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::default()
    }

    fn iri(s: &str) -> Iri {
        Iri::new(s)
    }

    fn placeholder(schema: &Schema, p: &str, o: &str) -> Quad {
        Quad::new(schema.any_resource.clone(), iri(p), Term::literal(o))
    }

    #[test]
    fn test_pop_keeps_root_frame() {
        let mut stack = ScopeStack::new(Frame::new(iri("urn:root"), Vec::new()));
        stack.push(Frame::new(iri("urn:a"), Vec::new()));
        assert_eq!(stack.depth(), 2);
        assert!(stack.pop().is_some());
        assert!(stack.pop().is_none());
        assert_eq!(stack.depth(), 1);
    }

    #[test]
    fn test_frames_tag_quads_with_scope() {
        let frame = Frame::new(iri("urn:a"), vec![Quad::new("urn:s", "urn:p", Term::literal("o"))]);
        assert!(frame.quads().iter().all(|q| q.scope.as_ref() == Some(&iri("urn:a"))));
    }

    #[test]
    fn test_shallow_placeholder_fills_first() {
        let schema = schema();
        let mut stack = ScopeStack::new(Frame::new(
            iri("urn:root"),
            vec![placeholder(&schema, "urn:p1", "A")],
        ));
        stack.push(Frame::new(
            iri("urn:dir"),
            vec![
                placeholder(&schema, "urn:p1", "B"),
                placeholder(&schema, "urn:p2", "C"),
            ],
        ));
        let file = iri("urn:file");
        let merged = stack.merge(&file, Dataset::new(), &schema);
        assert_eq!(merged.objects(&file, &iri("urn:p1")), vec![&Term::literal("A")]);
        assert_eq!(merged.objects(&file, &iri("urn:p2")), vec![&Term::literal("C")]);
    }

    #[test]
    fn test_subject_specific_values_block_defaults() {
        let schema = schema();
        let label = schema.label.as_str();
        let file = iri("urn:file");
        let mut stack = ScopeStack::new(Frame::new(
            iri("urn:root"),
            vec![placeholder(&schema, label, "DefaultLabel")],
        ));
        stack.push(Frame::new(
            iri("urn:dir"),
            vec![
                placeholder(&schema, label, "DirLabel"),
                Quad::new(file.clone(), schema.label.clone(), Term::literal("FileLabel")),
            ],
        ));
        let merged = stack.merge(&file, Dataset::new(), &schema);
        assert_eq!(
            merged.objects(&file, &schema.label),
            vec![&Term::literal("FileLabel")]
        );

        let other = iri("urn:other");
        let merged = stack.merge(&other, Dataset::new(), &schema);
        assert_eq!(
            merged.objects(&other, &schema.label),
            vec![&Term::literal("DefaultLabel")]
        );
    }

    #[test]
    fn test_class_defaults_follow_acquired_type() {
        let schema = schema();
        let file = iri("urn:file");
        let resource = schema.classes.resource.clone();
        let stack = ScopeStack::new(Frame::new(
            iri("urn:root"),
            vec![
                Quad::new(schema.any_resource.clone(), Schema::rdf_type(), resource.clone()),
                Quad::new(resource.clone(), iri("urn:license"), Term::literal("CC-BY")),
                Quad::new(iri("urn:OtherClass"), iri("urn:x"), Term::literal("no")),
            ],
        ));
        let merged = stack.merge(&file, Dataset::new(), &schema);
        assert_eq!(
            merged.objects(&file, &iri("urn:license")),
            vec![&Term::literal("CC-BY")]
        );
        assert!(!merged.has(&file, &iri("urn:x")));
    }

    #[test]
    fn test_multi_valued_defaults_accumulate_within_a_level() {
        let schema = schema();
        let file = iri("urn:file");
        let stack = ScopeStack::new(Frame::new(
            iri("urn:root"),
            vec![
                placeholder(&schema, "urn:author", "Jane"),
                placeholder(&schema, "urn:author", "John"),
            ],
        ));
        let mut base = Dataset::new();
        base.add(Quad::new(file.clone(), iri("urn:size"), Term::literal("1")));
        let merged = stack.merge(&file, base, &schema);
        assert_eq!(merged.objects(&file, &iri("urn:author")).len(), 2);
        assert_eq!(merged.objects(&file, &iri("urn:size")).len(), 1);
    }
}
