//! Global merge phase.
//!
//! Combines a primary graph (inventory and/or tree walk output) with
//! secondary overlays read from a metadata directory, links object values
//! to named entities and puts the result in its canonical order.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use walkdir::WalkDir;

use crate::error::AppError;
use crate::models::{Dataset, Iri, Ontology, PropertyKind, Quad, Term};
use crate::readers::{Readers, SourceKind};
use crate::repositories::EntitiesDatabase;
use crate::schema::{Schema, NEUTRAL_LANG};

/// Rewrites values of vocabulary-bound properties given as a concept id,
/// label or notation to the concept IRI.
pub fn map_vocabularies(ontology: &Ontology, meta: &mut Dataset) {
    meta.map_in_place(|q| {
        match ontology.concept_for(q.predicate.as_str(), q.object.value()) {
            Some(concept) if concept != q.object.value() || !q.object.is_iri() => {
                q.with_object(Iri::new(concept))
            }
            _ => q.clone(),
        }
    });
}

/// Links object values to named entities and sorts the graph.
///
/// Objects of entity-valued properties that resolve in `entities` are
/// rewritten to the entity node, and the entity records (plus whatever
/// `sources` say about the referenced subjects) are placed first. The rest
/// follows sorted by subject and predicate.
pub fn link_entities(
    mut meta: Dataset,
    entities: &EntitiesDatabase,
    ontology: &Ontology,
    schema: &Schema,
    sources: &[&Dataset],
) -> Dataset {
    let always: Vec<_> = entities
        .entities_of_class(schema.classes.project.as_str())
        .into_iter()
        .chain(entities.entities_of_class(schema.classes.publication.as_str()))
        .collect();
    for entity in &always {
        meta.extend(entity.quads().iter().cloned());
    }

    let mut objects: Vec<Iri> = Vec::new();
    let mut seen = HashSet::new();
    for quad in meta.iter() {
        if quad.predicate == schema.id {
            continue;
        }
        let entity_valued = ontology.property(quad.predicate.as_str()).is_some_and(|p| {
            p.kind == PropertyKind::Object && p.vocabulary.is_none()
        });
        if let (true, Some(object)) = (entity_valued, quad.object.as_iri()) {
            if seen.insert(object.clone()) {
                objects.push(object.clone());
            }
        }
    }

    let mut linked = Dataset::new();
    let mut rewritten = 0;
    for object in &objects {
        if let Some(entity) = entities.get(object.as_str(), None) {
            if entity.node() != object {
                let node = Term::from(entity.node().clone());
                let target = Term::from(object.clone());
                meta.map_in_place(|q| {
                    if q.object == target {
                        q.with_object(node.clone())
                    } else {
                        q.clone()
                    }
                });
                rewritten += 1;
            }
            linked.extend(entity.quads().iter().cloned());
        }
        for source in sources {
            linked.extend(source.about(object).cloned());
        }
    }
    if rewritten > 0 {
        tracing::info!("\t{} entity references mapped to identifiers", rewritten);
    }
    for entity in &always {
        linked.extend(entity.quads().iter().cloned());
    }

    linked.extend(meta.sorted());
    linked
}

/// Global merge phase driver.
pub struct MetadataCrawler {
    ontology: Arc<Ontology>,
    schema: Arc<Schema>,
    readers: Readers,
    entities: EntitiesDatabase,
    primary: Dataset,
    secondary: Dataset,
    base_id: Iri,
}

impl MetadataCrawler {
    pub fn new(
        ontology: Arc<Ontology>,
        schema: Arc<Schema>,
        readers: Readers,
        entities: EntitiesDatabase,
        primary: Dataset,
        base_id: Iri,
    ) -> Self {
        Self {
            ontology,
            schema,
            readers,
            entities,
            primary,
            secondary: Dataset::new(),
            base_id,
        }
    }

    pub fn secondary(&self) -> &Dataset {
        &self.secondary
    }

    /// Reads every metadata source in `dir` (non-recursive), skipping the
    /// inventory file and editor lock files.
    pub fn read_metadata_dir(&mut self, dir: &Path, inventory_file: &str) -> Result<(), AppError> {
        if !dir.is_dir() {
            return Err(AppError::Directory {
                path: dir.display().to_string(),
                message: "not a directory".to_string(),
            });
        }
        let walker = WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name();
        for entry in walker {
            let entry = entry.map_err(|e| AppError::Directory {
                path: dir.display().to_string(),
                message: e.to_string(),
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !entry.file_type().is_file() || name.contains('~') || name == inventory_file {
                continue;
            }
            self.read_source(entry.path());
        }
        self.finish_secondary();
        Ok(())
    }

    /// Reads one metadata source into the entities database or the
    /// secondary overlays.
    pub fn read_source(&mut self, path: &Path) {
        match SourceKind::of(path) {
            SourceKind::Sheet => {
                let mut n = self.entities.add(self.readers.entities(path));
                if n == 0 {
                    n = self.add_secondary(self.readers.vertical(path));
                }
                if n == 0 {
                    let quads = self.readers.horizontal(path);
                    n = quads.iter().map(|q| &q.subject).collect::<HashSet<_>>().len();
                    self.secondary.extend(quads);
                }
                if n == 0 {
                    tracing::warn!("Failed to parse {} in all supported formats", path.display());
                }
            }
            SourceKind::Rdf => {
                self.secondary.extend(self.readers.rdf(path));
            }
        }
    }

    /// Admits quads about subjects known to the primary graph. Returns the
    /// number of distinct subjects seen.
    pub fn add_secondary(&mut self, quads: Vec<Quad>) -> usize {
        let mut checked: HashSet<Iri> = HashSet::new();
        let mut known: HashSet<Iri> = HashSet::new();
        for quad in quads {
            if checked.insert(quad.subject.clone()) {
                if self.primary.has_subject(&quad.subject) {
                    known.insert(quad.subject.clone());
                } else {
                    tracing::warn!("\t{} is missing in the inventory", quad.subject);
                }
            }
            if known.contains(&quad.subject) {
                self.secondary.add(quad);
            }
        }
        checked.len()
    }

    /// Assigns the base scope to unscoped quads, maps entity labels to
    /// identifiers and vocabulary values to concepts.
    pub fn finish_secondary(&mut self) {
        let base = self.base_id.clone();
        let entities = &self.entities;
        self.secondary.map_in_place(|q| {
            let mut q = if q.scope.is_none() {
                q.with_scope(Some(&base))
            } else {
                q.clone()
            };
            let id = q
                .object
                .as_iri()
                .filter(|o| !o.is_absolute())
                .and_then(|o| entities.get_id(o.as_str(), None));
            if let Some(id) = id {
                q = q.with_object(id);
            }
            q
        });
        map_vocabularies(&self.ontology, &mut self.primary);
        map_vocabularies(&self.ontology, &mut self.secondary);
    }

    /// Merges secondary overlays into every primary subject and returns
    /// the linked, sorted graph. Scopes are kept.
    pub fn crawl(&self) -> Dataset {
        let schema = &self.schema;
        let rdf_type = Schema::rdf_type();
        let mut graphs: Vec<Iri> = self.secondary.scopes().into_iter().cloned().collect();
        graphs.sort();
        graphs.reverse();

        let mut meta = Dataset::new();
        for subject in self.primary.subjects() {
            let mut tmp: Dataset = self.primary.about(subject).cloned().collect();
            let ids: Vec<Iri> = iris(tmp.objects(subject, &schema.id));
            let classes: Vec<Iri> = iris(tmp.objects(subject, &rdf_type));

            let mut added: HashSet<Iri> = tmp.predicates(subject).into_iter().cloned().collect();
            for id in &ids {
                for quad in self.secondary.about(id) {
                    tmp.add(quad.with_subject(subject));
                    added.insert(quad.predicate.clone());
                }
            }
            for class in &classes {
                for graph in graphs.iter().filter(|g| subject.as_str().starts_with(g.as_str())) {
                    self.fill_missing(&mut tmp, &mut added, subject, class, graph);
                }
            }
            for graph in &graphs {
                self.fill_missing(&mut tmp, &mut added, subject, &schema.any_resource, graph);
            }

            if !tmp.has(subject, &schema.label) {
                let labels: Vec<Quad> = tmp
                    .objects(subject, &schema.file_name)
                    .into_iter()
                    .map(|name| {
                        Quad::new(
                            subject.clone(),
                            schema.label.clone(),
                            name.with_lang(NEUTRAL_LANG),
                        )
                    })
                    .collect();
                tmp.extend(labels);
            }
            meta.extend(tmp);
        }
        tracing::info!("Merged metadata of {} subjects", self.primary.subjects().len());

        link_entities(
            meta,
            &self.entities,
            &self.ontology,
            schema,
            &[&self.primary, &self.secondary],
        )
    }

    /// Adds `source` quads of `graph` whose predicate `added` doesn't hold
    /// yet, rewritten to `subject`.
    fn fill_missing(
        &self,
        tmp: &mut Dataset,
        added: &mut HashSet<Iri>,
        subject: &Iri,
        source: &Iri,
        graph: &Iri,
    ) {
        let mut new_props = Vec::new();
        for quad in self
            .secondary
            .about(source)
            .filter(|q| q.scope.as_ref() == Some(graph))
        {
            if !added.contains(&quad.predicate) {
                tmp.add(quad.with_subject(subject));
                new_props.push(quad.predicate.clone());
            }
        }
        added.extend(new_props);
    }
}

fn iris(terms: Vec<&Term>) -> Vec<Iri> {
    terms.into_iter().filter_map(|t| t.as_iri().cloned()).collect()
}
