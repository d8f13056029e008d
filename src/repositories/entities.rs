//! Named-entity database: lookup by identifier or by (class, label).

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use crate::models::{EntityRecord, Iri};
use crate::schema::Schema;

/// A map slot. Once a key is declared by two different nodes it becomes a
/// tombstone and never resolves again.
#[derive(Debug, Clone)]
enum Slot {
    Entity(Arc<EntityRecord>),
    Tombstone,
}

/// Deduplicates and reconciles named entities declared across many sources.
///
/// Two indexes are kept:
/// - a global one keyed by every declared identifier and label;
/// - a per-class one keyed by `(class, label)`.
///
/// Ambiguity is reported once, when the conflicting registration happens.
/// Lookups of ambiguous keys simply return `None`.
#[derive(Debug)]
pub struct EntitiesDatabase {
    schema: Arc<Schema>,
    by_id: HashMap<String, Slot>,
    by_class: BTreeMap<String, HashMap<String, Slot>>,
}

impl EntitiesDatabase {
    pub fn new(schema: Arc<Schema>) -> Self {
        Self {
            schema,
            by_id: HashMap::new(),
            by_class: BTreeMap::new(),
        }
    }

    /// Registers entities under their identifiers, labels and
    /// `(class, label)` pairs. Returns the number of records processed.
    pub fn add<I, E>(&mut self, entities: I) -> usize
    where
        I: IntoIterator<Item = E>,
        E: Into<Arc<EntityRecord>>,
    {
        let rdf_type = Schema::rdf_type();
        let mut n = 0;
        for entity in entities {
            let entity: Arc<EntityRecord> = entity.into();
            let classes: Vec<String> = values(&entity, &rdf_type);
            let labels: Vec<String> = values(&entity, &self.schema.label);
            let ids: Vec<String> = values(&entity, &self.schema.id);

            // keys whose conflict was already warned about for this record
            let mut reported: HashSet<&str> = HashSet::new();
            for class in &classes {
                let map = self.by_class.entry(class.clone()).or_default();
                let context = format!("({} class mapping)", class);
                for label in &labels {
                    let quiet = reported.contains(label.as_str());
                    if check_and_map(map, &entity, label, &context, quiet) {
                        reported.insert(label.as_str());
                    }
                }
            }
            for key in ids.iter().chain(&labels) {
                let quiet = reported.contains(key.as_str());
                if check_and_map(&mut self.by_id, &entity, key, "(global mapping)", quiet) {
                    reported.insert(key.as_str());
                }
            }
            n += 1;
        }
        n
    }

    /// Whether `key` resolves to an entity (never true for tombstones).
    pub fn exists(&self, key: &str, class: Option<&str>) -> bool {
        self.get(key, class).is_some()
    }

    /// Exact lookup. Unknown and ambiguous keys both yield `None`.
    pub fn get(&self, key: &str, class: Option<&str>) -> Option<Arc<EntityRecord>> {
        let slot = match class {
            None => self.by_id.get(key),
            Some(class) => self.by_class.get(class).and_then(|map| map.get(key)),
        };
        match slot {
            Some(Slot::Entity(entity)) => Some(Arc::clone(entity)),
            Some(Slot::Tombstone) | None => None,
        }
    }

    /// Canonical identifier of the entity `key` resolves to.
    pub fn get_id(&self, key: &str, class: Option<&str>) -> Option<Iri> {
        let entity = self.get(key, class)?;
        entity
            .values(&self.schema.id)
            .first()
            .and_then(|id| id.as_iri())
            .cloned()
    }

    /// All resolvable entities registered under `class`, one per node,
    /// ordered by node IRI.
    pub fn entities_of_class(&self, class: &str) -> Vec<Arc<EntityRecord>> {
        let mut unique: BTreeMap<&Iri, &Arc<EntityRecord>> = BTreeMap::new();
        if let Some(map) = self.by_class.get(class) {
            for slot in map.values() {
                if let Slot::Entity(entity) = slot {
                    unique.entry(entity.node()).or_insert(entity);
                }
            }
        }
        unique.into_values().cloned().collect()
    }

    /// Classes with at least one registration attempt.
    pub fn classes(&self) -> Vec<Iri> {
        self.by_class.keys().map(|c| Iri::new(c.as_str())).collect()
    }
}

fn values(entity: &EntityRecord, predicate: &Iri) -> Vec<String> {
    entity
        .values(predicate)
        .into_iter()
        .map(|v| v.value().to_string())
        .collect()
}

/// Maps `key` to `entity` in `map`, tombstoning it on conflict. Returns
/// whether a new conflict was found. With `quiet`, the conflict is only
/// logged at debug level.
fn check_and_map(
    map: &mut HashMap<String, Slot>,
    entity: &Arc<EntityRecord>,
    key: &str,
    context: &str,
    quiet: bool,
) -> bool {
    match map.get(key) {
        None => {
            map.insert(key.to_string(), Slot::Entity(Arc::clone(entity)));
        }
        Some(Slot::Tombstone) => {
            tracing::debug!("key '{}' already ambiguous - skipping {}", key, context);
        }
        Some(Slot::Entity(existing)) if existing.node() == entity.node() => {
            if !Arc::ptr_eq(existing, entity) {
                tracing::debug!("repeated metadata for key '{}' {}", key, context);
            }
        }
        Some(Slot::Entity(existing)) => {
            let message = format!(
                "duplication for key '{}' ({} and {}) - removing the mapping {}",
                key,
                existing.node(),
                entity.node(),
                context
            );
            if quiet {
                tracing::debug!("{}", message);
            } else {
                tracing::warn!("{}", message);
            }
            map.insert(key.to_string(), Slot::Tombstone);
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Term;
    use crate::testing::capture_logs;

    fn schema() -> Arc<Schema> {
        Arc::new(Schema::default())
    }

    fn person(schema: &Schema, id: &str, labels: &[(&str, &str)]) -> EntityRecord {
        let mut record = EntityRecord::new(id)
            .with(&Schema::rdf_type(), Iri::new("https://example.org/Person"))
            .with(&schema.id, Iri::new(id));
        for (label, lang) in labels {
            record.add(&schema.label, Term::lang_literal(*label, *lang));
        }
        record
    }

    #[test]
    fn test_lookup_by_id_label_and_class() {
        let schema = schema();
        let mut db = EntitiesDatabase::new(schema.clone());
        let n = db.add(vec![person(
            &schema,
            "https://id.example.org/p1",
            &[("place 4", "en"), ("Platz 4", "de")],
        )]);
        assert_eq!(n, 1);
        assert!(db.exists("place 4", None));
        assert!(db.exists("Platz 4", None));
        assert!(db.exists("https://id.example.org/p1", None));
        assert!(db.exists("place 4", Some("https://example.org/Person")));
        assert!(!db.exists("place 4", Some("https://example.org/Place")));
        assert_eq!(
            db.get_id("Platz 4", None).unwrap().as_str(),
            "https://id.example.org/p1"
        );
    }

    #[test]
    fn test_same_entity_twice_is_idempotent() {
        let schema = schema();
        let mut db = EntitiesDatabase::new(schema.clone());
        let entity = Arc::new(person(&schema, "urn:p1", &[("Jane", "en")]));
        let (logs, _) = capture_logs(|| {
            db.add(vec![Arc::clone(&entity)]);
            db.add(vec![Arc::clone(&entity)]);
            db.add(vec![person(&schema, "urn:p1", &[("Jane", "en")])]);
        });
        assert!(Arc::ptr_eq(&db.get("Jane", None).unwrap(), &entity));
        assert!(!logs.contains("WARN"));
        assert!(logs.contains("repeated metadata"));
    }

    #[test]
    fn test_conflicting_label_is_tombstoned() {
        let schema = schema();
        let mut db = EntitiesDatabase::new(schema.clone());
        let class = "https://example.org/Person";
        let (logs, _) = capture_logs(|| {
            db.add(vec![
                person(&schema, "urn:p1", &[("J. Doe", "en")]),
                person(&schema, "urn:p2", &[("J. Doe", "en")]),
            ]);
        });
        assert!(db.get("J. Doe", Some(class)).is_none());
        assert!(db.get("J. Doe", None).is_none());
        let warnings: Vec<&str> = logs.lines().filter(|l| l.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "{logs}");
        assert!(warnings[0].contains("class mapping"));
        // the global index is tombstoned too, without a second warning
        assert!(logs
            .lines()
            .any(|l| l.contains("DEBUG") && l.contains("global mapping")));

        // a third declaration stays ambiguous without another warning
        let (logs, _) = capture_logs(|| {
            db.add(vec![person(&schema, "urn:p3", &[("J. Doe", "en")])]);
        });
        assert!(db.get("J. Doe", Some(class)).is_none());
        assert!(!logs.contains("WARN"));
        // unambiguous keys keep resolving
        assert!(db.exists("urn:p1", None));
        assert!(db.exists("urn:p3", None));
    }

    #[test]
    fn test_conflict_across_classes_warns_once() {
        let schema = schema();
        let mut db = EntitiesDatabase::new(schema.clone());
        let place = EntityRecord::new("urn:vienna")
            .with(&Schema::rdf_type(), Iri::new("https://example.org/Place"))
            .with(&schema.id, Iri::new("urn:vienna"))
            .with(&schema.label, Term::lang_literal("Vienna", "en"));
        let (logs, _) = capture_logs(|| {
            db.add(vec![place, person(&schema, "urn:p1", &[("Vienna", "en")])]);
        });
        // each class keeps its own unambiguous mapping
        assert!(db.exists("Vienna", Some("https://example.org/Place")));
        assert!(db.exists("Vienna", Some("https://example.org/Person")));
        assert!(!db.exists("Vienna", None));
        let warnings: Vec<&str> = logs.lines().filter(|l| l.contains("WARN")).collect();
        assert_eq!(warnings.len(), 1, "{logs}");
        assert!(warnings[0].contains("global mapping"));
    }

    #[test]
    fn test_entities_of_class_deduplicates() {
        let schema = schema();
        let mut db = EntitiesDatabase::new(schema.clone());
        db.add(vec![
            person(&schema, "urn:p2", &[("Bob", "en"), ("Robert", "de")]),
            person(&schema, "urn:p1", &[("Alice", "en")]),
        ]);
        let entities = db.entities_of_class("https://example.org/Person");
        let nodes: Vec<&str> = entities.iter().map(|e| e.node().as_str()).collect();
        assert_eq!(nodes, vec!["urn:p1", "urn:p2"]);
        assert!(db.entities_of_class("https://example.org/Place").is_empty());
        assert_eq!(db.classes(), vec![Iri::new("https://example.org/Person")]);
    }
}
