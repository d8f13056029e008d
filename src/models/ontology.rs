//! Ontology model: classes, property descriptions and controlled vocabularies.
//!
//! The ontology is loaded once from a JSON document and is read-only for the
//! rest of the run:
//!
//! ```json
//! {
//!   "namespace": "https://vocabs.acdh.oeaw.ac.at/schema#",
//!   "classes": [
//!     { "uri": "https://vocabs.acdh.oeaw.ac.at/schema#Resource",
//!       "properties": ["https://vocabs.acdh.oeaw.ac.at/schema#hasTitle"] }
//!   ],
//!   "properties": [
//!     { "uri": "https://vocabs.acdh.oeaw.ac.at/schema#hasTitle",
//!       "kind": "datatype", "min": 1, "max": 1, "lang_tag": true }
//!   ],
//!   "vocabularies": {
//!     "https://vocabs.acdh.oeaw.ac.at/archecategory/": [
//!       { "uri": "https://vocabs.acdh.oeaw.ac.at/archecategory/text",
//!         "labels": ["Text"], "notations": ["text"] }
//!     ]
//!   }
//! }
//! ```

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Whether a property takes named nodes or literals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    Object,
    Datatype,
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKind::Object => f.write_str("owl:ObjectProperty"),
            PropertyKind::Datatype => f.write_str("owl:DatatypeProperty"),
        }
    }
}

/// Description of a single property.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PropertyDesc {
    pub uri: String,
    pub kind: PropertyKind,
    /// Minimum number of values (0 = optional).
    #[serde(default)]
    pub min: u32,
    /// Maximum number of values, unbounded when absent.
    #[serde(default)]
    pub max: Option<u32>,
    /// Permitted ranges (classes or datatypes).
    #[serde(default)]
    pub range: Vec<String>,
    /// Controlled vocabulary the values must come from.
    #[serde(default)]
    pub vocabulary: Option<String>,
    /// Literal values must carry a language tag.
    #[serde(default)]
    pub lang_tag: bool,
    /// Filled in by the repository on ingestion.
    #[serde(default)]
    pub automated_fill: bool,
    #[serde(default)]
    pub default_value: Option<String>,
    /// Classes for which the property is recommended.
    #[serde(default)]
    pub recommended: Vec<String>,
}

impl PropertyDesc {
    /// Required on data entry: has a minimum and nobody fills it for us.
    pub fn is_required(&self) -> bool {
        self.min > 0 && !self.automated_fill && self.default_value.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassDesc {
    pub uri: String,
    /// Property URIs applicable to the class (inherited ones included).
    #[serde(default)]
    pub properties: Vec<String>,
}

/// A concept of a controlled vocabulary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Concept {
    pub uri: String,
    /// Alternative concept identifiers.
    #[serde(default)]
    pub concepts: Vec<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub notations: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct OntologyDocument {
    #[serde(default)]
    namespace: String,
    #[serde(default)]
    classes: Vec<ClassDesc>,
    #[serde(default)]
    properties: Vec<PropertyDesc>,
    #[serde(default)]
    vocabularies: BTreeMap<String, Vec<Concept>>,
}

/// Read-only ontology service.
#[derive(Debug, Clone, Default)]
pub struct Ontology {
    namespace: String,
    classes: BTreeMap<String, ClassDesc>,
    properties: BTreeMap<String, PropertyDesc>,
    vocabularies: BTreeMap<String, Vec<Concept>>,
    /// Per property: concept URIs allowed as values.
    concept_sets: HashMap<String, HashSet<String>>,
    /// Per property: concept id, label or notation -> concept URI.
    value_maps: HashMap<String, HashMap<String, String>>,
}

impl Ontology {
    /// Loads the ontology from a JSON file.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path).map_err(|e| AppError::Ontology {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json(&content).map_err(|e| AppError::Ontology {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let doc: OntologyDocument = serde_json::from_str(content)?;
        Ok(Self::from_parts(
            doc.namespace,
            doc.classes,
            doc.properties,
            doc.vocabularies,
        ))
    }

    pub fn from_parts(
        namespace: String,
        classes: Vec<ClassDesc>,
        properties: Vec<PropertyDesc>,
        vocabularies: BTreeMap<String, Vec<Concept>>,
    ) -> Self {
        let properties: BTreeMap<_, _> = properties
            .into_iter()
            .map(|p| (p.uri.clone(), p))
            .collect();

        let mut concept_sets = HashMap::new();
        let mut value_maps = HashMap::new();
        for prop in properties.values() {
            let Some(concepts) = prop.vocabulary.as_ref().and_then(|v| vocabularies.get(v)) else {
                continue;
            };
            let mut allowed = HashSet::new();
            let mut map = HashMap::new();
            for concept in concepts {
                allowed.insert(concept.uri.clone());
                for key in concept
                    .concepts
                    .iter()
                    .chain(&concept.labels)
                    .chain(&concept.notations)
                {
                    map.insert(key.clone(), concept.uri.clone());
                }
            }
            concept_sets.insert(prop.uri.clone(), allowed);
            value_maps.insert(prop.uri.clone(), map);
        }

        Self {
            namespace,
            classes: classes.into_iter().map(|c| (c.uri.clone(), c)).collect(),
            properties,
            vocabularies,
            concept_sets,
            value_maps,
        }
    }

    /// Namespace used to expand short property names.
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Expands a short name to a full URI using the ontology namespace.
    pub fn expand(&self, name: &str) -> String {
        if name.starts_with("http") || self.namespace.is_empty() {
            name.to_string()
        } else {
            format!("{}{}", self.namespace, name)
        }
    }

    pub fn class(&self, uri: &str) -> Option<&ClassDesc> {
        self.classes.get(uri)
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDesc> {
        self.classes.values()
    }

    pub fn property(&self, uri: &str) -> Option<&PropertyDesc> {
        self.properties.get(uri)
    }

    pub fn properties(&self) -> impl Iterator<Item = &PropertyDesc> {
        self.properties.values()
    }

    /// Properties applicable to `class`, skipping undeclared ones.
    pub fn class_properties<'a>(
        &'a self,
        class: &'a ClassDesc,
    ) -> impl Iterator<Item = &'a PropertyDesc> + 'a {
        class.properties.iter().filter_map(|p| self.properties.get(p))
    }

    pub fn class_has_property(&self, class: &ClassDesc, property: &str) -> bool {
        class.properties.iter().any(|p| p == property)
    }

    pub fn vocabulary(&self, name: &str) -> Option<&[Concept]> {
        self.vocabularies.get(name).map(Vec::as_slice)
    }

    /// Whether `value` is a concept URI of the vocabulary bound to `property`.
    pub fn is_concept(&self, property: &str, value: &str) -> bool {
        self.concept_sets
            .get(property)
            .is_some_and(|set| set.contains(value))
    }

    /// Concept URI for an id, label or notation of the vocabulary bound to
    /// `property`.
    pub fn concept_for(&self, property: &str, value: &str) -> Option<&str> {
        self.value_maps
            .get(property)
            .and_then(|map| map.get(value))
            .map(String::as_str)
    }
}
