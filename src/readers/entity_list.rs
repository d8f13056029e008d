//! Named-entity lists (persons, organisations, places, ...).
//!
//! The header row is the first row whose first cell names an ontology
//! property. The entity class is inferred from the header: it must be the
//! only class having every listed property and having all its required
//! properties listed. A new entity starts at every row with a new label;
//! rows with an empty label continue the current entity.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use super::sheet::{cell_value, property_header, PropertyColumn};
use super::{read_rows, EntityReader, ReaderError};
use crate::models::{ClassDesc, EntityRecord, Iri, Ontology};
use crate::schema::Schema;

const HEADER_ROW_MAX: usize = 20;

pub struct EntityListReader {
    ontology: Arc<Ontology>,
    schema: Arc<Schema>,
    default_lang: String,
}

impl EntityListReader {
    pub fn new(ontology: Arc<Ontology>, schema: Arc<Schema>, default_lang: &str) -> Self {
        Self {
            ontology,
            schema,
            default_lang: default_lang.to_string(),
        }
    }

    fn header_row(&self, rows: &[Vec<String>]) -> Option<usize> {
        rows.iter().take(HEADER_ROW_MAX).position(|row| {
            row.first().is_some_and(|first| {
                let (uri, _) = property_header(&self.ontology, first, &self.default_lang);
                !first.is_empty() && self.ontology.property(&uri).is_some()
            })
        })
    }

    /// Resolves the class described by the header columns.
    fn infer_class(&self, path: &Path, headers: &[String]) -> Option<&ClassDesc> {
        let mut candidates: Vec<&ClassDesc> = self.ontology.classes().collect();
        let mut breaking = None;
        for header in headers {
            candidates.retain(|c| self.ontology.class_has_property(c, header));
            if candidates.is_empty() && breaking.is_none() {
                breaking = Some(header.as_str());
            }
        }
        candidates.retain(|class| {
            self.ontology
                .class_properties(class)
                .filter(|p| p.min > 0 && !p.automated_fill)
                .all(|p| headers.contains(&p.uri))
        });

        let agents = &self.schema.classes.agents;
        if candidates.len() > 1
            && candidates
                .iter()
                .all(|c| agents.iter().any(|a| a.as_str() == c.uri))
        {
            if let Some(first) = agents
                .iter()
                .find_map(|a| candidates.iter().find(|c| c.uri == a.as_str()))
            {
                candidates = vec![*first];
            }
        }

        match candidates.as_slice() {
            [class] => {
                tracing::debug!("\t{} mapped to class {}", path.display(), class.uri);
                Some(*class)
            }
            [] => {
                tracing::warn!(
                    "\t{} matches no classes ({} property not matched)",
                    path.display(),
                    breaking.unwrap_or("a required")
                );
                None
            }
            many => {
                let names: Vec<&str> = many.iter().map(|c| c.uri.as_str()).collect();
                tracing::warn!(
                    "\t{} matches multiple classes: {}",
                    path.display(),
                    names.join(", ")
                );
                None
            }
        }
    }

    /// Whether the entity carries every required property of the sheet.
    fn check_entity(&self, entity: &EntityRecord, columns: &[PropertyColumn]) -> bool {
        let mut valid = true;
        for column in columns {
            let property = &column.property;
            if property.automated_fill || (property.min == 0 && property.recommended.is_empty()) {
                continue;
            }
            if entity.has(&Iri::new(property.uri.as_str())) {
                continue;
            }
            if property.min > 0 {
                tracing::error!(
                    "\t\tEntity {} missing value of required property {}",
                    entity.node(),
                    property.uri
                );
                valid = false;
            } else {
                tracing::debug!(
                    "\t\tEntity {} missing value of recommended property {}",
                    entity.node(),
                    property.uri
                );
            }
        }
        valid
    }
}

impl EntityReader for EntityListReader {
    fn read_entities(&self, path: &Path) -> Result<Vec<EntityRecord>, ReaderError> {
        let rows = read_rows(path)?;
        let header_row = self.header_row(&rows).ok_or(ReaderError::UnrecognizedLayout)?;

        let mut columns = Vec::new();
        for (column, header) in rows[header_row].iter().enumerate() {
            if header.is_empty() {
                break;
            }
            let (uri, lang) = property_header(&self.ontology, header, &self.default_lang);
            match self.ontology.property(&uri) {
                Some(property) => columns.push(PropertyColumn {
                    column,
                    lang: property.lang_tag.then_some(lang),
                    property: property.clone(),
                }),
                None => {
                    tracing::warn!("\t{} uses unknown property {}", path.display(), header);
                    return Err(ReaderError::UnrecognizedLayout);
                }
            }
        }
        let headers: Vec<String> = columns.iter().map(|c| c.property.uri.clone()).collect();
        let class = self
            .infer_class(path, &headers)
            .ok_or(ReaderError::UnrecognizedLayout)?;
        let class_iri = Iri::new(class.uri.as_str());

        let find = |uri: &Iri| columns.iter().find(|c| c.property.uri == uri.as_str()).map(|c| c.column);
        let (Some(label_col), Some(id_col)) = (find(&self.schema.label), find(&self.schema.id)) else {
            return Err(ReaderError::Rejected(
                "entities list lacks an identifier or a title column".to_string(),
            ));
        };

        tracing::info!("Reading {} as a named entities list of {}", path.display(), class.uri);
        let rdf_type = Schema::rdf_type();
        let mut entities = Vec::new();
        let mut current: Option<EntityRecord> = None;
        let mut current_label: Option<String> = None;
        let mut labels: HashMap<String, usize> = HashMap::new();
        let mut ids: HashMap<String, usize> = HashMap::new();

        for (n, row) in rows.iter().enumerate().skip(header_row + 1) {
            let label = row.get(label_col).map(String::as_str).unwrap_or("");
            if !label.is_empty() && current_label.as_deref() != Some(label) {
                if let Some(entity) = current.take() {
                    if self.check_entity(&entity, &columns) {
                        entities.push(entity);
                    }
                }
                current_label = None;
                let id = row.get(id_col).map(String::as_str).unwrap_or("");
                if id.is_empty() {
                    tracing::debug!("\t\tSkipping row {} because of an empty id column", n + 1);
                } else {
                    current = Some(EntityRecord::new(id).with(&rdf_type, class_iri.clone()));
                    current_label = Some(label.to_string());
                    let count = labels.entry(label.to_string()).or_default();
                    *count += 1;
                    if *count > 1 {
                        tracing::error!("\t\tTitle {} used more than once in row {}", label, n + 1);
                    }
                }
            }
            let Some(entity) = current.as_mut() else {
                continue;
            };
            for column in &columns {
                let raw = row.get(column.column).map(String::as_str).unwrap_or("");
                let Some(value) = cell_value(&column.property, raw, column.lang.as_deref())? else {
                    continue;
                };
                if column.column == id_col {
                    let count = ids.entry(value.value().to_string()).or_default();
                    *count += 1;
                    if *count > 1 {
                        tracing::error!(
                            "\t\tIdentifier {} used more than once in row {}",
                            value.value(),
                            n + 1
                        );
                    }
                }
                entity.add(&Iri::new(column.property.uri.as_str()), value);
            }
        }
        if let Some(entity) = current.take() {
            if self.check_entity(&entity, &columns) {
                entities.push(entity);
            }
        }

        if labels.values().chain(ids.values()).any(|&count| count > 1) {
            return Err(ReaderError::Rejected(
                "aborting entities reading because of duplicated ids and/or titles".to_string(),
            ));
        }
        tracing::info!("\t{} entities read", entities.len());
        Ok(entities)
    }
}
