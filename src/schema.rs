//! Well-known property and class IRIs.
//!
//! Defaults follow the ARCHE repository vocabulary; every value can be
//! overridden in the `[schema]` configuration section.

use serde::{Deserialize, Serialize};

use crate::models::Iri;

pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
pub const OWL_THING: &str = "http://www.w3.org/2002/07/owl#Thing";
pub const XSD_NON_NEGATIVE_INTEGER: &str = "http://www.w3.org/2001/XMLSchema#nonNegativeInteger";

/// Language tag of synthesized labels.
pub const NEUTRAL_LANG: &str = "und";

const NMSP: &str = "https://vocabs.acdh.oeaw.ac.at/schema#";

fn acdh(name: &str) -> Iri {
    Iri::new(format!("{NMSP}{name}"))
}

/// Property IRIs the pipeline gives special meaning to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Schema {
    /// Identifier property; every entity carries itself as a value.
    pub id: Iri,
    pub label: Iri,
    pub parent: Iri,
    pub file_name: Iri,
    pub mime: Iri,
    pub binary_size: Iri,
    pub category: Iri,
    /// Placeholder subject for defaults that apply to any resource.
    pub any_resource: Iri,
    pub classes: SchemaClasses,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaClasses {
    pub top_collection: Iri,
    pub collection: Iri,
    pub resource: Iri,
    pub project: Iri,
    pub publication: Iri,
    /// Entity-list sheets matching several of these collapse to the first.
    pub agents: Vec<Iri>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            id: acdh("hasIdentifier"),
            label: acdh("hasTitle"),
            parent: acdh("isPartOf"),
            file_name: acdh("hasFilename"),
            mime: acdh("hasFormat"),
            binary_size: acdh("hasBinarySize"),
            category: acdh("hasCategory"),
            any_resource: Iri::new(OWL_THING),
            classes: SchemaClasses::default(),
        }
    }
}

impl Default for SchemaClasses {
    fn default() -> Self {
        Self {
            top_collection: acdh("TopCollection"),
            collection: acdh("Collection"),
            resource: acdh("Resource"),
            project: acdh("Project"),
            publication: acdh("Publication"),
            agents: vec![acdh("Organisation"), acdh("Agent"), acdh("Person")],
        }
    }
}

impl Schema {
    pub fn rdf_type() -> Iri {
        Iri::new(RDF_TYPE)
    }
}
