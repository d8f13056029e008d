//! Data model for the metadata graph.

mod dataset;
mod entity;
pub mod ontology;
mod quad;
mod term;

pub use dataset::Dataset;
pub use entity::EntityRecord;
pub use ontology::{ClassDesc, Concept, Ontology, PropertyDesc, PropertyKind};
pub use quad::Quad;
pub use term::{Iri, Literal, Term};
