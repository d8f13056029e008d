//! Named-entity records (persons, organisations, places, projects, ...).

use super::{Dataset, Iri, Quad, Term};

/// A subject IRI plus the quads describing it.
///
/// Records are registered in the entities database behind an `Arc`; two
/// registrations are "the same record" only when they share the allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    node: Iri,
    quads: Dataset,
}

impl EntityRecord {
    /// Creates an empty record for `node`.
    pub fn new(node: impl Into<Iri>) -> Self {
        Self {
            node: node.into(),
            quads: Dataset::new(),
        }
    }

    pub fn node(&self) -> &Iri {
        &self.node
    }

    /// Adds a `(node, predicate, object)` quad.
    pub fn add(&mut self, predicate: &Iri, object: impl Into<Term>) {
        self.quads.add(Quad::new(self.node.clone(), predicate.clone(), object));
    }

    /// Builder-style [`add`](Self::add).
    pub fn with(mut self, predicate: &Iri, object: impl Into<Term>) -> Self {
        self.add(predicate, object);
        self
    }

    /// Distinct objects of `predicate`.
    pub fn values(&self, predicate: &Iri) -> Vec<&Term> {
        self.quads.objects(&self.node, predicate)
    }

    pub fn has(&self, predicate: &Iri) -> bool {
        self.quads.has(&self.node, predicate)
    }

    pub fn quads(&self) -> &Dataset {
        &self.quads
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_of_predicate() {
        let label = Iri::new("urn:label");
        let record = EntityRecord::new("urn:e1")
            .with(&label, Term::lang_literal("Vienna", "en"))
            .with(&label, Term::lang_literal("Wien", "de"));
        assert_eq!(record.values(&label).len(), 2);
        assert!(record.has(&label));
        assert!(!record.has(&Iri::new("urn:other")));
    }
}
