//! Quads: triples tagged with the scope that declared them.

use std::fmt;

use super::{Iri, Term};

/// A subject/predicate/object triple plus a provenance scope.
///
/// The scope identifies the directory (or other unit) that declared the
/// quad. It takes part in precedence decisions while merging and is never
/// asserted in the final output.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Quad {
    pub subject: Iri,
    pub predicate: Iri,
    pub object: Term,
    pub scope: Option<Iri>,
}

impl Quad {
    pub fn new(subject: impl Into<Iri>, predicate: impl Into<Iri>, object: impl Into<Term>) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            scope: None,
        }
    }

    pub fn with_subject(&self, subject: &Iri) -> Self {
        Self {
            subject: subject.clone(),
            ..self.clone()
        }
    }

    pub fn with_object(&self, object: impl Into<Term>) -> Self {
        Self {
            object: object.into(),
            ..self.clone()
        }
    }

    pub fn with_predicate(&self, predicate: &Iri) -> Self {
        Self {
            predicate: predicate.clone(),
            ..self.clone()
        }
    }

    pub fn with_scope(&self, scope: Option<&Iri>) -> Self {
        Self {
            scope: scope.cloned(),
            ..self.clone()
        }
    }

    pub fn in_scope(mut self, scope: &Iri) -> Self {
        self.scope = Some(scope.clone());
        self
    }
}

/// N-Triples line (N-Quads when a scope is set).
impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}> <{}> {}", self.subject, self.predicate, self.object)?;
        if let Some(scope) = &self.scope {
            write!(f, " <{}>", scope)?;
        }
        f.write_str(" .")
    }
}
