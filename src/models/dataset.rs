//! Insertion-ordered, deduplicated quad collection.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use super::{Iri, Quad, Term};

/// A set of quads that remembers insertion order.
///
/// Iteration order is the order in which distinct quads were first added,
/// which keeps every pipeline stage deterministic. Use [`Dataset::sorted`]
/// for the canonical output order.
///
/// Quads are also indexed by subject and by object, so per-subject queries
/// and reverse lookups don't scan the whole set.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    quads: IndexSet<Quad>,
    by_subject: HashMap<Iri, Vec<usize>>,
    by_object: HashMap<Term, Vec<usize>>,
}

impl Dataset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.quads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Adds a quad. Returns `false` if it was already present.
    pub fn add(&mut self, quad: Quad) -> bool {
        if self.quads.contains(&quad) {
            return false;
        }
        let position = self.quads.len();
        self.by_subject
            .entry(quad.subject.clone())
            .or_default()
            .push(position);
        self.by_object
            .entry(quad.object.clone())
            .or_default()
            .push(position);
        self.quads.insert(quad)
    }

    pub fn contains(&self, quad: &Quad) -> bool {
        self.quads.contains(quad)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Quad> {
        self.quads.iter()
    }

    fn at<'a>(&'a self, positions: Option<&'a Vec<usize>>) -> impl Iterator<Item = &'a Quad> + 'a {
        positions
            .into_iter()
            .flatten()
            .filter_map(|&i| self.quads.get_index(i))
    }

    /// Quads whose subject is `subject`, in insertion order.
    pub fn about(&self, subject: &Iri) -> impl Iterator<Item = &Quad> + '_ {
        self.at(self.by_subject.get(subject))
    }

    /// Objects of `(subject, predicate, *)`, distinct, in insertion order.
    pub fn objects(&self, subject: &Iri, predicate: &Iri) -> Vec<&Term> {
        let mut seen = HashSet::new();
        self.about(subject)
            .filter(|q| &q.predicate == predicate)
            .map(|q| &q.object)
            .filter(|o| seen.insert(*o))
            .collect()
    }

    /// Distinct subjects in insertion order.
    pub fn subjects(&self) -> Vec<&Iri> {
        let set: IndexSet<&Iri> = self.quads.iter().map(|q| &q.subject).collect();
        set.into_iter().collect()
    }

    /// Distinct scopes in insertion order.
    pub fn scopes(&self) -> IndexSet<&Iri> {
        self.quads.iter().filter_map(|q| q.scope.as_ref()).collect()
    }

    /// Distinct predicates used on `subject`.
    pub fn predicates(&self, subject: &Iri) -> IndexSet<&Iri> {
        self.about(subject).map(|q| &q.predicate).collect()
    }

    pub fn has_subject(&self, subject: &Iri) -> bool {
        self.by_subject.contains_key(subject)
    }

    pub fn has(&self, subject: &Iri, predicate: &Iri) -> bool {
        self.about(subject).any(|q| &q.predicate == predicate)
    }

    /// Whether any quad has the given predicate and object.
    pub fn has_object(&self, predicate: &Iri, object: &Term) -> bool {
        self.at(self.by_object.get(object))
            .any(|q| &q.predicate == predicate)
    }

    /// Groups quads by subject, keeping subject first-appearance order.
    pub fn by_subject(&self) -> IndexMap<&Iri, Vec<&Quad>> {
        let mut groups: IndexMap<&Iri, Vec<&Quad>> = IndexMap::new();
        for quad in &self.quads {
            groups.entry(&quad.subject).or_default().push(quad);
        }
        groups
    }

    /// Replaces every quad by `f(quad)`. Quads collapsing into an already
    /// present one are deduplicated.
    pub fn map_in_place(&mut self, f: impl Fn(&Quad) -> Quad) {
        *self = self.quads.iter().map(f).collect();
    }

    /// Drops provenance scopes, collapsing quads that differed only by scope.
    pub fn without_scopes(&self) -> Dataset {
        self.quads.iter().map(|q| q.with_scope(None)).collect()
    }

    /// Canonical order: subjects by lexical value, then predicates by
    /// lexical value. Objects keep their relative insertion order.
    pub fn sorted(&self) -> Dataset {
        let mut groups = self.by_subject();
        groups.sort_keys();
        let mut out = Dataset::new();
        for (_, quads) in groups {
            let mut quads = quads;
            quads.sort_by(|a, b| a.predicate.cmp(&b.predicate));
            out.extend(quads.into_iter().cloned());
        }
        out
    }

    /// N-Triples serialization, one quad per line.
    pub fn to_ntriples(&self) -> String {
        let mut out = String::new();
        for quad in &self.quads {
            out.push_str(&quad.to_string());
            out.push('\n');
        }
        out
    }
}

// indexes are derived from `quads`
impl PartialEq for Dataset {
    fn eq(&self, other: &Self) -> bool {
        self.quads == other.quads
    }
}

impl Eq for Dataset {}

impl Extend<Quad> for Dataset {
    fn extend<T: IntoIterator<Item = Quad>>(&mut self, iter: T) {
        for quad in iter {
            self.add(quad);
        }
    }
}

impl FromIterator<Quad> for Dataset {
    fn from_iter<T: IntoIterator<Item = Quad>>(iter: T) -> Self {
        let mut dataset = Dataset::new();
        dataset.extend(iter);
        dataset
    }
}

impl IntoIterator for Dataset {
    type Item = Quad;
    type IntoIter = indexmap::set::IntoIter<Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.into_iter()
    }
}

impl<'a> IntoIterator for &'a Dataset {
    type Item = &'a Quad;
    type IntoIter = indexmap::set::Iter<'a, Quad>;

    fn into_iter(self) -> Self::IntoIter {
        self.quads.iter()
    }
}
