//! Schema validation of a merged metadata graph.
//!
//! Data problems never abort a check: each one is logged as
//! `{subject};{message}` and collected in a [`ValidationReport`].

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};

use super::resolver::{NormalizedUri, Normalizer, ResolveError, Resolver};
use crate::models::{ClassDesc, Dataset, Iri, Ontology, PropertyDesc, PropertyKind, Term};
use crate::schema::Schema;

const PROGRESS_INTERVAL: usize = 10;

/// A single violated rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    pub subject: String,
    pub message: String,
}

/// Outcome of a check run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationReport {
    pub checked_at: DateTime<Utc>,
    pub subjects: usize,
    pub issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Whether the graph is ready for submission.
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issues reported for `subject`.
    pub fn issues_for<'a>(&'a self, subject: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.issues
            .iter()
            .filter(move |i| i.subject == subject)
            .map(|i| i.message.as_str())
    }
}

pub struct MetadataChecker {
    ontology: Arc<Ontology>,
    schema: Arc<Schema>,
    normalizer: Arc<Normalizer>,
    resolver: Arc<dyn Resolver>,
    concurrency: usize,
    progress: bool,
}

impl MetadataChecker {
    pub fn new(
        ontology: Arc<Ontology>,
        schema: Arc<Schema>,
        normalizer: Arc<Normalizer>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            ontology,
            schema,
            normalizer,
            resolver,
            concurrency: 1,
            progress: true,
        }
    }

    /// Number of subjects validated concurrently.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Report progress at info level instead of debug.
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Validates every subject of `graph`; `true` when no rule was violated.
    pub async fn check(&self, graph: &Dataset) -> bool {
        self.validate(graph).await.passed()
    }

    pub async fn validate(&self, graph: &Dataset) -> ValidationReport {
        let subjects = graph.subjects();
        let total = subjects.len();
        tracing::info!("Checking {} subjects", total);

        let mut results = stream::iter(subjects)
            .map(|subject| async move { (subject, self.check_subject(graph, subject).await) })
            .buffered(self.concurrency);

        let mut issues = Vec::new();
        let mut n = 0;
        while let Some((subject, messages)) = results.next().await {
            for message in messages {
                tracing::error!("{};{}", subject, message);
                issues.push(ValidationIssue {
                    subject: subject.to_string(),
                    message,
                });
            }
            n += 1;
            if n % PROGRESS_INTERVAL == 0 {
                self.report_progress(n, total);
            }
        }

        let failed: HashSet<&str> = issues.iter().map(|i| i.subject.as_str()).collect();
        tracing::info!(
            "Check finished: {} of {} subjects failed",
            failed.len(),
            total
        );
        ValidationReport {
            checked_at: Utc::now(),
            subjects: total,
            issues,
        }
    }

    fn report_progress(&self, n: usize, total: usize) {
        let percent = 100.0 * n as f64 / total.max(1) as f64;
        if self.progress {
            tracing::info!("Check progress: {}/{} {:.1}%", n, total, percent);
        } else {
            tracing::debug!("Check progress: {}/{} {:.1}%", n, total, percent);
        }
    }

    async fn check_subject(&self, graph: &Dataset, subject: &Iri) -> Vec<String> {
        let rdf_type = Schema::rdf_type();
        let types = graph.objects(subject, &rdf_type);
        let class_uri = match types.as_slice() {
            [] => return vec!["rdf:type property missing".to_string()],
            [class] => class.value(),
            many => {
                let names: Vec<&str> = many.iter().map(|t| t.value()).collect();
                return vec![format!("multiple rdf:types: {}", names.join(", "))];
            }
        };
        let Some(class) = self.ontology.class(class_uri) else {
            return vec![format!("unknown class {}", class_uri)];
        };
        self.check_class(graph, subject, class).await
    }

    async fn check_class(&self, graph: &Dataset, subject: &Iri, class: &ClassDesc) -> Vec<String> {
        let mut messages = Vec::new();

        for property in self.ontology.class_properties(class) {
            if property.is_required() && !graph.has(subject, &Iri::new(property.uri.as_str())) {
                messages.push(format!("required property {} is missing", property.uri));
            }
        }

        let rdf_type = Schema::rdf_type();
        for predicate in graph.predicates(subject) {
            if predicate == &rdf_type {
                continue;
            }
            let property = self
                .ontology
                .property(predicate.as_str())
                .filter(|_| self.ontology.class_has_property(class, predicate.as_str()));
            let Some(property) = property else {
                messages.push(format!("unknown property {} used", predicate));
                continue;
            };
            let values = graph.objects(subject, predicate);
            if !self.check_kind(property, &values, &mut messages) {
                continue;
            }
            self.check_langs(property, &values, &mut messages);
            self.check_vocabulary(property, &values, &mut messages);
            if predicate == &self.schema.id {
                self.check_identifiers(predicate, &values, &mut messages);
            }
            self.check_references(graph, property, &values, &mut messages)
                .await;
        }
        messages
    }

    fn check_kind(&self, property: &PropertyDesc, values: &[&Term], messages: &mut Vec<String>) -> bool {
        let expect_iri = property.kind == PropertyKind::Object;
        if values.iter().all(|v| v.is_iri() == expect_iri) {
            return true;
        }
        messages.push(format!(
            "wrong type of value for a {} property {}",
            property.kind, property.uri
        ));
        false
    }

    fn check_langs(&self, property: &PropertyDesc, values: &[&Term], messages: &mut Vec<String>) {
        if !property.lang_tag {
            return;
        }
        let mut langs = HashSet::new();
        for literal in values.iter().filter_map(|v| v.as_literal()) {
            let lang = literal.lang();
            if lang.is_empty() {
                messages.push(format!(
                    "value {} of property {} misses the language tag",
                    literal.value, property.uri
                ));
            } else if property.max == Some(1) && !langs.insert(lang) {
                messages.push(format!(
                    "value {} of property {} has duplicated lang tag {}",
                    literal.value, property.uri, lang
                ));
            }
        }
    }

    fn check_vocabulary(&self, property: &PropertyDesc, values: &[&Term], messages: &mut Vec<String>) {
        if property.vocabulary.is_none() {
            return;
        }
        for value in values {
            if !self.ontology.is_concept(&property.uri, value.value()) {
                messages.push(format!(
                    "{} value {} does not match the controlled vocabulary",
                    property.uri,
                    value.value()
                ));
            }
        }
    }

    fn check_identifiers(&self, predicate: &Iri, values: &[&Term], messages: &mut Vec<String>) {
        for value in values {
            if let Err(e) = self.normalizer.normalize_generic(value.value()) {
                messages.push(format!("{} value {}: {}", predicate, value.value(), e));
            }
        }
    }

    /// References to checked ranges must resolve unless defined in `graph`.
    async fn check_references(
        &self,
        graph: &Dataset,
        property: &PropertyDesc,
        values: &[&Term],
        messages: &mut Vec<String>,
    ) {
        let ranges: Vec<&str> = property
            .range
            .iter()
            .map(String::as_str)
            .filter(|r| self.normalizer.is_checked(r))
            .collect();
        if ranges.is_empty() {
            return;
        }
        for iri in values.iter().filter_map(|v| v.as_iri()) {
            // a value is valid if it resolves under any of the checked ranges
            let mut targets = Vec::new();
            let mut fetch_error = None;
            let mut rule_error = None;
            let mut resolved = false;
            for range in &ranges {
                let target = match self.normalizer.normalize(range, iri.as_str()) {
                    Ok(target) => target,
                    Err(e) => {
                        rule_error.get_or_insert(e);
                        continue;
                    }
                };
                match self.resolver.resolve(&target).await {
                    Ok(()) => {
                        resolved = true;
                        break;
                    }
                    Err(e) => {
                        fetch_error.get_or_insert(e);
                        targets.push(target);
                    }
                }
            }
            if resolved {
                continue;
            }
            let e = fetch_error
                .or(rule_error)
                .unwrap_or_else(|| ResolveError::InvalidUri(iri.to_string()));
            if self.defined_locally(graph, iri, &targets) {
                tracing::debug!(
                    "{} value {} doesn't resolve but is defined in the checked graph: {}",
                    property.uri,
                    iri,
                    e
                );
                continue;
            }
            messages.push(format!("{} value {}: {}", property.uri, iri, e));
        }
    }

    /// Whether the value, or one of its canonical forms, is a subject or a
    /// declared identifier in `graph`.
    fn defined_locally(&self, graph: &Dataset, iri: &Iri, targets: &[NormalizedUri]) -> bool {
        std::iter::once(iri.clone())
            .chain(targets.iter().map(|t| Iri::new(t.uri.as_str())))
            .any(|id| graph.has_subject(&id) || graph.has_object(&self.schema.id, &Term::iri(id)))
    }
}
