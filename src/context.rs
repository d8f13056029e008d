//! Run context holding the shared read-only handles.

use std::sync::Arc;

use crate::config::Config;
use crate::error::AppError;
use crate::ids::FileId;
use crate::models::Ontology;
use crate::readers::Readers;
use crate::schema::Schema;
use crate::services::{HttpResolver, MetadataChecker, Normalizer, Resolver};

/// Shared dependencies of a crawl or check run.
///
/// Everything here is loaded once and never mutated afterwards, so the
/// context can be cloned freely into concurrent validation tasks.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub ontology: Arc<Ontology>,
    pub schema: Arc<Schema>,
}

impl Context {
    pub fn new(config: Config, ontology: Ontology) -> Self {
        Self {
            schema: Arc::new(config.schema.clone()),
            config: Arc::new(config),
            ontology: Arc::new(ontology),
        }
    }

    /// Loads the ontology named by the configuration.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        tracing::info!("Loading ontology from {}", config.ontology.display());
        let ontology = Ontology::load(&config.ontology)?;
        Ok(Self::new(config, ontology))
    }

    /// Identifier generator for paths below `base`.
    pub fn ids(&self, base: &str) -> Result<FileId, AppError> {
        FileId::new(&self.config.crawl.id_prefix(), base)
    }

    pub fn readers(&self, ids: FileId) -> Readers {
        Readers::new(
            self.ontology.clone(),
            self.schema.clone(),
            ids,
            &self.config.crawl.default_lang,
        )
    }

    /// Checker resolving references over HTTP.
    pub fn checker(&self) -> Result<MetadataChecker, AppError> {
        let resolver = HttpResolver::new(&self.config.resolution)?;
        self.checker_with(Arc::new(resolver))
    }

    pub fn checker_with(&self, resolver: Arc<dyn Resolver>) -> Result<MetadataChecker, AppError> {
        let normalizer = Normalizer::new(&self.config.resolution.rules)?;
        Ok(MetadataChecker::new(
            self.ontology.clone(),
            self.schema.clone(),
            Arc::new(normalizer),
            resolver,
        )
        .with_concurrency(self.config.resolution.concurrency))
    }
}
