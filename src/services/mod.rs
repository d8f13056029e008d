//! Crawl, merge and validation services.
//!
//! Services borrow the read-only handles of a [`Context`](crate::context::Context)
//! and own the mutable state of one run (entities database, scope stack,
//! accumulated graph).

mod checker;
mod crawler;
mod inventory;
mod merger;
mod pipeline;
mod resolver;

pub use checker::{MetadataChecker, ValidationIssue, ValidationReport};
pub use crawler::{DirectoryCrawler, Frame, ScopeStack};
pub use inventory::{Inventory, InventoryRecord};
pub use merger::{link_entities, map_vocabularies, MetadataCrawler};
pub use pipeline::crawl;
pub use resolver::{HttpResolver, NormalizedUri, Normalizer, ResolveError, Resolver, RetryPolicy};
