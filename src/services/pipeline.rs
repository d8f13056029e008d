//! Full crawl: tree walk, optional metadata directory, entity linking.

use std::path::Path;

use super::crawler::DirectoryCrawler;
use super::inventory::Inventory;
use super::merger::{link_entities, MetadataCrawler};
use crate::context::Context;
use crate::error::AppError;
use crate::models::Dataset;

/// Crawls `root` and returns the merged, sorted graph without scopes.
///
/// With a `metadata_dir`, the inventory file inside it drives the primary
/// graph and every other file there becomes a secondary overlay.
pub fn crawl(ctx: &Context, root: &Path, metadata_dir: Option<&Path>) -> Result<Dataset, AppError> {
    let crawl = &ctx.config.crawl;
    let root = root.canonicalize().map_err(|e| AppError::Directory {
        path: root.display().to_string(),
        message: e.to_string(),
    })?;
    let base = if crawl.inventory_base_path.is_empty() {
        root.display().to_string()
    } else {
        crawl.inventory_base_path.clone()
    };
    let ids = ctx.ids(&base)?;

    let mut walker = DirectoryCrawler::new(
        ctx.ontology.clone(),
        ctx.schema.clone(),
        ctx.readers(ids.clone()),
        ids.clone(),
        &crawl.special_prefix,
    );
    if let Some(dir) = metadata_dir {
        let inventory = Inventory::load(
            &dir.join(&crawl.inventory_file),
            &ids,
            &ctx.schema,
            crawl.map_binary_size,
        )?;
        walker = walker.with_inventory(inventory);
    }

    let primary = walker.crawl(&root)?;
    tracing::info!("\t{} quads collected", primary.len());
    let entities = walker.into_entities();

    let meta = match metadata_dir {
        Some(dir) => {
            tracing::info!("Reading metadata directory {}", dir.display());
            let mut merger = MetadataCrawler::new(
                ctx.ontology.clone(),
                ctx.schema.clone(),
                ctx.readers(ids.clone()),
                entities,
                primary,
                ids.id(""),
            );
            merger.read_metadata_dir(dir, &crawl.inventory_file)?;
            merger.crawl()
        }
        None => link_entities(primary, &entities, &ctx.ontology, &ctx.schema, &[]),
    };
    Ok(meta.without_scopes())
}
