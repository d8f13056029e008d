//! Crawl command handler.

use std::io::Write;
use std::path::Path;

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::error::AppError;
use crate::models::Dataset;
use crate::services;

use super::App;

impl App {
    /// Crawl a directory tree and write the merged graph.
    pub async fn run_crawl(
        &self,
        root: &Path,
        metadata_dir: Option<&Path>,
        output: Option<&Path>,
    ) -> Result<()> {
        let ctx = Context::from_config(Config::load()?)?;
        let graph = services::crawl(&ctx, root, metadata_dir)?;
        write_graph(&graph, output)?;
        tracing::info!("{} quads written", graph.len());
        Ok(())
    }
}

/// Writes `graph` as N-Triples to `output`, or to stdout.
pub(super) fn write_graph(graph: &Dataset, output: Option<&Path>) -> Result<(), AppError> {
    let ntriples = graph.to_ntriples();
    match output {
        Some(path) => std::fs::write(path, ntriples).map_err(|source| AppError::Output {
            path: path.display().to_string(),
            source,
        }),
        None => std::io::stdout()
            .lock()
            .write_all(ntriples.as_bytes())
            .map_err(|source| AppError::Output {
                path: "<stdout>".to_string(),
                source,
            }),
    }
}
