//! Check and run command handlers.

use std::path::Path;

use color_eyre::Result;

use crate::config::Config;
use crate::context::Context;
use crate::error::AppError;
use crate::models::Dataset;
use crate::readers::NTriplesReader;
use crate::services::{self, ValidationReport};

use super::crawl::write_graph;
use super::App;

impl App {
    /// Validate an N-Triples graph.
    pub async fn run_check(&self, input: &Path, report: Option<&Path>, quiet: bool) -> Result<()> {
        let ctx = Context::from_config(Config::load()?)?;
        let content = std::fs::read_to_string(input)?;
        let graph: Dataset = NTriplesReader.parse(&content)?.into_iter().collect();
        tracing::info!("Read {} quads from {}", graph.len(), input.display());
        check_graph(&ctx, &graph, report, quiet).await
    }

    /// Crawl, write the graph, then validate it. Validation failures don't
    /// affect the exit status.
    pub async fn run_pipeline(
        &self,
        root: &Path,
        metadata_dir: Option<&Path>,
        output: Option<&Path>,
        report: Option<&Path>,
        quiet: bool,
    ) -> Result<()> {
        let ctx = Context::from_config(Config::load()?)?;
        let graph = services::crawl(&ctx, root, metadata_dir)?;
        write_graph(&graph, output)?;
        check_graph(&ctx, &graph, report, quiet).await
    }
}

async fn check_graph(
    ctx: &Context,
    graph: &Dataset,
    report_path: Option<&Path>,
    quiet: bool,
) -> Result<()> {
    let checker = ctx.checker()?.with_progress(!quiet);
    let report = checker.validate(graph).await;
    if report.passed() {
        tracing::info!("Metadata check passed");
    } else {
        tracing::warn!(
            "Metadata check failed with {} issues, the graph is not ready for submission",
            report.issues.len()
        );
    }
    if let Some(path) = report_path {
        write_report(&report, path)?;
    }
    Ok(())
}

fn write_report(report: &ValidationReport, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|source| AppError::Output {
        path: path.display().to_string(),
        source,
    })?;
    tracing::info!("Validation report written to {}", path.display());
    Ok(())
}
