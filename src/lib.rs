//! metacrawl - hierarchical metadata crawler
//!
//! Walks a directory tree, merges the metadata declared at every level into
//! one graph and validates it against an ontology.

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod models;
pub mod readers;
pub mod repositories;
pub mod schema;
pub mod services;

#[cfg(test)]
mod testing;
