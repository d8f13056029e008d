//! In-memory repositories populated during the crawl.

mod entities;

pub use entities::EntitiesDatabase;
