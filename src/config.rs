//! Configuration with layered resolution using figment.
//!
//! Resolution order (highest priority last):
//! 1. User config: `~/.config/metacrawl/config.toml` (XDG) or platform config dir
//! 2. Project config: `.metacrawl.toml`
//! 3. Environment variables: `METACRAWL_*` (nested keys separated by `__`)
//!
//! # Intended Usage
//!
//! **Project config** (`.metacrawl.toml` next to the data):
//! ```toml
//! ontology = "ontology.json"
//!
//! [crawl]
//! id_prefix = "https://id.acdh.oeaw.ac.at/myproject"
//! default_lang = "en"
//! inventory_base_path = "/data/myproject"
//!
//! [resolution]
//! attempts = 4
//! backoff_base_ms = 250
//!
//! [[resolution.rules]]
//! range = "https://vocabs.acdh.oeaw.ac.at/schema#Place"
//! pattern = '^https?://(www\.|sws\.)?geonames\.org/([0-9]+)(/.*)?$'
//! replace = "https://sws.geonames.org/$2/"
//! resolve = "https://sws.geonames.org/$2/about.rdf"
//! ```
//!
//! Only `crawl.id_prefix` has no default.

use std::ops::Deref;
use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Boxed wrapper for figment::Error to reduce Result size on the stack.
#[derive(Debug)]
pub struct ConfigError(Box<figment::Error>);

impl Deref for ConfigError {
    type Target = figment::Error;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self(Box::new(err))
    }
}

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(default)]
    pub schema: Schema,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    /// Path of the ontology JSON document.
    #[serde(default = "default_ontology_path")]
    pub ontology: PathBuf,
}

/// Crawl and merge settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    /// Prefix of generated identifiers (required).
    pub id_prefix: String,
    /// Language tag for literals read without one.
    #[serde(default = "default_lang")]
    pub default_lang: String,
    /// File name prefix marking declarative metadata sources in the tree.
    #[serde(default = "default_special_prefix")]
    pub special_prefix: String,
    /// Name of the filesystem inventory inside the metadata directory.
    #[serde(default = "default_inventory_file")]
    pub inventory_file: String,
    /// Inventory entries outside this path are skipped.
    #[serde(default)]
    pub inventory_base_path: String,
    /// Map inventory file sizes to the binary size property.
    #[serde(default = "default_true")]
    pub map_binary_size: bool,
}

/// External URI resolution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolutionConfig {
    /// Total number of fetch attempts per URI.
    pub attempts: u32,
    /// Delay before retry `n` is `backoff_base_ms * n^backoff_exponent`.
    pub backoff_base_ms: u64,
    pub backoff_exponent: f64,
    /// Per-request timeout.
    pub timeout_secs: u64,
    /// Subjects validated concurrently.
    pub concurrency: usize,
    /// Normalization rules; every range named here is a checked range.
    pub rules: Vec<NormalizationRuleConfig>,
}

/// A single URI normalization rule for a checked range.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationRuleConfig {
    /// Range class the rule applies to.
    pub range: String,
    /// Regular expression a URI must match.
    pub pattern: String,
    /// Replacement producing the canonical URI.
    pub replace: String,
    /// Replacement producing the URL to fetch, canonical URI when absent.
    #[serde(default)]
    pub resolve: Option<String>,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            attempts: 3,
            backoff_base_ms: 500,
            backoff_exponent: 2.0,
            timeout_secs: 10,
            concurrency: 1,
            rules: Vec::new(),
        }
    }
}

fn default_ontology_path() -> PathBuf {
    PathBuf::from("ontology.json")
}

fn default_lang() -> String {
    crate::schema::NEUTRAL_LANG.to_string()
}

fn default_special_prefix() -> String {
    "__".to_string()
}

fn default_inventory_file() -> String {
    "fileList.json".to_string()
}

fn default_true() -> bool {
    true
}

impl CrawlConfig {
    /// Identifier prefix with the trailing slash enforced.
    pub fn id_prefix(&self) -> String {
        if self.id_prefix.ends_with('/') {
            self.id_prefix.clone()
        } else {
            format!("{}/", self.id_prefix)
        }
    }
}

impl Config {
    /// Load config with layered resolution (user → project → env).
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_figment(Self::figment())
    }

    /// The layered provider stack, exposed so callers can merge overrides.
    pub fn figment() -> Figment {
        let user_config = Self::user_config_path();

        Figment::new()
            // Layer 1: User config (lowest priority)
            .merge(Toml::file(user_config))
            // Layer 2: Project config
            .merge(Toml::file(".metacrawl.toml"))
            // Layer 3: Environment variables (highest priority)
            .merge(Env::prefixed("METACRAWL_").split("__"))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        figment.extract().map_err(ConfigError::from)
    }

    /// User config path: ~/.config/metacrawl/config.toml (XDG) or platform config dir.
    fn user_config_path() -> PathBuf {
        // Prefer XDG config location (~/.config) on all platforms
        if let Some(home) = dirs::home_dir() {
            let xdg_path = home.join(".config").join("metacrawl").join("config.toml");
            if xdg_path.exists() {
                return xdg_path;
            }
        }
        // Fall back to platform-specific config dir
        dirs::config_dir()
            .map(|p| p.join("metacrawl").join("config.toml"))
            .unwrap_or_default()
    }
}
