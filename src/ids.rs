//! Deterministic identifier generation for files and directories.

use std::path::Path;

use url::Url;

use crate::error::AppError;
use crate::models::Iri;

/// Maps paths below a base directory to IRIs below an identifier prefix.
///
/// Each path segment becomes one percent-encoded URL path segment, so
/// distinct relative paths always map to distinct identifiers. The base
/// directory itself maps to the prefix without its trailing slash.
#[derive(Debug, Clone)]
pub struct FileId {
    prefix: Url,
    base: String,
}

impl FileId {
    pub fn new(prefix: &str, base: &str) -> Result<Self, AppError> {
        let prefix = Url::parse(prefix).map_err(|e| AppError::IdPrefix {
            prefix: prefix.to_string(),
            message: e.to_string(),
        })?;
        if prefix.cannot_be_a_base() {
            return Err(AppError::IdPrefix {
                prefix: prefix.to_string(),
                message: "not a hierarchical URL".to_string(),
            });
        }
        Ok(Self {
            prefix,
            base: base.trim_end_matches('/').to_string(),
        })
    }

    /// Base directory, without a trailing slash.
    pub fn base(&self) -> &str {
        &self.base
    }

    /// Identifier of a `/`-separated path. Paths starting with the base
    /// directory are made relative to it first.
    pub fn id(&self, path: &str) -> Iri {
        let relative = if self.base.is_empty() {
            path
        } else if path == self.base {
            ""
        } else {
            path.strip_prefix(&format!("{}/", self.base)).unwrap_or(path)
        };
        self.id_of_segments(relative.split('/').filter(|s| !s.is_empty()))
    }

    /// Identifier of a filesystem path relative to `root`.
    pub fn id_for_path(&self, root: &Path, path: &Path) -> Iri {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let segments: Vec<String> = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        self.id_of_segments(segments.iter().map(String::as_str))
    }

    fn id_of_segments<'a>(&self, segments: impl Iterator<Item = &'a str>) -> Iri {
        let mut url = self.prefix.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        Iri::new(String::from(url))
    }
}
