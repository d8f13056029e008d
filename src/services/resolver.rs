//! URI normalization and resolution of external references.

use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use thiserror::Error;
use url::Url;

use crate::config::{NormalizationRuleConfig, ResolutionConfig};
use crate::error::AppError;

const RDF_ACCEPT: &str =
    "application/n-triples, text/turtle;q=0.9, application/rdf+xml;q=0.8, */*;q=0.1";

/// Why a reference could not be normalized or resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("{0} is not a valid URI")]
    InvalidUri(String),

    #[error("{uri} doesn't match any normalization rule for {range}")]
    NoMatchingRule { uri: String, range: String },

    #[error("Failed to fetch RDF data from {uri} ({reason})")]
    Fetch { uri: String, reason: String },
}

/// A canonical URI plus the URL to fetch to prove it exists.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUri {
    pub uri: String,
    pub fetch_url: String,
}

struct Rule {
    pattern: Regex,
    replace: String,
    resolve: Option<String>,
}

/// Per-range URI normalization rules, compiled once.
pub struct Normalizer {
    rules: BTreeMap<String, Vec<Rule>>,
}

impl Normalizer {
    pub fn new(rules: &[NormalizationRuleConfig]) -> Result<Self, AppError> {
        let mut compiled: BTreeMap<String, Vec<Rule>> = BTreeMap::new();
        for rule in rules {
            let pattern = Regex::new(&rule.pattern).map_err(|e| AppError::NormalizationRule {
                range: rule.range.clone(),
                message: e.to_string(),
            })?;
            compiled.entry(rule.range.clone()).or_default().push(Rule {
                pattern,
                replace: rule.replace.clone(),
                resolve: rule.resolve.clone(),
            });
        }
        Ok(Self { rules: compiled })
    }

    /// Whether values of `range` must resolve.
    pub fn is_checked(&self, range: &str) -> bool {
        self.rules.contains_key(range)
    }

    /// Range-independent normalization: the value must be an absolute URL.
    pub fn normalize_generic(&self, uri: &str) -> Result<NormalizedUri, ResolveError> {
        let url = Url::parse(uri).map_err(|_| ResolveError::InvalidUri(uri.to_string()))?;
        Ok(NormalizedUri {
            uri: uri.to_string(),
            fetch_url: url.into(),
        })
    }

    /// Applies the first rule of `range` matching `uri`.
    pub fn normalize(&self, range: &str, uri: &str) -> Result<NormalizedUri, ResolveError> {
        let rule = self
            .rules
            .get(range)
            .and_then(|rules| rules.iter().find(|r| r.pattern.is_match(uri)))
            .ok_or_else(|| ResolveError::NoMatchingRule {
                uri: uri.to_string(),
                range: range.to_string(),
            })?;
        let canonical = rule.pattern.replace(uri, rule.replace.as_str()).into_owned();
        let fetch_url = match &rule.resolve {
            Some(resolve) => rule.pattern.replace(uri, resolve.as_str()).into_owned(),
            None => canonical.clone(),
        };
        Ok(NormalizedUri {
            uri: canonical,
            fetch_url,
        })
    }
}

/// Proves a normalized reference exists.
#[async_trait]
pub trait Resolver: Send + Sync {
    async fn resolve(&self, target: &NormalizedUri) -> Result<(), ResolveError>;
}

/// Bounded retries with power-law backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub base: Duration,
    pub exponent: f64,
}

impl RetryPolicy {
    /// Delay before retry `n` (1-based): `base * n^exponent`.
    pub fn delay(&self, n: u32) -> Duration {
        self.base.mul_f64(f64::from(n).powf(self.exponent))
    }
}

impl From<&ResolutionConfig> for RetryPolicy {
    fn from(config: &ResolutionConfig) -> Self {
        Self {
            attempts: config.attempts.max(1),
            base: Duration::from_millis(config.backoff_base_ms),
            exponent: config.backoff_exponent,
        }
    }
}

/// Resolves references over HTTP. Outcomes are cached per URI.
pub struct HttpResolver {
    client: reqwest::Client,
    policy: RetryPolicy,
    cache: Mutex<HashMap<String, Result<(), ResolveError>>>,
}

impl HttpResolver {
    pub fn new(config: &ResolutionConfig) -> Result<Self, AppError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            policy: RetryPolicy::from(config),
            cache: Mutex::new(HashMap::new()),
        })
    }

    fn cached(&self, uri: &str) -> Option<Result<(), ResolveError>> {
        self.cache.lock().ok()?.get(uri).cloned()
    }

    async fn fetch(&self, target: &NormalizedUri) -> Result<(), ResolveError> {
        let fail = |reason: String| ResolveError::Fetch {
            uri: target.uri.clone(),
            reason,
        };
        let mut reason = String::new();
        for attempt in 1..=self.policy.attempts {
            let response = self
                .client
                .get(&target.fetch_url)
                .header(reqwest::header::ACCEPT, RDF_ACCEPT)
                .send()
                .await;
            match response {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) => {
                    let status = response.status();
                    reason = format!("HTTP {}", status);
                    // client errors other than throttling won't change on retry
                    if status.is_client_error() && status != reqwest::StatusCode::TOO_MANY_REQUESTS {
                        return Err(fail(reason));
                    }
                }
                Err(e) => reason = e.to_string(),
            }
            tracing::debug!(
                "Resolving {} failed (attempt {}/{}): {}",
                target.fetch_url,
                attempt,
                self.policy.attempts,
                reason
            );
            if attempt < self.policy.attempts {
                tokio::time::sleep(self.policy.delay(attempt)).await;
            }
        }
        Err(fail(reason))
    }
}

#[async_trait]
impl Resolver for HttpResolver {
    async fn resolve(&self, target: &NormalizedUri) -> Result<(), ResolveError> {
        if let Some(result) = self.cached(&target.uri) {
            return result;
        }
        let result = self.fetch(target).await;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(target.uri.clone(), result.clone());
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PLACE: &str = "https://vocabs.acdh.oeaw.ac.at/schema#Place";

    fn rules() -> Vec<NormalizationRuleConfig> {
        vec![NormalizationRuleConfig {
            range: PLACE.to_string(),
            pattern: r"^https?://(www\.|sws\.)?geonames\.org/([0-9]+)(/.*)?$".to_string(),
            replace: "https://sws.geonames.org/$2/".to_string(),
            resolve: Some("https://sws.geonames.org/$2/about.rdf".to_string()),
        }]
    }

    #[test]
    fn test_normalize_with_range_rule() {
        let normalizer = Normalizer::new(&rules()).unwrap();
        let n = normalizer
            .normalize(PLACE, "http://www.geonames.org/2761369/vienna.html")
            .unwrap();
        assert_eq!(n.uri, "https://sws.geonames.org/2761369/");
        assert_eq!(n.fetch_url, "https://sws.geonames.org/2761369/about.rdf");
        assert!(normalizer.is_checked(PLACE));
        assert!(!normalizer.is_checked("https://example.org/Other"));
    }

    #[test]
    fn test_normalize_without_matching_rule() {
        let normalizer = Normalizer::new(&rules()).unwrap();
        assert!(matches!(
            normalizer.normalize(PLACE, "https://example.org/vienna"),
            Err(ResolveError::NoMatchingRule { .. })
        ));
        assert!(normalizer.normalize("urn:other", "https://sws.geonames.org/1/").is_err());
    }

    #[test]
    fn test_generic_normalization() {
        let normalizer = Normalizer::new(&[]).unwrap();
        assert!(normalizer.normalize_generic("https://id.example.org/x").is_ok());
        assert!(matches!(
            normalizer.normalize_generic("Jane Doe"),
            Err(ResolveError::InvalidUri(_))
        ));
    }

    #[test]
    fn test_invalid_rule_is_fatal() {
        let mut bad = rules();
        bad[0].pattern = "([".to_string();
        assert!(matches!(
            Normalizer::new(&bad),
            Err(AppError::NormalizationRule { .. })
        ));
    }

    #[test]
    fn test_power_law_backoff() {
        let policy = RetryPolicy {
            attempts: 3,
            base: Duration::from_millis(100),
            exponent: 2.0,
        };
        assert_eq!(policy.delay(1), Duration::from_millis(100));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(900));
    }

    #[tokio::test]
    async fn test_unreachable_uri_fails_after_retries() {
        let config = ResolutionConfig {
            attempts: 2,
            backoff_base_ms: 1,
            timeout_secs: 2,
            ..ResolutionConfig::default()
        };
        let resolver = HttpResolver::new(&config).unwrap();
        let target = NormalizedUri {
            uri: "http://127.0.0.1:9/missing".to_string(),
            fetch_url: "http://127.0.0.1:9/missing".to_string(),
        };
        let err = resolver.resolve(&target).await.unwrap_err();
        assert!(err.to_string().starts_with("Failed to fetch RDF data from http://127.0.0.1:9/missing"));
        // served from the cache the second time
        assert_eq!(resolver.resolve(&target).await.unwrap_err(), err);
    }

    #[cfg(feature = "network")]
    #[tokio::test]
    async fn test_resolves_live_geonames_uri() {
        let normalizer = Normalizer::new(&rules()).unwrap();
        let resolver = HttpResolver::new(&ResolutionConfig::default()).unwrap();
        let target = normalizer
            .normalize(PLACE, "https://www.geonames.org/2761369")
            .unwrap();
        assert!(resolver.resolve(&target).await.is_ok());
    }
}
