//! RDF terms: named nodes and literals.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A named node (IRI).
///
/// Two IRIs are equal iff their string forms match. No normalization is
/// applied on construction.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Iri(String);

impl Iri {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the IRI is an absolute web address rather than a bare
    /// label or local identifier.
    pub fn is_absolute(&self) -> bool {
        self.0.starts_with("http")
    }
}

impl fmt::Display for Iri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Iri {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Iri {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A scalar value, optionally language-tagged or typed.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Literal {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datatype: Option<Iri>,
}

impl Literal {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            lang: None,
            datatype: None,
        }
    }

    /// Language-tagged literal. An empty tag is stored as no tag.
    pub fn with_lang(value: impl Into<String>, lang: impl Into<String>) -> Self {
        let lang = lang.into();
        Self {
            value: value.into(),
            lang: (!lang.is_empty()).then_some(lang),
            datatype: None,
        }
    }

    pub fn typed(value: impl Into<String>, datatype: impl Into<Iri>) -> Self {
        Self {
            value: value.into(),
            lang: None,
            datatype: Some(datatype.into()),
        }
    }

    /// Language tag, empty string when absent.
    pub fn lang(&self) -> &str {
        self.lang.as_deref().unwrap_or("")
    }
}

/// An RDF term as used in the object position of a quad.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Term {
    Iri { value: Iri },
    Literal(Literal),
}

impl Term {
    pub fn iri(value: impl Into<Iri>) -> Self {
        Term::Iri {
            value: value.into(),
        }
    }

    pub fn literal(value: impl Into<String>) -> Self {
        Term::Literal(Literal::new(value))
    }

    pub fn lang_literal(value: impl Into<String>, lang: impl Into<String>) -> Self {
        Term::Literal(Literal::with_lang(value, lang))
    }

    pub fn typed_literal(value: impl Into<String>, datatype: impl Into<Iri>) -> Self {
        Term::Literal(Literal::typed(value, datatype))
    }

    /// Lexical value (IRI string or literal value).
    pub fn value(&self) -> &str {
        match self {
            Term::Iri { value } => value.as_str(),
            Term::Literal(literal) => &literal.value,
        }
    }

    pub fn as_iri(&self) -> Option<&Iri> {
        match self {
            Term::Iri { value } => Some(value),
            Term::Literal(_) => None,
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            Term::Literal(literal) => Some(literal),
            Term::Iri { .. } => None,
        }
    }

    pub fn is_iri(&self) -> bool {
        matches!(self, Term::Iri { .. })
    }

    /// Same value with a different language tag. IRIs are returned unchanged.
    pub fn with_lang(&self, lang: &str) -> Self {
        match self {
            Term::Literal(literal) => Term::lang_literal(literal.value.clone(), lang),
            Term::Iri { .. } => self.clone(),
        }
    }
}

impl From<Iri> for Term {
    fn from(value: Iri) -> Self {
        Term::Iri { value }
    }
}

impl From<Literal> for Term {
    fn from(value: Literal) -> Self {
        Term::Literal(value)
    }
}

/// N-Triples rendering.
impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Iri { value } => write!(f, "<{}>", value),
            Term::Literal(literal) => {
                write!(f, "\"{}\"", escape(&literal.value))?;
                if let Some(lang) = &literal.lang {
                    write!(f, "@{}", lang)
                } else if let Some(datatype) = &literal.datatype {
                    write!(f, "^^<{}>", datatype)
                } else {
                    Ok(())
                }
            }
        }
    }
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_equality_includes_lang_and_datatype() {
        assert_eq!(Term::lang_literal("a", "en"), Term::lang_literal("a", "en"));
        assert_ne!(Term::lang_literal("a", "en"), Term::lang_literal("a", "de"));
        assert_ne!(Term::literal("a"), Term::typed_literal("a", "urn:dt"));
    }

    #[test]
    fn test_empty_lang_is_no_lang() {
        assert_eq!(Term::lang_literal("a", ""), Term::literal("a"));
    }

    #[test]
    fn test_display_escapes_literals() {
        let term = Term::lang_literal("say \"hi\"\n", "en");
        assert_eq!(term.to_string(), "\"say \\\"hi\\\"\\n\"@en");
        let typed = Term::typed_literal("5", "http://www.w3.org/2001/XMLSchema#integer");
        assert_eq!(
            typed.to_string(),
            "\"5\"^^<http://www.w3.org/2001/XMLSchema#integer>"
        );
    }

    #[test]
    fn test_is_absolute() {
        assert!(Iri::new("https://example.org/x").is_absolute());
        assert!(!Iri::new("Jane Doe").is_absolute());
    }
}
