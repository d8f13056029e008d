//! N-Triples / N-Quads reader.
//!
//! Graph labels of N-Quads input are accepted and dropped: provenance is
//! assigned by the crawler from the file location. Blank nodes are rejected
//! since they can't be merged across sources.

use std::path::Path;

use super::{MetadataReader, ReaderError};
use crate::models::{Iri, Literal, Quad, Term};

#[derive(Debug, Default, Clone, Copy)]
pub struct NTriplesReader;

impl NTriplesReader {
    /// Parses a whole document. Any malformed line fails the document.
    pub fn parse(&self, content: &str) -> Result<Vec<Quad>, ReaderError> {
        let mut quads = Vec::new();
        for (n, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let quad = LineParser::new(line)
                .statement()
                .map_err(|message| ReaderError::Syntax { line: n + 1, message })?;
            quads.push(quad);
        }
        Ok(quads)
    }
}

impl MetadataReader for NTriplesReader {
    fn name(&self) -> &'static str {
        "an RDF file"
    }

    fn read_quads(&self, path: &Path) -> Result<Vec<Quad>, ReaderError> {
        let content = std::fs::read_to_string(path)?;
        self.parse(&content)
    }
}

struct LineParser<'a> {
    rest: &'a str,
}

impl<'a> LineParser<'a> {
    fn new(line: &'a str) -> Self {
        Self { rest: line }
    }

    fn statement(mut self) -> Result<Quad, String> {
        let subject = self.iri()?;
        let predicate = self.iri()?;
        let object = self.object()?;
        self.skip_ws();
        if self.rest.starts_with('<') {
            self.iri()?;
        } else if self.rest.starts_with("_:") {
            return Err("blank nodes are not supported".to_string());
        }
        self.skip_ws();
        let Some(rest) = self.rest.strip_prefix('.') else {
            return Err("missing final '.'".to_string());
        };
        let rest = rest.trim_start();
        if !rest.is_empty() && !rest.starts_with('#') {
            return Err(format!("unexpected trailing content: {}", rest));
        }
        Ok(Quad::new(subject, predicate, object))
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn iri(&mut self) -> Result<Iri, String> {
        self.skip_ws();
        if self.rest.starts_with("_:") {
            return Err("blank nodes are not supported".to_string());
        }
        let Some(rest) = self.rest.strip_prefix('<') else {
            return Err(format!("expected an IRI at: {}", self.rest));
        };
        let end = rest.find('>').ok_or_else(|| "unterminated IRI".to_string())?;
        let value = unescape(&rest[..end])?;
        self.rest = &rest[end + 1..];
        Ok(Iri::new(value))
    }

    fn object(&mut self) -> Result<Term, String> {
        self.skip_ws();
        if !self.rest.starts_with('"') {
            return self.iri().map(Term::from);
        }
        let body = &self.rest[1..];
        let mut end = None;
        let mut escaped = false;
        for (i, c) in body.char_indices() {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => {}
            }
        }
        let end = end.ok_or_else(|| "unterminated literal".to_string())?;
        let value = unescape(&body[..end])?;
        self.rest = &body[end + 1..];

        if let Some(rest) = self.rest.strip_prefix('@') {
            let len = rest
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
                .unwrap_or(rest.len());
            if len == 0 {
                return Err("empty language tag".to_string());
            }
            let lang = rest[..len].to_string();
            self.rest = &rest[len..];
            Ok(Term::Literal(Literal::with_lang(value, lang)))
        } else if let Some(rest) = self.rest.strip_prefix("^^") {
            self.rest = rest;
            let datatype = self.iri()?;
            Ok(Term::Literal(Literal::typed(value, datatype)))
        } else {
            Ok(Term::literal(value))
        }
    }
}

fn unescape(raw: &str) -> Result<String, String> {
    if !raw.contains('\\') {
        return Ok(raw.to_string());
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('t') => out.push('\t'),
            Some('b') => out.push('\u{8}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('f') => out.push('\u{c}'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some('\\') => out.push('\\'),
            Some(u @ ('u' | 'U')) => {
                let len = if u == 'u' { 4 } else { 8 };
                let hex: String = chars.by_ref().take(len).collect();
                let code = u32::from_str_radix(&hex, 16)
                    .ok()
                    .filter(|_| hex.len() == len)
                    .and_then(char::from_u32)
                    .ok_or_else(|| format!("invalid unicode escape \\{}{}", u, hex))?;
                out.push(code);
            }
            other => return Err(format!("invalid escape sequence \\{}", other.unwrap_or(' '))),
        }
    }
    Ok(out)
}
