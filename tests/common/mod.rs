//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use figment::providers::{Format, Toml};
use figment::Figment;
use metacrawl::config::Config;
use metacrawl::context::Context;
use metacrawl::models::{Iri, Ontology};

pub const NS: &str = "https://vocabs.acdh.oeaw.ac.at/schema#";
pub const CAT: &str = "https://vocabs.acdh.oeaw.ac.at/archecategory/";
pub const PREFIX: &str = "https://id.example.org/proj";

pub const OWL_THING: &str = "http://www.w3.org/2002/07/owl#Thing";
pub const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";

pub fn ontology() -> Ontology {
    let common = format!(
        r#""{NS}hasIdentifier", "{NS}hasTitle", "{NS}isPartOf", "{NS}hasFilename",
           "{NS}hasCategory", "{NS}hasDescription""#
    );
    let doc = format!(
        r#"{{
        "namespace": "{NS}",
        "classes": [
            {{"uri": "{NS}TopCollection", "properties": [{common}]}},
            {{"uri": "{NS}Collection", "properties": [{common}]}},
            {{"uri": "{NS}Resource", "properties": [{common}, "{NS}hasContributor",
                "{NS}hasSpatialCoverage", "{NS}hasBinarySize", "{NS}hasFormat"]}},
            {{"uri": "{NS}Person", "properties": ["{NS}hasIdentifier", "{NS}hasTitle", "{NS}hasLastName"]}},
            {{"uri": "{NS}Place", "properties": ["{NS}hasIdentifier", "{NS}hasTitle"]}}
        ],
        "properties": [
            {{"uri": "{NS}hasIdentifier", "kind": "object", "min": 1}},
            {{"uri": "{NS}hasTitle", "kind": "datatype", "min": 1, "max": 1, "lang_tag": true}},
            {{"uri": "{NS}isPartOf", "kind": "object"}},
            {{"uri": "{NS}hasFilename", "kind": "datatype"}},
            {{"uri": "{NS}hasCategory", "kind": "object", "vocabulary": "{CAT}"}},
            {{"uri": "{NS}hasDescription", "kind": "datatype", "lang_tag": true}},
            {{"uri": "{NS}hasContributor", "kind": "object", "range": ["{NS}Person"]}},
            {{"uri": "{NS}hasSpatialCoverage", "kind": "object", "range": ["{NS}Place"]}},
            {{"uri": "{NS}hasBinarySize", "kind": "datatype"}},
            {{"uri": "{NS}hasFormat", "kind": "datatype"}},
            {{"uri": "{NS}hasLastName", "kind": "datatype"}}
        ],
        "vocabularies": {{
            "{CAT}": [{{"uri": "{CAT}text", "labels": ["Text"], "notations": ["text"]}}]
        }}
    }}"#
    );
    Ontology::from_json(&doc).expect("test ontology")
}

/// Context with the test ontology and extra `[resolution]` settings.
pub fn context_with(resolution: &str) -> Context {
    let toml = format!(
        r#"
        [crawl]
        id_prefix = "{PREFIX}"
        default_lang = "en"

        [resolution]
        attempts = 1
        backoff_base_ms = 1
        {resolution}

        [[resolution.rules]]
        range = "{NS}Place"
        pattern = '^https?://(www\.|sws\.)?geonames\.org/([0-9]+)(/.*)?$'
        replace = "https://sws.geonames.org/$2/"
        "#
    );
    let config = Config::from_figment(Figment::new().merge(Toml::string(&toml)))
        .expect("test config");
    Context::new(config, ontology())
}

pub fn context() -> Context {
    context_with("")
}

pub fn p(name: &str) -> Iri {
    Iri::new(format!("{NS}{name}"))
}

/// Identifier of a path relative to the crawled root.
pub fn id(relative: &str) -> Iri {
    if relative.is_empty() {
        Iri::new(PREFIX)
    } else {
        Iri::new(format!("{PREFIX}/{relative}"))
    }
}

/// Writes `content` to `root/relative`, creating parent directories.
pub fn write(root: &Path, relative: &str, content: &str) -> PathBuf {
    let path = root.join(relative);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create parent");
    }
    std::fs::write(&path, content).expect("write fixture");
    path
}

/// The `root/dirA/file1` tree: root makes everything a resource, `dirA`
/// adds a category and `file1` has its own title.
pub fn sample_tree(root: &Path) {
    write(
        root,
        "__defaults.nt",
        &format!("<{OWL_THING}> <{RDF_TYPE}> <{NS}Resource> .\n"),
    );
    write(
        root,
        "dirA/__category.nt",
        &format!("<{OWL_THING}> <{NS}hasCategory> \"Text\" .\n"),
    );
    write(root, "dirA/__files.csv", "path,hasTitle\ndirA/file1.txt,Doc1\n");
    write(root, "dirA/file1.txt", "hello");
}
