//! Tabular metadata sheets (CSV).
//!
//! Two layouts are recognized:
//! - vertical: a header row with `path` (or `directory` + `filename`)
//!   columns and one column per property, one row per described file;
//! - horizontal: a `machine name` column holding property names and
//!   `value 1`, `value 2`, ... columns holding their values. Horizontal
//!   sheets describe defaults for any resource, or for the class given in a
//!   `class` row.

use std::path::Path;
use std::sync::{Arc, LazyLock};

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;

use super::{read_rows, MetadataReader, ReaderError};
use crate::ids::FileId;
use crate::models::{Iri, Ontology, PropertyDesc, PropertyKind, Quad, Term};
use crate::schema::Schema;

const VERTICAL_HEADER_ROW_MAX: usize = 10;
const HORIZONTAL_HEADER_ROW_MAX: usize = 20;

const COLUMN_PATH: &str = "path";
const COLUMN_DIR: &str = "directory";
const COLUMN_FILENAME: &str = "filename";

pub(crate) const XSD_DATE: &str = "http://www.w3.org/2001/XMLSchema#date";
pub(crate) const XSD_DATE_TIME: &str = "http://www.w3.org/2001/XMLSchema#dateTime";

static VALUE_LANG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?s)(.*)@([a-z]{2,3})[[:blank:]]*$").expect("valid regex"));
static ONLY_YEAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^-?[0-9]+$").expect("valid regex"));

/// A sheet column bound to an ontology property.
#[derive(Debug, Clone)]
pub(crate) struct PropertyColumn {
    pub column: usize,
    pub property: PropertyDesc,
    /// Language of untagged values; `None` for properties without tags.
    pub lang: Option<String>,
}

/// Splits a `name@lang` header into the expanded property URI and language.
pub(crate) fn property_header(ontology: &Ontology, header: &str, default_lang: &str) -> (String, String) {
    match header.split_once('@') {
        Some((name, lang)) => (ontology.expand(name.trim()), lang.trim().to_string()),
        None => (ontology.expand(header), default_lang.to_string()),
    }
}

/// Converts a raw cell into a term according to the property description.
///
/// Empty cells yield `None`. Date and date-time properties are normalized;
/// an unparseable date rejects the value.
pub(crate) fn cell_value(
    property: &PropertyDesc,
    raw: &str,
    lang: Option<&str>,
) -> Result<Option<Term>, ReaderError> {
    let value = raw.trim();
    if value.is_empty() {
        return Ok(None);
    }
    if property.kind == PropertyKind::Object {
        return Ok(Some(Term::iri(value)));
    }
    let is_date = property.range.iter().any(|r| r == XSD_DATE);
    let is_date_time = property.range.iter().any(|r| r == XSD_DATE_TIME);
    if is_date || is_date_time {
        let parsed = parse_date_time(value).ok_or_else(|| {
            ReaderError::Rejected(format!("{} is not a valid date for {}", value, property.uri))
        })?;
        return Ok(Some(if is_date {
            Term::typed_literal(parsed.format("%Y-%m-%d").to_string(), XSD_DATE)
        } else {
            Term::typed_literal(
                parsed.and_utc().format("%Y-%m-%dT%H:%M:%S%z").to_string(),
                XSD_DATE_TIME,
            )
        }));
    }
    if let Some(captures) = VALUE_LANG.captures(value) {
        return Ok(Some(Term::lang_literal(&captures[1], &captures[2])));
    }
    Ok(Some(match lang {
        Some(lang) => Term::lang_literal(value, lang),
        None => Term::literal(value),
    }))
}

fn parse_date_time(value: &str) -> Option<NaiveDateTime> {
    if ONLY_YEAR.is_match(value) {
        let year: i32 = value.parse().ok()?;
        return NaiveDate::from_ymd_opt(year, 1, 1)?.and_hms_opt(0, 0, 0);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }
    for format in ["%Y-%m-%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

fn cell(row: &[String], column: usize) -> &str {
    row.get(column).map(String::as_str).unwrap_or("")
}

/// Reader for sheets with one row per described file.
pub struct VerticalSheetReader {
    ontology: Arc<Ontology>,
    ids: FileId,
    default_lang: String,
}

struct VerticalLayout {
    header_row: usize,
    properties: Vec<PropertyColumn>,
    path: Option<usize>,
    dir: Option<usize>,
    file_name: Option<usize>,
}

impl VerticalSheetReader {
    pub fn new(ontology: Arc<Ontology>, ids: FileId, default_lang: &str) -> Self {
        Self {
            ontology,
            ids,
            default_lang: default_lang.to_string(),
        }
    }

    fn layout(&self, rows: &[Vec<String>]) -> Option<VerticalLayout> {
        for (header_row, row) in rows.iter().enumerate().take(VERTICAL_HEADER_ROW_MAX) {
            let mut layout = VerticalLayout {
                header_row,
                properties: Vec::new(),
                path: None,
                dir: None,
                file_name: None,
            };
            for (column, header) in row.iter().enumerate() {
                match header.to_lowercase().as_str() {
                    COLUMN_PATH => layout.path = Some(column),
                    COLUMN_DIR => layout.dir = Some(column),
                    COLUMN_FILENAME => layout.file_name = Some(column),
                    "" => {}
                    _ => {
                        let (uri, lang) =
                            property_header(&self.ontology, header, &self.default_lang);
                        if let Some(property) = self.ontology.property(&uri) {
                            layout.properties.push(PropertyColumn {
                                column,
                                lang: property.lang_tag.then_some(lang),
                                property: property.clone(),
                            });
                        }
                    }
                }
            }
            let has_paths =
                layout.path.is_some() || (layout.dir.is_some() && layout.file_name.is_some());
            if !layout.properties.is_empty() && has_paths {
                return Some(layout);
            }
        }
        None
    }

    fn row_path(layout: &VerticalLayout, row: &[String], prev_dir: &mut String) -> String {
        if let Some(path) = layout.path.map(|c| cell(row, c)).filter(|p| !p.is_empty()) {
            return path.to_string();
        }
        let (Some(dir_col), Some(name_col)) = (layout.dir, layout.file_name) else {
            return String::new();
        };
        let dir = cell(row, dir_col);
        if !dir.is_empty() {
            *prev_dir = dir.to_string();
        }
        let file_name = cell(row, name_col);
        if file_name.is_empty() {
            return String::new();
        }
        if prev_dir.is_empty() {
            file_name.to_string()
        } else {
            format!("{}/{}", prev_dir.trim_end_matches('/'), file_name)
        }
    }
}

impl MetadataReader for VerticalSheetReader {
    fn name(&self) -> &'static str {
        "a vertical metadata sheet"
    }

    fn read_quads(&self, path: &Path) -> Result<Vec<Quad>, ReaderError> {
        let rows = read_rows(path)?;
        let layout = self.layout(&rows).ok_or(ReaderError::UnrecognizedLayout)?;

        let mut quads = Vec::new();
        let mut prev_path = String::new();
        let mut prev_dir = String::new();
        let mut subject: Option<Iri> = None;
        let mut files = 0;
        for row in rows.iter().skip(layout.header_row + 1) {
            // rows without a path continue the previous file
            let row_path = Self::row_path(&layout, row, &mut prev_dir);
            if !row_path.is_empty() && row_path != prev_path {
                subject = Some(self.ids.id(&row_path));
                prev_path = row_path;
                files += 1;
            }
            let Some(subject) = &subject else {
                continue;
            };
            for column in &layout.properties {
                let value = cell_value(&column.property, cell(row, column.column), column.lang.as_deref())?;
                if let Some(value) = value {
                    quads.push(Quad::new(
                        subject.clone(),
                        column.property.uri.as_str(),
                        value,
                    ));
                }
            }
        }
        tracing::debug!("\tMetadata of {} files read", files);
        Ok(quads)
    }
}

/// Reader for sheets with one row per property.
pub struct HorizontalSheetReader {
    ontology: Arc<Ontology>,
    schema: Arc<Schema>,
    default_lang: String,
}

impl HorizontalSheetReader {
    pub fn new(ontology: Arc<Ontology>, schema: Arc<Schema>, default_lang: &str) -> Self {
        Self {
            ontology,
            schema,
            default_lang: default_lang.to_string(),
        }
    }

    fn layout(rows: &[Vec<String>]) -> Option<(usize, usize, usize)> {
        for (header_row, row) in rows.iter().enumerate().take(HORIZONTAL_HEADER_ROW_MAX) {
            let mut predicate_col = None;
            let mut value_col = None;
            for (column, header) in row.iter().enumerate() {
                let normalized: String = header
                    .to_lowercase()
                    .chars()
                    .filter(|c| !matches!(c, ' ' | '_' | '-'))
                    .collect();
                match normalized.as_str() {
                    "machinename" => predicate_col = Some(column),
                    "value1" => value_col = Some(column),
                    _ => {}
                }
            }
            if let (Some(p), Some(v)) = (predicate_col, value_col) {
                return Some((header_row, p, v));
            }
        }
        None
    }
}

impl MetadataReader for HorizontalSheetReader {
    fn name(&self) -> &'static str {
        "a horizontal metadata sheet"
    }

    fn read_quads(&self, path: &Path) -> Result<Vec<Quad>, ReaderError> {
        let rows = read_rows(path)?;
        let (header_row, predicate_col, value_col) =
            Self::layout(&rows).ok_or(ReaderError::UnrecognizedLayout)?;
        let body = &rows[header_row + 1..];

        let mut subject = self.schema.any_resource.clone();
        for row in body {
            if cell(row, predicate_col).eq_ignore_ascii_case("class") {
                let class = cell(row, value_col);
                if !class.is_empty() {
                    subject = Iri::new(self.ontology.expand(class));
                }
            }
        }

        let mut quads = Vec::new();
        for row in body {
            let header = cell(row, predicate_col);
            if header.is_empty() || header.eq_ignore_ascii_case("class") {
                continue;
            }
            let (uri, lang) = property_header(&self.ontology, header, &self.default_lang);
            let Some(property) = self.ontology.property(&uri) else {
                tracing::debug!("\tSkipping unknown property {} in {}", header, path.display());
                continue;
            };
            let lang = property.lang_tag.then_some(lang.as_str());
            for raw in row.iter().skip(value_col) {
                if let Some(value) = cell_value(property, raw, lang)? {
                    quads.push(Quad::new(subject.clone(), property.uri.as_str(), value));
                }
            }
        }
        Ok(quads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const NS: &str = "https://example.org/schema#";

    fn ontology() -> Arc<Ontology> {
        Arc::new(
            Ontology::from_json(&format!(
                r#"{{
                "namespace": "{NS}",
                "classes": [],
                "properties": [
                    {{"uri": "{NS}hasTitle", "kind": "datatype", "lang_tag": true}},
                    {{"uri": "{NS}hasNote", "kind": "datatype"}},
                    {{"uri": "{NS}hasDate", "kind": "datatype",
                      "range": ["{XSD_DATE}"]}},
                    {{"uri": "{NS}hasAuthor", "kind": "object"}}
                ]
            }}"#
            ))
            .unwrap(),
        )
    }

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    fn property(uri: &str) -> PropertyDesc {
        ontology().property(&format!("{NS}{uri}")).unwrap().clone()
    }

    #[test]
    fn test_cell_value_languages() {
        let title = property("hasTitle");
        assert_eq!(
            cell_value(&title, "Hello@de ", Some("en")).unwrap(),
            Some(Term::lang_literal("Hello", "de"))
        );
        assert_eq!(
            cell_value(&title, "Hello", Some("en")).unwrap(),
            Some(Term::lang_literal("Hello", "en"))
        );
        assert_eq!(cell_value(&title, "  ", Some("en")).unwrap(), None);
        assert_eq!(
            cell_value(&property("hasNote"), "x", None).unwrap(),
            Some(Term::literal("x"))
        );
    }

    #[test]
    fn test_cell_value_dates_and_objects() {
        let date = property("hasDate");
        assert_eq!(
            cell_value(&date, "1999", None).unwrap(),
            Some(Term::typed_literal("1999-01-01", XSD_DATE))
        );
        assert_eq!(
            cell_value(&date, "2020-05-06", None).unwrap(),
            Some(Term::typed_literal("2020-05-06", XSD_DATE))
        );
        assert!(cell_value(&date, "someday", None).is_err());
        assert_eq!(
            cell_value(&property("hasAuthor"), "Jane Doe", None).unwrap(),
            Some(Term::iri("Jane Doe"))
        );
    }

    #[test]
    fn test_vertical_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "__meta.csv",
            "Some description,,\n\
             path,hasTitle@en,hasAuthor\n\
             a/f1.txt,First,Jane\n\
             ,,John\n\
             a/f2.txt,Second,\n",
        );
        let ids = FileId::new("https://id.example.org/p/", "").unwrap();
        let reader = VerticalSheetReader::new(ontology(), ids, "und");
        let quads = reader.read_quads(&path).unwrap();
        let f1 = Iri::new("https://id.example.org/p/a/f1.txt");
        let authors: Vec<_> = quads
            .iter()
            .filter(|q| q.subject == f1 && q.predicate.as_str().ends_with("hasAuthor"))
            .collect();
        assert_eq!(authors.len(), 2);
        assert!(quads.contains(&Quad::new(
            "https://id.example.org/p/a/f2.txt",
            format!("{NS}hasTitle").as_str(),
            Term::lang_literal("Second", "en"),
        )));
        assert_eq!(quads.len(), 4);
    }

    #[test]
    fn test_vertical_sheet_directory_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "__meta.csv",
            "directory,filename,hasNote\nsub,a.txt,n1\n,b.txt,n2\n",
        );
        let ids = FileId::new("https://id.example.org/p/", "").unwrap();
        let reader = VerticalSheetReader::new(ontology(), ids, "und");
        let quads = reader.read_quads(&path).unwrap();
        assert_eq!(quads[1].subject.as_str(), "https://id.example.org/p/sub/b.txt");
    }

    #[test]
    fn test_vertical_sheet_without_paths_is_unrecognized() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(&dir, "__meta.csv", "hasTitle,hasNote\na,b\n");
        let ids = FileId::new("https://id.example.org/p/", "").unwrap();
        let reader = VerticalSheetReader::new(ontology(), ids, "und");
        assert!(matches!(
            reader.read_quads(&path),
            Err(ReaderError::UnrecognizedLayout)
        ));
    }

    #[test]
    fn test_horizontal_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "__defaults.csv",
            "Machine name,Value 1,Value 2\n\
             hasTitle@de,Titel,\n\
             hasAuthor,Jane,John\n\
             unknownProp,x,\n",
        );
        let reader = HorizontalSheetReader::new(ontology(), Arc::new(Schema::default()), "en");
        let quads = reader.read_quads(&path).unwrap();
        assert_eq!(quads.len(), 3);
        assert!(quads.iter().all(|q| q.subject.as_str() == crate::schema::OWL_THING));
        assert_eq!(quads[0].object, Term::lang_literal("Titel", "de"));
    }

    #[test]
    fn test_horizontal_sheet_class_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "__defaults.csv",
            "machine_name,value1\nclass,Collection\nhasNote,shared\n",
        );
        let reader = HorizontalSheetReader::new(ontology(), Arc::new(Schema::default()), "en");
        let quads = reader.read_quads(&path).unwrap();
        assert_eq!(quads.len(), 1);
        assert_eq!(quads[0].subject.as_str(), format!("{NS}Collection"));
    }
}
