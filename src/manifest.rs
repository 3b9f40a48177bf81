// Copyright 2026 Folio Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Manifest loading: fetch, shape detection, key mapping, and the publish gate.

use std::collections::HashSet;
use std::fmt;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use log::debug;
use log::info;
use serde_json::Map;
use serde_json::Value;
use url::Url;

use crate::model::Record;
use crate::viewer::DocumentBase;

const ID_KEYS: &[&str] = &["id", "Id"];
const TITLE_KEYS: &[&str] = &["title", "Title"];
const YEAR_KEYS: &[&str] = &["year", "Year"];
const SUMMARY_KEYS: &[&str] = &["summary", "Summary"];
const SOURCE_KEYS: &[&str] = &["source", "Source"];
const PRIMARY_KEYS: &[&str] = &["file_pdf", "url_pdf", "pdf"];
const SECONDARY_KEYS: &[&str] = &["file_OCR", "url_OCR", "file_ocr", "ocr"];
const TYPE_KEYS: &[&str] = &["type", "Type"];
const THEMES_KEYS: &[&str] = &["themes"];
const PAGE_KEYS: &[&str] = &["blog_page"];

const UNTITLED: &str = "Untitled";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestSource {
    Path(PathBuf),
    Url(String),
}

impl ManifestSource {
    pub fn parse(location: &str) -> Self {
        if location.starts_with("http://") || location.starts_with("https://") {
            ManifestSource::Url(location.to_string())
        } else {
            ManifestSource::Path(PathBuf::from(location))
        }
    }

    /// Base that relative document references resolve against.
    pub fn document_base(&self) -> Option<DocumentBase> {
        match self {
            ManifestSource::Path(path) => path
                .parent()
                .map(|dir| DocumentBase::Dir(dir.to_path_buf())),
            ManifestSource::Url(url) => Url::parse(url).ok().map(DocumentBase::Url),
        }
    }
}

impl fmt::Display for ManifestSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ManifestSource::Path(path) => write!(f, "{}", path.display()),
            ManifestSource::Url(url) => f.write_str(url),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Items pass only when this key holds boolean `true`.
    pub publish_flag: Option<String>,
}

#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<Record>,
    pub unpublished: usize,
    pub warnings: Vec<String>,
}

pub fn load(source: &ManifestSource, opts: &LoadOptions) -> Result<LoadReport> {
    let text = match source {
        ManifestSource::Path(path) => std::fs::read_to_string(path)
            .with_context(|| format!("read manifest {}", path.display()))?,
        ManifestSource::Url(url) => reqwest::blocking::get(url)
            .and_then(|resp| resp.error_for_status())
            .and_then(|resp| resp.text())
            .with_context(|| format!("fetch manifest {url}"))?,
    };
    let report = parse_manifest(&text, opts).with_context(|| format!("load manifest {source}"))?;
    info!(
        "loaded {} documents from {source} ({} unpublished skipped)",
        report.records.len(),
        report.unpublished
    );
    Ok(report)
}

pub fn parse_manifest(text: &str, opts: &LoadOptions) -> Result<LoadReport> {
    let value: Value = serde_json::from_str(text).context("parse manifest json")?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut obj) => match obj.remove("documents") {
            Some(Value::Array(items)) => items,
            _ => anyhow::bail!("manifest object has no `documents` array"),
        },
        _ => anyhow::bail!("manifest must be an array or an object with a `documents` array"),
    };

    let mut report = LoadReport::default();
    let mut kept: Vec<(Option<String>, Map<String, Value>)> = Vec::new();
    let mut explicit_ids = HashSet::new();
    for (i, item) in items.into_iter().enumerate() {
        let Value::Object(obj) = item else {
            anyhow::bail!("manifest item {i} is not an object");
        };
        if let Some(flag) = &opts.publish_flag
            && obj.get(flag).and_then(Value::as_bool) != Some(true)
        {
            debug!("skipping unpublished item {i}");
            report.unpublished += 1;
            continue;
        }

        let id = text_field(&obj, ID_KEYS);
        if let Some(id) = &id
            && !explicit_ids.insert(id.clone())
        {
            anyhow::bail!("duplicate document id {id:?} at item {i}");
        }
        kept.push((id, obj));
    }

    // Items without an id take their position, skipping any value an
    // explicit id already claimed.
    let mut taken = explicit_ids;
    let mut next_derived = 0;
    for (position, (id, obj)) in kept.into_iter().enumerate() {
        let id = match id {
            Some(id) => id,
            None => {
                next_derived = next_derived.max(position);
                while taken.contains(&next_derived.to_string()) {
                    next_derived += 1;
                }
                let id = next_derived.to_string();
                taken.insert(id.clone());
                id
            }
        };
        let record = map_record(&obj, id, &mut report.warnings);
        report.records.push(record);
    }
    Ok(report)
}

fn map_record(obj: &Map<String, Value>, id: String, warnings: &mut Vec<String>) -> Record {
    let title = match text_field(obj, TITLE_KEYS) {
        Some(title) if !title.trim().is_empty() => title,
        _ => {
            warnings.push(format!("document {id} has no title"));
            UNTITLED.to_string()
        }
    };
    Record {
        id,
        title,
        year: text_field(obj, YEAR_KEYS),
        summary: text_field(obj, SUMMARY_KEYS),
        source_ref: text_field(obj, SOURCE_KEYS),
        primary_document_ref: text_field(obj, PRIMARY_KEYS),
        secondary_document_ref: text_field(obj, SECONDARY_KEYS),
        doc_type: text_field(obj, TYPE_KEYS),
        themes: list_field(obj, THEMES_KEYS),
        page_ref: text_field(obj, PAGE_KEYS),
    }
}

/// First non-empty string or number stored under any of `keys`.
fn text_field(obj: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match obj.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn list_field(obj: &Map<String, Value>, keys: &[&str]) -> Vec<String> {
    keys.iter()
        .find_map(|key| obj.get(*key)?.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> LoadReport {
        parse_manifest(text, &LoadOptions::default()).expect("parse manifest")
    }

    #[test]
    fn accepts_bare_array_and_documents_wrapper() {
        let bare = parse(r#"[{"Title": "A"}, {"Title": "B"}]"#);
        let wrapped = parse(r#"{"documents": [{"Title": "A"}, {"Title": "B"}]}"#);
        assert_eq!(bare.records, wrapped.records);
        assert_eq!(bare.records[1].id, "1");
    }

    #[test]
    fn maps_capitalized_manifest_keys() {
        let report = parse(
            r#"[{
                "Title": "Shippingport",
                "Year": 1957,
                "Type": "Speech",
                "Summary": "nuclear reactor lessons",
                "Source": "https://example.org/src",
                "file_pdf": "https://example.org/s.pdf",
                "file_OCR": "https://example.org/s.txt",
                "themes": ["Energy", 3, "Navy"],
                "blog_page": "posts/shippingport.html"
            }]"#,
        );
        let record = &report.records[0];
        assert_eq!(record.title, "Shippingport");
        assert_eq!(record.year.as_deref(), Some("1957"));
        assert_eq!(record.doc_type.as_deref(), Some("Speech"));
        assert_eq!(record.source_ref.as_deref(), Some("https://example.org/src"));
        assert_eq!(
            record.primary_document_ref.as_deref(),
            Some("https://example.org/s.pdf")
        );
        assert_eq!(
            record.secondary_document_ref.as_deref(),
            Some("https://example.org/s.txt")
        );
        assert_eq!(record.themes, vec!["Energy", "Navy"]);
        assert_eq!(record.page_ref.as_deref(), Some("posts/shippingport.html"));
    }

    #[test]
    fn url_ocr_is_the_same_secondary_field() {
        let report = parse(r#"[{"title": "A", "url_OCR": "a.txt"}]"#);
        assert_eq!(
            report.records[0].secondary_document_ref.as_deref(),
            Some("a.txt")
        );
    }

    #[test]
    fn missing_title_degrades_with_warning() {
        let report = parse(r#"[{"Summary": "orphan"}, {"Title": "  "}]"#);
        assert_eq!(report.records[0].title, UNTITLED);
        assert_eq!(report.records[1].title, UNTITLED);
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn publish_gate_filters_before_ids_are_assigned() {
        let opts = LoadOptions {
            publish_flag: Some("gemini".into()),
        };
        let report = parse_manifest(
            r#"[{"Title": "A"}, {"Title": "B", "gemini": true}, {"Title": "C", "gemini": "yes"}]"#,
            &opts,
        )
        .expect("parse");
        assert_eq!(report.records.len(), 1);
        assert_eq!(report.records[0].title, "B");
        assert_eq!(report.records[0].id, "0");
        assert_eq!(report.unpublished, 2);
    }

    #[test]
    fn explicit_ids_must_be_unique() {
        let err = parse_manifest(
            r#"[{"id": "x", "Title": "A"}, {"id": "x", "Title": "B"}]"#,
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate document id"));
    }

    #[test]
    fn derived_ids_never_collide_with_explicit_ids() {
        let report = parse(r#"[{"id": "1", "Title": "A"}, {"Title": "B"}, {"Title": "C"}]"#);
        let ids: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3"]);

        let report = parse(r#"[{"Title": "A"}, {"id": "0", "Title": "B"}]"#);
        let ids: Vec<&str> = report.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "0"]);
    }

    #[test]
    fn malformed_manifests_are_rejected() {
        for text in ["not json", "42", r#"{"docs": []}"#, r#"[1, 2]"#] {
            assert!(
                parse_manifest(text, &LoadOptions::default()).is_err(),
                "accepted {text}"
            );
        }
    }

    #[test]
    fn load_reads_from_path() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("manifest.json");
        std::fs::write(&path, r#"[{"Title": "A"}]"#).expect("write");
        let source = ManifestSource::parse(path.to_str().expect("utf8 path"));
        assert_eq!(
            source.document_base(),
            Some(DocumentBase::Dir(dir.path().to_path_buf()))
        );
        let report = load(&source, &LoadOptions::default()).expect("load");
        assert_eq!(report.records.len(), 1);

        let missing = ManifestSource::Path(dir.path().join("nope.json"));
        let err = load(&missing, &LoadOptions::default()).unwrap_err();
        assert!(format!("{err:#}").contains("read manifest"));
    }

    /// Serves `body` once over HTTP on a loopback port and returns its URL.
    fn serve_once(path: &str, body: &'static str) -> String {
        use std::io::BufRead;
        use std::io::BufReader;
        use std::io::Write;
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let port = listener.local_addr().expect("addr").port();
        std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
            let mut line = String::new();
            while reader.read_line(&mut line).expect("read request") > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).expect("write response");
        });
        format!("http://127.0.0.1:{port}{path}")
    }

    #[test]
    fn load_fetches_remote_manifest() {
        let url = serve_once("/data/manifest.json", r#"{"documents": [{"Title": "Remote"}]}"#);
        let source = ManifestSource::parse(&url);
        assert_eq!(source, ManifestSource::Url(url.clone()));
        let report = load(&source, &LoadOptions::default()).expect("load");
        assert_eq!(report.records[0].title, "Remote");

        let Some(DocumentBase::Url(base)) = source.document_base() else {
            panic!("expected url base");
        };
        assert_eq!(
            base.join("ocr/a.txt").expect("join").as_str(),
            url.replace("manifest.json", "ocr/a.txt").as_str()
        );
    }
}
