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

use std::borrow::Cow;
use std::io::Write;

use anyhow::Context;
use anyhow::Result;
use serde::Serialize;

use crate::controller::RenderSink;
use crate::index::SearchIndex;
use crate::model::Hit;
use crate::model::Record;

pub const DEFAULT_PREVIEW_CHARS: usize = 200;

/// Display shape of one revealed row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RowView {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub year: String,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub primary_document_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secondary_document_ref: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub doc_type: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub themes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distance: Option<f32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum SourceView {
    Link(String),
    Label(String),
}

impl SourceView {
    pub fn classify(source: &str) -> Self {
        if is_absolute_url(source) {
            SourceView::Link(source.to_string())
        } else {
            SourceView::Label(source.to_string())
        }
    }

    pub fn text(&self) -> &str {
        match self {
            SourceView::Link(s) | SourceView::Label(s) => s,
        }
    }
}

impl RowView {
    pub fn new(record: &Record, distance: Option<f32>, preview_chars: usize) -> Self {
        Self {
            id: record.id.clone(),
            slug: record.slug(),
            title: record.title.clone(),
            year: record.year_display().to_string(),
            summary: summary_preview(record.summary_display(), preview_chars),
            source: record
                .source_ref
                .as_deref()
                .filter(|s| !s.is_empty())
                .map(SourceView::classify),
            primary_document_ref: record.primary_document_ref.clone(),
            secondary_document_ref: record.secondary_document_ref.clone(),
            doc_type: record.doc_type.clone(),
            themes: record.themes.clone(),
            page_ref: record.page_ref.clone(),
            distance,
        }
    }
}

/// First `max_chars` characters of `summary`, with "..." appended when cut.
pub fn summary_preview(summary: &str, max_chars: usize) -> String {
    let mut chars = summary.char_indices();
    match chars.nth(max_chars) {
        Some((cut, _)) => format!("{}...", &summary[..cut]),
        None => summary.to_string(),
    }
}

pub fn is_absolute_url(text: &str) -> bool {
    let trimmed = text.trim();
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return false;
    }
    url::Url::parse(trimmed).is_ok()
}

/// One table cell: tabs and line breaks become spaces so every record stays
/// on a single line.
fn cell(text: &str) -> Cow<'_, str> {
    if text.contains(['\t', '\r', '\n']) {
        Cow::Owned(text.replace(['\t', '\r', '\n'], " "))
    } else {
        Cow::Borrowed(text)
    }
}

/// Prints rows as tab-separated lines.
pub struct TableSink<'a, W: Write> {
    index: &'a SearchIndex,
    out: W,
    preview_chars: usize,
    explain: bool,
}

impl<'a, W: Write> TableSink<'a, W> {
    pub fn new(index: &'a SearchIndex, out: W, preview_chars: usize, explain: bool) -> Self {
        Self {
            index,
            out,
            preview_chars,
            explain,
        }
    }
}

impl<W: Write> RenderSink for TableSink<'_, W> {
    fn render(&mut self, hit: &Hit) -> Result<()> {
        let record = self
            .index
            .get(hit.position)
            .with_context(|| format!("no record at position {}", hit.position))?;
        let row = RowView::new(record, hit.distance, self.preview_chars);
        let source = row.source.as_ref().map(SourceView::text).unwrap_or("");
        let primary = row.primary_document_ref.as_deref().unwrap_or("");
        let secondary = row.secondary_document_ref.as_deref().unwrap_or("");
        if self.explain {
            write!(self.out, "{:.3}\t", hit.distance.unwrap_or(0.0))?;
        }
        writeln!(
            self.out,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            cell(&row.id),
            cell(&row.year),
            cell(&row.title),
            cell(&row.summary),
            cell(source),
            cell(primary),
            cell(secondary)
        )
        .context("write row")?;
        Ok(())
    }
}

/// Collects rows for the JSON response.
pub struct JsonSink<'a> {
    index: &'a SearchIndex,
    preview_chars: usize,
    explain: bool,
    rows: Vec<RowView>,
}

impl<'a> JsonSink<'a> {
    pub fn new(index: &'a SearchIndex, preview_chars: usize, explain: bool) -> Self {
        Self {
            index,
            preview_chars,
            explain,
            rows: Vec::new(),
        }
    }

    pub fn take_rows(&mut self) -> Vec<RowView> {
        std::mem::take(&mut self.rows)
    }
}

impl RenderSink for JsonSink<'_> {
    fn render(&mut self, hit: &Hit) -> Result<()> {
        let record = self
            .index
            .get(hit.position)
            .with_context(|| format!("no record at position {}", hit.position))?;
        let distance = hit.distance.filter(|_| self.explain);
        self.rows
            .push(RowView::new(record, distance, self.preview_chars));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::IndexOptions;

    #[test]
    fn preview_truncates_long_summaries() {
        let long = "a".repeat(250);
        let preview = summary_preview(&long, DEFAULT_PREVIEW_CHARS);
        assert_eq!(preview.len(), 203);
        assert!(preview.ends_with("..."));

        let exact = "b".repeat(200);
        assert_eq!(summary_preview(&exact, DEFAULT_PREVIEW_CHARS), exact);
        assert_eq!(summary_preview("", DEFAULT_PREVIEW_CHARS), "");
    }

    #[test]
    fn preview_counts_characters_not_bytes() {
        let text = "é".repeat(5);
        assert_eq!(summary_preview(&text, 3), "ééé...");
    }

    #[test]
    fn source_is_link_only_for_absolute_urls() {
        assert_eq!(
            SourceView::classify("https://example.org/doc"),
            SourceView::Link("https://example.org/doc".into())
        );
        assert_eq!(
            SourceView::classify("Naval History Archive"),
            SourceView::Label("Naval History Archive".into())
        );
        assert_eq!(
            SourceView::classify("www.example.org"),
            SourceView::Label("www.example.org".into())
        );
        assert_eq!(
            SourceView::classify("http://"),
            SourceView::Label("http://".into())
        );
    }

    #[test]
    fn missing_fields_render_as_empty() {
        let record = Record::new("7", "Bare");
        let row = RowView::new(&record, None, DEFAULT_PREVIEW_CHARS);
        assert_eq!(row.year, "");
        assert_eq!(row.summary, "");
        assert!(row.source.is_none());
        assert!(row.primary_document_ref.is_none());
    }

    #[test]
    fn table_sink_writes_tab_separated_rows() {
        let mut record = Record::new("0", "Shippingport").with_primary("s.pdf");
        record.year = Some("1957".into());
        let index = SearchIndex::build(vec![record], IndexOptions::default());
        let mut buf = Vec::new();
        {
            let mut sink = TableSink::new(&index, &mut buf, DEFAULT_PREVIEW_CHARS, false);
            sink.render(&Hit {
                position: 0,
                distance: None,
            })
            .expect("render");
        }
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text, "0\t1957\tShippingport\t\t\ts.pdf\t\n");
    }

    #[test]
    fn table_sink_keeps_multiline_fields_on_one_row() {
        let mut record = Record::new("0", "Memo\tDraft");
        record.summary = Some("line one\nline two\tcol\r\n".into());
        let index = SearchIndex::build(vec![record], IndexOptions::default());
        let mut buf = Vec::new();
        {
            let mut sink = TableSink::new(&index, &mut buf, DEFAULT_PREVIEW_CHARS, false);
            sink.render(&Hit {
                position: 0,
                distance: None,
            })
            .expect("render");
        }
        let text = String::from_utf8(buf).expect("utf8");
        assert_eq!(text.lines().count(), 1);
        assert_eq!(text, "0\t\tMemo Draft\tline one line two col  \t\t\t\n");
    }

    #[test]
    fn sink_rejects_unknown_position() {
        let index = SearchIndex::build(Vec::new(), IndexOptions::default());
        let mut sink = JsonSink::new(&index, DEFAULT_PREVIEW_CHARS, false);
        let err = sink
            .render(&Hit {
                position: 3,
                distance: None,
            })
            .unwrap_err();
        assert!(err.to_string().contains("no record at position 3"));
        assert!(sink.take_rows().is_empty());
    }
}
