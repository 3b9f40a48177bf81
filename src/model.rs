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

//! Shared domain types used across manifest loading, search, and rendering.

use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Record {
    pub id: String,
    pub title: String,
    pub year: Option<String>,
    pub summary: Option<String>,
    pub source_ref: Option<String>,
    pub primary_document_ref: Option<String>,
    pub secondary_document_ref: Option<String>,
    pub doc_type: Option<String>,
    pub themes: Vec<String>,
    pub page_ref: Option<String>,
}

impl Record {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[cfg(test)]
    pub fn with_primary(mut self, doc_ref: impl Into<String>) -> Self {
        self.primary_document_ref = Some(doc_ref.into());
        self
    }

    #[cfg(test)]
    pub fn with_secondary(mut self, doc_ref: impl Into<String>) -> Self {
        self.secondary_document_ref = Some(doc_ref.into());
        self
    }

    pub fn year_display(&self) -> &str {
        self.year.as_deref().unwrap_or("")
    }

    pub fn summary_display(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }

    /// True when either document reference equals `doc_ref` exactly.
    pub fn references(&self, doc_ref: &str) -> bool {
        self.primary_document_ref.as_deref() == Some(doc_ref)
            || self.secondary_document_ref.as_deref() == Some(doc_ref)
    }

    pub fn slug(&self) -> String {
        slugify(&self.title)
    }
}

const MAX_SLUG_CHARS: usize = 120;

/// URL-friendly slug of a title: lower-case words joined by single dashes.
pub fn slugify(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut slug = String::with_capacity(lowered.len());
    let mut pending_dash = false;
    for c in lowered.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else if c.is_whitespace() || c == '_' || c == '-' {
            pending_dash = true;
        }
    }
    slug.trim_matches('-').chars().take(MAX_SLUG_CHARS).collect()
}

/// Ordered outcome of a query. Holds positions into the indexed collection,
/// never copies of the records themselves.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultSet {
    pub hits: Vec<Hit>,
    pub ranked: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: usize,
    pub distance: Option<f32>,
}

impl ResultSet {
    pub fn unranked(len: usize) -> Self {
        Self {
            hits: (0..len)
                .map(|position| Hit {
                    position,
                    distance: None,
                })
                .collect(),
            ranked: false,
        }
    }

    pub fn ranked(hits: Vec<Hit>) -> Self {
        Self { hits, ranked: true }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }

    #[cfg(test)]
    pub fn positions(&self) -> impl Iterator<Item = usize> + '_ {
        self.hits.iter().map(|hit| hit.position)
    }
}
