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

use anyhow::Result;
use serde::Serialize;

use crate::render::RowView;
use crate::viewer::ViewerPane;

#[derive(Debug, Clone, Serialize, Default)]
pub struct StatsOut {
    pub took_ms: i64,
    pub total_hits: i64,
    pub doc_count: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rendered: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corpus: Option<CorpusStats>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct CorpusStats {
    pub with_summary: i64,
    pub with_source_link: i64,
    pub with_primary: i64,
    pub with_secondary: i64,
    pub unpublished: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryOut {
    pub text: String,
    pub ranked: bool,
    pub threshold: f32,
    pub min_match_char_length: usize,
    pub page_size: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorOut {
    pub code: String,
    pub message: String,
    pub details: Option<String>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct JsonResponse {
    pub ok: bool,
    pub schema_version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<QueryOut>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<Vec<RowView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub viewer: Option<ViewerPane>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsOut>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_offset: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorOut>,
}

impl JsonResponse {
    pub fn ok() -> Self {
        Self {
            ok: true,
            schema_version: "1".to_string(),
            ..Default::default()
        }
    }

    pub fn error(code: &str, message: &str) -> Self {
        Self {
            ok: false,
            schema_version: "1".to_string(),
            error: Some(ErrorOut {
                code: code.to_string(),
                message: message.to_string(),
                details: None,
            }),
            ..Default::default()
        }
    }

    pub fn with_query(mut self, query: QueryOut) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_results(mut self, results: Vec<RowView>) -> Self {
        self.results = Some(results);
        self
    }

    pub fn with_viewer(mut self, viewer: Option<ViewerPane>) -> Self {
        self.viewer = viewer;
        self
    }

    pub fn with_stats(mut self, stats: StatsOut) -> Self {
        self.stats = Some(stats);
        self
    }

    pub fn with_next_offset(mut self, next_offset: Option<usize>) -> Self {
        self.next_offset = next_offset;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }
}

pub fn print_json(resp: &JsonResponse) -> Result<()> {
    let text = serde_json::to_string_pretty(resp)?;
    println!("{text}");
    Ok(())
}
