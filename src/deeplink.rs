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

//! Shareable `file=` links and their resolution back to records.

use url::form_urlencoded;

use crate::index::SearchIndex;

pub const FILE_PARAM: &str = "file";

/// Pulls the document reference out of `target`.
///
/// `target` may be a full link (`https://host/index.html?file=...`), a bare
/// query string (`?file=...` or `file=...`), or the reference itself. Link
/// values are URL-decoded exactly once; bare references are taken verbatim.
pub fn document_ref_from(target: &str) -> String {
    let target = target.trim();
    if let Some(query) = query_part(target)
        && let Some(value) = file_param(query)
    {
        return value;
    }
    target.to_string()
}

fn query_part(target: &str) -> Option<&str> {
    let query = match target.split_once('?') {
        Some((_, query)) => query,
        None if target.starts_with("file=") => target,
        None => return None,
    };
    Some(query.split('#').next().unwrap_or(query))
}

fn file_param(query: &str) -> Option<String> {
    form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == FILE_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// Position of the first record whose primary or secondary document
/// reference equals `doc_ref` exactly.
pub fn resolve(index: &SearchIndex, doc_ref: &str) -> Option<usize> {
    index
        .records()
        .iter()
        .position(|record| record.references(doc_ref))
}

/// Link that reopens `doc_ref` when loaded: `<base>?file=<encoded ref>`.
pub fn share_link(base: &str, doc_ref: &str) -> String {
    let encoded = form_urlencoded::Serializer::new(String::new())
        .append_pair(FILE_PARAM, doc_ref)
        .finish();
    let base = base.split('#').next().unwrap_or(base);
    if base.contains('?') {
        format!("{base}&{encoded}")
    } else {
        format!("{base}?{encoded}")
    }
}
