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

use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use log::debug;
use log::warn;
use serde::Serialize;
use url::Url;

use crate::deeplink;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerPane {
    pub document_ref: String,
    pub title: String,
    pub share_url: String,
    pub content: PaneContent,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum PaneContent {
    Pdf { src: String },
    Text { body: String },
    Error { message: String },
}

pub trait Viewer {
    /// Shows `document_ref` under `title`. Load failures stay inside the
    /// returned pane.
    fn open(&mut self, document_ref: &str, title: &str) -> ViewerPane;
}

/// Where relative document references resolve: the manifest's directory
/// for a local manifest, the manifest URL for a remote one.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentBase {
    Dir(PathBuf),
    Url(Url),
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchTarget {
    Remote(String),
    Local(PathBuf),
}

/// Embeds PDFs by reference and fetches everything else as plain text, from
/// HTTP(S) or relative to the archive base.
pub struct DocumentViewer {
    base: Option<DocumentBase>,
    share_base_url: String,
    client: Option<reqwest::blocking::Client>,
}

impl DocumentViewer {
    pub fn new(base: Option<DocumentBase>, share_base_url: impl Into<String>) -> Self {
        Self {
            base,
            share_base_url: share_base_url.into(),
            client: None,
        }
    }

    pub fn fetch_target(&self, document_ref: &str) -> Result<FetchTarget> {
        if is_remote(document_ref) {
            return Ok(FetchTarget::Remote(document_ref.to_string()));
        }
        match &self.base {
            Some(DocumentBase::Url(base)) => {
                let url = base
                    .join(document_ref)
                    .with_context(|| format!("resolve {document_ref} against {base}"))?;
                Ok(FetchTarget::Remote(url.into()))
            }
            Some(DocumentBase::Dir(root)) => Ok(FetchTarget::Local(root.join(document_ref))),
            None => Ok(FetchTarget::Local(PathBuf::from(document_ref))),
        }
    }

    fn fetch_text(&mut self, document_ref: &str) -> Result<String> {
        match self.fetch_target(document_ref)? {
            FetchTarget::Remote(url) => {
                let client = match &self.client {
                    Some(client) => client.clone(),
                    None => {
                        let client = reqwest::blocking::Client::builder()
                            .build()
                            .context("build http client")?;
                        self.client = Some(client.clone());
                        client
                    }
                };
                let resp = client
                    .get(&url)
                    .send()
                    .with_context(|| format!("fetch {url}"))?
                    .error_for_status()
                    .with_context(|| format!("fetch {url}"))?;
                resp.text().context("read response body")
            }
            FetchTarget::Local(path) => std::fs::read_to_string(&path)
                .with_context(|| format!("read {}", path.display())),
        }
    }
}

impl Viewer for DocumentViewer {
    fn open(&mut self, document_ref: &str, title: &str) -> ViewerPane {
        let share_url = deeplink::share_link(&self.share_base_url, document_ref);
        let content = if is_pdf(document_ref) {
            debug!("embedding pdf {document_ref}");
            PaneContent::Pdf {
                src: document_ref.to_string(),
            }
        } else {
            match self.fetch_text(document_ref) {
                Ok(body) => PaneContent::Text { body },
                Err(err) => {
                    warn!("failed to load {document_ref}: {err:#}");
                    PaneContent::Error {
                        message: format!("Error loading document: {err:#}"),
                    }
                }
            }
        };
        ViewerPane {
            document_ref: document_ref.to_string(),
            title: title.to_string(),
            share_url,
            content,
        }
    }
}

/// Prints a pane for the terminal: title, share link, then the content.
pub fn write_pane(out: &mut impl Write, pane: &ViewerPane) -> std::io::Result<()> {
    writeln!(out, "{}", pane.title)?;
    writeln!(out, "Share: {}", pane.share_url)?;
    match &pane.content {
        PaneContent::Pdf { src } => writeln!(out, "PDF: {src}"),
        PaneContent::Text { body } => writeln!(out, "\n{body}"),
        PaneContent::Error { message } => writeln!(out, "{message}"),
    }
}

fn is_remote(document_ref: &str) -> bool {
    document_ref.starts_with("http://") || document_ref.starts_with("https://")
}

pub fn is_pdf(document_ref: &str) -> bool {
    let path = document_ref
        .split(['?', '#'])
        .next()
        .unwrap_or(document_ref);
    path.to_ascii_lowercase().ends_with(".pdf")
}
