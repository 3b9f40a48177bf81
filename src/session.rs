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

//! One browsing session: the index, the reveal controller, and the viewer
//! wired together, with no state shared outside the struct.

use std::io::Write;
use std::ops::Range;

use anyhow::Result;

use log::warn;

use crate::controller::Anchor;
use crate::controller::RenderSink;
use crate::controller::ResultsController;
use crate::controller::RevealState;
use crate::controller::VisibilitySignal;
use crate::deeplink;
use crate::index::SearchIndex;
use crate::viewer::PaneContent;
use crate::viewer::Viewer;
use crate::viewer::ViewerPane;
use crate::viewer::write_pane;

pub const CLOSED_VIEWER: &str = "Viewer closed: no document matches that reference";

/// Visibility signal for a terminal: the tail is "visible" whenever the user
/// asks to scroll.
#[derive(Debug, Default)]
pub struct ScrollSignal {
    observed: Option<Anchor>,
}

impl ScrollSignal {
    pub fn observed(&self) -> Option<Anchor> {
        self.observed
    }
}

impl VisibilitySignal for ScrollSignal {
    fn subscribe(&mut self, anchor: Anchor) {
        self.observed = Some(anchor);
    }

    fn unsubscribe(&mut self) {
        self.observed = None;
    }
}

pub struct Session<'a, S, V> {
    index: &'a SearchIndex,
    controller: ResultsController<S, ScrollSignal>,
    viewer: V,
    query: String,
    warnings: Vec<String>,
}

impl<'a, S: RenderSink, V: Viewer> Session<'a, S, V> {
    pub fn new(index: &'a SearchIndex, page_size: usize, sink: S, viewer: V) -> Self {
        Self {
            index,
            controller: ResultsController::new(page_size, sink, ScrollSignal::default()),
            viewer,
            query: String::new(),
            warnings: Vec::new(),
        }
    }

    /// Runs `query` and reveals the first window of its results.
    pub fn search(&mut self, query: &str) -> Range<usize> {
        self.query = query.trim().to_string();
        let result_set = self.index.query(query);
        let revealed = self.controller.set_result_set(result_set);
        self.collect_failures();
        revealed
    }

    /// Scrolls to the revealed tail. A no-op once the results are exhausted.
    pub fn scroll(&mut self) -> Range<usize> {
        let rendered = self.controller.window().rendered_count;
        if self.controller.state() == RevealState::Exhausted {
            return rendered..rendered;
        }
        let revealed = match self.controller.signal().observed() {
            Some(anchor) => self.controller.on_visible(anchor),
            None => rendered..rendered,
        };
        self.collect_failures();
        revealed
    }

    /// Opens the record referenced by a `file=` link or a bare document
    /// reference. A reference that matches no record leaves the viewer
    /// closed.
    pub fn open(&mut self, target: &str) -> Option<ViewerPane> {
        let doc_ref = deeplink::document_ref_from(target);
        let Some(position) = deeplink::resolve(self.index, &doc_ref) else {
            let message = format!("document not found in archive: {doc_ref}");
            warn!("{message}");
            self.warnings.push(message);
            return None;
        };
        let title = self
            .index
            .get(position)
            .map(|record| record.title.as_str())
            .unwrap_or_default();
        let pane = self.viewer.open(&doc_ref, title);
        if let PaneContent::Error { message } = &pane.content {
            self.warnings.push(message.clone());
        }
        Some(pane)
    }

    /// Handles one line of interactive input. Returns `false` on `:quit`.
    ///
    /// Warnings have already been logged by the time a command finishes, so
    /// they are dropped here instead of accumulating for the whole session.
    pub fn browse_input(&mut self, input: &str, out: &mut impl Write) -> Result<bool> {
        let input = input.trim();
        match input {
            ":quit" | ":q" => return Ok(false),
            "" | ":more" => {
                if self.scroll().is_empty() {
                    writeln!(out, "(end of results)")?;
                }
            }
            _ => {
                if let Some(target) = input.strip_prefix(":open ") {
                    match self.open(target) {
                        Some(pane) => write_pane(out, &pane)?,
                        None => writeln!(out, "{CLOSED_VIEWER}")?,
                    }
                } else {
                    self.search(input);
                    writeln!(out, "{}", self.count_line())?;
                }
            }
        }
        self.warnings.clear();
        Ok(true)
    }

    fn collect_failures(&mut self) {
        let failures = self.controller.take_failures();
        self.warnings.extend(failures);
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn rendered(&self) -> usize {
        self.controller.window().rendered_count
    }

    pub fn remaining(&self) -> usize {
        self.controller.remaining()
    }

    pub fn total_hits(&self) -> usize {
        self.controller.result_set().len()
    }

    pub fn is_filtered(&self) -> bool {
        self.controller.result_set().ranked
    }

    /// "N documents" for the full collection, "N of M documents" otherwise.
    pub fn count_line(&self) -> String {
        let total = self.index.len();
        if !self.is_filtered() {
            return format!("{total} documents");
        }
        if self.controller.result_set().is_empty() {
            return "No documents match your search.".to_string();
        }
        format!("{} of {total} documents", self.total_hits())
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }

    pub fn sink_mut(&mut self) -> &mut S {
        self.controller.sink_mut()
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;

    use super::*;
    use crate::index::IndexOptions;
    use crate::model::Hit;
    use crate::model::Record;

    #[derive(Default)]
    struct Rows(Vec<usize>);

    impl RenderSink for Rows {
        fn render(&mut self, hit: &Hit) -> Result<()> {
            self.0.push(hit.position);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeViewer {
        opened: Vec<(String, String)>,
    }

    impl Viewer for FakeViewer {
        fn open(&mut self, document_ref: &str, title: &str) -> ViewerPane {
            self.opened.push((document_ref.to_string(), title.to_string()));
            ViewerPane {
                document_ref: document_ref.to_string(),
                title: title.to_string(),
                share_url: deeplink::share_link("index.html", document_ref),
                content: PaneContent::Pdf {
                    src: document_ref.to_string(),
                },
            }
        }
    }

    fn archive(n: usize) -> SearchIndex {
        let records = (0..n)
            .map(|i| {
                Record::new(i.to_string(), format!("Speech number {i}"))
                    .with_primary(format!("scans/{i}.pdf"))
            })
            .collect();
        SearchIndex::build(records, IndexOptions::default())
    }

    #[test]
    fn scrolling_reveals_forty_five_records() {
        let index = archive(45);
        let mut session = Session::new(&index, 20, Rows::default(), FakeViewer::default());
        assert_eq!(session.search(""), 0..20);
        assert_eq!(session.scroll(), 20..40);
        assert_eq!(session.scroll(), 40..45);
        assert!(session.scroll().is_empty());
        assert_eq!(session.sink_mut().0, (0..45).collect::<Vec<_>>());
        assert_eq!(session.count_line(), "45 documents");
    }

    #[test]
    fn new_query_restarts_reveal() {
        let index = archive(45);
        let mut session = Session::new(&index, 20, Rows::default(), FakeViewer::default());
        session.search("");
        session.scroll();
        session.search("speech number 7");
        assert!(session.is_filtered());
        assert_eq!(session.total_hits(), 45);
        assert_eq!(session.rendered(), 20);
        assert_eq!(session.sink_mut().0[40], 7);
    }

    #[test]
    fn unmatched_query_reports_no_documents() {
        let index = archive(3);
        let mut session = Session::new(&index, 20, Rows::default(), FakeViewer::default());
        session.search("q");
        assert_eq!(session.count_line(), "No documents match your search.");
        assert!(session.scroll().is_empty());
    }

    #[test]
    fn deep_link_opens_viewer_with_record_title() {
        let index = archive(5);
        let mut session = Session::new(&index, 20, Rows::default(), FakeViewer::default());
        let pane = session.open("?file=scans%2F3.pdf").expect("viewer opened");
        assert_eq!(pane.title, "Speech number 3");
        assert_eq!(pane.document_ref, "scans/3.pdf");
        assert_eq!(session.viewer.opened.len(), 1);
        assert!(session.take_warnings().is_empty());
    }

    #[test]
    fn browsing_does_not_accumulate_warnings() {
        let index = archive(5);
        let mut session = Session::new(&index, 2, Rows::default(), FakeViewer::default());
        let mut out = Vec::new();
        for _ in 0..3 {
            assert!(session.browse_input(":open scans/99.pdf", &mut out).expect("open"));
            assert!(session.warnings.is_empty());
        }
        assert!(session.browse_input(":open scans/1.pdf", &mut out).expect("open"));
        assert!(session.browse_input("", &mut out).expect("scroll"));
        assert!(session.browse_input("speech", &mut out).expect("search"));
        assert!(!session.browse_input(":q", &mut out).expect("quit"));

        let text = String::from_utf8(out).expect("utf8");
        assert_eq!(text.matches(CLOSED_VIEWER).count(), 3);
        assert!(text.contains("Speech number 1\nShare: index.html?file=scans%2F1.pdf\n"));
        assert!(text.contains("5 of 5 documents"));
    }

    #[test]
    fn deep_link_miss_keeps_viewer_closed() {
        let index = archive(5);
        let mut session = Session::new(&index, 20, Rows::default(), FakeViewer::default());
        assert!(session.open("?file=scans%2F99.pdf").is_none());
        assert!(session.viewer.opened.is_empty());
        let warnings = session.take_warnings();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("scans/99.pdf"));
    }
}
