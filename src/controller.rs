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

//! Incremental reveal of a result set, one window per visibility signal.

use std::ops::Range;

use anyhow::Result;
use log::debug;
use log::warn;

use crate::model::Hit;
use crate::model::ResultSet;

pub const DEFAULT_PAGE_SIZE: usize = 20;

/// Receives revealed rows, in result-set order.
pub trait RenderSink {
    fn render(&mut self, hit: &Hit) -> Result<()>;
}

/// Boundary-crossing notifications for the last revealed row.
pub trait VisibilitySignal {
    fn subscribe(&mut self, anchor: Anchor);
    fn unsubscribe(&mut self);
}

/// The revealed tail row a visibility subscription is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Anchor {
    pub version: u64,
    pub offset: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RenderWindow {
    pub result_set_version: u64,
    pub rendered_count: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealState {
    Idle,
    Revealing,
    Exhausted,
}

pub struct ResultsController<S, V> {
    page_size: usize,
    result_set: ResultSet,
    window: RenderWindow,
    state: RevealState,
    subscription: Option<Anchor>,
    failed_rows: Vec<String>,
    sink: S,
    signal: V,
}

impl<S: RenderSink, V: VisibilitySignal> ResultsController<S, V> {
    pub fn new(page_size: usize, sink: S, signal: V) -> Self {
        Self {
            page_size: page_size.max(1),
            result_set: ResultSet::default(),
            window: RenderWindow::default(),
            state: RevealState::Idle,
            subscription: None,
            failed_rows: Vec::new(),
            sink,
            signal,
        }
    }

    /// Replaces the active result set and reveals its first window.
    pub fn set_result_set(&mut self, result_set: ResultSet) -> Range<usize> {
        self.cancel_subscription();
        self.result_set = result_set;
        self.window = RenderWindow {
            result_set_version: self.window.result_set_version + 1,
            rendered_count: 0,
        };
        self.state = RevealState::Revealing;
        debug!(
            "result set v{} with {} rows",
            self.window.result_set_version,
            self.result_set.len()
        );
        self.reveal_next_window()
    }

    /// Emits the next contiguous batch of at most `page_size` rows and returns
    /// the offsets it covered. Empty once everything has been revealed.
    pub fn reveal_next_window(&mut self) -> Range<usize> {
        let start = self.window.rendered_count;
        let end = (start + self.page_size).min(self.result_set.len());

        // Disconnect before touching the sink so a reveal cannot re-enter.
        self.cancel_subscription();
        if start >= end {
            if self.state != RevealState::Idle {
                self.state = RevealState::Exhausted;
            }
            return start..start;
        }

        for offset in start..end {
            let hit = self.result_set.hits[offset];
            if let Err(err) = self.sink.render(&hit) {
                warn!("failed to render row {offset}: {err:#}");
                self.failed_rows.push(format!("row {offset}: {err:#}"));
            }
            self.window.rendered_count = offset + 1;
        }

        if end < self.result_set.len() {
            let anchor = Anchor {
                version: self.window.result_set_version,
                offset: end - 1,
            };
            self.signal.subscribe(anchor);
            self.subscription = Some(anchor);
            self.state = RevealState::Revealing;
        } else {
            self.state = RevealState::Exhausted;
        }
        start..end
    }

    /// Handles a visibility notification. Anchors from an older result set or
    /// an already-consumed tail are ignored.
    pub fn on_visible(&mut self, anchor: Anchor) -> Range<usize> {
        if self.subscription != Some(anchor) {
            debug!("ignoring stale anchor {anchor:?}");
            let rendered = self.window.rendered_count;
            return rendered..rendered;
        }
        self.reveal_next_window()
    }

    fn cancel_subscription(&mut self) {
        if self.subscription.take().is_some() {
            self.signal.unsubscribe();
        }
    }

    pub fn window(&self) -> RenderWindow {
        self.window
    }

    pub fn state(&self) -> RevealState {
        self.state
    }

    pub fn result_set(&self) -> &ResultSet {
        &self.result_set
    }

    pub fn remaining(&self) -> usize {
        self.result_set.len() - self.window.rendered_count
    }

    #[cfg(test)]
    pub fn pending_anchor(&self) -> Option<Anchor> {
        self.subscription
    }

    pub fn take_failures(&mut self) -> Vec<String> {
        std::mem::take(&mut self.failed_rows)
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn signal(&self) -> &V {
        &self.signal
    }
}
