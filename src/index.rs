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

use crate::config::Config;
use crate::model::Hit;
use crate::model::Record;
use crate::model::ResultSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexOptions {
    /// Largest admitted match distance, 0.0 (exact substring) to 1.0.
    pub threshold: f32,
    pub min_match_char_length: usize,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            threshold: 0.5,
            min_match_char_length: 2,
        }
    }
}

impl IndexOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            threshold: config.threshold,
            min_match_char_length: config.min_match_char_length,
        }
    }
}

#[derive(Debug, Clone)]
struct IndexedFields {
    title: Vec<char>,
    summary: Option<Vec<char>>,
}

/// Immutable fuzzy index over a fixed record collection.
///
/// Record order at build time is the canonical order: it is what an empty
/// query returns and what breaks ties between equally distant matches.
#[derive(Debug, Clone)]
pub struct SearchIndex {
    records: Vec<Record>,
    fields: Vec<IndexedFields>,
    options: IndexOptions,
}

impl SearchIndex {
    pub fn build(records: Vec<Record>, options: IndexOptions) -> Self {
        let fields = records
            .iter()
            .map(|record| IndexedFields {
                title: normalize(&record.title),
                summary: record.summary.as_deref().map(normalize),
            })
            .collect();
        Self {
            records,
            fields,
            options,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    pub fn options(&self) -> IndexOptions {
        self.options
    }

    pub fn query(&self, text: &str) -> ResultSet {
        let text = text.trim();
        if text.is_empty() {
            return ResultSet::unranked(self.records.len());
        }
        if text.chars().count() < self.options.min_match_char_length {
            return ResultSet::ranked(Vec::new());
        }

        let pattern = normalize(text);
        let mut hits: Vec<Hit> = self
            .fields
            .iter()
            .enumerate()
            .filter_map(|(position, fields)| {
                self.best_distance(&pattern, fields)
                    .map(|distance| Hit {
                        position,
                        distance: Some(distance),
                    })
            })
            .collect();

        // sort_by is stable, so equal distances keep collection order.
        hits.sort_by(|a, b| {
            let da = a.distance.unwrap_or(f32::MAX);
            let db = b.distance.unwrap_or(f32::MAX);
            da.total_cmp(&db)
        });
        ResultSet::ranked(hits)
    }

    fn best_distance(&self, pattern: &[char], fields: &IndexedFields) -> Option<f32> {
        let min_len = self.options.min_match_char_length;
        std::iter::once(fields.title.as_slice())
            .chain(fields.summary.as_deref())
            .filter(|field| field.len() >= min_len)
            .map(|field| match_distance(pattern, field))
            .filter(|distance| *distance <= self.options.threshold)
            .min_by(|a, b| a.total_cmp(b))
    }
}

fn normalize(text: &str) -> Vec<char> {
    text.chars().flat_map(char::to_lowercase).collect()
}

/// Smallest edit distance between `pattern` and any substring of `text`,
/// divided by the pattern length and capped at 1.0.
pub fn match_distance(pattern: &[char], text: &[char]) -> f32 {
    let m = pattern.len();
    if m == 0 {
        return 0.0;
    }

    // column[i] = cost of matching pattern[..i] ending at the current text char.
    let mut column: Vec<usize> = (0..=m).collect();
    let mut best = column[m];
    for &tc in text {
        let mut diag = column[0];
        column[0] = 0;
        for i in 1..=m {
            let left = column[i];
            let cost = usize::from(pattern[i - 1] != tc);
            column[i] = (diag + cost).min(left + 1).min(column[i - 1] + 1);
            diag = left;
        }
        best = best.min(column[m]);
        if best == 0 {
            break;
        }
    }

    (best as f32 / m as f32).min(1.0)
}
