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

use clap::Args;
use clap::Parser;
use clap::Subcommand;

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Fuzzy search and viewer for document archives")]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write the default global config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Fuzzy search titles and summaries
    Search(SearchArgs),

    /// Open a document by reference or shareable link
    Open(OpenArgs),

    /// Interactive browsing on stdin
    Browse(BrowseArgs),

    /// Show archive stats
    Stats(StatsArgs),
}

#[derive(Args, Debug)]
pub struct ManifestArgs {
    /// Manifest path or http(s) URL (defaults to the configured manifest)
    #[arg(long)]
    pub manifest: Option<String>,
}

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Query text (empty lists every document)
    #[arg(default_value = "")]
    pub query: String,

    /// Number of windows to reveal
    #[arg(long, default_value_t = 1)]
    pub pages: usize,

    /// Reveal every result
    #[arg(long, conflicts_with = "pages")]
    pub all: bool,

    /// Include match distances
    #[arg(long)]
    pub explain: bool,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Document reference, `file=` query string, or full shareable link
    pub target: String,

    /// Output JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Args, Debug)]
pub struct BrowseArgs {
    #[command(flatten)]
    pub manifest: ManifestArgs,
}

#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Output JSON
    #[arg(long)]
    pub json: bool,

    #[command(flatten)]
    pub manifest: ManifestArgs,
}
