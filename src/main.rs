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

mod cli;
mod config;
mod controller;
mod deeplink;
mod index;
mod manifest;
mod model;
mod output;
mod render;
mod session;
mod viewer;

use std::io::BufRead;
use std::time::Instant;

use anyhow::Context as _;
use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::warn;

use crate::cli::BrowseArgs;
use crate::cli::Cli;
use crate::cli::Commands;
use crate::cli::OpenArgs;
use crate::cli::SearchArgs;
use crate::cli::StatsArgs;
use crate::config::Config;
use crate::config::ConfigCtx;
use crate::controller::RenderSink;
use crate::index::IndexOptions;
use crate::index::SearchIndex;
use crate::manifest::LoadOptions;
use crate::model::Record;
use crate::output::CorpusStats;
use crate::output::JsonResponse;
use crate::output::QueryOut;
use crate::output::StatsOut;
use crate::output::print_json;
use crate::render::JsonSink;
use crate::render::TableSink;
use crate::render::is_absolute_url;
use crate::session::CLOSED_VIEWER;
use crate::session::Session;
use crate::viewer::DocumentBase;
use crate::viewer::DocumentViewer;
use crate::viewer::Viewer;
use crate::viewer::write_pane;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    match cli.command {
        Commands::Init { force } => cmd_init(force),
        Commands::Search(args) => {
            let json = args.json;
            handle_result(cmd_search(args), json)
        }
        Commands::Open(args) => {
            let json = args.json;
            handle_result(cmd_open(args), json)
        }
        Commands::Browse(args) => cmd_browse(args),
        Commands::Stats(args) => {
            let json = args.json;
            handle_result(cmd_stats(args), json)
        }
    }
}

fn init_logging(verbose: bool) {
    let env = if verbose {
        Env::default().default_filter_or("debug")
    } else {
        Env::default().default_filter_or("warn")
    };
    env_logger::Builder::from_env(env).init();
}

fn handle_result(result: Result<()>, json: bool) -> Result<()> {
    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            if json {
                let resp = JsonResponse::error("error", &format!("{err:#}"));
                print_json(&resp)?;
                Ok(())
            } else {
                Err(err)
            }
        }
    }
}

/// Loaded manifest plus the index built over it.
struct Archive {
    ctx: ConfigCtx,
    index: SearchIndex,
    unpublished: usize,
    warnings: Vec<String>,
}

impl Archive {
    fn load(manifest: Option<&str>) -> Result<Self> {
        let ctx = ConfigCtx::load_from_cwd(manifest)?;
        let opts = LoadOptions {
            publish_flag: ctx.config.publish_flag.clone(),
        };
        let report = manifest::load(&ctx.manifest, &opts)?;
        for warning in &report.warnings {
            warn!("{warning}");
        }
        let index = SearchIndex::build(report.records, IndexOptions::from_config(&ctx.config));
        if index.is_empty() {
            warn!("manifest {} has no documents", ctx.manifest);
        }
        Ok(Self {
            ctx,
            index,
            unpublished: report.unpublished,
            warnings: report.warnings,
        })
    }

    fn config(&self) -> &Config {
        &self.ctx.config
    }

    fn viewer(&self) -> DocumentViewer {
        let base = self
            .ctx
            .manifest
            .document_base()
            .unwrap_or_else(|| DocumentBase::Dir(self.ctx.root.clone()));
        DocumentViewer::new(Some(base), self.ctx.config.share_base_url.clone())
    }

    fn json_sink(&self, explain: bool) -> JsonSink<'_> {
        JsonSink::new(&self.index, self.config().summary_preview_chars, explain)
    }
}

fn cmd_init(force: bool) -> Result<()> {
    let path = config::global_config_path().context("config directory unavailable")?;
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }
    config::write_config(&path, &Config::default())?;
    println!("Wrote default config to {}", path.display());
    Ok(())
}

fn reveal_pages<S: RenderSink, V: Viewer>(
    session: &mut Session<'_, S, V>,
    query: &str,
    pages: usize,
    all: bool,
) {
    session.search(query);
    let mut shown = 1;
    while all || shown < pages {
        if session.scroll().is_empty() {
            break;
        }
        shown += 1;
    }
}

fn cmd_search(args: SearchArgs) -> Result<()> {
    let started = Instant::now();
    let archive = Archive::load(args.manifest.manifest.as_deref())?;
    let config = archive.config();

    if args.json {
        let sink = archive.json_sink(args.explain);
        let mut session = Session::new(&archive.index, config.page_size, sink, archive.viewer());
        reveal_pages(&mut session, &args.query, args.pages, args.all);

        let rendered = session.rendered();
        let next_offset = (session.remaining() > 0).then_some(rendered);
        let options = archive.index.options();
        let query = QueryOut {
            text: session.query().to_string(),
            ranked: session.is_filtered(),
            threshold: options.threshold,
            min_match_char_length: options.min_match_char_length,
            page_size: config.page_size,
        };
        let stats = StatsOut {
            took_ms: started.elapsed().as_millis() as i64,
            total_hits: session.total_hits() as i64,
            doc_count: archive.index.len() as i64,
            rendered: Some(rendered as i64),
            corpus: None,
        };
        let mut warnings = archive.warnings.clone();
        warnings.extend(session.take_warnings());
        let rows = session.sink_mut().take_rows();
        let resp = JsonResponse::ok()
            .with_query(query)
            .with_results(rows)
            .with_stats(stats)
            .with_next_offset(next_offset)
            .with_warnings(warnings);
        print_json(&resp)?;
    } else {
        let sink = TableSink::new(
            &archive.index,
            std::io::stdout(),
            config.summary_preview_chars,
            args.explain,
        );
        let mut session = Session::new(&archive.index, config.page_size, sink, archive.viewer());
        reveal_pages(&mut session, &args.query, args.pages, args.all);
        println!("{}", session.count_line());
        if session.remaining() > 0 {
            println!(
                "-- {} more (use --pages or --all to reveal)",
                session.remaining()
            );
        }
    }

    Ok(())
}

fn cmd_open(args: OpenArgs) -> Result<()> {
    let started = Instant::now();
    let archive = Archive::load(args.manifest.manifest.as_deref())?;
    let config = archive.config();
    let sink = archive.json_sink(false);
    let mut session = Session::new(&archive.index, config.page_size, sink, archive.viewer());
    let pane = session.open(&args.target);

    if args.json {
        let stats = StatsOut {
            took_ms: started.elapsed().as_millis() as i64,
            total_hits: i64::from(pane.is_some()),
            doc_count: archive.index.len() as i64,
            rendered: None,
            corpus: None,
        };
        let mut warnings = archive.warnings.clone();
        warnings.extend(session.take_warnings());
        let resp = JsonResponse::ok()
            .with_viewer(pane)
            .with_stats(stats)
            .with_warnings(warnings);
        print_json(&resp)?;
    } else {
        match pane {
            Some(pane) => write_pane(&mut std::io::stdout(), &pane)?,
            None => println!("{CLOSED_VIEWER}"),
        }
    }
    Ok(())
}

fn cmd_browse(args: BrowseArgs) -> Result<()> {
    let archive = Archive::load(args.manifest.manifest.as_deref())?;
    let config = archive.config();
    let sink = TableSink::new(
        &archive.index,
        std::io::stdout(),
        config.summary_preview_chars,
        false,
    );
    let mut session = Session::new(&archive.index, config.page_size, sink, archive.viewer());
    session.search("");
    println!("{}", session.count_line());

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    for line in stdin.lock().lines() {
        let line = line.context("read stdin")?;
        if !session.browse_input(&line, &mut stdout)? {
            break;
        }
    }
    Ok(())
}

fn cmd_stats(args: StatsArgs) -> Result<()> {
    let started = Instant::now();
    let archive = Archive::load(args.manifest.manifest.as_deref())?;
    let records = archive.index.records();
    let corpus = CorpusStats {
        with_summary: count_where(records, |r| r.summary.is_some()),
        with_source_link: count_where(records, |r| {
            r.source_ref.as_deref().is_some_and(is_absolute_url)
        }),
        with_primary: count_where(records, |r| r.primary_document_ref.is_some()),
        with_secondary: count_where(records, |r| r.secondary_document_ref.is_some()),
        unpublished: archive.unpublished as i64,
    };

    if args.json {
        let stats = StatsOut {
            took_ms: started.elapsed().as_millis() as i64,
            total_hits: 0,
            doc_count: records.len() as i64,
            rendered: None,
            corpus: Some(corpus),
        };
        let resp = JsonResponse::ok()
            .with_stats(stats)
            .with_warnings(archive.warnings.clone());
        print_json(&resp)?;
    } else {
        println!("Manifest: {}", archive.ctx.manifest);
        println!("Documents: {}", records.len());
        println!("With summary: {}", corpus.with_summary);
        println!("With source link: {}", corpus.with_source_link);
        println!("With primary document: {}", corpus.with_primary);
        println!("With secondary document: {}", corpus.with_secondary);
        println!("Unpublished (skipped): {}", corpus.unpublished);
    }

    Ok(())
}

fn count_where(records: &[Record], pred: impl Fn(&Record) -> bool) -> i64 {
    records.iter().filter(|r| pred(r)).count() as i64
}
