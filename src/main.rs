//! Interactive command-line client.
//!
//! This module is the thin shell around the library: it parses arguments,
//! installs tracing, builds the store, and then turns input lines into
//! [`Event`]s until the user quits.
//!
//! # Usage
//!
//! ```text
//! book-inquiry [key=value ...] [query words ...]
//! ```
//!
//! `key=value` arguments are configuration (see [`Config::from_map`]);
//! `config=<path>` reads a TOML file instead. Remaining words form an initial
//! query.
//!
//! # Runtime
//!
//! The store is single-threaded (`Rc`/`RefCell`), so everything runs on a
//! current-thread runtime inside a [`LocalSet`]. The store's scheduler is
//! spawned there to run prefetches and dispatch triggers between inputs.
//!
//! # Keybindings
//!
//! - free text: search
//! - `:n` / `:p`: next / previous page
//! - `:b` / `:f`: history back / forward
//! - `:t`: toggle total page count
//! - `:q`: quit

#![allow(clippy::multiple_crate_versions)]

use book_inquiry::app::{handle_event, Control, Event, MemoryHistory, RootState};
use book_inquiry::infrastructure::ReqwestFetch;
use book_inquiry::observability::init_tracing;
use book_inquiry::store::Trigger;
use book_inquiry::{initialize, Config, StoreRoot};
use std::cell::Cell;
use std::collections::BTreeMap;
use std::process::ExitCode;
use std::rc::Rc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::task::LocalSet;

/// Splits arguments into `key=value` settings and query words.
fn parse_args(args: impl IntoIterator<Item = String>) -> (BTreeMap<String, String>, Vec<String>) {
    let mut settings = BTreeMap::new();
    let mut words = Vec::new();
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) if !key.is_empty() && !key.contains(char::is_whitespace) => {
                settings.insert(key.to_string(), value.to_string());
            }
            _ => words.push(arg),
        }
    }
    (settings, words)
}

fn load_config(settings: &BTreeMap<String, String>) -> book_inquiry::Result<Config> {
    match settings.get("config") {
        Some(path) => Config::load(book_inquiry::infrastructure::expand_tilde(path)),
        None => Ok(Config::from_map(settings)),
    }
}

fn render(store: &StoreRoot) {
    let root = match RootState::from_state(&store.get()) {
        Ok(root) => root,
        Err(e) => {
            tracing::warn!(error = %e, "state cannot be rendered");
            return;
        }
    };
    if let Err(e) = book_inquiry::ui::render(&root, &mut std::io::stdout().lock()) {
        tracing::warn!(error = %e, "render failed");
    }
}

async fn run(config: Config, query: Option<String>) -> book_inquiry::Result<()> {
    let history = Rc::new(MemoryHistory::new("/"));
    let store = initialize(&config, Rc::new(ReqwestFetch::new()), history.clone());
    tokio::task::spawn_local(store.scheduler().drive());

    let dirty = Rc::new(Cell::new(true));
    {
        let dirty = Rc::clone(&dirty);
        store.subscribe(move |_| dirty.set(true));
    }
    store.add_dispatch_trigger(
        "lastPageEncountered",
        Trigger::callback(|root, _| {
            render(root);
            Ok(())
        }),
    );

    let warm = store.clone();
    tokio::task::spawn_local(async move {
        warm.dispatch("ping/pingServer", vec![]).await;
    });

    if let Some(query) = query {
        handle_event(&store, &history, &Event::Search(query)).await;
    }
    if dirty.replace(false) {
        render(&store);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let Some(event) = Event::parse(&line) else {
            continue;
        };
        if handle_event(&store, &history, &event).await == Control::Quit {
            break;
        }
        if dirty.replace(false) {
            render(&store);
        }
    }

    tracing::info!("client stopped");
    Ok(())
}

fn main() -> ExitCode {
    let (settings, words) = parse_args(std::env::args().skip(1));

    let config = match load_config(&settings) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("book-inquiry: {e}");
            return ExitCode::from(2);
        }
    };
    init_tracing(&config);
    tracing::info!(api_base_url = %config.api_base_url, "client starting");

    let query = (!words.is_empty()).then(|| words.join(" "));

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("book-inquiry: cannot start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    let local = LocalSet::new();
    match local.block_on(&runtime, run(config, query)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "client failed");
            eprintln!("book-inquiry: {e}");
            ExitCode::FAILURE
        }
    }
}
