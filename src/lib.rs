//! tabgraph: causal navigation history across browser tabs.
//!
//! Two persisted structures make up the store:
//!
//! - **Visit graph**: every committed top-level page load is a [`Visit`]
//!   node. A visit links to the visit it descends from and is ended once
//!   it is left or its tab closes. The graph is a forest.
//! - **Tab table**: one [`TabRecord`] per live tab, pointing at its current
//!   visit and holding its strip position. Positions are unique, enforced by
//!   a unique index.
//!
//! Host tab ids do not survive a restart, so at startup the table is
//! reconciled against the host's snapshot ([`history::reconcile`]). A manual
//! reorder shifts neighbouring tabs without notice; [`history::move_chain`]
//! derives every implied move before anything is written.
//!
//! All mutations go through [`core::broker::Broker`], which logs and journals
//! them to `broker.events.jsonl`.
//!
//! # Examples
//!
//! ```bash
//! # Create the store under ./.tabgraph
//! tabgraph init
//!
//! # Feed a recorded host event stream
//! tabgraph replay session.jsonl
//!
//! # Inspect
//! tabgraph tabs
//! tabgraph lineage 01J9Z3...
//! tabgraph check
//! ```
//!
//! [`Visit`]: history::Visit
//! [`TabRecord`]: history::TabRecord

pub mod core;
pub mod history;

use crate::core::{broker, error::TabGraphError, store::Store};
use crate::history::{VisitId, events::Session, integrity, tabs::TabStore, visits::VisitStore};

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[clap(
    name = "tabgraph",
    version = env!("CARGO_PKG_VERSION"),
    about = "Causal navigation history across browser tabs"
)]
struct Cli {
    /// Store root holding the database, config and audit journal.
    #[clap(long, global = true, env = "TABGRAPH_ROOT", default_value = ".tabgraph")]
    root: PathBuf,
    /// Log at debug level (overridden by TABGRAPH_LOG / RUST_LOG).
    #[clap(short, long, global = true)]
    verbose: bool,
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create the store root, default config and schema
    #[clap(name = "init")]
    Init,

    /// Feed a JSON-lines host event stream through the tracker
    #[clap(name = "replay")]
    Replay {
        /// Event file, or `-` for stdin.
        input: String,
    },

    /// List live tab records in insertion order
    #[clap(name = "tabs")]
    Tabs,

    /// Show one visit
    #[clap(name = "visit")]
    Visit { id: VisitId },

    /// Show the chain of visits from the root down to a visit
    #[clap(name = "lineage")]
    Lineage { id: VisitId },

    /// Run integrity checks over the store
    #[clap(name = "check")]
    Check,

    /// Show the audit journal of brokered mutations
    #[clap(name = "audit")]
    Audit,
}

/// Install the global tracing subscriber. `TABGRAPH_LOG` wins over
/// `RUST_LOG`; with neither set the level follows `verbose`.
pub fn init_tracing(verbose: bool) {
    let default = if verbose { "tabgraph=debug" } else { "tabgraph=info" };
    let filter = std::env::var("TABGRAPH_LOG")
        .ok()
        .and_then(|spec| EnvFilter::try_new(spec).ok())
        .or_else(|| EnvFilter::try_from_default_env().ok())
        .unwrap_or_else(|| EnvFilter::new(default));
    // Logs go to stderr; stdout carries command output.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}

pub fn run() -> Result<(), TabGraphError> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Init => {
            let store = Store::init(&cli.root)?;
            store.open_database()?;
            println!("initialized {}", store.root.display());
        }
        Command::Replay { input } => {
            let store = Store::open(&cli.root)?;
            let mut session = Session::new(store.open_database()?, broker_for(&store));
            let summary = if input == "-" {
                session.replay(io::stdin().lock())?
            } else {
                session.replay(BufReader::new(File::open(&input)?))?
            };
            print_json(&summary)?;
        }
        Command::Tabs => {
            let db = Store::open(&cli.root)?.open_database()?;
            print_json(&TabStore::new(db.conn()).get_all()?)?;
        }
        Command::Visit { id } => {
            let db = Store::open(&cli.root)?.open_database()?;
            print_json(&VisitStore::new(db.conn()).require_visit(&id)?)?;
        }
        Command::Lineage { id } => {
            let db = Store::open(&cli.root)?.open_database()?;
            print_json(&VisitStore::new(db.conn()).lineage(&id)?)?;
        }
        Command::Check => {
            let db = Store::open(&cli.root)?.open_database()?;
            let report = integrity::check_integrity(db.conn())?;
            print_json(&report)?;
            if !report.is_clean() {
                return Err(TabGraphError::ValidationError(format!(
                    "{} integrity violation(s)",
                    report.violations.len()
                )));
            }
        }
        Command::Audit => {
            let store = Store::open(&cli.root)?;
            let mut out = io::stdout().lock();
            for event in broker::read_journal(&store.audit_log_path())? {
                writeln!(out, "{}", serde_json::to_string(&event)?)?;
            }
        }
    }

    Ok(())
}

fn broker_for(store: &Store) -> broker::Broker {
    if store.config.audit_log {
        broker::Broker::new(&store.audit_log_path())
    } else {
        broker::Broker::unjournaled()
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), TabGraphError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
