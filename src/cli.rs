//! Command-line entry point: parse flags, load config, open the provider and
//! run the demo sequence.

use std::path::PathBuf;

use clap::Parser;

use crate::config::{self, ConfigOverrides};
use crate::graph::memory::MemoryStore;
use crate::graph::store::GraphStore;
use crate::observability::init_logging;
use crate::provider::GraphProvider;
use crate::service::run_demo;

/// Process exit status for a normal run, including runs where a demo step
/// failed and was logged.
pub const EXIT_OK: u8 = 0;
/// Process exit status when config, open or schema setup fails.
pub const EXIT_FATAL: u8 = 1;

/// Seed a user/car/group graph and run traversal queries over it.
#[derive(Debug, Parser)]
#[command(name = "entgraph", version, about)]
pub struct Cli {
    /// YAML config file.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// SQLite database path (`:memory:` for a throwaway database).
    #[arg(long, value_name = "PATH")]
    pub db: Option<String>,

    /// Use the in-process store instead of SQLite.
    #[arg(long)]
    pub in_memory: bool,

    /// Logging filter, e.g. `entgraph=debug`.
    #[arg(long = "log", value_name = "FILTER")]
    pub log: Option<String>,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            db_path: self.db.clone(),
            log_filter: self.log.clone(),
        }
    }
}

/// Run the program and return its exit status.
pub fn run(cli: &Cli) -> u8 {
    let config = match config::load(cli.config.as_deref(), &cli.overrides()) {
        Ok(config) => config,
        Err(e) => {
            init_logging(cli.log.as_deref().unwrap_or("entgraph=info"));
            tracing::error!("{e}");
            return EXIT_FATAL;
        }
    };
    init_logging(&config.logging.filter);

    if cli.in_memory {
        tracing::info!("using in-memory store");
        return run_with(MemoryStore::new());
    }

    match GraphStore::open(&config.database) {
        Ok(store) => run_with(store),
        Err(e) => {
            tracing::error!("{e}");
            EXIT_FATAL
        }
    }
}

/// Ensure the schema, run the demo and close the provider on every path.
pub fn run_with<P: GraphProvider>(provider: P) -> u8 {
    if let Err(e) = provider.ensure_schema() {
        tracing::error!("{e}");
        close(provider);
        return EXIT_FATAL;
    }

    let report = run_demo(&provider);
    let failures = report.failures();
    if failures > 0 {
        tracing::warn!(failures, "finished with failed steps");
    }

    close(provider);
    EXIT_OK
}

fn close<P: GraphProvider>(provider: P) {
    if let Err(e) = provider.close() {
        tracing::warn!("failed closing connection: {e}");
    }
}
