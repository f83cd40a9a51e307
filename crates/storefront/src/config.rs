//! Command line configuration for the storefront CLI.
//!
//! Every connection setting can also be supplied through the environment.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `STOREFRONT_LOG_LEVEL` | info | Log level |
//! | `STOREFRONT_SYNC_MODE` | synchronous | `synchronous` or `outbox` |
//! | `STOREFRONT_INLINE_APPLY` | true | Apply index writes inline in outbox mode |
//! | `STOREFRONT_OPERATION_TIMEOUT` | 10 | Per-call timeout (seconds) |
//! | `STOREFRONT_REINDEX_BATCH_SIZE` | 500 | Documents per bulk request |
//! | `DB_HOST` | localhost | PostgreSQL host |
//! | `DB_PORT` | 5432 | PostgreSQL port |
//! | `DB_NAME` | storefront | PostgreSQL database |
//! | `DB_USER` | postgres | PostgreSQL user |
//! | `DB_PASSWORD` | | PostgreSQL password |
//! | `DB_MAX_CONNECTIONS` | 10 | Pool size |
//! | `ES_NODES` | http://localhost:9200 | Elasticsearch nodes (comma-separated) |
//! | `ES_USERNAME` / `ES_PASSWORD` | | Elasticsearch basic auth |

use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use storefront_persistence::search::ReindexConfig;
use storefront_persistence::sync::{SyncConfig, SyncMode};

/// Storefront sync engine CLI.
#[derive(Debug, Clone, Parser)]
#[command(name = "storefront")]
#[command(about = "PostgreSQL + Elasticsearch sync engine for the storefront")]
pub struct CliConfig {
    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "STOREFRONT_LOG_LEVEL", default_value = "info", global = true)]
    pub log_level: String,

    /// How index writes follow database writes.
    #[arg(long, env = "STOREFRONT_SYNC_MODE", default_value = "synchronous", global = true)]
    pub sync_mode: SyncMode,

    /// In outbox mode, also attempt the index write inline.
    #[arg(
        long,
        env = "STOREFRONT_INLINE_APPLY",
        default_value = "true",
        action = clap::ArgAction::Set,
        global = true
    )]
    pub inline_apply: bool,

    /// Timeout for each database or index call, in seconds.
    #[arg(long, env = "STOREFRONT_OPERATION_TIMEOUT", default_value = "10", global = true)]
    pub operation_timeout: u64,

    /// Failed relay passes after which an outbox entry is dead-lettered.
    #[arg(long, env = "STOREFRONT_RELAY_MAX_ATTEMPTS", default_value = "5", global = true)]
    pub relay_max_attempts: u32,

    /// How long applied outbox entries are kept, e.g. `7d` or `12h`.
    #[arg(
        long,
        env = "STOREFRONT_OUTBOX_RETENTION",
        default_value = "7d",
        value_parser = humantime::parse_duration,
        global = true
    )]
    pub outbox_retention: Duration,

    /// Documents per bulk request when reindexing.
    #[arg(long, env = "STOREFRONT_REINDEX_BATCH_SIZE", default_value = "500", global = true)]
    pub reindex_batch_size: usize,

    #[command(flatten)]
    pub database: DatabaseArgs,

    #[command(flatten)]
    pub search: SearchArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// PostgreSQL connection settings.
#[derive(Debug, Clone, Args)]
pub struct DatabaseArgs {
    /// Full connection string; overrides the individual settings.
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// PostgreSQL host.
    #[arg(long, env = "DB_HOST", default_value = "localhost", global = true)]
    pub db_host: String,

    /// PostgreSQL port.
    #[arg(long, env = "DB_PORT", default_value = "5432", global = true)]
    pub db_port: u16,

    /// Database name.
    #[arg(long, env = "DB_NAME", default_value = "storefront", global = true)]
    pub db_name: String,

    /// Database user.
    #[arg(long, env = "DB_USER", default_value = "postgres", global = true)]
    pub db_user: String,

    /// Database password.
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true, global = true)]
    pub db_password: Option<String>,

    /// Maximum pool size.
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value = "10", global = true)]
    pub db_max_connections: usize,
}

/// Elasticsearch connection settings.
#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    /// Elasticsearch node URLs (comma-separated).
    #[arg(long, env = "ES_NODES", default_value = "http://localhost:9200", global = true)]
    pub es_nodes: String,

    /// Elasticsearch username for basic auth.
    #[arg(long, env = "ES_USERNAME", global = true)]
    pub es_username: Option<String>,

    /// Elasticsearch password for basic auth.
    #[arg(long, env = "ES_PASSWORD", hide_env_values = true, global = true)]
    pub es_password: Option<String>,
}

/// The entity a maintenance command applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityArg {
    /// Products.
    Products,
    /// Invoices.
    Invoices,
    /// Both entities, products first.
    All,
}

impl EntityArg {
    /// Whether products are included.
    pub fn products(self) -> bool {
        matches!(self, EntityArg::Products | EntityArg::All)
    }

    /// Whether invoices are included.
    pub fn invoices(self) -> bool {
        matches!(self, EntityArg::Invoices | EntityArg::All)
    }
}

/// CLI subcommands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create or upgrade the database schema.
    Migrate,

    /// Create the index and load every row into it. Refuses an existing index.
    SyncAll {
        #[arg(value_enum, default_value = "all")]
        entity: EntityArg,
    },

    /// Build a fresh index and swap the alias onto it.
    Rebuild {
        #[arg(value_enum, default_value = "all")]
        entity: EntityArg,
    },

    /// Drain the outbox into the index.
    Relay {
        #[arg(value_enum, default_value = "all")]
        entity: EntityArg,

        /// Run a single pass and exit.
        #[arg(long)]
        once: bool,

        /// Seconds between passes.
        #[arg(long, default_value = "5")]
        interval: u64,
    },

    /// Search products.
    SearchProducts(ProductSearchArgs),

    /// Search invoices.
    SearchInvoices(InvoiceSearchArgs),

    /// Sum of invoice totals in a time window.
    InvoiceSum(WindowArgs),

    /// Sum and average of invoice totals in a time window.
    InvoiceReport(WindowArgs),
}

/// Product search filters.
#[derive(Debug, Clone, Args)]
pub struct ProductSearchArgs {
    #[arg(long)]
    pub offset: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
    /// `field[:asc|desc],...`
    #[arg(long)]
    pub sort_by: Option<String>,
    /// Free text over name, description and price.
    #[arg(long)]
    pub query: Option<String>,
    #[arg(long)]
    pub name: Option<String>,
    #[arg(long)]
    pub price_gte: Option<String>,
    #[arg(long)]
    pub price_lte: Option<String>,
    /// `YYYY-MM-DDTHH:mm:ss`
    #[arg(long)]
    pub created_at_gte: Option<String>,
    /// `YYYY-MM-DDTHH:mm:ss`
    #[arg(long)]
    pub created_at_lte: Option<String>,
}

/// Invoice search filters.
#[derive(Debug, Clone, Args)]
pub struct InvoiceSearchArgs {
    #[arg(long)]
    pub offset: Option<u32>,
    #[arg(long)]
    pub limit: Option<u32>,
    #[arg(long)]
    pub sort_by: Option<String>,
    #[arg(long)]
    pub created_at_gte: Option<String>,
    #[arg(long)]
    pub created_at_lte: Option<String>,
}

/// Aggregation window.
#[derive(Debug, Clone, Args)]
pub struct WindowArgs {
    /// Start of the window, `YYYY-MM-DDTHH:mm:ss`.
    #[arg(long)]
    pub start_time: Option<String>,
    /// End of the window, `YYYY-MM-DDTHH:mm:ss`.
    #[arg(long)]
    pub end_time: Option<String>,
}

impl CliConfig {
    /// Sync engine settings derived from the flags.
    pub fn sync_config(&self) -> SyncConfig {
        let base = match self.sync_mode {
            SyncMode::Synchronous => SyncConfig::synchronous(),
            SyncMode::Outbox => SyncConfig::outbox(self.inline_apply),
        };
        base.with_operation_timeout(Duration::from_secs(self.operation_timeout))
            .with_max_attempts(self.relay_max_attempts)
            .with_outbox_retention(self.outbox_retention)
    }

    /// Reindex settings derived from the flags.
    pub fn reindex_config(&self) -> ReindexConfig {
        ReindexConfig::default().with_batch_size(self.reindex_batch_size)
    }

    /// Validates settings clap cannot check on its own.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.operation_timeout == 0 {
            errors.push("operation timeout must be at least one second".to_string());
        }
        if self.relay_max_attempts == 0 {
            errors.push("relay max attempts must be at least one".to_string());
        }
        if self.reindex_batch_size == 0 {
            errors.push("reindex batch size must be positive".to_string());
        }
        if self.database.db_max_connections == 0 {
            errors.push("database pool must allow at least one connection".to_string());
        }
        if self.search.nodes().is_empty() {
            errors.push("at least one Elasticsearch node is required".to_string());
        }
        if self.search.es_username.is_some() != self.search.es_password.is_some() {
            errors.push("ES_USERNAME and ES_PASSWORD must be set together".to_string());
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl SearchArgs {
    /// Node URLs, trimmed and without empties.
    pub fn nodes(&self) -> Vec<String> {
        self.es_nodes
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}
