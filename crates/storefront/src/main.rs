//! Storefront sync engine CLI.
//!
//! Runs schema migrations, full reindexes, the outbox relay and ad-hoc
//! searches against the PostgreSQL + Elasticsearch pair.

mod config;

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use serde_json::json;
use storefront_persistence::backends::elasticsearch::{
    ElasticsearchAuth, ElasticsearchBackend, ElasticsearchConfig,
};
use storefront_persistence::backends::postgres::{PostgresBackend, PostgresConfig};
use storefront_persistence::core::Backend;
use storefront_persistence::services::{
    InvoiceAggregationParams, InvoiceSearchParams, ProductSearchParams,
};
use storefront_persistence::{CatalogService, InvoiceService, ReindexReport};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::config::{CliConfig, Command, EntityArg};

/// Initializes the tracing subscriber. `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "storefront={level},storefront_persistence={level}"
        ))
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Connects to PostgreSQL using the connection string or the individual settings.
async fn connect_postgres(config: &CliConfig) -> anyhow::Result<PostgresBackend> {
    let db = &config.database;
    let backend = if let Some(ref url) = db.database_url {
        info!("Initializing PostgreSQL backend from connection string");
        PostgresBackend::from_connection_string(url).await?
    } else {
        info!(host = %db.db_host, port = db.db_port, dbname = %db.db_name, "Initializing PostgreSQL backend");
        PostgresBackend::new(PostgresConfig {
            host: db.db_host.clone(),
            port: db.db_port,
            dbname: db.db_name.clone(),
            user: db.db_user.clone(),
            password: db.db_password.clone(),
            max_connections: db.db_max_connections,
            ..Default::default()
        })
        .await?
    };
    Ok(backend)
}

/// Builds the Elasticsearch client and checks the cluster is reachable.
async fn connect_elasticsearch(config: &CliConfig) -> anyhow::Result<ElasticsearchBackend> {
    let search = &config.search;
    let auth = match (&search.es_username, &search.es_password) {
        (Some(username), Some(password)) => Some(ElasticsearchAuth::Basic {
            username: username.clone(),
            password: password.clone(),
        }),
        _ => None,
    };

    let nodes = search.nodes();
    info!(nodes = ?nodes, "Initializing Elasticsearch backend");
    let backend = ElasticsearchBackend::new(ElasticsearchConfig {
        nodes,
        auth,
        ..Default::default()
    })?;
    backend.health_check().await?;
    Ok(backend)
}

/// Both entity services sharing one pool and one client.
struct Services {
    catalog: CatalogService,
    invoices: InvoiceService,
}

async fn build_services(config: &CliConfig) -> anyhow::Result<Services> {
    let postgres = Arc::new(connect_postgres(config).await?);
    let elasticsearch = Arc::new(connect_elasticsearch(config).await?);

    let catalog = CatalogService::new(
        postgres.clone(),
        elasticsearch.clone(),
        config.sync_config(),
        config.reindex_config(),
    );
    let invoices = InvoiceService::new(
        postgres,
        elasticsearch,
        config.sync_config(),
        config.reindex_config(),
    );
    Ok(Services { catalog, invoices })
}

/// Prints a value as pretty JSON on stdout.
fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_reports(reports: &[ReindexReport]) -> anyhow::Result<()> {
    for report in reports {
        if !report.is_complete() {
            warn!(
                index = %report.index,
                failed = report.failed,
                "Reindex finished with failed documents"
            );
        }
    }
    print_json(&reports)
}

async fn sync_all(services: &Services, entity: EntityArg) -> anyhow::Result<()> {
    let mut reports = Vec::new();
    if entity.products() {
        reports.push(services.catalog.sync_all().await?);
    }
    if entity.invoices() {
        reports.push(services.invoices.sync_all().await?);
    }
    print_reports(&reports)
}

async fn rebuild(services: &Services, entity: EntityArg) -> anyhow::Result<()> {
    let mut reports = Vec::new();
    if entity.products() {
        reports.push(services.catalog.rebuild().await?);
    }
    if entity.invoices() {
        reports.push(services.invoices.rebuild().await?);
    }
    print_reports(&reports)
}

async fn relay(
    services: &Services,
    entity: EntityArg,
    once: bool,
    interval: Duration,
) -> anyhow::Result<()> {
    if once {
        let mut output = serde_json::Map::new();
        if entity.products() {
            let report = services.catalog.relay().run_once().await?;
            output.insert("products".to_string(), serde_json::to_value(report)?);
        }
        if entity.invoices() {
            let report = services.invoices.relay().run_once().await?;
            output.insert("invoices".to_string(), serde_json::to_value(report)?);
        }
        return print_json(&output);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut handles = Vec::new();
    if entity.products() {
        let relay = Arc::new(services.catalog.relay());
        handles.push(relay.spawn(interval, shutdown_rx.clone()));
    }
    if entity.invoices() {
        let relay = Arc::new(services.invoices.relay());
        handles.push(relay.spawn(interval, shutdown_rx.clone()));
    }

    info!(interval_secs = interval.as_secs(), "Outbox relay running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;
    info!("Shutting down outbox relay");
    shutdown_tx.send(true)?;

    for handle in handles {
        handle.await?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();
    init_logging(&config.log_level);

    if let Err(errors) = config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(
        sync_mode = %config.sync_mode,
        operation_timeout_secs = config.operation_timeout,
        "Starting storefront"
    );

    if let Command::Migrate = config.command {
        let postgres = connect_postgres(&config).await?;
        postgres.init_schema().await?;
        info!("Database schema is up to date");
        return Ok(());
    }

    let services = build_services(&config).await?;

    match config.command {
        Command::Migrate => {}
        Command::SyncAll { entity } => sync_all(&services, entity).await?,
        Command::Rebuild { entity } => rebuild(&services, entity).await?,
        Command::Relay {
            entity,
            once,
            interval,
        } => relay(&services, entity, once, Duration::from_secs(interval.max(1))).await?,
        Command::SearchProducts(args) => {
            let params = ProductSearchParams {
                offset: args.offset,
                limit: args.limit,
                sort_by: args.sort_by,
                query: args.query,
                name: args.name,
                price_gte: args.price_gte,
                price_lte: args.price_lte,
                created_at_gte: args.created_at_gte,
                created_at_lte: args.created_at_lte,
            };
            print_json(&services.catalog.search_products(&params).await?)?;
        }
        Command::SearchInvoices(args) => {
            let params = InvoiceSearchParams {
                offset: args.offset,
                limit: args.limit,
                sort_by: args.sort_by,
                created_at_gte: args.created_at_gte,
                created_at_lte: args.created_at_lte,
            };
            print_json(&services.invoices.search_invoices(&params).await?)?;
        }
        Command::InvoiceSum(window) => {
            let params = InvoiceAggregationParams {
                created_at_gte: window.start_time,
                created_at_lte: window.end_time,
            };
            let sum = services.invoices.total_amount_sum(&params).await?;
            print_json(&json!({ "total_amount_sum": sum }))?;
        }
        Command::InvoiceReport(window) => {
            let params = InvoiceAggregationParams {
                created_at_gte: window.start_time,
                created_at_lte: window.end_time,
            };
            print_json(&services.invoices.report(&params).await?)?;
        }
    }

    Ok(())
}

#[cfg(not(all(feature = "postgres", feature = "elasticsearch")))]
compile_error!("storefront requires both the 'postgres' and 'elasticsearch' features");
