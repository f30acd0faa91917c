use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use raftkv_http::Service;
use raftkv_store::InMemoryStore;

use crate::cli::*;
use crate::load::{self, LoadConfig, TaskStats};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Load(args) => cmd_load(args).await,
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = args.resolve()?;
    let store = Arc::new(InMemoryStore::new(
        config.node_id.clone(),
        config.http_addr.to_string(),
    ));

    let mut service = Service::new(config.http_addr, store.clone())?;

    // The scrape port is bound up front so a taken port stops startup.
    let metrics_task = if config.expose_metrics {
        let listener = raftkv_metrics::bind(config.metrics_addr)
            .await
            .with_context(|| format!("failed to expose metrics on {}", config.metrics_addr))?;
        let registry = raftkv_metrics::registry().clone();
        Some(tokio::spawn(async move {
            if let Err(e) = raftkv_metrics::serve_listener(listener, registry).await {
                tracing::error!("error exposing metrics: {}", e);
            }
        }))
    } else {
        None
    };

    service
        .start()
        .await
        .with_context(|| format!("failed to start HTTP service on {}", config.http_addr))?;

    let addr = service.addr().map(|a| a.to_string()).unwrap_or_default();
    println!(
        "{} raftkv node {} serving on {}",
        "✓".green().bold(),
        store.node_id().yellow(),
        addr.bold()
    );
    if config.expose_metrics {
        println!("  Metrics: http://{}/metrics", config.metrics_addr.to_string().cyan());
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutdown requested");

    service.close().await;
    if let Some(task) = metrics_task {
        task.abort();
    }
    Ok(())
}

async fn cmd_load(args: LoadArgs) -> anyhow::Result<()> {
    println!(
        "Driving {} with {} users for {}s...",
        args.target.bold(),
        args.users.to_string().yellow(),
        args.duration
    );

    let report = load::run(LoadConfig {
        target: args.target,
        users: args.users,
        duration: Duration::from_secs(args.duration),
        key_length: args.key_length,
        max_wait: Duration::from_millis(args.max_wait_ms),
    })
    .await?;

    print_stats("POST /key", &report.writes);
    print_stats("GET  /key", &report.reads);
    Ok(())
}

fn print_stats(name: &str, stats: &TaskStats) {
    println!(
        "  {}  total {}  {} {}  {} {}  {} {}  {} {}",
        name.bold(),
        stats.total(),
        "ok".green(),
        stats.ok,
        "4xx".yellow(),
        stats.client_errors,
        "5xx".red(),
        stats.server_errors,
        "failed".red().bold(),
        stats.transport_errors,
    );
}
