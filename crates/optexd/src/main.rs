//! optexd — the optex daemon.
//!
//! Single binary around the optex metrics engine:
//! - Option store (redb)
//! - Metric registry (from optex.toml + built-ins)
//! - Prometheus scrape endpoint
//! - One-shot `update` / `fetch` / `render` commands for scripts and cron
//!
//! # Usage
//!
//! ```text
//! optexd --config /etc/optex/optex.toml serve --listen 0.0.0.0:9100
//! optexd --config /etc/optex/optex.toml update jobs_total 42 -l queue=mail
//! ```
//!
//! A running `serve` holds the database file. One-shot commands that find it
//! locked send their work to that server instead, at the address in
//! `[server].listen`.

mod app;
mod config;
mod remote;

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use optex_metrics::{Exporter, LabelSet, is_valid_label_name};
use optex_state::{Scope, StateError};
use tracing::info;

use crate::config::OptexConfig;

#[derive(Parser)]
#[command(
    name = "optexd",
    about = "optex — persistent Prometheus metrics over an option store",
    version,
    propagate_version = true,
)]
struct Cli {
    /// Path to optex.toml (defaults apply when omitted).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Override the data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Use the network-wide option namespace instead of the per-site one.
    #[arg(long, global = true)]
    network: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the scrape endpoint.
    Serve {
        /// Address to listen on (overrides [server].listen).
        #[arg(long)]
        listen: Option<String>,
    },
    /// Store a value for one series.
    Update {
        metric: String,
        value: String,
        /// Label as key=value; repeatable.
        #[arg(short, long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },
    /// Print the stored value of one series.
    Fetch {
        metric: String,
        /// Label as key=value; repeatable.
        #[arg(short, long = "label", value_parser = parse_label)]
        labels: Vec<(String, String)>,
    },
    /// Print the full exposition to stdout.
    Render,
}

fn parse_label(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if is_valid_label_name(key) => Ok((key.to_string(), value.to_string())),
        Some((key, _)) => Err(format!("invalid label name `{key}`")),
        None => Err(format!("invalid label `{s}` (expected key=value)")),
    }
}

fn label_set(labels: Vec<(String, String)>) -> Option<LabelSet> {
    if labels.is_empty() {
        None
    } else {
        Some(labels.into_iter().collect())
    }
}

/// Where a one-shot command runs.
enum Target {
    /// The store was free; use it directly.
    Local(Exporter),
    /// A server holds the store; go through it.
    Remote(SocketAddr),
}

fn target(config: &OptexConfig) -> anyhow::Result<Target> {
    match app::exporter_from_config(config) {
        Ok(exporter) => Ok(Target::Local(exporter)),
        Err(e) if matches!(e.downcast_ref::<StateError>(), Some(StateError::Locked(_))) => {
            let listen: SocketAddr = config
                .server
                .listen
                .parse()
                .with_context(|| format!("invalid listen address `{}`", config.server.listen))?;
            let addr = remote::control_addr(listen);
            info!(%addr, "store is held by a running server, forwarding");
            Ok(Target::Remote(addr))
        }
        Err(e) => Err(e),
    }
}

fn block_on<F: std::future::Future>(future: F) -> anyhow::Result<F::Output> {
    Ok(tokio::runtime::Runtime::new()?.block_on(future))
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,optexd=debug,optex=debug".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = OptexConfig::load(cli.config.as_deref())
        .with_context(|| format!("failed to load config {:?}", cli.config))?;
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }
    if cli.network {
        config.store.scope = Scope::Network;
    }

    match cli.command {
        Command::Serve { listen } => {
            if let Some(listen) = listen {
                config.server.listen = listen;
            }
            block_on(serve(config))?
        }
        Command::Update { metric, value, labels } => match target(&config)? {
            Target::Local(exporter) => {
                let labels = label_set(labels);
                exporter.series(&metric, labels.as_ref())?.update(value)?;
                Ok(())
            }
            Target::Remote(addr) => {
                let labels = labels.into_iter().collect();
                block_on(remote::update(addr, &metric, labels, value))??;
                Ok(())
            }
        },
        Command::Fetch { metric, labels } => {
            let value = match target(&config)? {
                Target::Local(exporter) => {
                    let labels = label_set(labels);
                    exporter.series(&metric, labels.as_ref())?.fetch()?
                }
                Target::Remote(addr) => {
                    let labels = labels.into_iter().collect();
                    block_on(remote::fetch(addr, &metric, labels))??
                }
            };
            println!("{value}");
            Ok(())
        }
        Command::Render => {
            let body = match target(&config)? {
                Target::Local(exporter) => exporter.render(),
                Target::Remote(addr) => block_on(remote::render(addr))??,
            };
            print!("{body}");
            Ok(())
        }
    }
}

async fn serve(config: OptexConfig) -> anyhow::Result<()> {
    info!("optex daemon starting");

    let addr: SocketAddr = config
        .server
        .listen
        .parse()
        .with_context(|| format!("invalid listen address `{}`", config.server.listen))?;

    let exporter = app::exporter_from_config(&config)?;
    let router = optex_api::build_router(exporter);

    info!(%addr, "scrape endpoint starting");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    // Graceful shutdown on Ctrl-C.
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("shutdown signal received");
            }
        })
        .await?;

    info!("optex daemon stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_label_accepts_key_value() {
        assert_eq!(
            parse_label("queue=mail").unwrap(),
            ("queue".to_string(), "mail".to_string())
        );
        assert_eq!(
            parse_label("expr=a=b").unwrap(),
            ("expr".to_string(), "a=b".to_string())
        );
        assert_eq!(parse_label("empty=").unwrap().1, "");
    }

    #[test]
    fn parse_label_rejects_malformed() {
        assert!(parse_label("novalue").is_err());
        assert!(parse_label("=value").is_err());
        assert!(parse_label("bad key=v").is_err());
        assert!(parse_label("9lives=v").is_err());
        assert!(parse_label("quo\"te=v").is_err());
    }

    #[test]
    fn free_store_runs_locally() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = OptexConfig::default();
        config.store.data_dir = dir.path().to_path_buf();

        assert!(matches!(target(&config).unwrap(), Target::Local(_)));
    }

    #[test]
    fn held_store_forwards_to_listen_address() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = OptexConfig::default();
        config.store.data_dir = dir.path().to_path_buf();
        config.server.listen = "0.0.0.0:9555".to_string();

        let _server = app::exporter_from_config(&config).unwrap();
        match target(&config).unwrap() {
            Target::Remote(addr) => {
                assert_eq!(addr, "127.0.0.1:9555".parse::<SocketAddr>().unwrap())
            }
            Target::Local(_) => panic!("expected the held store to forward"),
        }
    }

    #[test]
    fn label_set_from_cli_pairs() {
        assert!(label_set(Vec::new()).is_none());
        let set = label_set(vec![
            ("b".to_string(), "2".to_string()),
            ("a".to_string(), "1".to_string()),
        ])
        .unwrap();
        assert_eq!(set.canonical(), r#"a="1",b="2""#);
    }

    #[test]
    fn cli_parses_update_with_labels() {
        let cli = Cli::try_parse_from([
            "optexd", "--network", "update", "jobs_total", "3", "-l", "queue=mail", "--label", "host=a",
        ])
        .unwrap();
        assert!(cli.network);
        match cli.command {
            Command::Update { metric, value, labels } => {
                assert_eq!(metric, "jobs_total");
                assert_eq!(value, "3");
                assert_eq!(labels.len(), 2);
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn cli_verifies() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
