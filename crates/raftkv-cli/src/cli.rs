use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use raftkv_http::ServerConfig;

#[derive(Parser)]
#[command(
    name = "raftkvd",
    about = "raftkv node: HTTP front door for a consensus-backed key-value store",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a node serving /key, /join and /status
    Serve(ServeArgs),
    /// Drive a running node with concurrent reads and writes
    Load(LoadArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML config file; flags below override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub http_addr: Option<SocketAddr>,
    #[arg(long)]
    pub metrics_addr: Option<SocketAddr>,
    #[arg(long)]
    pub node_id: Option<String>,
    /// Do not bind the Prometheus scrape endpoint
    #[arg(long)]
    pub no_metrics: bool,
}

impl ServeArgs {
    /// Merge the config file (or defaults) with command-line overrides.
    pub fn resolve(&self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)?,
            None => ServerConfig::default(),
        };
        if let Some(addr) = self.http_addr {
            config.http_addr = addr;
        }
        if let Some(addr) = self.metrics_addr {
            config.metrics_addr = addr;
        }
        if let Some(id) = &self.node_id {
            config.node_id = id.clone();
        }
        if self.no_metrics {
            config.expose_metrics = false;
        }
        Ok(config)
    }
}

#[derive(Args)]
pub struct LoadArgs {
    /// Base URL of the node under test
    #[arg(short, long, default_value = "http://127.0.0.1:11000")]
    pub target: String,
    /// Concurrent simulated users
    #[arg(short, long, default_value = "10")]
    pub users: usize,
    /// Run time in seconds
    #[arg(short, long, default_value = "30")]
    pub duration: u64,
    /// Length of generated keys
    #[arg(long, default_value = "4")]
    pub key_length: usize,
    /// Upper bound of the random pause between tasks, in milliseconds
    #[arg(long, default_value = "1000")]
    pub max_wait_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn serve_args(argv: &[&str]) -> ServeArgs {
        let mut full = vec!["raftkvd", "serve"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Serve(args) => args,
            _ => panic!("wrong command"),
        }
    }

    #[test]
    fn parse_serve_defaults() {
        let config = serve_args(&[]).resolve().unwrap();
        assert_eq!(config, ServerConfig::default());
    }

    #[test]
    fn parse_serve_overrides() {
        let config = serve_args(&[
            "--http-addr",
            "0.0.0.0:11001",
            "--metrics-addr",
            "127.0.0.1:9101",
            "--node-id",
            "node1",
            "--no-metrics",
        ])
        .resolve()
        .unwrap();
        assert_eq!(config.http_addr.port(), 11001);
        assert_eq!(config.metrics_addr.port(), 9101);
        assert_eq!(config.node_id, "node1");
        assert!(!config.expose_metrics);
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "node_id = \"from-file\"").unwrap();
        writeln!(file, "http_addr = \"127.0.0.1:11500\"").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let config = serve_args(&["--config", &path, "--node-id", "from-flag"])
            .resolve()
            .unwrap();
        assert_eq!(config.node_id, "from-flag");
        assert_eq!(config.http_addr.port(), 11500);
    }

    #[test]
    fn bad_addr_rejected() {
        assert!(Cli::try_parse_from(["raftkvd", "serve", "--http-addr", "nope"]).is_err());
    }

    #[test]
    fn parse_load() {
        let cli = Cli::try_parse_from([
            "raftkvd", "load", "-t", "http://10.0.0.1:11000", "-u", "50", "-d", "5",
        ])
        .unwrap();
        if let Command::Load(args) = cli.command {
            assert_eq!(args.target, "http://10.0.0.1:11000");
            assert_eq!(args.users, 50);
            assert_eq!(args.duration, 5);
            assert_eq!(args.key_length, 4);
            assert_eq!(args.max_wait_ms, 1000);
        } else {
            panic!("wrong command");
        }
    }

    #[test]
    fn parse_verbose() {
        let cli = Cli::try_parse_from(["raftkvd", "--verbose", "serve"]).unwrap();
        assert!(cli.verbose);
    }
}
