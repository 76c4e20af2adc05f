//! `skiff` — content-addressed directory sync for S3-compatible stores.
//!
//! # Usage
//!
//! ```text
//! skiff push <DIR>                 # upload a directory, print its project id
//! skiff pull <UUID> <DIR>          # restore a project into a directory
//! skiff push <DIR> --bucket b      # explicit bucket (or SKIFF_BUCKET)
//! skiff pull <UUID> <DIR> --endpoint http://localhost:9000
//! ```
//!
//! Credentials come from `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` /
//! `AWS_SESSION_TOKEN` or their flag equivalents; requests are sent
//! unsigned when no access key is configured.
//!
//! Exit codes: 0 on success, 1 on a runtime failure, 127 when the
//! arguments don't parse.

mod config;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use skiff_store::{ObjectStore, S3Store};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use config::StoreOpts;

#[derive(Parser)]
#[command(
    name = "skiff",
    version,
    about = "Content-addressed directory sync for S3-compatible object stores"
)]
struct Cli {
    #[command(flatten)]
    store: StoreOpts,

    /// Log level filter (e.g. "info", "debug").
    #[arg(long, env = "SKIFF_LOG", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Archive, chunk, deduplicate, and upload a directory.
    Push {
        /// Directory to push.
        dir: PathBuf,
    },
    /// Download a project and extract it into a directory.
    Pull {
        /// Project id (UUID) printed by a previous push.
        id: String,
        /// Directory to extract into.
        dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Help and version travel through clap's error path too.
            let _ = e.print();
            return match e.kind() {
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion => {
                    ExitCode::SUCCESS
                }
                _ => ExitCode::from(127),
            };
        }
    };

    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("skiff: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let store: Arc<dyn ObjectStore> = Arc::new(S3Store::new(config::store_config(&cli.store)?));
    let concurrency = cli.store.concurrency;

    match cli.command {
        Commands::Push { dir } => {
            let id = skiff_engine::push(&dir, store, concurrency).await?;
            println!("{id}");
        }
        Commands::Pull { id, dir } => {
            let id = Uuid::parse_str(&id)
                .with_context(|| format!("invalid project id '{id}': expected a UUID"))?;
            skiff_engine::pull(&id.to_string(), &dir, store, concurrency).await?;
        }
    }

    Ok(())
}

/// Console tracing subscriber, writing to stderr so stdout stays clean for
/// the project id. `RUST_LOG` overrides the configured level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_push() {
        let cli = Cli::try_parse_from(["skiff", "push", "/some/dir"]).unwrap();
        match cli.command {
            Commands::Push { dir } => assert_eq!(dir, PathBuf::from("/some/dir")),
            _ => panic!("expected Push command"),
        }
    }

    #[test]
    fn test_cli_parses_pull() {
        let cli = Cli::try_parse_from([
            "skiff",
            "pull",
            "0c8ae742-6fd5-4bd3-9ee1-8b36d5c9f7a2",
            "out",
        ])
        .unwrap();
        match cli.command {
            Commands::Pull { id, dir } => {
                assert_eq!(id, "0c8ae742-6fd5-4bd3-9ee1-8b36d5c9f7a2");
                assert_eq!(dir, PathBuf::from("out"));
            }
            _ => panic!("expected Pull command"),
        }
    }

    #[test]
    fn test_cli_rejects_missing_arguments() {
        assert!(Cli::try_parse_from(["skiff", "push"]).is_err());
        assert!(Cli::try_parse_from(["skiff", "pull", "only-id"]).is_err());
        assert!(Cli::try_parse_from(["skiff"]).is_err());
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "skiff",
            "push",
            "dir",
            "--bucket",
            "b",
            "--concurrency",
            "8",
            "--endpoint",
            "http://localhost:9000",
        ])
        .unwrap();
        assert_eq!(cli.store.bucket.as_deref(), Some("b"));
        assert_eq!(cli.store.concurrency, 8);
        assert_eq!(cli.store.endpoint.as_str(), "http://localhost:9000/");
    }

    #[test]
    fn test_cli_concurrency_defaults_to_64() {
        let cli = Cli::try_parse_from(["skiff", "push", "dir"]).unwrap();
        assert_eq!(cli.store.concurrency, 64);
    }
}
