//! # Repo Indexer CLI (`ridx`)
//!
//! ## Usage
//!
//! ```bash
//! ridx --config ./config/ridx.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `ridx init` | Create the SQLite database and run schema migrations |
//! | `ridx connect <owner/repo> --workspace <ws>` | Validate the token and link a repository |
//! | `ridx index <id>` | Full index of a connection |
//! | `ridx resync <id>` | Incremental add/remove sync |
//! | `ridx status [<id>]` | Connection status and counters |
//! | `ridx modules <id>` | List indexed modules |
//! | `ridx architecture <ws>` | Print the workspace architecture summary |
//! | `ridx search "<query>"` | Semantic search over module embeddings |
//! | `ridx serve` | Start the HTTP API |
//!
//! Logs go to stderr (`RUST_LOG` overrides the level); command output goes
//! to stdout.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use repo_indexer::config::{self, Config};
use repo_indexer::embedding::{self, embed_query};
use repo_indexer::error::RunError;
use repo_indexer::github::{GitHubClient, RepoSource};
use repo_indexer::indexer::{Pipeline, RunReport};
use repo_indexer::models::{split_repo_name, Connection, ModuleType};
use repo_indexer::progress::ProgressMode;
use repo_indexer::store::{ModuleQuery, Store};
use repo_indexer::{db, migrate, server};

/// Repo Indexer CLI: structural indexing, AI summaries and incremental sync
/// for GitHub repositories.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/ridx.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "ridx",
    about = "Repo Indexer: codebase indexing and incremental sync",
    version,
    long_about = "Repo Indexer lists a GitHub repository, extracts the public surface of every \
    source file, summarizes and embeds each file with a language model, and synthesizes one \
    architecture overview per workspace. Resync picks up added and removed files."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/ridx.toml")]
    config: PathBuf,

    /// Progress output for index and resync: off, human, json.
    ///
    /// Defaults to human when stderr is a terminal, otherwise off.
    #[arg(long, global = true, value_enum)]
    progress: Option<ProgressMode>,

    /// Debug logging for this crate.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables. Running it
    /// again is a no-op.
    Init,

    /// Link a repository to a workspace.
    ///
    /// Validates the GitHub token, resolves the default branch unless
    /// `--branch` is given, and creates a `pending` connection.
    Connect {
        /// Repository as `owner/repo`.
        repo: String,

        #[arg(long)]
        workspace: String,

        #[arg(long)]
        branch: Option<String>,
    },

    /// Index every eligible file of a connection.
    Index {
        connection_id: String,

        /// Start even if the connection is marked as syncing.
        #[arg(long)]
        force: bool,
    },

    /// Reconcile stored modules with the live tree.
    ///
    /// Removed files are deleted, added files are indexed and summarized.
    /// Files present in both are left untouched.
    Resync {
        connection_id: String,

        #[arg(long)]
        force: bool,
    },

    /// Show connection status and counters.
    Status {
        /// Omit to list every connection.
        connection_id: Option<String>,
    },

    /// List indexed modules of a connection.
    Modules {
        connection_id: String,

        /// component, service, model, route, utility, config, test, unknown.
        #[arg(long = "type")]
        module_type: Option<String>,

        /// Substring matched against path and summary.
        #[arg(long)]
        query: Option<String>,

        #[arg(long)]
        limit: Option<i64>,
    },

    /// Print the architecture summary of a workspace.
    Architecture { workspace_id: String },

    /// Semantic search over stored embeddings.
    ///
    /// Requires an embedding provider to be configured.
    Search {
        query: String,

        /// Restrict to one source type (e.g. `module`).
        #[arg(long)]
        source_type: Option<String>,

        #[arg(long, default_value_t = 10)]
        limit: usize,
    },

    /// Start the HTTP API on `[server].bind`.
    Serve,
}

fn init_tracing(verbose: bool) {
    let default = if verbose {
        "info,repo_indexer=debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let cfg = config::load_config(&cli.config)?;
    let progress = cli.progress.unwrap_or_else(ProgressMode::default_for_tty);

    let pool = db::connect(&cfg).await?;
    let store = Store::new(pool);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(store.pool()).await?;
            println!("Database initialized successfully.");
        }
        Commands::Connect {
            repo,
            workspace,
            branch,
        } => {
            run_connect(&cfg, &store, &repo, &workspace, branch).await?;
        }
        Commands::Index {
            connection_id,
            force,
        } => {
            let pipeline = Pipeline::from_config(&cfg, store)?.with_progress(progress.reporter());
            let report = pipeline.run_full_index(&connection_id, force).await?;
            print_report(&report, progress)?;
        }
        Commands::Resync {
            connection_id,
            force,
        } => {
            let pipeline = Pipeline::from_config(&cfg, store)?.with_progress(progress.reporter());
            let report = pipeline.run_resync(&connection_id, force).await?;
            print_report(&report, progress)?;
        }
        Commands::Status { connection_id } => {
            let connections = match connection_id {
                Some(id) => vec![store
                    .get_connection(&id)
                    .await?
                    .ok_or_else(|| RunError::ConnectionNotFound(id.clone()))?],
                None => store.list_connections().await?,
            };
            if connections.is_empty() {
                println!("No connections. Link one with `ridx connect`.");
            }
            for connection in &connections {
                print_connection(connection);
            }
        }
        Commands::Modules {
            connection_id,
            module_type,
            query,
            limit,
        } => {
            let module_type = module_type
                .as_deref()
                .map(str::parse::<ModuleType>)
                .transpose()?;
            let modules = store
                .query_modules(&ModuleQuery {
                    connection_id,
                    module_type,
                    text: query,
                    limit,
                })
                .await?;
            for module in &modules {
                println!("{:<10} {}", module.module_type, module.file_path);
                if let Some(summary) = &module.summary {
                    println!("           {}", summary);
                }
            }
            println!("{} modules", modules.len());
        }
        Commands::Architecture { workspace_id } => {
            let summary = store
                .get_architecture_summary(&workspace_id)
                .await?
                .with_context(|| format!("No architecture summary for workspace {}", workspace_id))?;
            println!("{}\n\n{}", summary.title, summary.content);
        }
        Commands::Search {
            query,
            source_type,
            limit,
        } => {
            let provider = embedding::create_provider(&cfg.embedding)?;
            if !provider.is_enabled() {
                anyhow::bail!("Search requires an embedding provider. Configure [embedding].");
            }
            let vector = embed_query(provider.as_ref(), &query).await?;
            let matches = store
                .vector_search(&vector, source_type.as_deref(), limit)
                .await?;
            if matches.is_empty() {
                println!("No results.");
            }
            for (i, hit) in matches.iter().enumerate() {
                let label = hit
                    .metadata
                    .get("file_path")
                    .and_then(|v| v.as_str())
                    .unwrap_or(&hit.source_id);
                println!(
                    "{}. [{:.3}] {} ({})",
                    i + 1,
                    hit.score,
                    label,
                    hit.source_type
                );
            }
        }
        Commands::Serve => {
            server::run_server(&cfg, store).await?;
        }
    }

    Ok(())
}

async fn run_connect(
    cfg: &Config,
    store: &Store,
    repo: &str,
    workspace: &str,
    branch: Option<String>,
) -> anyhow::Result<()> {
    let (owner, name) =
        split_repo_name(repo).ok_or_else(|| RunError::InvalidRepoName(repo.to_string()))?;

    let github = GitHubClient::from_config(&cfg.github)?;
    let user = github
        .fetch_user()
        .await
        .context("GitHub token validation failed")?;

    let branch = match branch {
        Some(branch) => branch,
        None => github.fetch_default_branch(owner, name).await?,
    };

    let connection = store.create_connection(workspace, repo, &branch).await?;
    println!(
        "Connected {}@{} to workspace {} as {}",
        repo, branch, workspace, user.login
    );
    println!("connection_id: {}", connection.id);
    Ok(())
}

fn print_connection(connection: &Connection) {
    println!(
        "{}  {}@{}  {}  files={} modules={}",
        connection.id,
        connection.repo_name,
        connection.default_branch,
        connection.status,
        connection.file_count,
        connection.module_count
    );
    if let Some(synced) = connection
        .last_synced_at
        .and_then(|ts| chrono::DateTime::from_timestamp(ts, 0))
    {
        println!("  last synced: {}", synced.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(message) = &connection.error_message {
        println!("  error: {}", message);
    }
}

fn print_report(report: &RunReport, progress: ProgressMode) -> anyhow::Result<()> {
    if progress == ProgressMode::Json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("Run complete:");
    println!("  eligible files:  {}", report.eligible);
    println!("  indexed:         {}", report.indexed);
    println!("  skipped (size):  {}", report.skipped);
    println!("  failed:          {}", report.failed);
    if report.removed > 0 {
        println!("  removed:         {}", report.removed);
    }
    println!(
        "  summarized:      {} ({} embedded, {} failed)",
        report.summary.summarized, report.summary.embedded, report.summary.failed
    );
    println!(
        "  architecture:    {}",
        if report.architecture_updated {
            "updated"
        } else {
            "skipped"
        }
    );
    println!("  modules:         {}", report.module_count);
    Ok(())
}
