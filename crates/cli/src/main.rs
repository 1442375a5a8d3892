//! Drone Capital CLI - operator tools against the backend.
//!
//! # Usage
//!
//! ```bash
//! # Export the audit log as CSV to stdout
//! drone-cli audit export
//!
//! # Only role changes mentioning "ada", written to a file
//! drone-cli audit export --action update_user_role --search ada --out roles.csv
//!
//! # Print the admin dashboard figures
//! drone-cli stats
//!
//! # Check the backend answers with the service key
//! drone-cli ping
//! ```
//!
//! # Environment Variables
//!
//! - `BACKEND_URL`, `BACKEND_ANON_KEY`, `BACKEND_SERVICE_KEY` - see `drone_backend::config`

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "drone-cli")]
#[command(author, version, about = "Drone Capital operator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Audit log tools
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
    /// Print the admin dashboard figures
    Stats,
    /// Check the backend REST endpoint with the service key
    Ping,
}

#[derive(Subcommand)]
enum AuditAction {
    /// Export audit log entries as CSV
    Export {
        /// Only entries whose fields contain this text (case-insensitive)
        #[arg(short, long)]
        search: Option<String>,

        /// Only entries with exactly this action, e.g. `approve_kyc`
        #[arg(short, long)]
        action: Option<String>,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Most recent entries to fetch before filtering
        #[arg(short, long, default_value_t = commands::audit::DEFAULT_LIMIT)]
        limit: usize,
    },
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so CSV on stdout stays clean
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "drone_cli=info,drone_backend=warn".into()),
        )
        .init();

    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), commands::CliError> {
    let backend = commands::connect()?;
    match cli.command {
        Commands::Audit { action } => match action {
            AuditAction::Export {
                search,
                action,
                out,
                limit,
            } => {
                let filter = commands::audit::ExportFilter {
                    search: search.unwrap_or_default(),
                    action,
                    limit,
                };
                commands::audit::export(&backend, &filter, out.as_deref()).await?;
            }
        },
        Commands::Stats => commands::stats::print(&backend).await?,
        Commands::Ping => commands::ping(&backend).await?,
    }
    Ok(())
}
