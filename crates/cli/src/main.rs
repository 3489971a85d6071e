//! verifydesk CLI - migrations, admin directory, and applicant simulation.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! vd-cli migrate
//!
//! # Manage admins
//! vd-cli admin add -n "Alice"
//! vd-cli admin connect ADM-1a2b3c4d5e U0123ABC
//! vd-cli admin list
//!
//! # Counters
//! vd-cli stats
//! vd-cli stats --admin ADM-1a2b3c4d5e
//!
//! # Play the applicant against a running server
//! vd-cli apply --phone +255712345678 --pin 1234
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};

mod client;
mod commands;
mod poller;

use commands::apply::ApplyResult;
use poller::PollPolicy;

#[derive(Parser)]
#[command(name = "vd-cli")]
#[command(author, version, about = "verifydesk CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Manage the admin directory
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
    /// Show desk-wide or per-admin counters
    Stats {
        /// Only this admin
        #[arg(short, long)]
        admin: Option<String>,
    },
    /// Submit an application and follow it through both stages
    Apply {
        /// Server base URL
        #[arg(short, long, default_value = "http://localhost:3000")]
        server: String,

        /// Applicant phone number
        #[arg(long)]
        phone: String,

        /// Four-digit PIN
        #[arg(long)]
        pin: String,

        /// Route to this admin instead of auto-assigning
        #[arg(short, long)]
        admin: Option<String>,

        /// Seconds between status checks
        #[arg(long, default_value_t = 2)]
        interval: u64,

        /// Status checks before giving up
        #[arg(long, default_value_t = 150)]
        attempts: u32,
    },
}

#[derive(Subcommand)]
enum AdminAction {
    /// Create an admin
    Add {
        /// Display name
        #[arg(short, long)]
        name: String,

        /// Contact email (display only)
        #[arg(short, long)]
        email: Option<String>,

        /// Explicit admin id; generated when omitted
        #[arg(long)]
        id: Option<String>,
    },
    /// Bind a chat endpoint to an admin
    Connect {
        admin_id: String,
        /// Slack user id or Telegram chat id
        endpoint: String,
    },
    /// Stop new prompts to an admin
    Pause { admin_id: String },
    /// Resume prompts to an admin
    Unpause { admin_id: String },
    /// Delete an admin; their applications are kept
    Remove { admin_id: String },
    /// List all admins
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, commands::CommandError> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Admin { action } => match action {
            AdminAction::Add { name, email, id } => {
                commands::admin::add(id, &name, email).await?;
            }
            AdminAction::Connect { admin_id, endpoint } => {
                commands::admin::connect_endpoint(&admin_id, &endpoint).await?;
            }
            AdminAction::Pause { admin_id } => commands::admin::pause(&admin_id).await?,
            AdminAction::Unpause { admin_id } => commands::admin::unpause(&admin_id).await?,
            AdminAction::Remove { admin_id } => commands::admin::remove(&admin_id).await?,
            AdminAction::List => commands::admin::list().await?,
        },
        Commands::Stats { admin } => commands::stats::run(admin).await?,
        Commands::Apply {
            server,
            phone,
            pin,
            admin,
            interval,
            attempts,
        } => {
            let policy = PollPolicy {
                interval: Duration::from_secs(interval),
                max_attempts: attempts,
            };
            let result =
                commands::apply::run(&server, &phone, &pin, admin.as_deref(), policy).await?;
            return Ok(match result {
                ApplyResult::Approved => ExitCode::SUCCESS,
                ApplyResult::Rejected => ExitCode::from(2),
                ApplyResult::NoResponse => ExitCode::from(3),
            });
        }
    }
    Ok(ExitCode::SUCCESS)
}
