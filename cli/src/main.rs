use clap::{Parser, Subcommand};

mod commands;
mod util;

#[derive(Parser)]
#[command(
    name = "qms",
    version,
    about = "QMS Audit CLI - command-line client for the audit management API"
)]
struct Cli {
    /// API base URL
    #[arg(long, env = "QMS_API_URL", default_value = "http://localhost:8000")]
    api_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check API health
    Health,
    /// Audit record operations
    Audit {
        #[command(subcommand)]
        command: AuditCommands,
    },
    /// AI analysis tools
    Ai {
        #[command(subcommand)]
        command: AiCommands,
    },
}

#[derive(Subcommand)]
pub enum AuditCommands {
    /// List audits with optional filters
    List {
        /// Rows to skip
        #[arg(long)]
        skip: Option<i64>,
        /// Maximum rows to return
        #[arg(long)]
        limit: Option<i64>,
        /// Substring match on the audit id
        #[arg(long)]
        audit_id: Option<String>,
        /// Exact audit type (e.g. "Internal", "Regulatory"), or "All"
        #[arg(long)]
        audit_type: Option<String>,
        /// Exact status (e.g. "Planned", "In Progress"), or "All"
        #[arg(long)]
        status: Option<String>,
        /// Substring match on the lead auditor
        #[arg(long)]
        lead_auditor: Option<String>,
        /// Substring match on the auditee country
        #[arg(long)]
        site: Option<String>,
    },
    /// Fetch one audit by its audit id
    Get { audit_id: String },
    /// Create an audit from a JSON body
    Create {
        /// Full create request as a JSON string
        #[arg(long)]
        body: String,
    },
    /// Partially update an audit from a JSON body
    Update {
        audit_id: String,
        /// Fields to change as a JSON string
        #[arg(long)]
        body: String,
    },
    /// Delete an audit
    Delete { audit_id: String },
    /// Status-bucket counts
    Summary,
}

#[derive(Subcommand)]
pub enum AiCommands {
    /// List the available AI tools
    Tools,
    /// Run one tool with a free-text query
    Query {
        /// Tool id (e.g. "identify_trends")
        #[arg(long)]
        tool: String,
        /// Free-text query
        #[arg(long)]
        query: String,
        /// Tool context as a JSON string (e.g. '{"audit_id": "AUD-2025-1A2B3C4D"}')
        #[arg(long)]
        context: Option<String>,
    },
    /// Free-text chat, routed to a tool by keyword
    Chat {
        message: String,
        /// Tool context as a JSON string
        #[arg(long)]
        context: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let exit_code = match cli.command {
        Commands::Health => commands::health::run(&cli.api_url).await,
        Commands::Audit { command } => commands::audit::run(&cli.api_url, command).await,
        Commands::Ai { command } => commands::ai::run(&cli.api_url, command).await,
    };

    std::process::exit(exit_code);
}
