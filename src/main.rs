use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cortex::activity::EventType;
use cortex::cli;
use cortex::config::CortexConfig;
use cortex::memory::search::SearchMode;
use cortex::memory::types::{MemoryStatus, MemoryType, RelationshipType};

#[derive(Parser)]
#[command(name = "cortex", version, about = "Persistent memory for AI coding agents")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Store a new memory
    Remember {
        content: String,
        /// Situational detail ("when working on X")
        #[arg(long)]
        context: Option<String>,
        /// Category; inferred from content when omitted
        #[arg(long = "type")]
        memory_type: Option<MemoryType>,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Importance score, 1-100
        #[arg(long)]
        importance: Option<f64>,
        /// Session to attribute this memory to
        #[arg(long)]
        session: Option<String>,
    },
    /// Search memories
    Recall {
        query: String,
        /// keyword, semantic, or hybrid
        #[arg(long, default_value = "hybrid")]
        mode: SearchMode,
        #[arg(long = "type")]
        memory_type: Option<MemoryType>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        min_importance: Option<f64>,
        #[arg(long)]
        include_archived: bool,
        #[arg(long)]
        limit: Option<u32>,
    },
    /// List memories
    List {
        #[arg(long = "type")]
        memory_type: Option<MemoryType>,
        #[arg(long)]
        status: Option<MemoryStatus>,
        #[arg(long)]
        tag: Option<String>,
        /// created_at, last_accessed, importance_score, access_count, type, or status
        #[arg(long)]
        sort: Option<String>,
        #[arg(long, default_value_t = 20)]
        limit: u32,
        #[arg(long, default_value_t = 0)]
        offset: u32,
    },
    /// Delete a memory (embedding and edges go with it)
    Forget {
        memory_id: String,
        /// Archive instead of deleting; the row stays but leaves default retrieval
        #[arg(long)]
        archive: bool,
    },
    /// Record or inspect activity log entries
    Log {
        #[command(subcommand)]
        action: LogAction,
    },
    /// Manage work sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Create an edge between two memories
    Link {
        source_id: String,
        target_id: String,
        /// related_to, supersedes, derived_from, or contradicts
        #[arg(long = "type", default_value = "related_to")]
        relationship_type: RelationshipType,
        /// Edge weight, 0.0-1.0
        #[arg(long)]
        strength: Option<f64>,
    },
    /// Show all edges touching a memory
    Relations { memory_id: String },
    /// Print the graph around a memory, or the whole graph
    Graph {
        memory_id: Option<String>,
        #[arg(long, default_value_t = 2)]
        depth: u32,
    },
    /// Review workflow for stale memories
    Review {
        #[command(subcommand)]
        action: ReviewAction,
    },
    /// Embed memories that do not have a vector yet
    Backfill {
        /// Stop after this many (0 = no cap)
        #[arg(long, default_value_t = 0)]
        limit: usize,
    },
    /// Store statistics
    Stats,
    /// Tags in use, with counts
    Tags,
    /// Export memories and relationships as JSON to stdout
    Export,
    /// Apply pending schema migrations
    Migrate,
    /// Manage the embedding model
    Model {
        #[command(subcommand)]
        action: ModelAction,
    },
}

#[derive(Subcommand)]
enum LogAction {
    /// Record one activity
    Record {
        /// pre_tool_use, post_tool_use, decision, or observation
        #[arg(long, default_value = "observation")]
        event: EventType,
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        tool: Option<String>,
        /// Tool input as JSON (redacted before storage)
        #[arg(long)]
        input: Option<String>,
        /// Tool output as JSON (redacted before storage)
        #[arg(long)]
        output: Option<String>,
        #[arg(long)]
        failed: bool,
        #[arg(long)]
        error: Option<String>,
        #[arg(long)]
        file: Option<String>,
        #[arg(long)]
        summary: Option<String>,
    },
    /// Show recent activities
    Show {
        #[arg(long)]
        session: Option<String>,
        #[arg(long)]
        tool: Option<String>,
        #[arg(long)]
        failed: bool,
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Start (or resume) the session for this project
    Start {
        /// Use this session id instead of generating one
        #[arg(long)]
        id: Option<String>,
    },
    /// End a session and freeze its summary
    End {
        session_id: String,
        #[arg(long)]
        summary: Option<String>,
        #[arg(long)]
        learnings: Option<String>,
    },
    /// Show a session's summary (live if still open)
    Summary { session_id: String },
    /// Print "last time you were here" continuity text
    Context {
        /// How many ended sessions to cover
        #[arg(long, default_value_t = 3)]
        sessions: u32,
        /// Include key learnings
        #[arg(long)]
        learnings: bool,
        /// Cover every project, not just this one
        #[arg(long)]
        all: bool,
    },
    /// Dump one session's activities and memories as JSON
    Inspect {
        session_id: String,
        #[arg(long, default_value_t = 20)]
        activities: u32,
    },
    /// List recent sessions
    Recent {
        /// Only sessions for this project
        #[arg(long)]
        here: bool,
        #[arg(long, default_value_t = 10)]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum ReviewAction {
    /// Flag stale fresh memories as needing review
    Mark {
        /// Days without access; defaults from config
        #[arg(long)]
        days: Option<u32>,
    },
    /// Show memories waiting for review
    Pending {
        #[arg(long, default_value_t = 50)]
        limit: u32,
    },
    /// Set a new status on reviewed memories
    Resolve {
        /// fresh, needs_review, outdated, or archived
        #[arg(long)]
        status: MemoryStatus,
        ids: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ModelAction {
    /// Download the embedding model to ~/.cortex/models/
    Download,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = CortexConfig::load()?;

    // Log to stderr so stdout stays clean for JSON output.
    let filter = EnvFilter::try_new(&config.logging.log_level)
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Remember {
            content,
            context,
            memory_type,
            tags,
            importance,
            session,
        } => cli::remember::remember(
            &config,
            &content,
            context.as_deref(),
            memory_type,
            tags,
            importance,
            session.as_deref(),
        )?,
        Command::Recall {
            query,
            mode,
            memory_type,
            tags,
            min_importance,
            include_archived,
            limit,
        } => cli::recall::recall(
            &config,
            &query,
            mode,
            memory_type,
            tags,
            min_importance,
            include_archived,
            limit,
        )?,
        Command::List {
            memory_type,
            status,
            tag,
            sort,
            limit,
            offset,
        } => cli::list::list(&config, memory_type, status, tag, sort, limit, offset)?,
        Command::Forget { memory_id, archive } => {
            cli::forget::forget(&config, &memory_id, archive)?
        }
        Command::Log { action } => match action {
            LogAction::Record {
                event,
                session,
                tool,
                input,
                output,
                failed,
                error,
                file,
                summary,
            } => cli::log::record(
                &config,
                event,
                session.as_deref(),
                tool.as_deref(),
                input.as_deref(),
                output.as_deref(),
                !failed,
                error.as_deref(),
                file.as_deref(),
                summary.as_deref(),
            )?,
            LogAction::Show {
                session,
                tool,
                failed,
                limit,
            } => cli::log::show(&config, session.as_deref(), tool.as_deref(), failed, limit)?,
        },
        Command::Session { action } => match action {
            SessionAction::Start { id } => cli::session::start(&config, id.as_deref())?,
            SessionAction::End {
                session_id,
                summary,
                learnings,
            } => cli::session::end(
                &config,
                &session_id,
                summary.as_deref(),
                learnings.as_deref(),
            )?,
            SessionAction::Summary { session_id } => cli::session::summary(&config, &session_id)?,
            SessionAction::Context {
                sessions,
                learnings,
                all,
            } => cli::session::context(&config, sessions, learnings, all)?,
            SessionAction::Inspect {
                session_id,
                activities,
            } => cli::session::inspect(&config, &session_id, activities)?,
            SessionAction::Recent { here, limit } => cli::session::recent(&config, here, limit)?,
        },
        Command::Link {
            source_id,
            target_id,
            relationship_type,
            strength,
        } => cli::link::link(&config, &source_id, &target_id, relationship_type, strength)?,
        Command::Relations { memory_id } => cli::link::show(&config, &memory_id)?,
        Command::Graph { memory_id, depth } => {
            cli::link::graph(&config, memory_id.as_deref(), depth)?
        }
        Command::Review { action } => match action {
            ReviewAction::Mark { days } => cli::review::mark(&config, days)?,
            ReviewAction::Pending { limit } => cli::review::pending(&config, limit)?,
            ReviewAction::Resolve { status, ids } => cli::review::resolve(&config, ids, status)?,
        },
        Command::Backfill { limit } => cli::backfill::backfill(&config, limit).await?,
        Command::Stats => cli::stats::stats(&config)?,
        Command::Tags => cli::stats::tags(&config)?,
        Command::Export => cli::export::export(&config)?,
        Command::Migrate => {
            let db_path = config.resolved_db_path();
            let conn = cortex::db::open_database(&db_path)?;
            let version = cortex::db::migrations::current_version(&conn)?
                .unwrap_or_else(|| "none".to_string());
            println!("Database at {} is at schema {version}.", db_path.display());
        }
        Command::Model { action } => match action {
            ModelAction::Download => cli::model_download(&config.embedding).await?,
        },
    }

    Ok(())
}
