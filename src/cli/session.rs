use anyhow::Result;

use crate::config::CortexConfig;
use crate::session::{
    end_session, get_context, get_recent_sessions, get_session_context, get_session_summary,
    start_session,
};

/// Start (or resume) the session for the configured project.
pub fn start(config: &CortexConfig, explicit_id: Option<&str>) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;
    let project_dir = config.resolved_project_dir()?;

    let (session, resumed) = start_session(
        &mut conn,
        &project_dir,
        explicit_id,
        config.session.timeout_secs,
    )?;
    if resumed {
        println!("Resumed session {} (started {})", session.id, session.started_at);
    } else {
        println!("Started session {}", session.id);
    }
    Ok(())
}

/// End a session, freezing its summary.
pub fn end(
    config: &CortexConfig,
    session_id: &str,
    summary: Option<&str>,
    key_learnings: Option<&str>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;

    match end_session(&mut conn, session_id, summary, key_learnings)? {
        Some(session) => {
            println!(
                "Ended {}: {} activities, {} memories created",
                session.id, session.total_activities, session.total_memories_created
            );
            if !session.key_errors.is_empty() {
                println!("  errors seen: {}", session.key_errors.len());
            }
        }
        None => println!("No such session: {session_id}"),
    }
    Ok(())
}

/// Print the summary for a session (live if still open).
pub fn summary(config: &CortexConfig, session_id: &str) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    match get_session_summary(&conn, session_id)? {
        Some(summary) => println!("{}", serde_json::to_string_pretty(&summary)?),
        None => println!("No such session: {session_id}"),
    }
    Ok(())
}

/// Print continuity text built from recently ended sessions.
pub fn context(config: &CortexConfig, sessions: u32, learnings: bool, all: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let project = if all {
        None
    } else {
        Some(config.resolved_project_dir()?.to_string_lossy().into_owned())
    };
    println!("{}", get_context(&conn, project.as_deref(), sessions, learnings)?);
    Ok(())
}

/// Dump one session's activities and memories as JSON.
pub fn inspect(config: &CortexConfig, session_id: &str, activity_limit: u32) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    match get_session_context(&conn, session_id, activity_limit)? {
        Some(context) => println!("{}", serde_json::to_string_pretty(&context)?),
        None => println!("No such session: {session_id}"),
    }
    Ok(())
}

/// List recent sessions, optionally scoped to the configured project.
pub fn recent(config: &CortexConfig, this_project: bool, limit: u32) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let project = if this_project {
        Some(
            config
                .resolved_project_dir()?
                .to_string_lossy()
                .into_owned(),
        )
    } else {
        None
    };

    let sessions = get_recent_sessions(&conn, project.as_deref(), limit)?;
    if sessions.is_empty() {
        println!("No sessions found.");
        return Ok(());
    }

    for session in &sessions {
        let state = match &session.ended_at {
            Some(ended) => format!("ended {ended}"),
            None => "open".to_string(),
        };
        println!(
            "  {} {} ({}) {}",
            session.id, session.started_at, state, session.project_path
        );
    }
    Ok(())
}
