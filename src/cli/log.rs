use anyhow::{Context, Result};

use crate::activity::{query_activities, try_log_activity, ActivityFilter, EventType, LogParams};
use crate::config::CortexConfig;

/// Record one activity from the command line. Payloads arrive as JSON text.
#[allow(clippy::too_many_arguments)]
pub fn record(
    config: &CortexConfig,
    event_type: EventType,
    session_id: Option<&str>,
    tool_name: Option<&str>,
    tool_input: Option<&str>,
    tool_output: Option<&str>,
    success: bool,
    error_message: Option<&str>,
    file_path: Option<&str>,
    summary: Option<&str>,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;

    let parse = |raw: &str| -> Result<serde_json::Value> {
        serde_json::from_str(raw).context("payload is not valid JSON")
    };

    let mut params = LogParams::new(event_type);
    params.session_id = session_id.map(String::from);
    params.tool_name = tool_name.map(String::from);
    params.tool_input = tool_input.map(parse).transpose()?;
    params.tool_output = tool_output.map(parse).transpose()?;
    params.success = success;
    params.error_message = error_message.map(String::from);
    params.file_path = file_path.map(String::from);
    params.summary = summary.map(String::from);
    params.project_path = config
        .resolved_project_dir()
        .ok()
        .map(|p| p.to_string_lossy().into_owned());

    let activity = try_log_activity(&mut conn, params)?;
    println!("Logged {} ({})", activity.id, activity.event_type);
    Ok(())
}

/// Show the activity log, newest first.
pub fn show(
    config: &CortexConfig,
    session_id: Option<&str>,
    tool_name: Option<&str>,
    failed_only: bool,
    limit: u32,
) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = crate::db::open_database(&db_path)?;

    let page = query_activities(
        &conn,
        &ActivityFilter {
            session_id: session_id.map(String::from),
            tool_name: tool_name.map(String::from),
            success: if failed_only { Some(false) } else { None },
            limit,
            ..Default::default()
        },
    )?;

    if page.activities.is_empty() {
        println!("No activities match.");
        return Ok(());
    }

    println!(
        "Showing {} of {} activities\n",
        page.activities.len(),
        page.total_count
    );
    for activity in &page.activities {
        let status = if activity.success { "ok" } else { "FAILED" };
        println!(
            "  {} {} [{}] {} {}",
            activity.timestamp,
            activity.id,
            activity.event_type,
            activity.tool_name.as_deref().unwrap_or("-"),
            status,
        );
        if let Some(error) = &activity.error_message {
            println!("     error: {error}");
        }
        if let Some(summary) = &activity.summary {
            println!("     {summary}");
        }
    }
    Ok(())
}
