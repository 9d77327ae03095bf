mod helpers;

use cortex::activity::{try_log_activity, EventType, LogParams};
use cortex::session::marker::SessionMarker;
use cortex::session::{end_session, get_session, get_session_summary, start_session};
use helpers::{insert_memory_full, test_db};

#[test]
fn timeout_boundary_produces_a_new_session() {
    let mut conn = test_db();
    let dir = tempfile::tempdir().unwrap();

    let (first, _) = start_session(&mut conn, dir.path(), None, 3600).unwrap();

    // Just inside the timeout: resumed
    let mut marker = SessionMarker::load(dir.path()).unwrap().unwrap();
    marker.last_activity_at = (chrono::Utc::now() - chrono::Duration::minutes(30)).to_rfc3339();
    marker.save(dir.path()).unwrap();
    let (resumed, was_resumed) = start_session(&mut conn, dir.path(), None, 3600).unwrap();
    assert!(was_resumed);
    assert_eq!(resumed.id, first.id);

    // Past the timeout: a distinct session
    let mut marker = SessionMarker::load(dir.path()).unwrap().unwrap();
    marker.last_activity_at = (chrono::Utc::now() - chrono::Duration::hours(2)).to_rfc3339();
    marker.save(dir.path()).unwrap();
    let (fresh, was_resumed) = start_session(&mut conn, dir.path(), None, 3600).unwrap();
    assert!(!was_resumed);
    assert_ne!(fresh.id, first.id);

    // The marker now names the new session; the old row still exists
    let marker = SessionMarker::load(dir.path()).unwrap().unwrap();
    assert_eq!(marker.session_id, fresh.id);
    assert!(get_session(&conn, &first.id).unwrap().is_some());
}

#[test]
fn frozen_summary_survives_later_activity() {
    let mut conn = test_db();
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = start_session(&mut conn, dir.path(), None, 3600).unwrap();

    let mut params = LogParams::new(EventType::PostToolUse);
    params.session_id = Some(session.id.clone());
    params.tool_name = Some("Edit".into());
    try_log_activity(&mut conn, params.clone()).unwrap();

    insert_memory_full(&mut conn, "session fact", None, 50.0, Some(&session.id));

    let ended = end_session(&mut conn, &session.id, None, None).unwrap().unwrap();
    assert_eq!(ended.total_activities, 1);
    assert_eq!(ended.total_memories_created, 1);

    // Activity logged after the end does not mutate the frozen numbers
    try_log_activity(&mut conn, params).unwrap();
    let summary = get_session_summary(&conn, &session.id).unwrap().unwrap();
    assert!(summary.frozen);
    assert_eq!(summary.total_activities, 1);
}

#[test]
fn summary_collects_failures_and_files() {
    let mut conn = test_db();
    let dir = tempfile::tempdir().unwrap();
    let (session, _) = start_session(&mut conn, dir.path(), None, 3600).unwrap();

    for (tool, file, ok) in [
        ("Edit", Some("src/a.rs"), true),
        ("Edit", Some("src/a.rs"), true),
        ("Edit", Some("src/b.rs"), true),
        ("Bash", None, false),
    ] {
        let mut params = LogParams::new(EventType::PostToolUse);
        params.session_id = Some(session.id.clone());
        params.tool_name = Some(tool.into());
        params.file_path = file.map(String::from);
        params.success = ok;
        if !ok {
            params.error_message = Some("command exited 1".into());
        }
        try_log_activity(&mut conn, params).unwrap();
    }

    let ended = end_session(&mut conn, &session.id, Some("refactor"), None)
        .unwrap()
        .unwrap();
    assert_eq!(ended.tools_used.get("Edit"), Some(&3));
    assert_eq!(ended.tools_used.get("Bash"), Some(&1));
    // Files are deduplicated
    assert_eq!(ended.files_modified, vec!["src/a.rs", "src/b.rs"]);
    assert_eq!(ended.key_errors, vec!["command exited 1"]);
}

#[test]
fn sessions_for_different_projects_are_independent() {
    let mut conn = test_db();
    let dir_a = tempfile::tempdir().unwrap();
    let dir_b = tempfile::tempdir().unwrap();

    let (session_a, _) = start_session(&mut conn, dir_a.path(), None, 3600).unwrap();
    let (session_b, _) = start_session(&mut conn, dir_b.path(), None, 3600).unwrap();
    assert_ne!(session_a.id, session_b.id);

    // Each project marker names its own session
    assert_eq!(
        SessionMarker::load(dir_a.path()).unwrap().unwrap().session_id,
        session_a.id
    );
    assert_eq!(
        SessionMarker::load(dir_b.path()).unwrap().unwrap().session_id,
        session_b.id
    );
}
