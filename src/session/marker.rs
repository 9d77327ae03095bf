//! Current-session marker file.
//!
//! The marker lives at `<project>/.cortex/current_session.json` and lets
//! independent short-lived processes agree on which session is active without
//! touching the database. A marker older than the session timeout is simply
//! ignored; it is overwritten when a new session starts, never mutated to
//! point elsewhere.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default session idle timeout: four hours.
pub const DEFAULT_TIMEOUT_SECS: i64 = 4 * 60 * 60;

/// On-disk marker contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMarker {
    pub session_id: String,
    pub project_path: String,
    pub started_at: String,
    pub last_activity_at: String,
}

impl SessionMarker {
    pub fn new(session_id: &str, project_path: &str) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            session_id: session_id.to_string(),
            project_path: project_path.to_string(),
            started_at: now.clone(),
            last_activity_at: now,
        }
    }

    /// Where the marker for a project lives.
    pub fn path_for(project_dir: &Path) -> PathBuf {
        project_dir.join(".cortex").join("current_session.json")
    }

    /// Load the marker, if one exists and parses. A corrupt marker reads as
    /// absent so a stray file cannot wedge session startup.
    pub fn load(project_dir: &Path) -> Result<Option<Self>> {
        let path = Self::path_for(project_dir);
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("reading session marker {}", path.display()))?;
        match serde_json::from_str(&raw) {
            Ok(marker) => Ok(Some(marker)),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "ignoring corrupt session marker");
                Ok(None)
            }
        }
    }

    /// Write the marker atomically (tmp file then rename).
    pub fn save(&self, project_dir: &Path) -> Result<()> {
        let path = Self::path_for(project_dir);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(self)?)
            .with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &path)
            .with_context(|| format!("renaming into {}", path.display()))?;
        Ok(())
    }

    /// Refresh `last_activity_at` to now.
    pub fn touch(&mut self) {
        self.last_activity_at = chrono::Utc::now().to_rfc3339();
    }

    /// Whether the marker has been idle longer than `timeout_secs`.
    pub fn is_expired(&self, timeout_secs: i64) -> bool {
        match chrono::DateTime::parse_from_rfc3339(&self.last_activity_at) {
            Ok(last) => {
                let idle = chrono::Utc::now() - last.with_timezone(&chrono::Utc);
                idle.num_seconds() > timeout_secs
            }
            // Unparseable timestamp counts as expired
            Err(_) => true,
        }
    }

    /// Remove the marker if it names `session_id`. A marker for some other
    /// session (a newer one took over) is left alone.
    pub fn clear_if_matches(project_dir: &Path, session_id: &str) -> Result<()> {
        if let Some(marker) = Self::load(project_dir)? {
            if marker.session_id == session_id {
                let path = Self::path_for(project_dir);
                std::fs::remove_file(&path)
                    .with_context(|| format!("removing {}", path.display()))?;
            }
        }
        Ok(())
    }
}
