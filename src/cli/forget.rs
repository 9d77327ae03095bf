use anyhow::Result;

use crate::config::CortexConfig;
use crate::memory::store::{delete_memory, update_memory, UpdateMemoryParams};
use crate::memory::types::MemoryStatus;

/// Remove a memory. The default is a hard delete that takes the embedding and
/// relationship edges with it; `--archive` hides the memory instead.
pub fn forget(config: &CortexConfig, memory_id: &str, archive: bool) -> Result<()> {
    let db_path = config.resolved_db_path();
    let mut conn = crate::db::open_database(&db_path)?;

    if !archive {
        if delete_memory(&mut conn, memory_id)? {
            println!("Deleted {memory_id}.");
        } else {
            println!("No such memory: {memory_id}");
        }
    } else {
        let archived = update_memory(
            &mut conn,
            memory_id,
            UpdateMemoryParams {
                status: Some(MemoryStatus::Archived),
                ..Default::default()
            },
        )?;
        match archived {
            Some(_) => println!("Archived {memory_id}."),
            None => println!("No such memory: {memory_id}"),
        }
    }
    Ok(())
}
