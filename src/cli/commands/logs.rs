//! Import history command.

use std::path::Path;
use tokio::runtime::Runtime;

use super::import::open_store;
use crate::error::ResultExt;
use crate::import::ImportStore;

/// Print the most recent import runs
pub fn cmd_logs(rt: &Runtime, db_path: &Path, limit: usize) -> anyhow::Result<()> {
    rt.block_on(async {
        let store = open_store(db_path).await?;
        let logs = store
            .list_import_logs(limit)
            .await
            .with_context("listing import logs")?;

        if logs.is_empty() {
            println!("No imports recorded in {}", db_path.display());
            return Ok(());
        }

        for log in &logs {
            println!(
                "{}  {:<9} {:<22} {:<20} rows={} +{} ~{} skipped={} errors={}",
                log.started_at.format("%Y-%m-%d %H:%M:%S"),
                log.file_type.as_str(),
                log.status.as_str(),
                log.file_name,
                log.total_rows,
                log.inserted,
                log.updated,
                log.skipped,
                log.error_count,
            );
        }
        println!("\n{} run(s)", logs.len());
        Ok::<_, anyhow::Error>(())
    })
}
