//! CSV import command.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::config::Config;
use crate::db::{self, SqliteStore};
use crate::error::{self, ResultExt};
use crate::import::{ImportKind, MemoryStore, run_import_file};

/// Open the SQLite store at `path`, creating and migrating it if needed.
pub(super) async fn open_store(path: &Path) -> error::Result<SqliteStore> {
    SqliteStore::connect(&db::db_url(Some(path)))
        .await
        .with_context(format!("opening database {}", path.display()))
}

/// Import a legacy export file
pub fn cmd_import(
    rt: &Runtime,
    config: &Config,
    kind: ImportKind,
    file: &Path,
    db_path: &Path,
    dry_run: bool,
) -> anyhow::Result<()> {
    if !file.exists() {
        return Err(error::Error::not_found(file).into());
    }

    rt.block_on(async {
        let summary = if dry_run {
            println!("Dry run: nothing will be written to {}", db_path.display());
            let store = MemoryStore::new();
            run_import_file(&store, kind, file, config).await?
        } else {
            let store = open_store(db_path).await?;
            run_import_file(&store, kind, file, config).await?
        };

        println!("{}", summary);
        Ok::<_, anyhow::Error>(())
    })
}
