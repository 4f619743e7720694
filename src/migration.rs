use std::{fs, path::Path, path::PathBuf};

use anyhow::Context;
use sqlx::{Pool, Sqlite};

/// Runs every `NNN_name.sql` script in `dir`, lowest number first.
///
/// Scripts are applied on every start, so they must be idempotent.
pub async fn migrate(p: &Pool<Sqlite>, dir: &Path) -> anyhow::Result<()> {
    let mut migration_files: Vec<(usize, PathBuf)> = Vec::new();
    let entries = fs::read_dir(dir)
        .with_context(|| format!("cannot read migrations directory {}", dir.display()))?;

    for entry in entries {
        let entry = entry?;
        let path = entry.path();

        if !entry.metadata()?.is_file() {
            continue;
        }

        if path.extension().and_then(|e| e.to_str()) != Some("sql") {
            continue;
        }

        match migration_number(&path) {
            Some(n) => migration_files.push((n, path)),
            None => log::warn!("skipping {}: no numeric prefix", path.display()),
        }
    }

    migration_files.sort_by_key(|v| v.0);

    log::info!("starting migration");
    for (_, path) in &migration_files {
        let content = fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?;
        log::info!("migrating {}", path.display());
        sqlx::raw_sql(&content)
            .execute(p)
            .await
            .with_context(|| format!("migration {} failed", path.display()))?;
    }
    log::info!("migration end");

    Ok(())
}

fn migration_number(path: &Path) -> Option<usize> {
    let name = path.file_name()?.to_str()?;
    name.get(..3)?.parse().ok()
}
