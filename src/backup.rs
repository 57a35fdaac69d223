//! Rotating JSON snapshots taken before operations that rewrite local storage.

use crate::error::Res;
use crate::{utils, Config};
use anyhow::Context;
use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Prefix for snapshots taken before a storage migration.
pub const MIGRATE: &str = "migrate";

/// Prefix for snapshots taken before a CSV import.
pub const IMPORT: &str = "import";

/// Creates backup files and rotates old ones.
#[derive(Debug, Clone)]
pub struct Backup {
    backups_dir: PathBuf,
    backup_copies: u32,
}

impl Backup {
    pub fn new(config: &Config) -> Self {
        Self::with_dir(config.backups(), config.backup_copies())
    }

    pub(crate) fn with_dir(backups_dir: impl Into<PathBuf>, backup_copies: u32) -> Self {
        Self {
            backups_dir: backups_dir.into(),
            backup_copies,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.backups_dir
    }

    /// Saves `data` as pretty JSON to `{prefix}.YYYY-MM-DD-NNN.json`, where NNN is the next free
    /// sequence number for the day, then deletes the oldest files beyond `backup_copies`.
    ///
    /// Returns the path of the new file.
    pub async fn save_json<T>(&self, prefix: &str, data: &T) -> Res<PathBuf>
    where
        T: Serialize + ?Sized,
    {
        let date = today();
        let seq = self.next_sequence_number(prefix, &date).await?;
        let path = self.backups_dir.join(format!("{prefix}.{date}-{seq:03}.json"));

        let json = serde_json::to_string_pretty(data).context("Failed to serialize backup")?;
        utils::write(&path, json).await?;

        self.rotate(prefix).await?;
        Ok(path)
    }

    async fn next_sequence_number(&self, prefix: &str, date: &str) -> Res<u32> {
        let mut max_seq: u32 = 0;
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name();
            if let Some(seq) = parse_sequence_number(&name.to_string_lossy(), prefix, date) {
                max_seq = max_seq.max(seq);
            }
        }
        Ok(max_seq + 1)
    }

    async fn rotate(&self, prefix: &str) -> Res<()> {
        let mut files: Vec<(PathBuf, String)> = Vec::new();
        let mut dir = utils::read_dir(&self.backups_dir).await?;
        while let Some(entry) = dir
            .next_entry()
            .await
            .context("Failed to read directory entry")?
        {
            let name = entry.file_name().to_string_lossy().to_string();
            if is_backup_file(&name, prefix) {
                files.push((entry.path(), name));
            }
        }

        // The name format sorts by date, then sequence number.
        files.sort_by(|a, b| a.1.cmp(&b.1));

        let to_delete = files.len().saturating_sub(self.backup_copies as usize);
        for (path, _) in files.into_iter().take(to_delete) {
            utils::remove(&path).await?;
        }
        Ok(())
    }
}

fn today() -> String {
    Local::now().format("%Y-%m-%d").to_string()
}

/// Parses NNN out of `{prefix}.{date}-NNN.json`.
fn parse_sequence_number(filename: &str, prefix: &str, date: &str) -> Option<u32> {
    filename
        .strip_prefix(&format!("{prefix}.{date}-"))?
        .strip_suffix(".json")?
        .parse()
        .ok()
}

fn is_backup_file(filename: &str, prefix: &str) -> bool {
    filename.starts_with(&format!("{prefix}.")) && filename.ends_with(".json")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_sequence_number() {
        assert_eq!(
            parse_sequence_number("migrate.2025-12-14-001.json", MIGRATE, "2025-12-14"),
            Some(1)
        );
        assert_eq!(
            parse_sequence_number("migrate.2025-12-14-042.json", MIGRATE, "2025-12-14"),
            Some(42)
        );
        assert_eq!(
            parse_sequence_number("import.2025-12-14-001.json", MIGRATE, "2025-12-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("migrate.2025-12-13-001.json", MIGRATE, "2025-12-14"),
            None
        );
        assert_eq!(
            parse_sequence_number("migrate.2025-12-14-001.txt", MIGRATE, "2025-12-14"),
            None
        );
    }

    #[test]
    fn test_is_backup_file() {
        assert!(is_backup_file("migrate.2025-12-14-001.json", MIGRATE));
        assert!(is_backup_file("import.2025-12-14-001.json", IMPORT));
        assert!(!is_backup_file("migrate.2025-12-14-001.json", IMPORT));
        assert!(!is_backup_file("migrate.2025-12-14-001", MIGRATE));
    }

    #[tokio::test]
    async fn test_save_json_rotates() {
        let dir = TempDir::new().unwrap();
        let backup = Backup::with_dir(dir.path(), 2);
        let first = backup.save_json(MIGRATE, &vec![1]).await.unwrap();
        let second = backup.save_json(MIGRATE, &vec![2]).await.unwrap();
        let third = backup.save_json(MIGRATE, &vec![3]).await.unwrap();
        backup.save_json(IMPORT, &vec![4]).await.unwrap();

        assert!(first.to_string_lossy().ends_with("-001.json"));
        assert!(!utils::exists(&first).await.unwrap());
        assert!(utils::exists(&second).await.unwrap());
        assert!(utils::exists(&third).await.unwrap());
        assert_eq!(utils::read(&third).await.unwrap(), "[\n  3\n]");
    }
}
