// JSONL snapshot export/import

use crate::error::{Result, StorageError};
use crate::model::Task;
use crate::store::TaskStore;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use tracing::info;

/// Write the store's tasks to a JSONL file, one task per line
///
/// Lines follow list order, so the file itself encodes the ordering.
/// Image blobs are base64-encoded in the JSON.
pub fn export(store: &TaskStore, path: &Path) -> Result<usize> {
    let tasks = store.list()?;

    let mut file = File::create(path)?;
    for task in &tasks {
        let json = serde_json::to_string(task)?;
        writeln!(file, "{}", json)?;
    }
    file.sync_all()?;

    info!(file = ?path, count = tasks.len(), "Exported snapshot");
    Ok(tasks.len())
}

/// Replace the store's contents with the tasks in a JSONL file
///
/// Order comes from line order; `sort_index` values in the file are
/// ignored and re-derived densely. Any unreadable line fails the whole
/// import and leaves the store untouched.
pub fn import(store: &mut TaskStore, path: &Path) -> Result<usize> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);

    let mut tasks: Vec<Task> = Vec::new();
    for (line_num, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(&line).map_err(|e| {
            StorageError::Inconsistent(format!("bad snapshot line {}: {}", line_num + 1, e))
        })?;
        tasks.push(task);
    }

    store.replace_all(&tasks)?;

    info!(file = ?path, count = tasks.len(), "Imported snapshot");
    Ok(tasks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_export_import_round_trip() {
        let temp = TempDir::new().unwrap();
        let snapshot_path = temp.path().join("tasks.jsonl");

        let exported = {
            let mut store = TaskStore::open(temp.path().join("a")).unwrap();
            let a = store.create("A", "first").unwrap();
            store.create("B", "second").unwrap();
            store.toggle_completed(&a.id).unwrap();
            store.attach_image(&a.id, &[0, 1, 2, 255]).unwrap();
            store.reorder(0, 1).unwrap();
            (export(&store, &snapshot_path).unwrap(), store.list().unwrap())
        };

        let mut other = TaskStore::open(temp.path().join("b")).unwrap();
        let imported = import(&mut other, &snapshot_path).unwrap();

        assert_eq!(exported.0, 2);
        assert_eq!(imported, 2);
        assert_eq!(other.list().unwrap(), exported.1);
    }

    #[test]
    fn test_import_replaces_existing_contents() {
        let temp = TempDir::new().unwrap();
        let snapshot_path = temp.path().join("tasks.jsonl");

        {
            let mut store = TaskStore::open(temp.path().join("a")).unwrap();
            store.create("only", "task").unwrap();
            export(&store, &snapshot_path).unwrap();
        }

        let mut other = TaskStore::open(temp.path().join("b")).unwrap();
        other.create("stale", "gone after import").unwrap();
        import(&mut other, &snapshot_path).unwrap();

        let tasks = other.list().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "only");
        assert_eq!(tasks[0].sort_index, 0);
    }

    #[test]
    fn test_import_bad_line_fails_without_partial_apply() {
        let temp = TempDir::new().unwrap();
        let snapshot_path = temp.path().join("tasks.jsonl");
        std::fs::write(&snapshot_path, "not json at all\n").unwrap();

        let mut store = TaskStore::open(temp.path().join("a")).unwrap();
        store.create("kept", "still here").unwrap();

        assert!(import(&mut store, &snapshot_path).is_err());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn test_import_skips_blank_lines() {
        let temp = TempDir::new().unwrap();
        let snapshot_path = temp.path().join("tasks.jsonl");

        {
            let mut store = TaskStore::open(temp.path().join("a")).unwrap();
            store.create("A", "first").unwrap();
            export(&store, &snapshot_path).unwrap();
        }

        let mut content = std::fs::read_to_string(&snapshot_path).unwrap();
        content.push_str("\n\n");
        std::fs::write(&snapshot_path, content).unwrap();

        let mut other = TaskStore::open(temp.path().join("b")).unwrap();
        assert_eq!(import(&mut other, &snapshot_path).unwrap(), 1);
    }
}
