// SQLite-backed task store with dense manual ordering

use crate::error::{Result, StorageError, StoreError};
use crate::model::{Task, now_ms};
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::collections::HashSet;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use uuid::Uuid;

const CURRENT_VERSION: u32 = 1;

const TASK_COLUMNS: &str = "id, title, description, completed, image, sort_index, created_at, updated_at";

/// Persistent store for the full to-do list
///
/// The store owns the record set: all mutations go through its
/// operations, which keep the `sort_index` values of live tasks densely
/// packed as `0..n-1`. Every mutating operation runs in a transaction,
/// so the dense range is never observable half-applied.
pub struct TaskStore {
    base_path: PathBuf,
    db: Connection,
    // Held for the store's lifetime; enforces single-writer access.
    _lock: File,
}

impl TaskStore {
    /// Open or create a store at the given path
    ///
    /// The store lives in a `.todostore` subdirectory of the given path.
    /// Only one `TaskStore` may hold a given directory at a time; a
    /// second open fails with [`StorageError::Locked`].
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let base_path = path.as_ref().join(".todostore");

        fs::create_dir_all(&base_path)?;

        let lock = File::create(base_path.join(".lock"))?;
        if lock.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked.into());
        }

        let db_path = base_path.join("todostore.db");
        let db = Connection::open(&db_path)?;

        let store = Self {
            base_path,
            db,
            _lock: lock,
        };

        store.create_schema()?;
        store.create_gitignore()?;
        store.write_version()?;

        Ok(store)
    }

    /// Get the base path of this store
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn create_schema(&self) -> Result<()> {
        debug!("Creating database schema");

        // The unique index doubles as a runtime guard on the "no
        // duplicate sort_index" half of the dense-range invariant.
        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id          TEXT PRIMARY KEY,
                title       TEXT NOT NULL,
                description TEXT NOT NULL,
                completed   INTEGER NOT NULL DEFAULT 0,
                image       BLOB,
                sort_index  INTEGER NOT NULL,
                created_at  INTEGER NOT NULL,
                updated_at  INTEGER NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_tasks_sort ON tasks(sort_index);
            "#,
        )?;

        Ok(())
    }

    fn create_gitignore(&self) -> Result<()> {
        let gitignore_path = self.base_path.join(".gitignore");
        if !gitignore_path.exists() {
            fs::write(
                gitignore_path,
                "todostore.db\ntodostore.db-shm\ntodostore.db-wal\n.lock\n",
            )?;
        }
        Ok(())
    }

    fn write_version(&self) -> Result<()> {
        let version_path = self.base_path.join(".version");
        if !version_path.exists() {
            fs::write(version_path, CURRENT_VERSION.to_string())?;
        }
        Ok(())
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Create a new task appended at the end of the current order
    ///
    /// Emptiness of `title`/`description` is deliberately not checked
    /// here; the presentation layer enforces that before calling in.
    pub fn create(&mut self, title: &str, description: &str) -> Result<Task> {
        let now = now_ms();
        let task = Task {
            id: Uuid::now_v7().to_string(),
            title: title.to_string(),
            description: description.to_string(),
            completed: false,
            image: None,
            sort_index: self.len()? as i32,
            created_at: now,
            updated_at: now,
        };

        self.db.execute(
            &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
            params![
                task.id,
                task.title,
                task.description,
                task.completed,
                task.image,
                task.sort_index,
                task.created_at,
                task.updated_at,
            ],
        )?;

        debug!(id = %task.id, sort_index = task.sort_index, "Created task");
        Ok(task)
    }

    /// List all tasks ordered ascending by `sort_index`
    pub fn list(&self) -> Result<Vec<Task>> {
        let mut stmt = self
            .db
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks ORDER BY sort_index ASC"))?;

        let rows = stmt.query_map([], Self::task_from_row)?;

        let mut tasks = Vec::new();
        for row in rows {
            tasks.push(row?);
        }
        Ok(tasks)
    }

    /// Get a single task by id
    pub fn get(&self, id: &str) -> Result<Task> {
        let mut stmt = self
            .db
            .prepare(&format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ?1"))?;

        stmt.query_row([id], Self::task_from_row)
            .optional()?
            .ok_or_else(|| StoreError::NotFound { id: id.to_string() })
    }

    /// Flip the completion flag on a task, returning the updated record
    pub fn toggle_completed(&mut self, id: &str) -> Result<Task> {
        let changed = self.db.execute(
            "UPDATE tasks SET completed = NOT completed, updated_at = ?1 WHERE id = ?2",
            params![now_ms(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        debug!(id, "Toggled completion");
        self.get(id)
    }

    /// Attach an image blob to a task, overwriting any previous one
    ///
    /// The bytes are stored opaquely; no decoding or validation happens.
    pub fn attach_image(&mut self, id: &str, bytes: &[u8]) -> Result<Task> {
        let changed = self.db.execute(
            "UPDATE tasks SET image = ?1, updated_at = ?2 WHERE id = ?3",
            params![bytes, now_ms(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        debug!(id, size = bytes.len(), "Attached image");
        self.get(id)
    }

    /// Remove a task's attached image, if any
    pub fn clear_image(&mut self, id: &str) -> Result<Task> {
        let changed = self.db.execute(
            "UPDATE tasks SET image = NULL, updated_at = ?1 WHERE id = ?2",
            params![now_ms(), id],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        self.get(id)
    }

    /// Delete one task and repack the survivors
    ///
    /// Every survivor with a higher `sort_index` than the deleted task
    /// shifts down by one, restoring the dense `0..n-1` range.
    pub fn delete_one(&mut self, id: &str) -> Result<()> {
        let tx = self.db.transaction()?;

        let removed = tx.execute("DELETE FROM tasks WHERE id = ?1", [id])?;
        if removed == 0 {
            // Dropping the transaction rolls back.
            return Err(StoreError::NotFound { id: id.to_string() });
        }

        Self::repack_tx(&tx)?;
        tx.commit()?;

        debug!(id, "Deleted task");
        Ok(())
    }

    /// Delete every task in one logical operation
    ///
    /// The delete returns the removed identifiers, which are reconciled
    /// against the known record set before the transaction commits; a
    /// divergence rolls everything back and reports an inconsistency.
    /// Returns the number of tasks removed.
    pub fn delete_all(&mut self) -> Result<usize> {
        let tx = self.db.transaction()?;

        let known: HashSet<String> = {
            let mut stmt = tx.prepare("SELECT id FROM tasks")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        let removed: HashSet<String> = {
            let mut stmt = tx.prepare("DELETE FROM tasks RETURNING id")?;
            let rows = stmt.query_map([], |row| row.get(0))?;
            rows.collect::<rusqlite::Result<_>>()?
        };

        if removed != known {
            return Err(StorageError::Inconsistent(format!(
                "bulk delete removed {} of {} known task(s)",
                removed.len(),
                known.len()
            ))
            .into());
        }

        tx.commit()?;

        info!(count = removed.len(), "Deleted all tasks");
        Ok(removed.len())
    }

    /// Move the task at position `from` so it occupies position `to`
    ///
    /// Standard single-element list-move semantics: tasks between the
    /// two positions shift by one toward the vacated slot, everything
    /// else keeps its relative order.
    pub fn reorder(&mut self, from: i32, to: i32) -> Result<()> {
        let len = self.len()?;
        for index in [from, to] {
            if index < 0 || index as usize >= len {
                return Err(StoreError::OutOfRange { index, len });
            }
        }
        if from == to {
            return Ok(());
        }

        let tx = self.db.transaction()?;

        let mut ids = Self::ordered_ids_tx(&tx)?;
        let moved = ids.remove(from as usize);
        ids.insert(to as usize, moved);

        Self::renumber_tx(&tx, &ids)?;
        tx.commit()?;

        debug!(from, to, "Reordered task");
        Ok(())
    }

    /// Number of tasks currently stored
    pub fn len(&self) -> Result<usize> {
        let count: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM tasks", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Replace the whole record set, assigning `sort_index` from the
    /// slice order. Used by snapshot import.
    pub(crate) fn replace_all(&mut self, tasks: &[Task]) -> Result<()> {
        let tx = self.db.transaction()?;

        tx.execute("DELETE FROM tasks", [])?;
        for (position, task) in tasks.iter().enumerate() {
            tx.execute(
                &format!("INSERT INTO tasks ({TASK_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"),
                params![
                    task.id,
                    task.title,
                    task.description,
                    task.completed,
                    task.image,
                    position as i64,
                    task.created_at,
                    task.updated_at,
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    // ========================================================================
    // Helper methods
    // ========================================================================

    fn task_from_row(row: &rusqlite::Row) -> rusqlite::Result<Task> {
        Ok(Task {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            completed: row.get(3)?,
            image: row.get(4)?,
            sort_index: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn ordered_ids_tx(tx: &Transaction) -> Result<Vec<String>> {
        let mut stmt = tx.prepare("SELECT id FROM tasks ORDER BY sort_index ASC")?;
        let rows = stmt.query_map([], |row| row.get(0))?;
        Ok(rows.collect::<rusqlite::Result<_>>()?)
    }

    /// Renumber all tasks densely, following the order of `ordered_ids`
    ///
    /// Goes through negative index space first so the unique index on
    /// `sort_index` never sees a transient collision mid-statement.
    fn renumber_tx(tx: &Transaction, ordered_ids: &[String]) -> Result<()> {
        for (position, id) in ordered_ids.iter().enumerate() {
            tx.execute(
                "UPDATE tasks SET sort_index = ?1 WHERE id = ?2",
                params![-(position as i64) - 1, id],
            )?;
        }
        tx.execute(
            "UPDATE tasks SET sort_index = -sort_index - 1 WHERE sort_index < 0",
            [],
        )?;
        Ok(())
    }

    fn repack_tx(tx: &Transaction) -> Result<()> {
        let ids = Self::ordered_ids_tx(tx)?;
        Self::renumber_tx(tx, &ids)
    }
}
