use std::cell::Cell;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, error};

use crate::error::ServiceError;
use crate::models::User;

pub const CURRENT_USER_KEY: &str = "currentUser";
pub const SAMPLE_JOBS_KEY: &str = "sampleJobs";
pub const SAMPLE_DATA_INITIALIZED_KEY: &str = "sampleDataInitialized";

pub struct Database {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
    savepoint_depth: Cell<u32>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
            savepoint_depth: Cell::new(0),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self {
            conn,
            path: None,
            savepoint_depth: Cell::new(0),
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn default_path() -> PathBuf {
        // XDG data directory, falling back to the working directory
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "flowjob") {
            proj_dirs.data_dir().join("flowjob.db")
        } else {
            PathBuf::from("flowjob.db")
        }
    }

    pub fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS records (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                collection TEXT NOT NULL,
                id TEXT NOT NULL,
                owner_id TEXT,
                body TEXT NOT NULL,
                UNIQUE (collection, id)
            );

            CREATE INDEX IF NOT EXISTS idx_records_owner ON records(collection, owner_id);
            "#,
        )?;
        Ok(())
    }

    pub fn ensure_initialized(&self) -> Result<()> {
        let tables: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type='table' AND name IN ('kv', 'records')",
            [],
            |row| row.get(0),
        )?;
        if tables < 2 {
            return Err(anyhow!(
                "Database not initialized. Run 'flowjob init' first."
            ));
        }
        Ok(())
    }

    /// Runs `f` inside a savepoint. `Ok` releases it, `Err` rolls every write
    /// made by `f` back. Calls nest.
    pub fn atomic<T, F>(&self, f: F) -> Result<T, ServiceError>
    where
        F: FnOnce() -> Result<T, ServiceError>,
    {
        let depth = self.savepoint_depth.get();
        let name = format!("unit_{depth}");
        self.conn.execute_batch(&format!("SAVEPOINT {name}"))?;
        self.savepoint_depth.set(depth + 1);

        let result = f();
        self.savepoint_depth.set(depth);

        match result {
            Ok(value) => {
                self.conn.execute_batch(&format!("RELEASE {name}"))?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback) = self
                    .conn
                    .execute_batch(&format!("ROLLBACK TO {name}; RELEASE {name}"))
                {
                    error!(error = %rollback, savepoint = %name, "rollback failed");
                }
                Err(err)
            }
        }
    }

    // --- Key-value operations ---

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ServiceError> {
        let raw: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get(0))
            .optional()?;
        match raw {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), ServiceError> {
        let raw = serde_json::to_string(value)?;
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, raw],
        )?;
        debug!(key, "kv set");
        Ok(())
    }

    pub fn remove(&self, key: &str) -> Result<(), ServiceError> {
        self.conn.execute("DELETE FROM kv WHERE key = ?1", [key])?;
        debug!(key, "kv remove");
        Ok(())
    }

    // --- Session cache ---

    pub fn current_user(&self) -> Result<Option<User>, ServiceError> {
        self.get(CURRENT_USER_KEY)
    }

    pub fn set_current_user(&self, user: &User) -> Result<(), ServiceError> {
        self.set(CURRENT_USER_KEY, user)
    }

    pub fn clear_current_user(&self) -> Result<(), ServiceError> {
        self.remove(CURRENT_USER_KEY)
    }

    /// Rewrites the cached session copy, but only if it belongs to `user`.
    pub fn refresh_current_user(&self, user: &User) -> Result<(), ServiceError> {
        match self.current_user()? {
            Some(cached) if cached.id == user.id => self.set_current_user(user),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(id: &str) -> User {
        User {
            id: id.to_string(),
            name: "Test".to_string(),
            email: format!("{id}@example.com"),
            phone: None,
            points: 0,
            created_at: Utc::now(),
            referral_code: "TESABCDE".to_string(),
            referred_by: None,
            first_free_used: false,
            streak: 0,
            last_active_date: Utc::now(),
        }
    }

    fn db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.init().unwrap();
        db
    }

    #[test]
    fn test_ensure_initialized_requires_init() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.ensure_initialized().is_err());
        db.init().unwrap();
        db.init().unwrap();
        assert!(db.ensure_initialized().is_ok());
    }

    #[test]
    fn test_kv_missing_key_is_none() {
        let db = db();
        let value: Option<Vec<String>> = db.get("nothing").unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn test_kv_set_overwrites_and_remove_clears() {
        let db = db();
        db.set("flag", &true).unwrap();
        db.set("flag", &false).unwrap();
        assert_eq!(db.get::<bool>("flag").unwrap(), Some(false));
        db.remove("flag").unwrap();
        assert_eq!(db.get::<bool>("flag").unwrap(), None);
    }

    #[test]
    fn test_refresh_current_user_only_touches_same_id() {
        let db = db();
        let mut alice = user("alice");
        db.set_current_user(&alice).unwrap();

        let mut bob = user("bob");
        bob.points = 9;
        db.refresh_current_user(&bob).unwrap();
        assert_eq!(db.current_user().unwrap().unwrap().id, "alice");

        alice.points = 4;
        db.refresh_current_user(&alice).unwrap();
        assert_eq!(db.current_user().unwrap().unwrap().points, 4);

        db.clear_current_user().unwrap();
        assert!(db.current_user().unwrap().is_none());
    }

    #[test]
    fn test_atomic_rolls_back_on_error() {
        let db = db();
        db.set("count", &1).unwrap();
        let result: Result<(), ServiceError> = db.atomic(|| {
            db.set("count", &2)?;
            Err(ServiceError::Validation("boom".to_string()))
        });
        assert!(result.is_err());
        assert_eq!(db.get::<i64>("count").unwrap(), Some(1));
    }

    #[test]
    fn test_atomic_nested_inner_failure_keeps_outer_writes() {
        let db = db();
        let outcome = db.atomic(|| {
            db.set("outer", &true)?;
            let inner: Result<(), ServiceError> = db.atomic(|| {
                db.set("inner", &true)?;
                Err(ServiceError::NoSession)
            });
            assert!(inner.is_err());
            Ok(())
        });
        assert!(outcome.is_ok());
        assert_eq!(db.get::<bool>("outer").unwrap(), Some(true));
        assert_eq!(db.get::<bool>("inner").unwrap(), None);
    }
}
