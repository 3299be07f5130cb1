use rand::Rng;
use rusqlite::{params, OptionalExtension};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::auth::Session;
use crate::db::{Database, CURRENT_USER_KEY, SAMPLE_DATA_INITIALIZED_KEY, SAMPLE_JOBS_KEY};
use crate::error::{ServiceError, ServiceResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Users,
    Credentials,
    Cvs,
    CoverLetters,
    InterviewPreps,
    JobApplications,
    Referrals,
    Notifications,
    Transactions,
}

impl Collection {
    /// Collections that make up the exported state layout.
    pub const EXPORTED: [Collection; 8] = [
        Collection::Users,
        Collection::Cvs,
        Collection::CoverLetters,
        Collection::InterviewPreps,
        Collection::JobApplications,
        Collection::Referrals,
        Collection::Notifications,
        Collection::Transactions,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Credentials => "credentials",
            Collection::Cvs => "cvs",
            Collection::CoverLetters => "coverLetters",
            Collection::InterviewPreps => "interviewPreps",
            Collection::JobApplications => "jobApplications",
            Collection::Referrals => "referrals",
            Collection::Notifications => "notifications",
            Collection::Transactions => "transactions",
        }
    }
}

/// A JSON document stored in one named collection.
pub trait Record: Serialize + DeserializeOwned {
    const COLLECTION: Collection;

    fn id(&self) -> &str;

    fn owner_id(&self) -> Option<&str> {
        None
    }
}

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Random lowercase base-36 string of `len` characters.
pub fn random_base36(len: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..len)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect()
}

pub fn generate_id() -> String {
    random_base36(9)
}

impl Database {
    pub fn add_item<T: Record>(&self, item: T) -> ServiceResult<T> {
        let body = serde_json::to_string(&item)?;
        self.conn.execute(
            "INSERT INTO records (collection, id, owner_id, body) VALUES (?1, ?2, ?3, ?4)",
            params![T::COLLECTION.as_str(), item.id(), item.owner_id(), body],
        )?;
        debug!(collection = T::COLLECTION.as_str(), id = item.id(), "record added");
        Ok(item)
    }

    pub fn get_item<T: Record>(&self, id: &str) -> ServiceResult<Option<T>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE collection = ?1 AND id = ?2",
                params![T::COLLECTION.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str(&b)).transpose().map_err(Into::into)
    }

    /// Replaces a stored record wholesale. Returns false if `item`'s id is unknown.
    pub fn put_item<T: Record>(&self, item: &T) -> ServiceResult<bool> {
        let body = serde_json::to_string(item)?;
        let changed = self.conn.execute(
            "UPDATE records SET owner_id = ?3, body = ?4 WHERE collection = ?1 AND id = ?2",
            params![T::COLLECTION.as_str(), item.id(), item.owner_id(), body],
        )?;
        debug!(collection = T::COLLECTION.as_str(), id = item.id(), "record replaced");
        Ok(changed > 0)
    }

    /// Shallow-merges the fields of `patch` (a JSON object) into the stored
    /// record. `null` fields clear the key.
    pub fn update_item<T: Record>(&self, id: &str, patch: Value) -> ServiceResult<Option<T>> {
        let Value::Object(patch) = patch else {
            return Err(ServiceError::Validation(
                "update patch must be a JSON object".to_string(),
            ));
        };
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records WHERE collection = ?1 AND id = ?2",
                params![T::COLLECTION.as_str(), id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(body) = body else {
            return Ok(None);
        };

        let mut current: Map<String, Value> = serde_json::from_str(&body)?;
        for (key, value) in patch {
            if value.is_null() {
                current.remove(&key);
            } else {
                current.insert(key, value);
            }
        }
        let merged: T = serde_json::from_value(Value::Object(current))?;
        self.put_item(&merged)?;
        Ok(Some(merged))
    }

    pub fn delete_item<T: Record>(&self, id: &str) -> ServiceResult<bool> {
        let removed = self.conn.execute(
            "DELETE FROM records WHERE collection = ?1 AND id = ?2",
            params![T::COLLECTION.as_str(), id],
        )?;
        Ok(removed > 0)
    }

    /// The record `id`, provided the session user owns it.
    pub fn owned_item<T: Record>(&self, session: &Session, id: &str) -> ServiceResult<T> {
        match self.get_item::<T>(id)? {
            Some(item) if item.owner_id() == Some(session.user_id.as_str()) => Ok(item),
            _ => Err(ServiceError::not_found(T::COLLECTION, id)),
        }
    }

    /// Records owned by `owner_id`, most recently inserted first.
    pub fn items_owned_by<T: Record>(&self, owner_id: &str) -> ServiceResult<Vec<T>> {
        let mut stmt = self.conn.prepare(
            "SELECT body FROM records WHERE collection = ?1 AND owner_id = ?2 ORDER BY seq DESC",
        )?;
        let rows = stmt.query_map(params![T::COLLECTION.as_str(), owner_id], |row| {
            row.get::<_, String>(0)
        })?;
        decode_rows(rows)
    }

    /// Records owned by the session user; empty without a session.
    pub fn user_items<T: Record>(&self, session: Option<&Session>) -> ServiceResult<Vec<T>> {
        match session {
            Some(session) => self.items_owned_by(&session.user_id),
            None => Ok(Vec::new()),
        }
    }

    /// Every record of the collection in insertion order.
    pub fn all_items<T: Record>(&self) -> ServiceResult<Vec<T>> {
        let mut stmt = self
            .conn
            .prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY seq")?;
        let rows = stmt.query_map([T::COLLECTION.as_str()], |row| row.get::<_, String>(0))?;
        decode_rows(rows)
    }

    /// First record whose top-level string `field` equals `value` exactly.
    pub fn find_item_by<T: Record>(&self, field: &str, value: &str) -> ServiceResult<Option<T>> {
        let body: Option<String> = self
            .conn
            .query_row(
                "SELECT body FROM records
                 WHERE collection = ?1 AND json_extract(body, ?2) = ?3
                 ORDER BY seq LIMIT 1",
                params![T::COLLECTION.as_str(), format!("$.{field}"), value],
                |row| row.get(0),
            )
            .optional()?;
        body.map(|b| serde_json::from_str(&b)).transpose().map_err(Into::into)
    }

    pub fn count_items<T: Record>(&self) -> ServiceResult<usize> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM records WHERE collection = ?1",
            [T::COLLECTION.as_str()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }

    /// The whole persisted state, one root key per collection plus the kv
    /// entries. Credentials are left out.
    pub fn snapshot(&self) -> ServiceResult<Value> {
        let mut root = Map::new();
        let current: Option<Value> = self.get(CURRENT_USER_KEY)?;
        root.insert(CURRENT_USER_KEY.to_string(), current.unwrap_or(Value::Null));

        let mut stmt = self
            .conn
            .prepare("SELECT body FROM records WHERE collection = ?1 ORDER BY seq")?;
        for collection in Collection::EXPORTED {
            let rows = stmt.query_map([collection.as_str()], |row| row.get::<_, String>(0))?;
            let items = decode_rows::<Value>(rows)?;
            root.insert(collection.as_str().to_string(), Value::Array(items));
        }

        let jobs: Option<Value> = self.get(SAMPLE_JOBS_KEY)?;
        root.insert(
            SAMPLE_JOBS_KEY.to_string(),
            jobs.unwrap_or_else(|| Value::Array(Vec::new())),
        );
        let initialized: Option<bool> = self.get(SAMPLE_DATA_INITIALIZED_KEY)?;
        root.insert(
            SAMPLE_DATA_INITIALIZED_KEY.to_string(),
            Value::Bool(initialized.unwrap_or(false)),
        );
        Ok(Value::Object(root))
    }
}

fn decode_rows<T: DeserializeOwned>(
    rows: impl Iterator<Item = rusqlite::Result<String>>,
) -> ServiceResult<Vec<T>> {
    let mut items = Vec::new();
    for body in rows {
        items.push(serde_json::from_str(&body?)?);
    }
    Ok(items)
}
