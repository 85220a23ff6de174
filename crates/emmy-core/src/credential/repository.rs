//! Credential storage repository.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError};

use emmy_oauth::Token;
use sqlx::Row;
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, warn};

use crate::{Error, Result};

type KeyLocks = Arc<std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Durable mapping from account email to its `OAuth2` credential.
///
/// Cloning is cheap; clones share the pool and the per-account locks, so
/// concurrent writes for one account are serialized and a read never sees
/// a half-written record.
///
/// A lock entry only lives while some operation on that account is in
/// flight.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    pool: SqlitePool,
    locks: KeyLocks,
}

/// Holds one account's lock and removes its map entry on release when no
/// other operation is waiting for it.
struct KeyGuard {
    locks: KeyLocks,
    identity: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        drop(self.guard.take());
        if locks
            .get(&self.identity)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.identity);
        }
    }
}

impl CredentialStore {
    /// Open (or create) the store at the given database path.
    ///
    /// Creates the database and tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn new(database_path: &str) -> Result<Self> {
        let url = format!("sqlite:{database_path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Self::from_pool(pool).await
    }

    /// Create an in-memory store for testing.
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails or schema creation fails.
    pub async fn in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;

        Self::from_pool(pool).await
    }

    /// Wrap an existing pool, creating the schema if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if schema creation fails.
    pub async fn from_pool(pool: SqlitePool) -> Result<Self> {
        let store = Self {
            pool,
            locks: Arc::default(),
        };
        store.initialize().await?;
        Ok(store)
    }

    async fn initialize(&self) -> Result<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS credentials (
                email TEXT PRIMARY KEY,
                token TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn lock_identity(&self, identity: &str) -> KeyGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(identity.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        KeyGuard {
            locks: Arc::clone(&self.locks),
            identity: identity.to_string(),
            guard: Some(guard),
        }
    }

    /// Store the credential for an account, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential cannot be encoded or written.
    pub async fn put(&self, identity: &str, token: &Token) -> Result<()> {
        let blob = serde_json::to_string(token)?;
        let _guard = self.lock_identity(identity).await;

        sqlx::query(
            r"
            INSERT INTO credentials (email, token)
            VALUES (?, ?)
            ON CONFLICT(email) DO UPDATE SET token = excluded.token
            ",
        )
        .bind(identity)
        .bind(&blob)
        .execute(&self.pool)
        .await?;

        debug!(identity, "stored credential");
        Ok(())
    }

    /// Fetch the credential for an account.
    ///
    /// Returns `Ok(None)` when no record exists.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptCredential`] if the stored blob does not
    /// decode, or a database error.
    pub async fn get(&self, identity: &str) -> Result<Option<Token>> {
        let _guard = self.lock_identity(identity).await;

        let row = sqlx::query("SELECT token FROM credentials WHERE email = ?")
            .bind(identity)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| decode_token(identity, row.get("token")))
            .transpose()
    }

    /// Delete the credential for an account.
    ///
    /// Deleting an account with no record is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn delete(&self, identity: &str) -> Result<()> {
        let _guard = self.lock_identity(identity).await;

        let result = sqlx::query("DELETE FROM credentials WHERE email = ?")
            .bind(identity)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            debug!(identity, "no credential to delete");
        } else {
            debug!(identity, "deleted credential");
        }
        Ok(())
    }

    /// Return some stored account and its credential, if any.
    ///
    /// With several accounts stored the lowest email address wins, so the
    /// answer is stable across calls.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptCredential`] if the chosen blob does not
    /// decode, or a database error.
    pub async fn get_any(&self) -> Result<Option<(String, Token)>> {
        let row = sqlx::query("SELECT email, token FROM credentials ORDER BY email ASC LIMIT 1")
            .fetch_optional(&self.pool)
            .await?;

        row.map(|row| {
            let identity: String = row.get("email");
            let token = decode_token(&identity, row.get("token"))?;
            Ok((identity, token))
        })
        .transpose()
    }
}

fn decode_token(identity: &str, blob: &str) -> Result<Token> {
    serde_json::from_str(blob).map_err(|source| {
        warn!(identity, error = %source, "stored credential does not decode");
        Error::CorruptCredential {
            identity: identity.to_string(),
            source,
        }
    })
}
