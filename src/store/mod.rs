//! SQLite persistence for rooms, messages, accounts and roles.

mod accounts;
mod messages;
mod rooms;

use std::str::FromStr;

use argon2::{
    Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version,
    password_hash::{SaltString, rand_core::OsRng},
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use thiserror::Error;
use uuid::Uuid;

use crate::{config::PasswordCost, include_res};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Invalid(String),
    #[error("A user with this email address has already been registered")]
    AlreadyRegistered,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
    hasher: Argon2<'static>,
}

impl Store {
    pub async fn connect(url: &str, cost: PasswordCost) -> StoreResult<Store> {
        let options = SqliteConnectOptions::from_str(url)?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(16)
            .connect_with(options)
            .await?;
        Store::with_pool(pool, cost).await
    }

    /// A private in-memory database. Single connection, kept alive for the
    /// lifetime of the pool, since every sqlite memory connection is its own
    /// database.
    pub async fn in_memory(cost: PasswordCost) -> StoreResult<Store> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Store::with_pool(pool, cost).await
    }

    async fn with_pool(pool: SqlitePool, cost: PasswordCost) -> StoreResult<Store> {
        let params = Params::new(cost.memory_kib, cost.iterations, cost.parallelism, None)
            .map_err(|e| StoreError::Hash(e.to_string()))?;
        let store = Store {
            pool,
            hasher: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        };
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(include_res!(str, "/schema.sql"))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn hash_password(&self, password: String) -> StoreResult<String> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            hasher
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| StoreError::Hash(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Hash(e.to_string()))?
    }

    async fn check_password(&self, hash: String, password: String) -> StoreResult<bool> {
        let hasher = self.hasher.clone();
        tokio::task::spawn_blocking(move || {
            let Ok(parsed) = PasswordHash::new(&hash) else {
                return Err(StoreError::Corrupt("unparseable password hash".to_owned()));
            };
            Ok(hasher.verify_password(password.as_bytes(), &parsed).is_ok())
        })
        .await
        .map_err(|e| StoreError::Hash(e.to_string()))?
    }
}

fn parse_id(raw: &str) -> StoreResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| StoreError::Corrupt(format!("bad id {raw}: {e}")))
}

#[cfg(test)]
pub(crate) async fn test_store() -> Store {
    Store::in_memory(PasswordCost {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    })
    .await
    .unwrap()
}
