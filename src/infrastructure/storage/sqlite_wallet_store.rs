use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::domain::wallet::{Wallet, WalletStore};
use crate::shared::errors::ServiceError;

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS wallet (
        id          INTEGER PRIMARY KEY AUTOINCREMENT,
        address     TEXT UNIQUE NOT NULL,
        mnemonic    TEXT NOT NULL,
        user        TEXT,
        created_at  TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
        closed_at   TIMESTAMP DEFAULT NULL
    );

    CREATE INDEX IF NOT EXISTS idx_wallet_user ON wallet(user);
"#;

/// Wallet records in a local SQLite database
pub struct SqliteWalletStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteWalletStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ServiceError> {
        let conn = Connection::open(path.as_ref())?;
        conn.pragma_update(None, "journal_mode", "WAL").ok();
        info!("🗄️ wallet store at {}", path.as_ref().display());
        Self::with_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, ServiceError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, ServiceError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Marks a wallet closed; it disappears from `list_open`
    pub async fn close(&self, address: &str) -> Result<bool, ServiceError> {
        let conn = self.conn.lock().await;
        let rows = conn.execute(
            "UPDATE wallet SET closed_at = CURRENT_TIMESTAMP WHERE address = ?1 AND closed_at IS NULL",
            params![address],
        )?;
        Ok(rows > 0)
    }
}

#[async_trait]
impl WalletStore for SqliteWalletStore {
    async fn list_open(&self, user: &str) -> Result<Vec<Wallet>, ServiceError> {
        let conn = self.conn.lock().await;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, address, mnemonic, created_at
            FROM wallet
            WHERE user = ?1
              AND closed_at IS NULL
            ORDER BY created_at DESC, id DESC
        "#,
        )?;
        let rows = stmt.query_map(params![user], |row| {
            Ok(Wallet {
                id: row.get(0)?,
                address: row.get(1)?,
                mnemonic: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        let mut out = Vec::new();
        for wallet in rows {
            out.push(wallet?);
        }
        Ok(out)
    }

    async fn insert(&self, user: &str, address: &str, mnemonic: &str) -> Result<i64, ServiceError> {
        let conn = self.conn.lock().await;
        conn.execute(
            "INSERT INTO wallet (address, mnemonic, user) VALUES (?1, ?2, ?3)",
            params![address, mnemonic, user],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_list_open_filters_and_orders() {
        let store = SqliteWalletStore::open_in_memory().unwrap();
        store.insert("alice", "addr1", "one").await.unwrap();
        store.insert("bob", "addr2", "two").await.unwrap();
        store.insert("alice", "addr3", "three").await.unwrap();
        store.insert("alice", "addr4", "four").await.unwrap();
        assert!(store.close("addr3").await.unwrap());

        let wallets = store.list_open("alice").await.unwrap();
        let addresses: Vec<&str> = wallets.iter().map(|w| w.address.as_str()).collect();
        // Same-second inserts fall back to id order
        assert_eq!(addresses, vec!["addr4", "addr1"]);
        assert_eq!(wallets[1].mnemonic, "one");
        assert!(!wallets[0].created_at.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_address_is_storage_error() {
        let store = SqliteWalletStore::open_in_memory().unwrap();
        store.insert("alice", "addr1", "one").await.unwrap();
        let err = store.insert("bob", "addr1", "again").await.unwrap_err();
        assert!(matches!(err, ServiceError::Storage(_)));
    }

    #[tokio::test]
    async fn test_unknown_user_is_empty() {
        let store = SqliteWalletStore::open_in_memory().unwrap();
        assert!(store.list_open("nobody").await.unwrap().is_empty());
        assert!(!store.close("missing").await.unwrap());
    }
}
