//! Persistent stores

pub mod sqlite_wallet_store;

pub use sqlite_wallet_store::SqliteWalletStore;
