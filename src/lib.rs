//! Dataserver - live pool reserves, Jito tips and wallet lookup over HTTP

pub mod app;
pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use domain::fee::FeePoller;
pub use domain::pool::TrackerHandle;
pub use domain::wallet::WalletCache;
