//! HTTP clients for third-party REST and JSON-RPC endpoints

pub mod jito_client;
pub mod raydium_api_client;

pub use jito_client::JitoClient;
pub use raydium_api_client::RaydiumApiClient;
