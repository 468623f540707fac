//! Solana RPC and pubsub access

pub mod account_stream;
pub mod rpc_client;

pub use account_stream::PubsubNotifier;
pub use rpc_client::RpcPoolSource;
