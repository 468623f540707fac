//! Infrastructure layer - chain access, third-party APIs and storage

pub mod api_clients;
pub mod blockchain;
pub mod storage;
