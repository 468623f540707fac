//! Domain layer - reserve tracking, fee caching and wallet lookup

pub mod fee;
pub mod pool;
pub mod wallet;
