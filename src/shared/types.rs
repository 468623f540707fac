//! Common types used across the application

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::fmt;

/// Opaque handle for one live account subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub#{}", self.0)
    }
}

/// The three accounts the reserve tracker watches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchedAccount {
    BaseVault,
    QuoteVault,
    Pool,
}

impl WatchedAccount {
    pub fn as_str(&self) -> &'static str {
        match self {
            WatchedAccount::BaseVault => "base vault",
            WatchedAccount::QuoteVault => "quote vault",
            WatchedAccount::Pool => "pool",
        }
    }
}

/// A pushed account change, tagged with the subscription that produced it
#[derive(Debug, Clone)]
pub struct AccountNotification {
    pub subscription: SubscriptionId,
    pub account: Pubkey,
    pub slot: u64,
    pub data: Vec<u8>,
}

/// Everything a subscription reports to its sink
#[derive(Debug, Clone)]
pub enum AccountEvent {
    Changed(AccountNotification),
    /// The server ended the stream; nothing more arrives under this id
    Closed {
        subscription: SubscriptionId,
        account: Pubkey,
    },
}
