//! Fee domain - cached Jito tip statistic and tip account

mod poller;

pub use poller::{FeePoller, PollerIntervals};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;
use crate::shared::errors::ServiceError;

/// Tip-floor statistic used to price a bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TipPercentile {
    #[serde(rename = "landed_tips_25th_percentile")]
    Landed25th,
    #[serde(rename = "landed_tips_50th_percentile")]
    Landed50th,
    #[serde(rename = "landed_tips_75th_percentile")]
    Landed75th,
    #[serde(rename = "landed_tips_95th_percentile")]
    Landed95th,
    #[serde(rename = "landed_tips_99th_percentile")]
    Landed99th,
    #[default]
    #[serde(rename = "ema_landed_tips_50th_percentile")]
    Ema50th,
}

impl TipPercentile {
    pub const ALL: [TipPercentile; 6] = [
        TipPercentile::Landed25th,
        TipPercentile::Landed50th,
        TipPercentile::Landed75th,
        TipPercentile::Landed95th,
        TipPercentile::Landed99th,
        TipPercentile::Ema50th,
    ];

    /// Field name in the tip-floor response
    pub fn as_str(&self) -> &'static str {
        match self {
            TipPercentile::Landed25th => "landed_tips_25th_percentile",
            TipPercentile::Landed50th => "landed_tips_50th_percentile",
            TipPercentile::Landed75th => "landed_tips_75th_percentile",
            TipPercentile::Landed95th => "landed_tips_95th_percentile",
            TipPercentile::Landed99th => "landed_tips_99th_percentile",
            TipPercentile::Ema50th => "ema_landed_tips_50th_percentile",
        }
    }
}

impl fmt::Display for TipPercentile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TipPercentile {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TipPercentile::ALL
            .into_iter()
            .find(|tick| tick.as_str() == s)
            .ok_or_else(|| ServiceError::InvalidRequest(format!("unknown tip tick: {}", s)))
    }
}

/// Snapshot of the cached fee market values
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeStatistic {
    pub tip_lamports: u64,
    pub tip_account: Pubkey,
}

/// External source for tip statistics and tip accounts
#[async_trait]
pub trait TipSource: Send + Sync {
    /// Current tip floor for `tick`, in lamports
    async fn tip_lamports(&self, tick: TipPercentile) -> Result<u64, ServiceError>;

    /// One tip account picked at random from the block engine's list
    async fn random_tip_account(&self) -> Result<Pubkey, ServiceError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tip_percentile_names() {
        assert_eq!(TipPercentile::default(), TipPercentile::Ema50th);
        for tick in TipPercentile::ALL {
            assert_eq!(tick.as_str().parse::<TipPercentile>().unwrap(), tick);
            let json = serde_json::to_string(&tick).unwrap();
            assert_eq!(json, format!("\"{}\"", tick.as_str()));
        }
        assert!("landed_tips_10th_percentile".parse::<TipPercentile>().is_err());
    }
}
