//! Static pool keys derived from a descriptor

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use super::layout::{serialize_pubkey, PoolDescriptor};

pub const AMM_AUTHORITY_SEED: &[u8] = b"amm authority";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MintKey {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,
    pub decimals: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VaultKeys {
    #[serde(rename = "A", serialize_with = "serialize_pubkey")]
    pub a: Pubkey,
    #[serde(rename = "B", serialize_with = "serialize_pubkey")]
    pub b: Pubkey,
}

/// Account keys a swap against this pool needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolKeys {
    #[serde(serialize_with = "serialize_pubkey")]
    pub id: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub program_id: Pubkey,
    pub authority: Option<String>,
    pub mint_a: MintKey,
    pub mint_b: MintKey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub mint_lp: Pubkey,
    pub vault: VaultKeys,
    #[serde(serialize_with = "serialize_pubkey")]
    pub open_orders: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub target_orders: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub market_program_id: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub market_id: Pubkey,
}

impl PoolKeys {
    pub fn new(pool_id: Pubkey, program_id: Pubkey, descriptor: &PoolDescriptor) -> Self {
        Self {
            id: pool_id,
            program_id,
            authority: amm_authority(&program_id, descriptor.nonce).map(|key| key.to_string()),
            mint_a: MintKey {
                address: descriptor.base_mint,
                decimals: descriptor.base_decimal,
            },
            mint_b: MintKey {
                address: descriptor.quote_mint,
                decimals: descriptor.quote_decimal,
            },
            mint_lp: descriptor.lp_mint,
            vault: VaultKeys {
                a: descriptor.base_vault,
                b: descriptor.quote_vault,
            },
            open_orders: descriptor.open_orders,
            target_orders: descriptor.target_orders,
            market_program_id: descriptor.market_program_id,
            market_id: descriptor.market_id,
        }
    }
}

/// Program address signing for the pool's vaults, if the stored nonce is valid
pub fn amm_authority(program_id: &Pubkey, nonce: u64) -> Option<Pubkey> {
    let nonce = u8::try_from(nonce).ok()?;
    Pubkey::create_program_address(&[AMM_AUTHORITY_SEED, &[nonce]], program_id).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::pool::layout::sample_descriptor;

    #[test]
    fn test_pool_keys_follow_descriptor() {
        let descriptor = sample_descriptor();
        let pool_id = Pubkey::new_unique();
        let program_id = Pubkey::new_unique();

        let keys = PoolKeys::new(pool_id, program_id, &descriptor);
        assert_eq!(keys.vault.a, descriptor.base_vault);
        assert_eq!(keys.vault.b, descriptor.quote_vault);
        assert_eq!(keys.mint_a.decimals, 9);

        let json = serde_json::to_value(&keys).unwrap();
        assert_eq!(json["id"], pool_id.to_string());
        assert_eq!(json["vault"]["A"], descriptor.base_vault.to_string());
        assert_eq!(json["marketId"], descriptor.market_id.to_string());
    }

    #[test]
    fn test_amm_authority_matches_canonical_bump() {
        let program_id = Pubkey::new_unique();
        let (expected, bump) = Pubkey::find_program_address(&[AMM_AUTHORITY_SEED], &program_id);
        assert_eq!(amm_authority(&program_id, bump as u64), Some(expected));
        assert_eq!(amm_authority(&program_id, 300), None);
    }
}
