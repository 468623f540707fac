//! Fixed binary layouts for the pool descriptor and vault token accounts
//!
//! All integers are little-endian. Offsets follow the AMM v4 liquidity state
//! and the SPL token account layout.

use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use crate::shared::errors::LayoutError;

/// Size of the AMM v4 liquidity state account
pub const POOL_DESCRIPTOR_LEN: usize = 752;

/// Size of an SPL token account without extensions
pub const TOKEN_ACCOUNT_LEN: usize = 165;

const STATUS: usize = 0;
const NONCE: usize = 8;
const BASE_DECIMAL: usize = 32;
const QUOTE_DECIMAL: usize = 40;
const STATE: usize = 48;
const TRADE_FEE_NUMERATOR: usize = 144;
const TRADE_FEE_DENOMINATOR: usize = 152;
const SWAP_FEE_NUMERATOR: usize = 176;
const SWAP_FEE_DENOMINATOR: usize = 184;
const BASE_NEED_TAKE_PNL: usize = 192;
const QUOTE_NEED_TAKE_PNL: usize = 200;
const POOL_OPEN_TIME: usize = 224;
const BASE_VAULT: usize = 336;
const QUOTE_VAULT: usize = 368;
const BASE_MINT: usize = 400;
const QUOTE_MINT: usize = 432;
const LP_MINT: usize = 464;
const OPEN_ORDERS: usize = 496;
const MARKET_ID: usize = 528;
const MARKET_PROGRAM_ID: usize = 560;
const TARGET_ORDERS: usize = 592;
const OWNER: usize = 688;
const LP_RESERVE: usize = 720;

const TOKEN_MINT: usize = 0;
const TOKEN_OWNER: usize = 32;
const TOKEN_AMOUNT: usize = 64;
const TOKEN_STATE: usize = 108;

/// Decoded pool descriptor (the subset of the liquidity state we consume)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolDescriptor {
    pub status: u64,
    pub nonce: u64,
    pub base_decimal: u64,
    pub quote_decimal: u64,
    pub state: u64,
    pub trade_fee_numerator: u64,
    pub trade_fee_denominator: u64,
    pub swap_fee_numerator: u64,
    pub swap_fee_denominator: u64,
    pub base_need_take_pnl: u64,
    pub quote_need_take_pnl: u64,
    pub pool_open_time: u64,
    #[serde(serialize_with = "serialize_pubkey")]
    pub base_vault: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub quote_vault: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub base_mint: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub quote_mint: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub lp_mint: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub open_orders: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub market_id: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub market_program_id: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub target_orders: Pubkey,
    #[serde(serialize_with = "serialize_pubkey")]
    pub owner: Pubkey,
    pub lp_reserve: u64,
}

impl PoolDescriptor {
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() < POOL_DESCRIPTOR_LEN {
            return Err(LayoutError::TooShort {
                kind: "pool",
                len: data.len(),
                expected: POOL_DESCRIPTOR_LEN,
            });
        }

        Ok(Self {
            status: read_u64(data, STATUS),
            nonce: read_u64(data, NONCE),
            base_decimal: read_u64(data, BASE_DECIMAL),
            quote_decimal: read_u64(data, QUOTE_DECIMAL),
            state: read_u64(data, STATE),
            trade_fee_numerator: read_u64(data, TRADE_FEE_NUMERATOR),
            trade_fee_denominator: read_u64(data, TRADE_FEE_DENOMINATOR),
            swap_fee_numerator: read_u64(data, SWAP_FEE_NUMERATOR),
            swap_fee_denominator: read_u64(data, SWAP_FEE_DENOMINATOR),
            base_need_take_pnl: read_u64(data, BASE_NEED_TAKE_PNL),
            quote_need_take_pnl: read_u64(data, QUOTE_NEED_TAKE_PNL),
            pool_open_time: read_u64(data, POOL_OPEN_TIME),
            base_vault: read_pubkey(data, BASE_VAULT),
            quote_vault: read_pubkey(data, QUOTE_VAULT),
            base_mint: read_pubkey(data, BASE_MINT),
            quote_mint: read_pubkey(data, QUOTE_MINT),
            lp_mint: read_pubkey(data, LP_MINT),
            open_orders: read_pubkey(data, OPEN_ORDERS),
            market_id: read_pubkey(data, MARKET_ID),
            market_program_id: read_pubkey(data, MARKET_PROGRAM_ID),
            target_orders: read_pubkey(data, TARGET_ORDERS),
            owner: read_pubkey(data, OWNER),
            lp_reserve: read_u64(data, LP_RESERVE),
        })
    }

    /// Writes the descriptor back into a zeroed liquidity state buffer
    #[cfg(test)]
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; POOL_DESCRIPTOR_LEN];
        let words = [
            (STATUS, self.status),
            (NONCE, self.nonce),
            (BASE_DECIMAL, self.base_decimal),
            (QUOTE_DECIMAL, self.quote_decimal),
            (STATE, self.state),
            (TRADE_FEE_NUMERATOR, self.trade_fee_numerator),
            (TRADE_FEE_DENOMINATOR, self.trade_fee_denominator),
            (SWAP_FEE_NUMERATOR, self.swap_fee_numerator),
            (SWAP_FEE_DENOMINATOR, self.swap_fee_denominator),
            (BASE_NEED_TAKE_PNL, self.base_need_take_pnl),
            (QUOTE_NEED_TAKE_PNL, self.quote_need_take_pnl),
            (POOL_OPEN_TIME, self.pool_open_time),
            (LP_RESERVE, self.lp_reserve),
        ];
        for (offset, value) in words {
            data[offset..offset + 8].copy_from_slice(&value.to_le_bytes());
        }
        let keys = [
            (BASE_VAULT, self.base_vault),
            (QUOTE_VAULT, self.quote_vault),
            (BASE_MINT, self.base_mint),
            (QUOTE_MINT, self.quote_mint),
            (LP_MINT, self.lp_mint),
            (OPEN_ORDERS, self.open_orders),
            (MARKET_ID, self.market_id),
            (MARKET_PROGRAM_ID, self.market_program_id),
            (TARGET_ORDERS, self.target_orders),
            (OWNER, self.owner),
        ];
        for (offset, key) in keys {
            data[offset..offset + 32].copy_from_slice(key.as_ref());
        }
        data
    }
}

/// Decoded vault token account
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VaultAccount {
    pub mint: Pubkey,
    pub owner: Pubkey,
    pub amount: u64,
}

impl VaultAccount {
    pub fn decode(data: &[u8]) -> Result<Self, LayoutError> {
        if data.len() < TOKEN_ACCOUNT_LEN {
            return Err(LayoutError::TooShort {
                kind: "token",
                len: data.len(),
                expected: TOKEN_ACCOUNT_LEN,
            });
        }
        if data[TOKEN_STATE] == 0 {
            return Err(LayoutError::UninitializedTokenAccount);
        }

        Ok(Self {
            mint: read_pubkey(data, TOKEN_MINT),
            owner: read_pubkey(data, TOKEN_OWNER),
            amount: read_u64(data, TOKEN_AMOUNT),
        })
    }

    #[cfg(test)]
    pub fn encode(&self) -> Vec<u8> {
        let mut data = vec![0u8; TOKEN_ACCOUNT_LEN];
        data[TOKEN_MINT..TOKEN_MINT + 32].copy_from_slice(self.mint.as_ref());
        data[TOKEN_OWNER..TOKEN_OWNER + 32].copy_from_slice(self.owner.as_ref());
        data[TOKEN_AMOUNT..TOKEN_AMOUNT + 8].copy_from_slice(&self.amount.to_le_bytes());
        data[TOKEN_STATE] = 1;
        data
    }
}

// Callers check the buffer length against the layout size first.
fn read_u64(data: &[u8], offset: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&data[offset..offset + 8]);
    u64::from_le_bytes(bytes)
}

fn read_pubkey(data: &[u8], offset: usize) -> Pubkey {
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&data[offset..offset + 32]);
    Pubkey::new_from_array(bytes)
}

pub(crate) fn serialize_pubkey<S: serde::Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

#[cfg(test)]
pub(crate) fn sample_descriptor() -> PoolDescriptor {
    PoolDescriptor {
        status: 6,
        nonce: 254,
        base_decimal: 9,
        quote_decimal: 6,
        state: 1,
        trade_fee_numerator: 25,
        trade_fee_denominator: 10_000,
        swap_fee_numerator: 25,
        swap_fee_denominator: 10_000,
        base_need_take_pnl: 10,
        quote_need_take_pnl: 20,
        pool_open_time: 1_700_000_000,
        base_vault: Pubkey::new_unique(),
        quote_vault: Pubkey::new_unique(),
        base_mint: Pubkey::new_unique(),
        quote_mint: Pubkey::new_unique(),
        lp_mint: Pubkey::new_unique(),
        open_orders: Pubkey::new_unique(),
        market_id: Pubkey::new_unique(),
        market_program_id: Pubkey::new_unique(),
        target_orders: Pubkey::new_unique(),
        owner: Pubkey::new_unique(),
        lp_reserve: 42,
    }
}
