use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::domain::fee::TipPercentile;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RpcCfg {
    pub url: Option<String>,
    pub ws_url: Option<String>,
    pub commitment: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCfg {
    pub bind: Option<String>,
    /// Bearer tokens are base64 of this; defaults to the RPC url
    pub auth_secret: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JitoCfg {
    pub tip_floor_url: Option<String>,
    pub block_engine_url: Option<String>,
    pub uuid: Option<String>,
    pub default_tick: Option<TipPercentile>,
    pub tip_refresh_secs: Option<u64>,
    pub account_refresh_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RaydiumCfg {
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DatabaseCfg {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PoolCfg {
    /// Tracked from startup when set
    pub pool_id: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rpc: RpcCfg,
    pub server: ServerCfg,
    pub jito: JitoCfg,
    pub raydium: RaydiumCfg,
    pub database: DatabaseCfg,
    pub pool: PoolCfg,
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())
            .with_context(|| format!("read {}", path.as_ref().display()))?;
        Self::from_toml(&s)
    }

    pub fn from_toml(s: &str) -> Result<Self> {
        toml::from_str(s).context("parse Config.toml")
    }
}
