use base64::{engine::general_purpose::STANDARD, Engine};

pub const LAMPORTS_PER_SOL: f64 = 1_000_000_000.0;

/// Bearer token expected on every request: base64 of the configured secret
pub fn bearer_token(secret: &str) -> String {
    STANDARD.encode(secret.as_bytes())
}

/// Converts a SOL amount to lamports, rounding up
pub fn sol_to_lamports(sol: f64) -> u64 {
    (sol * LAMPORTS_PER_SOL).ceil() as u64
}

/// Derives the pubsub endpoint from an RPC endpoint
pub fn websocket_url(rpc_url: &str) -> String {
    if let Some(rest) = rpc_url.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = rpc_url.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        rpc_url.to_string()
    }
}
