use std::time::Duration;

use crate::premium::TimestampUnit;

const DEFAULT_NODE_URL: &str = "https://rpc.testnet.near.org";
const DEFAULT_WALLET_URL: &str = "https://wallet.testnet.near.org";
const DEFAULT_NETWORK_ID: &str = "testnet";
const DEFAULT_STREAMING_CONTRACT: &str = "streaming-r-v2.dcversus.testnet";
const DEFAULT_FINANCE_CONTRACT: &str = "finance-r-v2.dcversus.testnet";
const DEFAULT_WNEAR_CONTRACT: &str = "wnear.testnet";

/// Network constants and tunables for the bridge.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    pub node_url: String,
    pub wallet_url: String,
    pub network_id: String,
    pub streaming_contract: String,
    pub finance_contract: String,
    pub wnear_contract: String,
    /// Account that premium streams must pay into.
    pub premium_receiver: String,
    pub timestamp_unit: TimestampUnit,
    pub request_timeout: Duration,
    pub event_queue_capacity: usize,
    pub page_limit: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl NetworkConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from an arbitrary key lookup. Missing or unparseable
    /// values fall back to the testnet defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |key: &str, default: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let node_url = set("NEAR_NODE_URL")
            .or_else(|| set("NEAR_RPC_URL"))
            .or_else(|| set("RPC_URL"))
            .unwrap_or_else(|| DEFAULT_NODE_URL.to_string());

        let finance_contract = text("FINANCE_CONTRACT", DEFAULT_FINANCE_CONTRACT);
        let premium_receiver = text("PREMIUM_RECEIVER", &finance_contract);

        let timestamp_unit = lookup("STREAM_TIMESTAMP_UNIT")
            .and_then(|v| v.parse().ok())
            .unwrap_or(TimestampUnit::Nanos);
        let request_timeout_ms: u64 = lookup("RPC_TIMEOUT_MS")
            .and_then(|v| v.parse().ok())
            .unwrap_or(10_000);
        let event_queue_capacity: usize = lookup("EVENT_QUEUE_CAPACITY")
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(256);
        let page_limit: u32 = lookup("STREAM_PAGE_LIMIT")
            .and_then(|v| v.parse().ok())
            .filter(|v| *v > 0)
            .unwrap_or(100);

        Self {
            node_url,
            wallet_url: text("NEAR_WALLET_URL", DEFAULT_WALLET_URL),
            network_id: text("NEAR_NETWORK_ID", DEFAULT_NETWORK_ID),
            streaming_contract: text("ROKETO_CONTRACT", DEFAULT_STREAMING_CONTRACT),
            finance_contract,
            wnear_contract: text("WNEAR_CONTRACT", DEFAULT_WNEAR_CONTRACT),
            premium_receiver,
            timestamp_unit,
            request_timeout: Duration::from_millis(request_timeout_ms),
            event_queue_capacity,
            page_limit,
        }
    }
}
