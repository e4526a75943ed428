use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::metrics::set_last_stream_count;
use crate::premium::TimestampUnit;
use crate::rpc::RpcClient;
use crate::stream::Stream;

/// Source of the outgoing streams of an account, read through the session's
/// node client.
#[async_trait]
pub trait StreamLedger: Send + Sync {
    async fn outgoing_streams(&self, client: &RpcClient, account_id: &str) -> Result<Vec<Stream>>;
}

/// Reads streams from the Roketo streaming contract.
#[derive(Debug, Clone)]
pub struct RoketoLedger {
    contract: String,
    page_limit: u32,
    unit: TimestampUnit,
}

impl RoketoLedger {
    pub fn new(contract: impl Into<String>, page_limit: u32, unit: TimestampUnit) -> Self {
        Self {
            contract: contract.into(),
            page_limit: page_limit.max(1),
            unit,
        }
    }

    async fn page(&self, client: &RpcClient, account_id: &str, from: u32) -> Result<Vec<Stream>> {
        let args = json!({
            "account_id": account_id,
            "from": from,
            "limit": self.page_limit,
        });
        let raw = client
            .view_call(&self.contract, "get_account_outgoing_streams", &args)
            .await?;
        serde_json::from_value(raw).context("decode outgoing streams")
    }
}

#[async_trait]
impl StreamLedger for RoketoLedger {
    async fn outgoing_streams(&self, client: &RpcClient, account_id: &str) -> Result<Vec<Stream>> {
        let mut streams = Vec::new();
        let mut from = 0u32;
        loop {
            let page = self
                .page(client, account_id, from)
                .await
                .with_context(|| format!("list outgoing streams of {account_id} from {from}"))?;
            let short = (page.len() as u32) < self.page_limit;
            from = from.saturating_add(page.len() as u32);
            streams.extend(page);
            if short {
                break;
            }
        }

        fill_available(&mut streams, self.unit.now(), self.unit);
        set_last_stream_count(streams.len());
        tracing::debug!(
            target = "ledger",
            "fetched {} outgoing streams for {}",
            streams.len(),
            account_id
        );
        Ok(streams)
    }
}

/// Fill in `available_to_withdraw` for Active streams that do not carry it:
/// tokens accrued since `last_action` at the stream rate, capped by balance.
pub fn fill_available(streams: &mut [Stream], now: u64, unit: TimestampUnit) {
    for s in streams.iter_mut() {
        if !s.status.is_active() || s.available_to_withdraw != 0 {
            continue;
        }
        let Some(last_action) = s.last_action else {
            continue;
        };
        let elapsed = now.saturating_sub(last_action) as u128;
        let accrued = elapsed.saturating_mul(s.tokens_per_sec) / unit.per_second() as u128;
        s.available_to_withdraw = accrued.min(s.balance);
    }
}
