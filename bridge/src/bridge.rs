use anyhow::{anyhow, Result};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::config::NetworkConfig;
use crate::inflight::Inflight;
use crate::ledger::{RoketoLedger, StreamLedger};
use crate::metrics::{inc_premium_evaluations, inc_premium_unavailable};
use crate::notify::*;
use crate::premium::{evaluate_premium_in, PremiumStatus};
use crate::rpc::{NodeStatus, RpcClient};
use crate::session::{Session, SessionError, SessionState};
use crate::stream::Stream;

type ViewKey = (String, String, String);

/// Operations exposed to the host game.
///
/// Every operation reports its outcome on the host event queue and also
/// returns it to Rust callers.
pub struct Bridge {
    config: NetworkConfig,
    session: Session,
    notifier: Notifier,
    ledger: Arc<dyn StreamLedger>,
    stream_reads: Inflight<String, Arc<Vec<Stream>>>,
    view_reads: Inflight<ViewKey, Value>,
}

impl Bridge {
    /// Bridge reading streams from the configured Roketo contract.
    pub fn new(config: NetworkConfig, account_id: Option<String>, notifier: Notifier) -> Self {
        let ledger = RoketoLedger::new(
            config.streaming_contract.clone(),
            config.page_limit,
            config.timestamp_unit,
        );
        Self::with_ledger(config, account_id, notifier, Arc::new(ledger))
    }

    pub fn with_ledger(
        config: NetworkConfig,
        account_id: Option<String>,
        notifier: Notifier,
        ledger: Arc<dyn StreamLedger>,
    ) -> Self {
        Self {
            config,
            session: Session::new(account_id),
            notifier,
            ledger,
            stream_reads: Inflight::new(),
            view_reads: Inflight::new(),
        }
    }

    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub fn account_id(&self) -> Option<&str> {
        self.session.account_id()
    }

    pub fn is_ready(&self) -> bool {
        self.session.state() == SessionState::Ready
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    // -----------------------------------------------------------------------
    // Connection
    // -----------------------------------------------------------------------

    /// Connect to the node. A second call while connecting or connected
    /// reports `NearAlreadyInited`.
    pub async fn init_near(&self) -> Result<NodeStatus> {
        if let Err(e) = self.session.begin_connect() {
            tracing::error!(target = "bridge", "near already initialised");
            self.notifier
                .send_with(NEAR_INIT_ERROR, json!({ "error": e.to_string() }));
            return Err(e.into());
        }

        let connected = match RpcClient::new(self.config.node_url.clone(), self.config.request_timeout) {
            Ok(client) => client.status().await.map(|status| (client, status)),
            Err(e) => Err(e),
        };

        match connected {
            Ok((client, status)) => {
                tracing::info!(
                    target = "bridge",
                    "connected to {} ({}) at height {}",
                    client.url(),
                    status.chain_id,
                    status.latest_block_height
                );
                self.session.finish_connect(client);
                self.notifier.send(NEAR_INIT_SUCCESS);
                self.notifier.send_with(
                    NEAR_INIT_WALLET_SUCCESS,
                    json!({ "accountId": self.session.account_id() }),
                );
                Ok(status)
            }
            Err(e) => {
                self.session.fail_connect();
                tracing::error!(target = "bridge", "near connect error: {e:#}");
                self.notifier
                    .send_with(NEAR_INIT_ERROR, json!({ "error": format!("{e:#}") }));
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Premium streams
    // -----------------------------------------------------------------------

    /// Emits `NearStreamIsPremium {premium}`.
    pub async fn stream_is_premium(&self, account_id: Option<&str>) -> Result<PremiumStatus> {
        let status = self.premium_status("stream_is_premium", account_id).await?;
        self.notifier
            .send_with(NEAR_STREAM_IS_PREMIUM, json!({ "premium": status.premium }));
        Ok(status)
    }

    /// Emits `NearStreamEndTimestamp {endTimestamp}`.
    pub async fn stream_calculate_end_timestamp(&self, account_id: Option<&str>) -> Result<PremiumStatus> {
        let status = self
            .premium_status("stream_calculate_end_timestamp", account_id)
            .await?;
        self.notifier.send_with(
            NEAR_STREAM_END_TIMESTAMP,
            json!({ "endTimestamp": status.end_timestamp }),
        );
        Ok(status)
    }

    /// Emits `NearStreamPremiumStatus {premium, endTimestamp}`.
    pub async fn stream_premium_status(&self, account_id: Option<&str>) -> Result<PremiumStatus> {
        let status = self
            .premium_status("stream_premium_status", account_id)
            .await?;
        self.notifier
            .send_with(NEAR_STREAM_PREMIUM_STATUS, serde_json::to_value(status)?);
        Ok(status)
    }

    async fn premium_status(&self, operation: &str, account_id: Option<&str>) -> Result<PremiumStatus> {
        let client = self.ready_client(operation)?;
        let account = self.resolve_account(operation, account_id)?;

        let ledger = self.ledger.clone();
        let key = account.clone();
        let fetched = self
            .stream_reads
            .run(key, async move {
                ledger.outgoing_streams(&client, &account).await.map(Arc::new)
            })
            .await;

        let streams = match fetched {
            Ok(streams) => streams,
            Err(e) => {
                inc_premium_unavailable();
                tracing::warn!(target = "bridge", "{operation}: stream fetch failed: {e:#}");
                self.notifier.send_with(
                    NEAR_STREAM_ERROR,
                    json!({ "operation": operation, "error": format!("{e:#}") }),
                );
                return Err(anyhow!("{operation}: {e:#}"));
            }
        };

        let unit = self.config.timestamp_unit;
        let status = evaluate_premium_in(&streams, &self.config.premium_receiver, unit.now(), unit);
        inc_premium_evaluations(status.premium);
        tracing::info!(
            target = "bridge",
            "{operation}: premium={} end={} ({} streams)",
            status.premium,
            status.end_timestamp,
            streams.len()
        );
        Ok(status)
    }

    // -----------------------------------------------------------------------
    // Contract reads
    // -----------------------------------------------------------------------

    /// Read-only contract call. Concurrent calls with the same contract,
    /// method and arguments share one request.
    pub async fn contract_view(&self, contract: &str, method: &str, args: Value) -> Result<Value> {
        let client = self.ready_client("contract_view")?;
        let key = (contract.to_string(), method.to_string(), args.to_string());
        let (c, m) = (contract.to_string(), method.to_string());
        let fetched = self
            .view_reads
            .run(key, async move { client.view_call(&c, &m, &args).await })
            .await;

        match fetched {
            Ok(result) => {
                self.notifier.send_with(
                    NEAR_CONTRACT_VIEW,
                    json!({ "contract": contract, "method": method, "result": result }),
                );
                Ok(result)
            }
            Err(e) => {
                tracing::warn!(target = "bridge", "view {contract}.{method} failed: {e:#}");
                self.notifier.send_with(
                    NEAR_CONTRACT_VIEW_ERROR,
                    json!({ "contract": contract, "method": method, "error": format!("{e:#}") }),
                );
                Err(anyhow!("{e:#}"))
            }
        }
    }

    /// wNEAR balance of `account_id` (or the session account) as a decimal string.
    pub async fn wnear_balance(&self, account_id: Option<&str>) -> Result<String> {
        let client = self.ready_client("wnear_balance")?;
        let account = self.resolve_account("wnear_balance", account_id)?;
        let contract = self.config.wnear_contract.as_str();
        let method = "ft_balance_of";
        let args = json!({ "account_id": account });

        let key = (contract.to_string(), method.to_string(), args.to_string());
        let c = contract.to_string();
        let fetched = self
            .view_reads
            .run(key, async move { client.view_call(&c, method, &args).await })
            .await
            .map_err(|e| anyhow!("{e:#}"))
            .and_then(|value| match value.as_str() {
                Some(balance) => Ok(balance.to_owned()),
                None => Err(anyhow!("{method} returned {value}")),
            });

        match fetched {
            Ok(balance) => {
                self.notifier.send_with(
                    NEAR_CONTRACT_VIEW,
                    json!({ "contract": contract, "method": method, "result": balance }),
                );
                Ok(balance)
            }
            Err(e) => {
                tracing::warn!(target = "bridge", "wnear balance of {account} failed: {e:#}");
                self.notifier.send_with(
                    NEAR_CONTRACT_VIEW_ERROR,
                    json!({ "contract": contract, "method": method, "error": format!("{e:#}") }),
                );
                Err(e)
            }
        }
    }

    /// Explicit account or the session account; reports `NearNotReady` when
    /// neither is known.
    fn resolve_account(&self, operation: &str, account_id: Option<&str>) -> Result<String> {
        match account_id.or(self.session.account_id()) {
            Some(account) => Ok(account.to_owned()),
            None => {
                self.notifier.send_with(
                    NEAR_NOT_READY,
                    json!({ "operation": operation, "error": "no account" }),
                );
                Err(anyhow!("{operation}: no account to check"))
            }
        }
    }

    fn ready_client(&self, operation: &str) -> Result<RpcClient> {
        self.session.client().map_err(|e: SessionError| {
            self.notifier
                .send_with(NEAR_NOT_READY, json!({ "operation": operation }));
            anyhow!("{operation}: {e}")
        })
    }
}
