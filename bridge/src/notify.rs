use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc::{self, error::TrySendError, Receiver, Sender};
use tracing::warn;

use crate::metrics::{inc_host_events, inc_host_events_dropped};

pub const NEAR_INIT_SUCCESS: &str = "NearInitSuccess";
pub const NEAR_INIT_WALLET_SUCCESS: &str = "NearInitWalletSuccess";
pub const NEAR_INIT_ERROR: &str = "NearInitError";
pub const NEAR_NOT_READY: &str = "NearNotReady";
pub const NEAR_STREAM_IS_PREMIUM: &str = "NearStreamIsPremium";
pub const NEAR_STREAM_END_TIMESTAMP: &str = "NearStreamEndTimestamp";
pub const NEAR_STREAM_PREMIUM_STATUS: &str = "NearStreamPremiumStatus";
pub const NEAR_STREAM_ERROR: &str = "NearStreamError";
pub const NEAR_CONTRACT_VIEW: &str = "NearContractView";
pub const NEAR_CONTRACT_VIEW_ERROR: &str = "NearContractViewError";

/// Named event delivered to the host game.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HostEvent {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

/// Fire-and-forget sender side of the host event queue.
///
/// Delivery is best effort: when the queue is full or the host side has gone
/// away the event is dropped and logged.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<HostEvent>,
}

impl Notifier {
    pub fn channel(capacity: usize) -> (Notifier, Receiver<HostEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Notifier { tx }, rx)
    }

    pub fn send(&self, name: &str) {
        self.push(HostEvent {
            name: name.to_string(),
            payload: None,
        });
    }

    pub fn send_with(&self, name: &str, payload: Value) {
        self.push(HostEvent {
            name: name.to_string(),
            payload: Some(payload),
        });
    }

    fn push(&self, event: HostEvent) {
        let name = event.name.clone();
        match self.tx.try_send(event) {
            Ok(()) => inc_host_events(&name),
            Err(TrySendError::Full(_)) => {
                warn!(target = "notify", "host queue full, dropping {name}");
                inc_host_events_dropped(&name);
            }
            Err(TrySendError::Closed(_)) => {
                warn!(target = "notify", "host queue closed, dropping {name}");
                inc_host_events_dropped(&name);
            }
        }
    }
}
