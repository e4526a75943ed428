pub mod bridge;
pub mod config;
pub mod inflight;
pub mod ledger;
pub mod metrics;
pub mod notify;
pub mod premium;
pub mod rpc;
pub mod session;
pub mod stream;

pub use bridge::Bridge;
pub use premium::{evaluate_premium, PremiumStatus};
pub use stream::{Stream, StreamStatus};
