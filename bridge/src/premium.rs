// --- Premium entitlement ----------------------------------------------------
//
// Premium is active while the newest Active stream to the service account
// still holds unspent funds. The status is re-derived from a fresh snapshot
// on every call; nothing here keeps state between calls.
// ---------------------------------------------------------------------------

use anyhow::{anyhow, Result};
use serde::Serialize;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::stream::Stream;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PremiumStatus {
    pub premium: bool,
    #[serde(rename = "endTimestamp")]
    pub end_timestamp: u64,
}

impl PremiumStatus {
    /// No entitlement: no matching stream, or nothing left in it.
    pub const NONE: PremiumStatus = PremiumStatus {
        premium: false,
        end_timestamp: 0,
    };
}

/// Unit of the stream timestamps. The contract picks it; we only scale the
/// projected duration to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimestampUnit {
    Seconds,
    Millis,
    Nanos,
}

impl TimestampUnit {
    pub fn per_second(self) -> u64 {
        match self {
            TimestampUnit::Seconds => 1,
            TimestampUnit::Millis => 1_000,
            TimestampUnit::Nanos => 1_000_000_000,
        }
    }

    /// Wall clock in this unit.
    pub fn now(self) -> u64 {
        let elapsed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        match self {
            TimestampUnit::Seconds => elapsed.as_secs(),
            TimestampUnit::Millis => u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            TimestampUnit::Nanos => u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX),
        }
    }
}

impl FromStr for TimestampUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s" | "sec" | "secs" | "seconds" => Ok(TimestampUnit::Seconds),
            "ms" | "millis" | "milliseconds" => Ok(TimestampUnit::Millis),
            "ns" | "nanos" | "nanoseconds" => Ok(TimestampUnit::Nanos),
            other => Err(anyhow!("unknown timestamp unit: {other}")),
        }
    }
}

/// Picks the most recently created Active stream paying `receiver_id`.
/// On equal creation times the earlier entry in `streams` wins.
pub fn select_stream<'a>(streams: &'a [Stream], receiver_id: &str) -> Option<&'a Stream> {
    streams
        .iter()
        .filter(|s| s.receiver_id == receiver_id && s.status.is_active())
        .fold(None, |best: Option<&Stream>, s| match best {
            Some(b) if b.timestamp_created >= s.timestamp_created => Some(b),
            _ => Some(s),
        })
}

/// Evaluate premium status with timestamps in seconds.
///
/// `now` must use the same unit as `timestamp_created`.
pub fn evaluate_premium(streams: &[Stream], receiver_id: &str, now: u64) -> PremiumStatus {
    evaluate_premium_in(streams, receiver_id, now, TimestampUnit::Seconds)
}

/// Same as [`evaluate_premium`] for streams whose timestamps use `unit`.
pub fn evaluate_premium_in(
    streams: &[Stream],
    receiver_id: &str,
    now: u64,
    unit: TimestampUnit,
) -> PremiumStatus {
    let Some(stream) = select_stream(streams, receiver_id) else {
        return PremiumStatus::NONE;
    };

    PremiumStatus {
        premium: stream.status.is_active() && stream.remaining_fraction() > 0.0,
        end_timestamp: projected_end(stream, now, unit),
    }
}

/// Creation time plus the whole seconds the balance lasts at the stream rate,
/// never earlier than `now`. A stream without a rate ended at creation.
fn projected_end(stream: &Stream, now: u64, unit: TimestampUnit) -> u64 {
    if stream.tokens_per_sec == 0 {
        return stream.timestamp_created;
    }
    let span = (stream.balance / stream.tokens_per_sec).saturating_mul(unit.per_second() as u128);
    let span = u64::try_from(span).unwrap_or(u64::MAX);
    stream.timestamp_created.saturating_add(span).max(now)
}
