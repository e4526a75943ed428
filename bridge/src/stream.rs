use serde::de::Error as DeError;
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// Outgoing payment stream as reported by the streaming contract.
///
/// Token amounts travel as decimal strings on the wire since they do not fit
/// in a JSON number. Timestamps keep whatever unit the contract uses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stream {
    pub id: String,
    #[serde(default)]
    pub owner_id: String,
    pub receiver_id: String,
    #[serde(default)]
    pub token_account_id: String,
    pub status: StreamStatus,
    pub timestamp_created: u64,
    #[serde(default)]
    pub last_action: Option<u64>,
    #[serde(default, with = "u128_string")]
    pub balance: u128,
    #[serde(default, with = "u128_string")]
    pub available_to_withdraw: u128,
    #[serde(default, with = "u128_string")]
    pub tokens_per_sec: u128,
    #[serde(default, with = "u128_string")]
    pub tokens_total_withdrawn: u128,
}

impl Stream {
    /// Portion of the balance still locked in the stream, in `[0, 1]`.
    /// A zero balance yields `0.0`.
    pub fn remaining_fraction(&self) -> f64 {
        if self.balance == 0 {
            return 0.0;
        }
        self.balance.saturating_sub(self.available_to_withdraw) as f64 / self.balance as f64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamStatus {
    Initialized,
    Active,
    Paused,
    Finished { reason: Option<String> },
}

impl StreamStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StreamStatus::Active)
    }

    fn name(&self) -> &'static str {
        match self {
            StreamStatus::Initialized => "Initialized",
            StreamStatus::Active => "Active",
            StreamStatus::Paused => "Paused",
            StreamStatus::Finished { .. } => "Finished",
        }
    }
}

const STATUS_VARIANTS: &[&str] = &["Initialized", "Active", "Paused", "Finished"];

// The contract encodes unit variants as bare strings and `Finished` as an
// externally tagged object carrying the finish reason.
impl<'de> Deserialize<'de> for StreamStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Name(String),
            Tagged(std::collections::BTreeMap<String, Value>),
        }

        let (name, body) = match Raw::deserialize(deserializer)? {
            Raw::Name(name) => (name, Value::Null),
            Raw::Tagged(map) => map
                .into_iter()
                .next()
                .ok_or_else(|| D::Error::custom("empty stream status object"))?,
        };

        match name.as_str() {
            "Initialized" => Ok(StreamStatus::Initialized),
            "Active" => Ok(StreamStatus::Active),
            "Paused" => Ok(StreamStatus::Paused),
            "Finished" => Ok(StreamStatus::Finished {
                reason: body.get("reason").and_then(Value::as_str).map(str::to_owned),
            }),
            other => Err(D::Error::unknown_variant(other, STATUS_VARIANTS)),
        }
    }
}

impl Serialize for StreamStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            StreamStatus::Finished { reason } => {
                let mut map = serializer.serialize_map(Some(1))?;
                map.serialize_entry(self.name(), &serde_json::json!({ "reason": reason }))?;
                map.end()
            }
            _ => serializer.serialize_str(self.name()),
        }
    }
}

/// u128 carried as a decimal string; plain JSON integers are accepted too.
pub(crate) mod u128_string {
    use serde::de::Error as DeError;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Text(String),
            Int(u64),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Text(s) => s.trim().parse::<u128>().map_err(D::Error::custom),
            Raw::Int(n) => Ok(n as u128),
        }
    }
}
