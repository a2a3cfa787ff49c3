use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::db_types::NewRefund;

/// The wire format of an inbound work description.
///
/// Every field is optional on the wire and defaults to empty or zero. `status` is informational only; ingested
/// refunds always start out as pending.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueMessage {
    pub file_id: String,
    pub status: String,
    pub error_message: Option<String>,
    #[serde(deserialize_with = "amount_as_string")]
    pub refund_amount: String,
    pub user_id: String,
    pub year: i64,
    pub eta: String,
    pub timestamp: String,
}

impl QueueMessage {
    pub fn from_slice(payload: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(payload)
    }

    /// Converts the message into a new pending refund. Empty strings and a zero year are stored as absent.
    pub fn to_new_refund(&self) -> NewRefund {
        let non_empty = |s: &str| (!s.trim().is_empty()).then(|| s.to_string());
        NewRefund {
            file_id: self.file_id.trim().into(),
            user_id: non_empty(&self.user_id),
            year: (self.year != 0).then_some(self.year),
            refund_amount: non_empty(&self.refund_amount),
            eta: non_empty(&self.eta),
        }
    }
}

/// Accepts a string or a number and always yields a string. Whole numbers keep their digits; fractional amounts are
/// rounded to the nearest whole unit.
fn amount_as_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where D: Deserializer<'de> {
    let value = Value::deserialize(deserializer)?;
    let amount = match value {
        Value::Null => String::new(),
        Value::String(s) => s,
        Value::Number(n) => match (n.as_i64(), n.as_u64(), n.as_f64()) {
            (Some(i), _, _) => i.to_string(),
            (None, Some(u), _) => u.to_string(),
            (None, None, Some(f)) => format!("{f:.0}"),
            _ => n.to_string(),
        },
        Value::Bool(b) => b.to_string(),
        other => return Err(serde::de::Error::custom(format!("refund_amount must be a string or number, got {other}"))),
    };
    Ok(amount)
}
