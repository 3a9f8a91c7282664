//! Domain records shared by the store, the ledger and the API layer.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClientStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub status: ClientStatus,
    pub created_at: DateTime<Utc>,
}

/// A tradable instrument, identified by its normalized (uppercase) ticker.
/// Rows are created lazily the first time an allocation references the
/// ticker; the ticker is unique across the table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub ticker: String,
    pub name: Option<String>,
}

/// A client's position in one asset. Quantity and buy price are stored as
/// high-precision decimals and must both be positive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    pub id: i64,
    pub client_id: i64,
    pub asset_id: i64,
    pub quantity: Decimal,
    pub buy_price: Decimal,
    pub buy_date: NaiveDate,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ClientStatus::Active).unwrap(),
            "\"active\""
        );
        let parsed: ClientStatus = serde_json::from_str("\"inactive\"").unwrap();
        assert_eq!(parsed, ClientStatus::Inactive);
    }
}
