//! Inbound command contract
//!
//! Commands arrive from the transport as JSON documents tagged by
//! `action`:
//!
//! ```json
//! {"action": "submit", "order": {...}}
//! {"action": "cancel", "symbol": "btcusdt", "side": "BUY", "price": "20.1", "id": 7}
//! {"action": "reload", "target": "all"}
//! {"action": "new", "symbol": "ethusdt"}
//! ```

use serde::{Deserialize, Serialize};
use types::errors::EngineError;
use types::ids::MarketId;
use types::numeric::Price;
use types::order::{Order, Side};

use crate::order_book::OrderRef;

/// Key that locates a resident order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderKey {
    pub symbol: MarketId,
    pub side: Side,
    pub price: Price,
    #[serde(flatten)]
    pub reference: OrderRef,
}

/// Which markets a reload rebuilds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ReloadTarget {
    All,
    Market(MarketId),
}

impl TryFrom<String> for ReloadTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "all" {
            return Ok(ReloadTarget::All);
        }
        MarketId::try_new(value.clone())
            .map(ReloadTarget::Market)
            .ok_or_else(|| format!("invalid reload target {value:?}"))
    }
}

impl From<ReloadTarget> for String {
    fn from(target: ReloadTarget) -> Self {
        match target {
            ReloadTarget::All => "all".to_string(),
            ReloadTarget::Market(symbol) => symbol.to_string(),
        }
    }
}

/// A command addressed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "kebab-case")]
pub enum Command {
    Submit { order: Order },
    Cancel(OrderKey),
    Reload { target: ReloadTarget },
    New { symbol: MarketId },
}

impl Command {
    /// Decode a JSON command
    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        serde_json::from_slice(bytes).map_err(|err| EngineError::Decode {
            message: err.to_string(),
        })
    }

    /// Market the command addresses, None for `reload all`
    pub fn symbol(&self) -> Option<&MarketId> {
        match self {
            Command::Submit { order } => Some(&order.symbol),
            Command::Cancel(key) => Some(&key.symbol),
            Command::Reload {
                target: ReloadTarget::Market(symbol),
            } => Some(symbol),
            Command::Reload {
                target: ReloadTarget::All,
            } => None,
            Command::New { symbol } => Some(symbol),
        }
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            Command::Submit { .. } => "submit",
            Command::Cancel(_) => "cancel",
            Command::Reload { .. } => "reload",
            Command::New { .. } => "new",
        }
    }
}

/// What a dispatched command did
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutcome {
    /// At least one trade happened
    pub matched: bool,
    /// The command changed nothing (duplicate submit, unknown cancel)
    pub noop: bool,
    /// Events queued for publication
    pub events: usize,
    /// Markets (re)built by a reload or new-market command
    pub markets: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::ids::OrderId;
    use types::order::TimeInForce;
    use uuid::Uuid;

    #[test]
    fn test_decode_submit() {
        let json = r#"{
            "action": "submit",
            "order": {
                "order_id": 7,
                "uuid": "0190b2c4-7a3e-7000-8000-000000000001",
                "account_id": 3,
                "symbol": "btcusdt",
                "side": "BUY",
                "order_type": "LIMIT",
                "time_in_force": "IOC",
                "price": "20.12",
                "quantity": "5",
                "created_at": 100
            }
        }"#;

        let command = Command::decode(json.as_bytes()).unwrap();
        let Command::Submit { order } = command else {
            panic!("expected submit");
        };
        assert_eq!(order.order_id, OrderId::new(7));
        assert_eq!(order.time_in_force, TimeInForce::IOC);
        assert!(order.filled_quantity.is_zero());
        assert_eq!(order.stop_price, None);
    }

    #[test]
    fn test_decode_cancel_by_id_and_uuid() {
        let by_id = Command::decode(
            br#"{"action":"cancel","symbol":"btcusdt","side":"SELL","price":"20.1","id":9}"#,
        )
        .unwrap();
        assert_eq!(
            by_id,
            Command::Cancel(OrderKey {
                symbol: MarketId::new("btcusdt"),
                side: Side::SELL,
                price: "20.1".parse().unwrap(),
                reference: OrderRef::Id(OrderId::new(9)),
            })
        );

        let uuid = Uuid::now_v7();
        let json = format!(
            r#"{{"action":"cancel","symbol":"btcusdt","side":"BUY","price":"1","uuid":"{uuid}"}}"#
        );
        let by_uuid = Command::decode(json.as_bytes()).unwrap();
        let Command::Cancel(key) = by_uuid else {
            panic!("expected cancel");
        };
        assert_eq!(key.reference, OrderRef::Uuid(uuid));
    }

    #[test]
    fn test_decode_reload_targets() {
        let all = Command::decode(br#"{"action":"reload","target":"all"}"#).unwrap();
        assert_eq!(all, Command::Reload { target: ReloadTarget::All });
        assert_eq!(all.symbol(), None);

        let one = Command::decode(br#"{"action":"reload","target":"ethusdt"}"#).unwrap();
        assert_eq!(one.symbol(), Some(&MarketId::new("ethusdt")));

        assert!(Command::decode(br#"{"action":"reload","target":""}"#).is_err());
    }

    #[test]
    fn test_decode_new_market() {
        let command = Command::decode(br#"{"action":"new","symbol":"solusdt"}"#).unwrap();
        assert_eq!(command.label(), "new");
        assert_eq!(command.symbol(), Some(&MarketId::new("solusdt")));
    }

    #[test]
    fn test_decode_garbage() {
        let err = Command::decode(b"{not json").unwrap_err();
        assert!(matches!(err, EngineError::Decode { .. }));
        assert!(Command::decode(br#"{"action":"explode"}"#).is_err());
    }
}
