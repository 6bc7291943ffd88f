//! Wire protocol for the live channel.
//!
//! One message kind flows server-to-client: `order_update`, carrying a
//! change event exactly as produced by the store's feed. The `type` field
//! in the JSON object drives serde dispatch, so the envelope stays open
//! to further message kinds without breaking existing clients. Defined
//! beside the event types so both halves of the wire share one
//! definition.

use serde::{Deserialize, Serialize};

use crate::event::ChangeEvent;

/// Messages sent from the server to connected sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    /// One change event from the store feed, relayed verbatim.
    #[serde(rename = "order_update")]
    OrderUpdate {
        /// The change event, flattened into the envelope.
        #[serde(flatten)]
        event: ChangeEvent,
    },
}

impl ServerMessage {
    /// Wraps a change event in the broadcast envelope.
    #[must_use]
    pub fn order_update(event: ChangeEvent) -> Self {
        Self::OrderUpdate { event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::{Order, OrderId, OrderStatus};
    use chrono::Utc;

    fn order() -> Order {
        Order {
            id: OrderId::from(1),
            customer_name: "Ana".into(),
            product_name: "Desk".into(),
            status: OrderStatus::Pending,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_update_wire_format() {
        let msg = ServerMessage::order_update(ChangeEvent::insert(order()));
        let json = serde_json::to_value(&msg).unwrap();

        assert_eq!(json["type"], "order_update");
        assert_eq!(json["operationType"], "insert");
        assert_eq!(json["fullDocument"]["customer_name"], "Ana");
        assert_eq!(json["documentKey"]["id"], "1");
    }

    #[test]
    fn test_order_update_roundtrip() {
        let msg = ServerMessage::order_update(ChangeEvent::delete(OrderId::from(5)));
        let json = serde_json::to_string(&msg).unwrap();
        let back: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_unknown_type_fails() {
        let result = serde_json::from_str::<ServerMessage>(r#"{"type":"order_snapshot"}"#);
        assert!(result.is_err());
    }
}
