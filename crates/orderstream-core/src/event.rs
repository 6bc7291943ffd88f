//! Change events emitted by the store, one per committed mutation.
//!
//! Wire field names (`operationType`, `fullDocument`, `documentKey`)
//! follow the store's feed format and are shared verbatim by the
//! broadcast transport, so a relayed event deserializes back into the
//! same [`ChangeEvent`] on the client side.

use serde::{Deserialize, Serialize};

use crate::order::{Order, OrderId};

/// The kind of mutation a [`ChangeEvent`] describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    /// A new order was created.
    Insert,
    /// Some fields of an existing order changed.
    Update,
    /// An existing order was overwritten wholesale.
    Replace,
    /// An order was removed.
    Delete,
}

/// Key of the affected order; present on every event, including deletes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentKey {
    /// Identifier of the affected order.
    pub id: OrderId,
}

/// One notification describing a single committed mutation.
///
/// `full_document` carries the complete post-mutation record for
/// insert/update/replace and is absent for delete, where `document_key`
/// alone identifies the removed order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
    /// The mutation kind.
    pub operation_type: Operation,
    /// Complete current record; `None` for delete.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_document: Option<Order>,
    /// Key of the affected order.
    pub document_key: DocumentKey,
}

impl ChangeEvent {
    /// Event for a newly created order.
    #[must_use]
    pub fn insert(order: Order) -> Self {
        Self {
            operation_type: Operation::Insert,
            document_key: DocumentKey {
                id: order.id.clone(),
            },
            full_document: Some(order),
        }
    }

    /// Event for a partially updated order, carrying the full record.
    #[must_use]
    pub fn update(order: Order) -> Self {
        Self {
            operation_type: Operation::Update,
            document_key: DocumentKey {
                id: order.id.clone(),
            },
            full_document: Some(order),
        }
    }

    /// Event for a removed order.
    #[must_use]
    pub fn delete(id: OrderId) -> Self {
        Self {
            operation_type: Operation::Delete,
            full_document: None,
            document_key: DocumentKey { id },
        }
    }

    /// Identifier of the affected order, regardless of operation.
    #[must_use]
    pub fn id(&self) -> &OrderId {
        &self.document_key.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderStatus;
    use chrono::Utc;

    fn order(id: u64) -> Order {
        Order {
            id: OrderId::from(id),
            customer_name: "Ana".into(),
            product_name: "Desk".into(),
            status: OrderStatus::Pending,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_wire_format() {
        let json = serde_json::to_value(ChangeEvent::insert(order(1))).unwrap();
        assert_eq!(json["operationType"], "insert");
        assert_eq!(json["fullDocument"]["customer_name"], "Ana");
        assert_eq!(json["documentKey"]["id"], "1");
    }

    #[test]
    fn test_delete_omits_full_document() {
        let json = serde_json::to_value(ChangeEvent::delete(OrderId::from(9))).unwrap();
        assert_eq!(json["operationType"], "delete");
        assert!(json.get("fullDocument").is_none());
        assert_eq!(json["documentKey"]["id"], "9");
    }

    #[test]
    fn test_event_roundtrip() {
        let event = ChangeEvent::update(order(3));
        let json = serde_json::to_string(&event).unwrap();
        let back: ChangeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }

    #[test]
    fn test_delete_deserializes_numeric_key() {
        // An event producer may encode the key as a JSON number.
        let event: ChangeEvent =
            serde_json::from_str(r#"{"operationType":"delete","documentKey":{"id":42}}"#).unwrap();
        assert_eq!(event.operation_type, Operation::Delete);
        assert_eq!(event.id(), &OrderId::from(42));
    }
}
