//! Order records and their canonical identifiers.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Opaque order identifier, held in canonical string form.
///
/// The snapshot transport and the live-event transport may serialize the
/// same identifier with different JSON types (string vs number). `OrderId`
/// deserializes from either and compares on the canonical string
/// rendering, so equality between records from the two transports never
/// produces a false negative. This is the single id-comparison point for
/// the whole pipeline; nothing else compares raw wire values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrderId(String);

impl OrderId {
    /// Wraps an already-canonical identifier string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<u64> for OrderId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

impl<'de> Deserialize<'de> for OrderId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct IdVisitor;

        impl de::Visitor<'_> for IdVisitor {
            type Value = OrderId;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an order id as a string or an integer")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<OrderId, E> {
                Ok(OrderId(v.to_owned()))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<OrderId, E> {
                Ok(OrderId(v.to_string()))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<OrderId, E> {
                Ok(OrderId(v.to_string()))
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Order received, not yet shipped (default at creation).
    #[default]
    Pending,
    /// Order handed to the carrier.
    Shipped,
    /// Order delivered to the customer.
    Delivered,
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
        };
        f.write_str(s)
    }
}

/// A single order record, the unit of state tracked by the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Identifier assigned by the store at creation; immutable.
    pub id: OrderId,
    /// Customer the order belongs to. Non-empty.
    pub customer_name: String,
    /// Product being ordered. Non-empty.
    pub product_name: String,
    /// Current fulfillment status.
    pub status: OrderStatus,
    /// Set by the store on every create/update; never by the client.
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating an order. The store assigns `id` and `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    /// Customer name; must be non-empty.
    pub customer_name: String,
    /// Product name; must be non-empty.
    pub product_name: String,
    /// Initial status; pending when omitted.
    #[serde(default)]
    pub status: OrderStatus,
}

/// Partial update for an existing order. Absent fields are left unchanged.
///
/// An empty patch is still a write: it touches `updated_at` and emits an
/// `update` change event, matching the store's write-path contract.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderPatch {
    /// New customer name, if changing. Must be non-empty when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    /// New product name, if changing. Must be non-empty when present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,
    /// New status, if changing.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<OrderStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_from_string_and_number_compare_equal() {
        let from_str: OrderId = serde_json::from_str("\"42\"").unwrap();
        let from_num: OrderId = serde_json::from_str("42").unwrap();
        assert_eq!(from_str, from_num);
        assert_eq!(from_str.as_str(), "42");
    }

    #[test]
    fn test_id_distinct_strings_differ() {
        let a: OrderId = serde_json::from_str("\"42\"").unwrap();
        let b: OrderId = serde_json::from_str("\"042\"").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_id_serializes_as_string() {
        let id = OrderId::from(7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"7\"");
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(
            serde_json::to_string(&OrderStatus::Shipped).unwrap(),
            "\"shipped\""
        );
        let status: OrderStatus = serde_json::from_str("\"delivered\"").unwrap();
        assert_eq!(status, OrderStatus::Delivered);
    }

    #[test]
    fn test_new_order_status_defaults_to_pending() {
        let new: NewOrder =
            serde_json::from_str(r#"{"customer_name":"Ana","product_name":"Desk"}"#).unwrap();
        assert_eq!(new.status, OrderStatus::Pending);
    }

    #[test]
    fn test_patch_absent_fields_are_none() {
        let patch: OrderPatch = serde_json::from_str(r#"{"status":"shipped"}"#).unwrap();
        assert!(patch.customer_name.is_none());
        assert!(patch.product_name.is_none());
        assert_eq!(patch.status, Some(OrderStatus::Shipped));
    }
}
