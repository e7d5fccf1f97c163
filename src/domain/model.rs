use serde::{Deserialize, Serialize};

use crate::utils::error::{Result, SyncError};

/// Classification of a line item, mirroring the backend's `item_type`
/// choices. The kind decides which lookup endpoint applies; `Other` rows
/// have no catalog entity and never resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemKind {
    Product,
    Service,
    Other,
}

impl ItemKind {
    /// Parse a raw selector value ("product" / "service" / anything else).
    pub fn from_field_value(raw: &str) -> Self {
        match raw.trim() {
            "product" => ItemKind::Product,
            "service" => ItemKind::Service,
            _ => ItemKind::Other,
        }
    }
}

impl core::fmt::Display for ItemKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ItemKind::Product => write!(f, "product"),
            ItemKind::Service => write!(f, "service"),
            ItemKind::Other => write!(f, "other"),
        }
    }
}

/// Catalog entity id as it travels through form values and URL path
/// segments. Always non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(SyncError::ProcessingError {
                message: "entity id cannot be empty".to_string(),
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for EntityId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of one line-item row: formset prefix plus row index.
/// Displays the way the form names it, e.g. `invoiceitem_set-3`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RowKey {
    pub prefix: String,
    pub index: u32,
}

impl RowKey {
    pub fn new(prefix: impl Into<String>, index: u32) -> Self {
        Self {
            prefix: prefix.into(),
            index,
        }
    }
}

impl core::fmt::Display for RowKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}-{}", self.prefix, self.index)
    }
}

/// The role a named field plays inside its row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldRole {
    ItemType,
    ProductSelect,
    ServiceSelect,
    Quantity,
    UnitPrice,
    Discount,
    Subtotal,
}

/// Result of one remote price lookup. Ephemeral: consumed once to populate
/// the originating row's unit-price field, then discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub entity_id: EntityId,
    pub kind: ItemKind,
    pub price: f64,
}

/// Row lifecycle notifications the surrounding form emits. Serde-tagged so
/// event scripts can be replayed from JSON files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RowEvent {
    RowAdded { row: RowKey },
    RowRemoved { row: RowKey },
    FieldChanged { field: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_kind_from_field_value() {
        assert_eq!(ItemKind::from_field_value("product"), ItemKind::Product);
        assert_eq!(ItemKind::from_field_value(" service "), ItemKind::Service);
        assert_eq!(ItemKind::from_field_value("other"), ItemKind::Other);
        assert_eq!(ItemKind::from_field_value(""), ItemKind::Other);
        assert_eq!(ItemKind::from_field_value("garbage"), ItemKind::Other);
    }

    #[test]
    fn test_entity_id_rejects_empty() {
        assert!(EntityId::new("").is_err());
        assert!(EntityId::new("   ").is_err());
        assert_eq!(EntityId::new(" 7 ").unwrap().as_str(), "7");
    }

    #[test]
    fn test_row_key_display_matches_formset_naming() {
        let row = RowKey::new("invoiceitem_set", 3);
        assert_eq!(row.to_string(), "invoiceitem_set-3");
    }

    #[test]
    fn test_row_event_round_trips_through_json() {
        let ev = RowEvent::FieldChanged {
            field: "invoiceitem_set-0-quantity".to_string(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains("field_changed"));
        let back: RowEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ev);
    }
}
