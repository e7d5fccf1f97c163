use regex::Regex;
use std::collections::HashMap;

use crate::config::profile::FormProfile;
use crate::domain::model::{FieldRole, RowKey};
use crate::utils::error::{Result, SyncError};

/// Field-naming convention of one form flavor, compiled from a
/// [`FormProfile`]. Maps formset field names (`invoiceitem_set-0-quantity`)
/// to `(RowKey, FieldRole)` and back.
///
/// The convention is the only thing the four original form flavors disagree
/// on, so it is configuration, not code.
#[derive(Debug, Clone)]
pub struct FieldConvention {
    prefix: String,
    pattern: Regex,
    roles: HashMap<String, FieldRole>,
    suffixes: HashMap<FieldRole, String>,
    subtotal_display_suffix: Option<String>,
}

impl FieldConvention {
    pub fn from_profile(profile: &FormProfile) -> Result<Self> {
        // 欄位名格式：{prefix}-{index}-{suffix}
        let pattern = Regex::new(&format!(
            r"^{}-(\d+)-(.+)$",
            regex::escape(&profile.prefix)
        ))
        .map_err(|e| SyncError::ConfigError {
            message: format!("invalid form prefix '{}': {}", profile.prefix, e),
        })?;

        let pairs = [
            (FieldRole::ItemType, profile.item_type_suffix.clone()),
            (FieldRole::ProductSelect, profile.product_suffix.clone()),
            (FieldRole::ServiceSelect, profile.service_suffix.clone()),
            (FieldRole::Quantity, profile.quantity_suffix.clone()),
            (FieldRole::UnitPrice, profile.unit_price_suffix.clone()),
            (FieldRole::Discount, profile.discount_suffix.clone()),
            (FieldRole::Subtotal, profile.subtotal_suffix.clone()),
        ];

        let mut roles = HashMap::new();
        let mut suffixes = HashMap::new();
        for (role, suffix) in pairs {
            if roles.insert(suffix.clone(), role).is_some() {
                return Err(SyncError::ConfigError {
                    message: format!("duplicate field suffix '{}' in form profile", suffix),
                });
            }
            suffixes.insert(role, suffix);
        }

        Ok(Self {
            prefix: profile.prefix.clone(),
            pattern,
            roles,
            suffixes,
            subtotal_display_suffix: profile.subtotal_display_suffix.clone(),
        })
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Row Locator: resolve a changed field name to its enclosing row and
    /// role. Fields outside the convention (csrf tokens, management form
    /// fields, unrelated inputs) yield `RowNotFoundError`.
    pub fn locate(&self, field_name: &str) -> Result<(RowKey, FieldRole)> {
        let caps = self
            .pattern
            .captures(field_name)
            .ok_or_else(|| SyncError::RowNotFoundError {
                field: field_name.to_string(),
            })?;

        let index: u32 = caps[1].parse().map_err(|_| SyncError::RowNotFoundError {
            field: field_name.to_string(),
        })?;

        let role = self
            .roles
            .get(&caps[2])
            .copied()
            .ok_or_else(|| SyncError::RowNotFoundError {
                field: field_name.to_string(),
            })?;

        Ok((RowKey::new(self.prefix.clone(), index), role))
    }

    /// Build the field name a role has inside the given row.
    pub fn field_name(&self, row: &RowKey, role: FieldRole) -> String {
        // suffixes 涵蓋所有角色，from_profile 已保證
        let suffix = &self.suffixes[&role];
        format!("{}-{}-{}", row.prefix, row.index, suffix)
    }

    /// Optional read-only mirror of the subtotal (e.g. a display cell next
    /// to the hidden input). `None` when the profile does not name one.
    pub fn subtotal_display_name(&self, row: &RowKey) -> Option<String> {
        self.subtotal_display_suffix
            .as_ref()
            .map(|suffix| format!("{}-{}-{}", row.prefix, row.index, suffix))
    }

    /// Collect every distinct row key present in a flat list of field names.
    pub fn rows_in(&self, field_names: &[String]) -> Vec<RowKey> {
        let mut rows: Vec<RowKey> = Vec::new();
        for name in field_names {
            if let Ok((row, _)) = self.locate(name) {
                if !rows.contains(&row) {
                    rows.push(row);
                }
            }
        }
        rows.sort_by_key(|r| r.index);
        rows
    }
}
