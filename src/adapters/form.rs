use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::RwLock;

use crate::config::profile::FormProfile;
use crate::domain::model::RowKey;
use crate::domain::ports::{FieldStore, SnapshotStore};
use crate::utils::error::Result;

#[derive(Debug, Default)]
struct FieldState {
    value: String,
    writes: u64,
}

/// The engine-facing form: a flat map of field names to text values, the
/// same shape a serialized formset has. Rows exist only as naming
/// conventions over this map; removing a row removes its fields, which is
/// what makes late lookup writes miss.
#[derive(Debug, Default)]
pub struct InMemoryForm {
    fields: RwLock<HashMap<String, FieldState>>,
}

impl InMemoryForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a flat JSON object (`{"invoiceitem_set-0-quantity": "2", ...}`).
    /// Non-string scalars are accepted and stringified, since exported
    /// form data is not always consistent about quoting numbers.
    pub fn from_snapshot(data: &[u8]) -> Result<Self> {
        let raw: HashMap<String, serde_json::Value> = serde_json::from_slice(data)?;

        let mut fields = HashMap::new();
        for (name, value) in raw {
            let text = match value {
                serde_json::Value::String(s) => s,
                serde_json::Value::Null => String::new(),
                other => other.to_string(),
            };
            fields.insert(
                name,
                FieldState {
                    value: text,
                    writes: 0,
                },
            );
        }

        Ok(Self {
            fields: RwLock::new(fields),
        })
    }

    /// Serialize the current field values as pretty JSON with stable key
    /// order.
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let fields = self.fields.read().expect("form lock poisoned");
        let ordered: BTreeMap<&String, &String> =
            fields.iter().map(|(k, v)| (k, &v.value)).collect();
        Ok(serde_json::to_vec_pretty(&ordered)?)
    }

    /// Create one empty row worth of fields under the profile's naming
    /// convention.
    pub fn insert_row(&self, prefix: &str, index: u32, profile: &FormProfile) {
        let mut suffixes = vec![
            profile.item_type_suffix.as_str(),
            profile.product_suffix.as_str(),
            profile.service_suffix.as_str(),
            profile.quantity_suffix.as_str(),
            profile.unit_price_suffix.as_str(),
            profile.discount_suffix.as_str(),
            profile.subtotal_suffix.as_str(),
        ];
        if let Some(display) = &profile.subtotal_display_suffix {
            suffixes.push(display.as_str());
        }

        let mut fields = self.fields.write().expect("form lock poisoned");
        for suffix in suffixes {
            fields
                .entry(format!("{}-{}-{}", prefix, index, suffix))
                .or_default();
        }
    }

    /// Drop a single field, for form flavors that lack one of the
    /// conventional fields (e.g. no item-type selector).
    pub fn remove_field(&self, name: &str) {
        let mut fields = self.fields.write().expect("form lock poisoned");
        fields.remove(name);
    }

    /// Drop every field belonging to the row.
    pub fn remove_row(&self, row: &RowKey) {
        let prefix = format!("{}-{}-", row.prefix, row.index);
        let mut fields = self.fields.write().expect("form lock poisoned");
        fields.retain(|name, _| !name.starts_with(&prefix));
    }

    /// How many times a field has been written since it was created.
    pub fn write_count(&self, name: &str) -> u64 {
        let fields = self.fields.read().expect("form lock poisoned");
        fields.get(name).map(|f| f.writes).unwrap_or(0)
    }
}

impl FieldStore for InMemoryForm {
    fn read_field(&self, name: &str) -> Option<String> {
        let fields = self.fields.read().expect("form lock poisoned");
        fields.get(name).map(|f| f.value.clone())
    }

    fn write_field(&self, name: &str, value: &str) -> bool {
        let mut fields = self.fields.write().expect("form lock poisoned");
        match fields.get_mut(name) {
            Some(field) => {
                field.value = value.to_string();
                field.writes += 1;
                true
            }
            // 欄位不存在（列已移除）：寫入被丟棄
            None => false,
        }
    }

    fn field_names(&self) -> Vec<String> {
        let fields = self.fields.read().expect("form lock poisoned");
        fields.keys().cloned().collect()
    }
}

/// Snapshot files on the local filesystem, relative to a base directory.
#[derive(Debug, Clone)]
pub struct LocalSnapshots {
    base_path: String,
}

impl LocalSnapshots {
    pub fn new(base_path: String) -> Self {
        Self { base_path }
    }
}

impl SnapshotStore for LocalSnapshots {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = Path::new(&self.base_path).join(path);
        let data = std::fs::read(full_path)?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = Path::new(&self.base_path).join(path);

        if let Some(parent) = full_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(full_path, data)?;
        Ok(())
    }
}
