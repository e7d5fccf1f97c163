use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::utils::error::{Result, SyncError};
use crate::utils::validation::{
    validate_non_empty_string, validate_path_template, validate_positive_number, validate_url,
    Validate,
};

/// One form flavor's configuration: field-naming convention plus lookup
/// endpoints. The defaults reproduce the Django admin inline; the other
/// form variants ship as TOML overrides of the same structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncProfile {
    pub profile: ProfileMeta,
    #[serde(default)]
    pub form: FormProfile,
    #[serde(default)]
    pub api: ApiProfile,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileMeta {
    pub name: String,
    pub description: String,
    pub version: String,
}

/// Formset field-naming convention. Fields are named
/// `{prefix}-{index}-{suffix}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormProfile {
    pub prefix: String,
    pub item_type_suffix: String,
    pub product_suffix: String,
    pub service_suffix: String,
    pub quantity_suffix: String,
    pub unit_price_suffix: String,
    pub discount_suffix: String,
    pub subtotal_suffix: String,
    /// Optional read-only mirror of the subtotal, written only when the
    /// form actually has it.
    pub subtotal_display_suffix: Option<String>,
}

impl Default for FormProfile {
    fn default() -> Self {
        Self {
            prefix: "invoiceitem_set".to_string(),
            item_type_suffix: "item_type".to_string(),
            product_suffix: "product".to_string(),
            service_suffix: "service".to_string(),
            quantity_suffix: "quantity".to_string(),
            unit_price_suffix: "unit_price".to_string(),
            discount_suffix: "discount".to_string(),
            subtotal_suffix: "subtotal".to_string(),
            subtotal_display_suffix: None,
        }
    }
}

/// Price lookup endpoints. Path templates carry an `{id}` placeholder;
/// the payload field names differ between products and services on the
/// backend (`price_per_unit` vs `base_price`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiProfile {
    pub base_url: String,
    pub product_path: String,
    pub service_path: String,
    pub product_price_field: String,
    pub service_price_field: String,
    pub timeout_seconds: u64,
}

impl Default for ApiProfile {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            product_path: "/api/products/{id}/".to_string(),
            service_path: "/api/services/{id}/".to_string(),
            product_price_field: "price_per_unit".to_string(),
            service_price_field: "base_price".to_string(),
            timeout_seconds: 10,
        }
    }
}

impl SyncProfile {
    /// 從 TOML 檔案載入 profile
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let profile: SyncProfile = toml::from_str(&content)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Built-in default: the Django admin inline flavor.
    pub fn admin_inline(base_url: &str) -> Self {
        Self {
            profile: ProfileMeta {
                name: "admin-inline".to_string(),
                description: "Django admin invoice item inline".to_string(),
                version: "1.0.0".to_string(),
            },
            form: FormProfile::default(),
            api: ApiProfile {
                base_url: base_url.to_string(),
                ..ApiProfile::default()
            },
        }
    }
}

impl Validate for SyncProfile {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("profile.name", &self.profile.name)?;

        validate_non_empty_string("form.prefix", &self.form.prefix)?;
        if self.form.prefix.contains('-') {
            // '-' 是欄位名的分隔符，prefix 內不可出現
            return Err(SyncError::InvalidConfigValueError {
                field: "form.prefix".to_string(),
                value: self.form.prefix.clone(),
                reason: "Prefix cannot contain '-', it separates name segments".to_string(),
            });
        }
        for (field, suffix) in [
            ("form.item_type_suffix", &self.form.item_type_suffix),
            ("form.product_suffix", &self.form.product_suffix),
            ("form.service_suffix", &self.form.service_suffix),
            ("form.quantity_suffix", &self.form.quantity_suffix),
            ("form.unit_price_suffix", &self.form.unit_price_suffix),
            ("form.discount_suffix", &self.form.discount_suffix),
            ("form.subtotal_suffix", &self.form.subtotal_suffix),
        ] {
            validate_non_empty_string(field, suffix)?;
        }

        validate_url("api.base_url", &self.api.base_url)?;
        validate_path_template("api.product_path", &self.api.product_path)?;
        validate_path_template("api.service_path", &self.api.service_path)?;
        validate_non_empty_string("api.product_price_field", &self.api.product_price_field)?;
        validate_non_empty_string("api.service_price_field", &self.api.service_price_field)?;
        validate_positive_number("api.timeout_seconds", self.api.timeout_seconds as usize, 1)?;

        Ok(())
    }
}
