use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use crate::config::profile::ApiProfile;
use crate::domain::model::{EntityId, ItemKind, PriceQuote};
use crate::domain::ports::PriceSource;
use crate::utils::error::{Result, SyncError};

/// Price lookups against the backend's catalog API. One GET per
/// resolution; products and services live on different paths and name
/// their price field differently.
pub struct HttpPriceSource {
    client: Client,
    api: ApiProfile,
}

impl HttpPriceSource {
    pub fn new(api: ApiProfile) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.timeout_seconds))
            .build()?;
        Ok(Self { client, api })
    }

    fn lookup_url(&self, kind: ItemKind, id: &EntityId) -> Result<String> {
        let template = match kind {
            ItemKind::Product => &self.api.product_path,
            ItemKind::Service => &self.api.service_path,
            ItemKind::Other => {
                return Err(SyncError::ProcessingError {
                    message: "items of kind 'other' have no lookup endpoint".to_string(),
                })
            }
        };

        let path = template.replace("{id}", id.as_str());
        let url = format!("{}{}", self.api.base_url.trim_end_matches('/'), path);

        // 確認替換後仍是合法 URL（id 來自表單值）
        url::Url::parse(&url).map_err(|e| SyncError::ProcessingError {
            message: format!("built invalid lookup URL '{}': {}", url, e),
        })?;

        Ok(url)
    }

    fn price_field(&self, kind: ItemKind) -> &str {
        match kind {
            ItemKind::Product => &self.api.product_price_field,
            _ => &self.api.service_price_field,
        }
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn price_of(&self, kind: ItemKind, id: &EntityId) -> Result<PriceQuote> {
        let url = self.lookup_url(kind, id)?;

        tracing::debug!("📡 GET {}", url);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::LookupError {
                url,
                status: status.as_u16(),
            });
        }

        let payload: serde_json::Value = response.json().await?;
        let field = self.price_field(kind);

        // Django 的 DecimalField 會序列化成字串，數字與字串都接受
        let price = match payload.get(field) {
            Some(serde_json::Value::Number(n)) => {
                n.as_f64().ok_or_else(|| SyncError::PayloadError {
                    url: url.clone(),
                    message: format!("'{}' is not a finite number", field),
                })?
            }
            Some(serde_json::Value::String(s)) => {
                s.trim().parse::<f64>().map_err(|_| SyncError::PayloadError {
                    url: url.clone(),
                    message: format!("'{}' is not numeric: '{}'", field, s),
                })?
            }
            Some(_) => {
                return Err(SyncError::PayloadError {
                    url,
                    message: format!("'{}' has an unexpected type", field),
                })
            }
            None => {
                return Err(SyncError::PayloadError {
                    url,
                    message: format!("missing '{}' field", field),
                })
            }
        };

        Ok(PriceQuote {
            entity_id: id.clone(),
            kind,
            price,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn source_for(server: &MockServer) -> HttpPriceSource {
        HttpPriceSource::new(ApiProfile {
            base_url: server.base_url(),
            ..ApiProfile::default()
        })
        .unwrap()
    }

    #[test]
    fn test_product_lookup_parses_numeric_price() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/api/products/7/");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": 7, "price_per_unit": 150.0}));
        });

        let source = source_for(&server);
        let quote = tokio_test::block_on(
            source.price_of(ItemKind::Product, &EntityId::new("7").unwrap()),
        )
        .unwrap();

        mock.assert();
        assert_eq!(quote.price, 150.0);
        assert_eq!(quote.kind, ItemKind::Product);
        assert_eq!(quote.entity_id.as_str(), "7");
    }

    #[test]
    fn test_service_lookup_accepts_decimal_string() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/services/2/");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": 2, "base_price": "45.50"}));
        });

        let source = source_for(&server);
        let quote = tokio_test::block_on(
            source.price_of(ItemKind::Service, &EntityId::new("2").unwrap()),
        )
        .unwrap();

        assert_eq!(quote.price, 45.5);
    }

    #[test]
    fn test_not_found_becomes_lookup_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/products/999/");
            then.status(404);
        });

        let source = source_for(&server);
        let err = tokio_test::block_on(
            source.price_of(ItemKind::Product, &EntityId::new("999").unwrap()),
        )
        .unwrap_err();

        match err {
            SyncError::LookupError { status, .. } => assert_eq!(status, 404),
            other => panic!("expected LookupError, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_price_field_becomes_payload_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/products/7/");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": 7, "name": "Cinta decorativa"}));
        });

        let source = source_for(&server);
        let err = tokio_test::block_on(
            source.price_of(ItemKind::Product, &EntityId::new("7").unwrap()),
        )
        .unwrap_err();

        assert!(matches!(err, SyncError::PayloadError { .. }));
    }

    #[test]
    fn test_non_numeric_price_string_becomes_payload_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/services/3/");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"base_price": "consultar"}));
        });

        let source = source_for(&server);
        let err = tokio_test::block_on(
            source.price_of(ItemKind::Service, &EntityId::new("3").unwrap()),
        )
        .unwrap_err();

        assert!(matches!(err, SyncError::PayloadError { .. }));
    }

    #[test]
    fn test_other_kind_has_no_endpoint() {
        let server = MockServer::start();
        let source = source_for(&server);
        let err = tokio_test::block_on(
            source.price_of(ItemKind::Other, &EntityId::new("1").unwrap()),
        )
        .unwrap_err();

        assert!(matches!(err, SyncError::ProcessingError { .. }));
    }

    #[test]
    fn test_admin_prefixed_paths_from_profile() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/admin/api/products/4/");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"price_per_unit": 12}));
        });

        let source = HttpPriceSource::new(ApiProfile {
            base_url: server.base_url(),
            product_path: "/admin/api/products/{id}/".to_string(),
            ..ApiProfile::default()
        })
        .unwrap();

        let quote = tokio_test::block_on(
            source.price_of(ItemKind::Product, &EntityId::new("4").unwrap()),
        )
        .unwrap();

        mock.assert();
        assert_eq!(quote.price, 12.0);
    }
}
