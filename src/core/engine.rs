use std::sync::Arc;

use tokio::sync::mpsc::Receiver;

use crate::core::locator::FieldConvention;
use crate::core::watcher::{RowWatcher, WatcherStats};
use crate::domain::model::{FieldRole, ItemKind, RowEvent};
use crate::domain::ports::{FieldStore, PriceSource};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Wires one form, one price source and one field convention into a
/// running watcher, and reports a run summary at the end.
pub struct SyncEngine<F, P>
where
    F: FieldStore + ?Sized + 'static,
    P: PriceSource + ?Sized + 'static,
{
    form: Arc<F>,
    source: Arc<P>,
    convention: Arc<FieldConvention>,
    monitor: SystemMonitor,
}

impl<F, P> SyncEngine<F, P>
where
    F: FieldStore + ?Sized + 'static,
    P: PriceSource + ?Sized + 'static,
{
    pub fn new(form: Arc<F>, source: Arc<P>, convention: FieldConvention) -> Self {
        Self::new_with_monitoring(form, source, convention, false)
    }

    pub fn new_with_monitoring(
        form: Arc<F>,
        source: Arc<P>,
        convention: FieldConvention,
        monitor_enabled: bool,
    ) -> Self {
        Self {
            form,
            source,
            convention: Arc::new(convention),
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub fn convention(&self) -> &FieldConvention {
        &self.convention
    }

    /// Bind the rows already in the form, then consume events until the
    /// channel closes and every in-flight lookup has landed.
    pub async fn run(&self, events: Receiver<RowEvent>) -> Result<WatcherStats> {
        tracing::info!("Starting line-item sync...");

        let mut watcher = RowWatcher::new(
            self.form.clone(),
            self.source.clone(),
            self.convention.clone(),
        );

        let bound = watcher.bind_existing();
        tracing::info!("🔗 Bound {} existing rows", bound);
        self.monitor.log_stats("bind");

        let stats = watcher.run(events).await;

        tracing::info!(
            "✅ Sync finished: {} events, {} rows bound, {} lookups applied, {} failed, {} discarded, {} subtotal recomputes",
            stats.events_handled,
            stats.rows_bound,
            stats.lookups_applied,
            stats.lookups_failed,
            stats.lookups_discarded,
            stats.recomputes
        );
        self.monitor.log_final_stats();

        Ok(stats)
    }
}

/// Plan the synthetic change events for one reconcile pass over a loaded
/// snapshot: a selector change for every row whose price needs resolving,
/// plus a quantity change per row so every subtotal is recomputed.
///
/// The selector to resolve comes from the item-type field when the form
/// has one; flavors without it (the client-facing editor) infer it from
/// whichever selector holds a value. An explicit `other` resolves nothing.
pub fn plan_reconcile<F>(
    form: &F,
    convention: &FieldConvention,
    force_refresh: bool,
) -> Vec<RowEvent>
where
    F: FieldStore + ?Sized,
{
    let mut events = Vec::new();

    for row in convention.rows_in(&form.field_names()) {
        let read = |role: FieldRole| {
            form.read_field(&convention.field_name(&row, role))
                .unwrap_or_default()
        };

        let item_type = form.read_field(&convention.field_name(&row, FieldRole::ItemType));
        let selector_role = match item_type {
            Some(raw) if !raw.trim().is_empty() => match ItemKind::from_field_value(&raw) {
                ItemKind::Product => Some(FieldRole::ProductSelect),
                ItemKind::Service => Some(FieldRole::ServiceSelect),
                ItemKind::Other => None,
            },
            // 沒有 item_type 欄位（或留空）：看哪個選擇器有值
            _ => {
                if !read(FieldRole::ProductSelect).trim().is_empty() {
                    Some(FieldRole::ProductSelect)
                } else if !read(FieldRole::ServiceSelect).trim().is_empty() {
                    Some(FieldRole::ServiceSelect)
                } else {
                    None
                }
            }
        };

        if let Some(role) = selector_role {
            let has_selection = !read(role).trim().is_empty();
            let price_missing = read(FieldRole::UnitPrice).trim().is_empty();
            if has_selection && (price_missing || force_refresh) {
                events.push(RowEvent::FieldChanged {
                    field: convention.field_name(&row, role),
                });
            }
        }

        events.push(RowEvent::FieldChanged {
            field: convention.field_name(&row, FieldRole::Quantity),
        });
    }

    events
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::form::InMemoryForm;
    use crate::config::profile::FormProfile;

    fn fixture() -> (InMemoryForm, FieldConvention) {
        let profile = FormProfile::default();
        let form = InMemoryForm::new();
        form.insert_row("invoiceitem_set", 0, &profile);
        form.insert_row("invoiceitem_set", 1, &profile);
        let convention = FieldConvention::from_profile(&profile).unwrap();
        (form, convention)
    }

    #[test]
    fn test_plan_reconcile_resolves_rows_with_missing_prices() {
        let (form, convention) = fixture();
        form.write_field("invoiceitem_set-0-item_type", "product");
        form.write_field("invoiceitem_set-0-product", "7");
        form.write_field("invoiceitem_set-1-item_type", "service");
        form.write_field("invoiceitem_set-1-service", "2");
        form.write_field("invoiceitem_set-1-unit_price", "45.50");

        let events = plan_reconcile(&form, &convention, false);

        // Row 0 缺價格：選擇器事件 + 數量事件；row 1 已有價格：只有數量事件
        assert_eq!(
            events,
            vec![
                RowEvent::FieldChanged {
                    field: "invoiceitem_set-0-product".to_string()
                },
                RowEvent::FieldChanged {
                    field: "invoiceitem_set-0-quantity".to_string()
                },
                RowEvent::FieldChanged {
                    field: "invoiceitem_set-1-quantity".to_string()
                },
            ]
        );
    }

    #[test]
    fn test_plan_reconcile_force_refresh_re_resolves_priced_rows() {
        let (form, convention) = fixture();
        form.write_field("invoiceitem_set-0-item_type", "service");
        form.write_field("invoiceitem_set-0-service", "3");
        form.write_field("invoiceitem_set-0-unit_price", "99.00");

        let events = plan_reconcile(&form, &convention, true);
        assert!(events.contains(&RowEvent::FieldChanged {
            field: "invoiceitem_set-0-service".to_string()
        }));
    }

    #[test]
    fn test_plan_reconcile_explicit_other_resolves_nothing() {
        let (form, convention) = fixture();
        form.write_field("invoiceitem_set-0-item_type", "other");
        form.write_field("invoiceitem_set-0-product", "7");

        let events = plan_reconcile(&form, &convention, true);
        assert!(!events.contains(&RowEvent::FieldChanged {
            field: "invoiceitem_set-0-product".to_string()
        }));
    }

    #[test]
    fn test_plan_reconcile_infers_selector_without_item_type_field() {
        // invoice-details 風格：表單沒有 item_type 欄位
        let profile = FormProfile {
            prefix: "items".to_string(),
            ..FormProfile::default()
        };
        let convention = FieldConvention::from_profile(&profile).unwrap();

        let form = InMemoryForm::new();
        form.insert_row("items", 0, &profile);
        form.remove_field("items-0-item_type");
        form.write_field("items-0-service", "5");

        let events = plan_reconcile(&form, &convention, false);
        assert!(events.contains(&RowEvent::FieldChanged {
            field: "items-0-service".to_string()
        }));
    }
}
