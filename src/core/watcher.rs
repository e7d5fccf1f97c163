use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::Receiver;
use tokio::task::JoinSet;

use crate::core::locator::FieldConvention;
use crate::core::resolver::{recompute_subtotal, resolve_and_apply, LookupOutcome};
use crate::domain::model::{EntityId, FieldRole, ItemKind, RowEvent, RowKey};
use crate::domain::ports::{FieldStore, PriceSource};

/// Counters reported at the end of a watcher run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatcherStats {
    pub events_handled: u64,
    pub rows_bound: u64,
    pub lookups_applied: u64,
    pub lookups_failed: u64,
    pub lookups_discarded: u64,
    pub recomputes: u64,
}

/// Row Watcher: consumes the form's row lifecycle events and keeps every
/// bound row's unit price and subtotal in sync.
///
/// Binding is idempotent: rows are tracked by `RowKey` identity, so a
/// repeated row-added signal never attaches a second handler and never
/// causes duplicate recomputation. Field changes for rows that were never
/// announced (or already removed) are skipped.
pub struct RowWatcher<F, P>
where
    F: FieldStore + ?Sized + 'static,
    P: PriceSource + ?Sized + 'static,
{
    form: Arc<F>,
    source: Arc<P>,
    convention: Arc<FieldConvention>,
    bound: HashSet<RowKey>,
    lookups: JoinSet<LookupOutcome>,
    stats: WatcherStats,
}

impl<F, P> RowWatcher<F, P>
where
    F: FieldStore + ?Sized + 'static,
    P: PriceSource + ?Sized + 'static,
{
    pub fn new(form: Arc<F>, source: Arc<P>, convention: Arc<FieldConvention>) -> Self {
        Self {
            form,
            source,
            convention,
            bound: HashSet::new(),
            lookups: JoinSet::new(),
            stats: WatcherStats::default(),
        }
    }

    /// Bind every row already present in the form. Returns how many rows
    /// were bound.
    pub fn bind_existing(&mut self) -> usize {
        let rows = self.convention.rows_in(&self.form.field_names());
        let mut bound = 0;
        for row in rows {
            if self.bind(row) {
                bound += 1;
            }
        }
        bound
    }

    fn bind(&mut self, row: RowKey) -> bool {
        if self.bound.insert(row.clone()) {
            tracing::debug!("🔗 Bound row {}", row);
            self.stats.rows_bound += 1;
            true
        } else {
            // 重複的 row-added 訊號：綁定保持一次
            tracing::debug!("Row {} already bound, ignoring duplicate signal", row);
            false
        }
    }

    /// Consume events until the channel closes, then drain in-flight
    /// lookups so every spawned resolution lands (or is discarded) before
    /// the stats are returned.
    pub async fn run(mut self, mut events: Receiver<RowEvent>) -> WatcherStats {
        while let Some(event) = events.recv().await {
            self.stats.events_handled += 1;
            self.handle(event);

            // 機會性回收已完成的查詢
            while let Some(res) = self.lookups.try_join_next() {
                self.record(res);
            }
        }

        while let Some(res) = self.lookups.join_next().await {
            self.record(res);
        }

        self.stats
    }

    fn handle(&mut self, event: RowEvent) {
        match event {
            RowEvent::RowAdded { row } => {
                self.bind(row);
            }
            RowEvent::RowRemoved { row } => {
                if self.bound.remove(&row) {
                    tracing::debug!("Unbound row {}", row);
                }
            }
            RowEvent::FieldChanged { field } => self.on_field_changed(&field),
        }
    }

    fn on_field_changed(&mut self, field: &str) {
        let (row, role) = match self.convention.locate(field) {
            Ok(located) => located,
            Err(e) => {
                // 不在任何列內的欄位：靜默跳過
                tracing::debug!("{}", e);
                return;
            }
        };

        if !self.bound.contains(&row) {
            tracing::debug!("Change on unbound row {}, skipping", row);
            return;
        }

        match role {
            FieldRole::ProductSelect => self.spawn_lookup(row, ItemKind::Product),
            FieldRole::ServiceSelect => self.spawn_lookup(row, ItemKind::Service),
            FieldRole::ItemType => self.on_item_type_changed(row),
            FieldRole::Quantity | FieldRole::UnitPrice | FieldRole::Discount => {
                if recompute_subtotal(self.form.as_ref(), &self.convention, &row) {
                    self.stats.recomputes += 1;
                }
            }
            // 小計是導出值，使用者改它不觸發任何事
            FieldRole::Subtotal => {}
        }
    }

    /// The backend derives the unit price from the entity the item type
    /// points at, so a kind change re-resolves from the now-relevant
    /// selector. `Other` rows have no catalog entity.
    fn on_item_type_changed(&mut self, row: RowKey) {
        let type_field = self.convention.field_name(&row, FieldRole::ItemType);
        let raw = self.form.read_field(&type_field).unwrap_or_default();

        match ItemKind::from_field_value(&raw) {
            ItemKind::Product => self.spawn_lookup(row, ItemKind::Product),
            ItemKind::Service => self.spawn_lookup(row, ItemKind::Service),
            ItemKind::Other => {
                tracing::debug!("Row {} switched to 'other', nothing to resolve", row);
            }
        }
    }

    fn spawn_lookup(&mut self, row: RowKey, kind: ItemKind) {
        let selector_role = match kind {
            ItemKind::Product => FieldRole::ProductSelect,
            ItemKind::Service => FieldRole::ServiceSelect,
            ItemKind::Other => return,
        };

        let selector = self.convention.field_name(&row, selector_role);
        let raw = self.form.read_field(&selector).unwrap_or_default();

        let id = match EntityId::new(&raw) {
            Ok(id) => id,
            // 選擇器為空（尚未選擇）：不查詢
            Err(_) => {
                tracing::debug!("Row {} has no {} selected, skipping lookup", row, kind);
                return;
            }
        };

        // Capture everything the resolution needs by value now; the result
        // can then only be matched back to this row, however late it lands.
        self.lookups.spawn(resolve_and_apply(
            self.form.clone(),
            self.source.clone(),
            self.convention.clone(),
            row,
            kind,
            id,
        ));
    }

    fn record(&mut self, res: Result<LookupOutcome, tokio::task::JoinError>) {
        match res {
            Ok(LookupOutcome::Applied) => self.stats.lookups_applied += 1,
            Ok(LookupOutcome::Failed) => self.stats.lookups_failed += 1,
            Ok(LookupOutcome::Discarded) => self.stats.lookups_discarded += 1,
            Err(e) => {
                tracing::error!("Lookup task panicked: {}", e);
                self.stats.lookups_failed += 1;
            }
        }
    }
}
