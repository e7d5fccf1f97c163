use std::sync::Arc;

use crate::core::locator::FieldConvention;
use crate::domain::model::{EntityId, FieldRole, ItemKind, RowKey};
use crate::domain::ports::{FieldStore, PriceSource};
use crate::domain::services::{format_amount, parse_amount, subtotal};

/// Outcome of one spawned resolution, folded into the run stats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOutcome {
    Applied,
    Failed,
    Discarded,
}

/// Resolve the price for one row and write it back.
///
/// The row key and the field names derived from it are captured by value
/// before the await point, so a resolution that completes while other rows'
/// lookups are in flight can only ever touch its own row. A row removed
/// mid-lookup makes the write miss, and the result is dropped silently.
pub async fn resolve_and_apply<F, P>(
    form: Arc<F>,
    source: Arc<P>,
    convention: Arc<FieldConvention>,
    row: RowKey,
    kind: ItemKind,
    id: EntityId,
) -> LookupOutcome
where
    F: FieldStore + ?Sized,
    P: PriceSource + ?Sized,
{
    tracing::debug!("📡 Resolving {} price for {} (id={})", kind, row, id);

    let quote = match source.price_of(kind, &id).await {
        Ok(quote) => quote,
        Err(e) => {
            // 查詢失敗：價格欄位保持原值，不重試
            tracing::warn!("❌ Price lookup failed for {}: {}", row, e);
            return LookupOutcome::Failed;
        }
    };

    let price_field = convention.field_name(&row, FieldRole::UnitPrice);
    if !form.write_field(&price_field, &format_amount(quote.price)) {
        tracing::debug!("Row {} gone before lookup completed, discarding quote", row);
        return LookupOutcome::Discarded;
    }

    tracing::info!("💰 {} unit price set to {}", row, format_amount(quote.price));
    recompute_subtotal(form.as_ref(), &convention, &row);
    LookupOutcome::Applied
}

/// Subtotal Calculator: read the row's current quantity, unit price and
/// discount, write back `quantity * unit_price - discount` at two decimals.
/// Missing or non-numeric inputs count as 0; negative results stand.
pub fn recompute_subtotal<F>(form: &F, convention: &FieldConvention, row: &RowKey) -> bool
where
    F: FieldStore + ?Sized,
{
    let read = |role: FieldRole| {
        form.read_field(&convention.field_name(row, role))
            .unwrap_or_default()
    };

    let quantity = parse_amount(&read(FieldRole::Quantity));
    let unit_price = parse_amount(&read(FieldRole::UnitPrice));
    let discount = parse_amount(&read(FieldRole::Discount));

    let value = format_amount(subtotal(quantity, unit_price, discount));

    let subtotal_field = convention.field_name(row, FieldRole::Subtotal);
    let written = form.write_field(&subtotal_field, &value);
    if !written {
        tracing::debug!("Row {} has no subtotal field, skipping write", row);
        return false;
    }

    // 顯示欄位只在表單有它時才寫
    if let Some(display) = convention.subtotal_display_name(row) {
        form.write_field(&display, &value);
    }

    tracing::debug!("🧮 {} subtotal = {}", row, value);
    true
}
