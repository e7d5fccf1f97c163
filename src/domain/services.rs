//! Pure arithmetic for one row. No field access, no side effects.

/// Parse a raw field value as a decimal amount. Empty or non-numeric input
/// counts as 0, matching how the form treats untouched inputs.
pub fn parse_amount(raw: &str) -> f64 {
    raw.trim().parse::<f64>().unwrap_or(0.0)
}

/// `quantity * unit_price - discount`. Negative results are legitimate
/// (a discount may exceed the line total) and are not clamped.
pub fn subtotal(quantity: f64, unit_price: f64, discount: f64) -> f64 {
    quantity * unit_price - discount
}

/// Fixed two-decimal rendering, the precision the backend stores.
pub fn format_amount(value: f64) -> String {
    format!("{:.2}", value)
}
