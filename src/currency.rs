//! Display formatting for money amounts.

/// The currency prefix used when displaying amounts.
pub const CURRENCY_PREFIX: &str = "RM";

/// Format `amount` with the currency prefix and exactly two decimal places,
/// e.g. `RM18.99` or `-RM3.79`.
pub fn format_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-{CURRENCY_PREFIX}{:.2}", amount.abs())
    } else {
        format!("{CURRENCY_PREFIX}{amount:.2}")
    }
}
