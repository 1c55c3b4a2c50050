//! The API endpoint URIs.
//!
//! Routes with a parameter, e.g. '/api/members/{member_id}', use axum's
//! `{name}` path syntax.

/// Reports whether the server is up.
pub const HEALTH: &str = "/health";

/// The dashboard overview.
pub const DASHBOARD: &str = "/api/dashboard";

/// The route to list and create members.
pub const MEMBERS: &str = "/api/members";
/// The route to get, replace and delete a member.
pub const MEMBER: &str = "/api/members/{member_id}";
/// The route to record that a member has paid.
pub const MARK_MEMBER_PAID: &str = "/api/members/{member_id}/mark-paid";
/// Unpaid members past their due date.
pub const OVERDUE_MEMBERS: &str = "/api/members/overdue";
/// Unpaid members due soon.
pub const UPCOMING_MEMBERS: &str = "/api/members/upcoming";
/// Member counts.
pub const MEMBER_STATS: &str = "/api/members/stats";

/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to get, replace and delete a transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// Income and outgoing totals.
pub const TRANSACTION_STATS: &str = "/api/transactions/stats";
/// The transactions of one member.
pub const MEMBER_TRANSACTIONS: &str = "/api/transactions/member/{member_id}";
/// The transactions in one category.
pub const CATEGORY_TRANSACTIONS: &str = "/api/transactions/category/{category}";

/// The route to list and create cards.
pub const CARDS: &str = "/api/cards";
/// The route to get, replace and delete a card.
pub const CARD: &str = "/api/cards/{card_id}";
/// Active cards expiring soon.
pub const EXPIRING_CARDS: &str = "/api/cards/expiring";
/// A card's balance and ledger totals.
pub const CARD_STATS: &str = "/api/cards/{card_id}/stats";
/// The route to list and record a card's transactions.
pub const CARD_TRANSACTIONS: &str = "/api/cards/{card_id}/transactions";
/// The money needed on a card to pay for the subscription.
pub const CARD_MONEY_NEEDED: &str = "/api/cards/{card_id}/money-needed";

/// The route to get and change the app settings.
pub const SETTINGS: &str = "/api/settings";

/// Replace the parameter in `endpoint_path` with `value`.
///
/// Only the first `{...}` parameter is replaced.
pub fn format_endpoint(endpoint_path: &str, value: impl std::fmt::Display) -> String {
    match (endpoint_path.find('{'), endpoint_path.find('}')) {
        (Some(start), Some(end)) if start < end => format!(
            "{}{value}{}",
            &endpoint_path[..start],
            &endpoint_path[end + 1..]
        ),
        _ => endpoint_path.to_owned(),
    }
}
