//! Core transaction domain types and the income/outgoing summary.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, currency::format_currency, database_id::DatabaseId, date_range::DateRange,
    member::MemberId, text_enum::text_enum,
};

/// Database identifier for a transaction.
pub type TransactionId = DatabaseId;

pub(crate) const MAX_DESCRIPTION_LENGTH: usize = 200;
pub(crate) const MAX_REFERENCE_LENGTH: usize = 50;
pub(crate) const MAX_NOTES_LENGTH: usize = 500;

text_enum! {
    /// Whether money came in or went out.
    pub enum TransactionType ("transaction type") {
        /// Money received, always from a member.
        Incoming => "Incoming",
        /// Money spent.
        Outgoing => "Outgoing",
    }
}

text_enum! {
    /// What a transaction was for.
    pub enum TransactionCategory ("category") {
        Subscription => "Subscription",
        MemberPayment => "Member Payment",
        General => "General",
        Refund => "Refund",
        Other => "Other",
    }
}

text_enum! {
    /// How a transaction was paid.
    pub enum PaymentMethod ("payment method") {
        BankTransfer => "Bank Transfer",
        Cash => "Cash",
        CreditCard => "Credit Card",
        EWallet => "E-Wallet",
        Other => "Other",
    }
}

text_enum! {
    /// The processing state of a transaction, shared with card transactions.
    pub enum TransactionStatus ("status") {
        Completed => "Completed",
        Pending => "Pending",
        Failed => "Failed",
        Cancelled => "Cancelled",
    }
}

/// Money moving in or out of the shared pot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// When the transaction happened.
    pub date: Date,
    /// The amount of money, always positive.
    pub amount: f64,
    /// The member who paid, `None` for general costs.
    pub member_id: Option<MemberId>,
    /// A short description of the transaction.
    pub description: String,
    /// Whether money came in or went out.
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    /// What the transaction was for.
    pub category: TransactionCategory,
    /// How the transaction was paid.
    pub payment_method: PaymentMethod,
    /// The processing state of the transaction.
    pub status: TransactionStatus,
    /// An optional receipt number.
    pub receipt_number: String,
    /// Free-form notes.
    pub notes: String,
}

/// The data needed to create or replace a transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionForm {
    pub date: Date,
    pub amount: f64,
    #[serde(default)]
    pub member_id: Option<MemberId>,
    pub description: String,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    #[serde(default = "default_category")]
    pub category: TransactionCategory,
    #[serde(default = "default_payment_method")]
    pub payment_method: PaymentMethod,
    #[serde(default = "default_status")]
    pub status: TransactionStatus,
    #[serde(default)]
    pub receipt_number: String,
    #[serde(default)]
    pub notes: String,
}

fn default_category() -> TransactionCategory {
    TransactionCategory::Other
}

fn default_payment_method() -> PaymentMethod {
    PaymentMethod::Other
}

pub(crate) fn default_status() -> TransactionStatus {
    TransactionStatus::Completed
}

/// Check that `amount` is a positive number.
///
/// # Errors
/// Returns [Error::Validation] if `amount` is zero, negative or not a number.
pub fn validate_amount(amount: f64) -> Result<(), Error> {
    if amount > 0.0 && amount.is_finite() {
        Ok(())
    } else {
        Err(Error::Validation("Amount must be greater than 0".to_owned()))
    }
}

/// Check `text` is at most `max_length` characters.
pub(crate) fn validate_length(field: &str, text: &str, max_length: usize) -> Result<(), Error> {
    if text.chars().count() > max_length {
        Err(Error::Validation(format!(
            "{field} cannot exceed {max_length} characters"
        )))
    } else {
        Ok(())
    }
}

impl TransactionForm {
    /// Check the form and normalise the text fields.
    ///
    /// Whether a set member ID refers to an existing member is left to the store.
    ///
    /// # Errors
    /// Returns a:
    /// - [Error::Validation] if the amount is not positive, the description is
    ///   missing or any text field is too long,
    /// - or [Error::IncomingWithoutMember] for an incoming transaction with no member.
    pub fn validate(mut self) -> Result<Self, Error> {
        self.description = self.description.trim().to_owned();
        self.receipt_number = self.receipt_number.trim().to_owned();
        self.notes = self.notes.trim().to_owned();

        validate_amount(self.amount)?;

        if self.description.is_empty() {
            return Err(Error::Validation("Description is required".to_owned()));
        }

        validate_length("Description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validate_length("Receipt number", &self.receipt_number, MAX_REFERENCE_LENGTH)?;
        validate_length("Notes", &self.notes, MAX_NOTES_LENGTH)?;

        if self.transaction_type == TransactionType::Incoming && self.member_id.is_none() {
            return Err(Error::IncomingWithoutMember);
        }

        Ok(self)
    }

    /// Build the transaction this form describes with the given `id`.
    pub fn into_transaction(self, id: TransactionId) -> Transaction {
        Transaction {
            id,
            date: self.date,
            amount: self.amount,
            member_id: self.member_id,
            description: self.description,
            transaction_type: self.transaction_type,
            category: self.category,
            payment_method: self.payment_method,
            status: self.status,
            receipt_number: self.receipt_number,
            notes: self.notes,
        }
    }
}

/// A transaction with its amount formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    #[serde(flatten)]
    pub transaction: Transaction,
    /// The amount with the currency prefix, e.g. "RM3.79".
    pub formatted_amount: String,
}

impl From<Transaction> for TransactionView {
    fn from(transaction: Transaction) -> Self {
        Self {
            formatted_amount: format_currency(transaction.amount),
            transaction,
        }
    }
}

/// Which transactions to include in a list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransactionFilter {
    pub transaction_type: Option<TransactionType>,
    pub member_id: Option<MemberId>,
    pub category: Option<TransactionCategory>,
    pub status: Option<TransactionStatus>,
    pub date_range: DateRange,
}

impl TransactionFilter {
    /// Whether `transaction` passes every set filter.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.transaction_type
            .is_none_or(|transaction_type| transaction.transaction_type == transaction_type)
            && self
                .member_id
                .is_none_or(|member_id| transaction.member_id == Some(member_id))
            && self
                .category
                .is_none_or(|category| transaction.category == category)
            && self.status.is_none_or(|status| transaction.status == status)
            && self.date_range.contains(transaction.date)
    }
}

/// Totals of incoming and outgoing money.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub total_income: f64,
    pub total_outgoing: f64,
    /// `total_income - total_outgoing`.
    pub net_balance: f64,
    pub income_count: u32,
    pub outgoing_count: u32,
}

/// Sum the incoming and outgoing amounts of `transactions`.
pub fn summarize<'a>(
    transactions: impl IntoIterator<Item = &'a Transaction>,
) -> TransactionSummary {
    let mut summary = TransactionSummary::default();

    for transaction in transactions {
        match transaction.transaction_type {
            TransactionType::Incoming => {
                summary.total_income += transaction.amount;
                summary.income_count += 1;
            }
            TransactionType::Outgoing => {
                summary.total_outgoing += transaction.amount;
                summary.outgoing_count += 1;
            }
        }
    }

    summary.net_balance = summary.total_income - summary.total_outgoing;

    summary
}

/// Sort `transactions` newest first, the order used by every transaction list.
pub fn sort_newest_first(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
}
