//! The card ledger: deposits and withdrawals that move a card's balance.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error,
    card::CardId,
    currency::format_currency,
    database_id::DatabaseId,
    date_range::DateRange,
    text_enum::text_enum,
    transaction::{
        MAX_DESCRIPTION_LENGTH, MAX_NOTES_LENGTH, MAX_REFERENCE_LENGTH, TransactionStatus,
        default_status, validate_amount, validate_length,
    },
};

/// Database identifier for a card transaction.
pub type CardTransactionId = DatabaseId;

text_enum! {
    /// Whether money was put on or taken off a card.
    pub enum CardTransactionType ("card transaction type") {
        Deposit => "Deposit",
        Withdrawal => "Withdrawal",
    }
}

text_enum! {
    /// What a card transaction was for.
    pub enum CardTransactionCategory ("card transaction category") {
        YouTubePremium => "YouTube Premium",
        ManualDeposit => "Manual Deposit",
        AutomaticPayment => "Automatic Payment",
        Refund => "Refund",
        Other => "Other",
    }
}

/// Apply a deposit or withdrawal of `amount` to `balance`, returning the new balance.
///
/// # Errors
/// Returns [Error::InsufficientBalance] if a withdrawal is larger than `balance`.
pub fn apply_transaction(
    balance: f64,
    transaction_type: CardTransactionType,
    amount: f64,
) -> Result<f64, Error> {
    match transaction_type {
        CardTransactionType::Deposit => Ok(balance + amount),
        CardTransactionType::Withdrawal if amount > balance => {
            Err(Error::InsufficientBalance { balance, amount })
        }
        CardTransactionType::Withdrawal => Ok(balance - amount),
    }
}

/// A deposit to or withdrawal from a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransaction {
    /// The ID of the card transaction.
    pub id: CardTransactionId,
    /// The card whose balance changed.
    pub card_id: CardId,
    pub date: Date,
    /// The amount of money, always positive.
    pub amount: f64,
    pub description: String,
    #[serde(rename = "type")]
    pub transaction_type: CardTransactionType,
    pub category: CardTransactionCategory,
    pub status: TransactionStatus,
    pub reference_number: String,
    pub notes: String,
    /// The card balance right after this transaction, fixed when it is recorded.
    pub balance_after: f64,
}

/// The data needed to record a card transaction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransactionForm {
    pub date: Date,
    pub amount: f64,
    pub description: String,
    #[serde(rename = "type")]
    pub transaction_type: CardTransactionType,
    #[serde(default = "default_category")]
    pub category: CardTransactionCategory,
    #[serde(default = "default_status")]
    pub status: TransactionStatus,
    #[serde(default)]
    pub reference_number: String,
    #[serde(default)]
    pub notes: String,
}

fn default_category() -> CardTransactionCategory {
    CardTransactionCategory::Other
}

impl CardTransactionForm {
    /// The deposit that records a card's opening balance.
    pub fn opening_balance(date: Date, amount: f64) -> Self {
        Self {
            date,
            amount,
            description: "Opening balance".to_owned(),
            transaction_type: CardTransactionType::Deposit,
            category: CardTransactionCategory::ManualDeposit,
            status: TransactionStatus::Completed,
            reference_number: String::new(),
            notes: String::new(),
        }
    }

    /// Check the form and normalise the text fields.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the amount is not positive, the
    /// description is missing or any text field is too long.
    pub fn validate(mut self) -> Result<Self, Error> {
        self.description = self.description.trim().to_owned();
        self.reference_number = self.reference_number.trim().to_owned();
        self.notes = self.notes.trim().to_owned();

        validate_amount(self.amount)?;

        if self.description.is_empty() {
            return Err(Error::Validation("Description is required".to_owned()));
        }

        validate_length("Description", &self.description, MAX_DESCRIPTION_LENGTH)?;
        validate_length("Reference number", &self.reference_number, MAX_REFERENCE_LENGTH)?;
        validate_length("Notes", &self.notes, MAX_NOTES_LENGTH)?;

        Ok(self)
    }

    /// Build the card transaction this form describes.
    pub fn into_card_transaction(
        self,
        id: CardTransactionId,
        card_id: CardId,
        balance_after: f64,
    ) -> CardTransaction {
        CardTransaction {
            id,
            card_id,
            date: self.date,
            amount: self.amount,
            description: self.description,
            transaction_type: self.transaction_type,
            category: self.category,
            status: self.status,
            reference_number: self.reference_number,
            notes: self.notes,
            balance_after,
        }
    }
}

/// A card transaction with its amounts formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardTransactionView {
    #[serde(flatten)]
    pub transaction: CardTransaction,
    pub formatted_amount: String,
    pub formatted_balance_after: String,
}

impl From<CardTransaction> for CardTransactionView {
    fn from(transaction: CardTransaction) -> Self {
        Self {
            formatted_amount: format_currency(transaction.amount),
            formatted_balance_after: format_currency(transaction.balance_after),
            transaction,
        }
    }
}

/// Which card transactions to include in a list.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CardTransactionFilter {
    pub transaction_type: Option<CardTransactionType>,
    pub category: Option<CardTransactionCategory>,
    pub date_range: DateRange,
}

impl CardTransactionFilter {
    /// Whether `transaction` passes every set filter.
    pub fn matches(&self, transaction: &CardTransaction) -> bool {
        self.transaction_type
            .is_none_or(|transaction_type| transaction.transaction_type == transaction_type)
            && self
                .category
                .is_none_or(|category| transaction.category == category)
            && self.date_range.contains(transaction.date)
    }
}

/// The money put on and taken off a card.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerTotals {
    pub total_deposits: f64,
    pub total_withdrawals: f64,
}

impl LedgerTotals {
    /// Sum the deposits and withdrawals in `transactions`.
    pub fn of<'a>(transactions: impl IntoIterator<Item = &'a CardTransaction>) -> Self {
        transactions
            .into_iter()
            .fold(Self::default(), |mut totals, transaction| {
                match transaction.transaction_type {
                    CardTransactionType::Deposit => totals.total_deposits += transaction.amount,
                    CardTransactionType::Withdrawal => {
                        totals.total_withdrawals += transaction.amount
                    }
                }

                totals
            })
    }

    /// Deposits less withdrawals.
    pub fn balance(&self) -> f64 {
        self.total_deposits - self.total_withdrawals
    }
}
