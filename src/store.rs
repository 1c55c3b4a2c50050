//! A file-backed store holding all of the app's data as one JSON snapshot.
//!
//! [DataStore] applies the same validation and balance rules as the database,
//! so a snapshot can be edited offline and later imported into a database.

use std::{fs, io, path::Path};

use rusqlite::{Connection, Transaction as SqlTransaction, TransactionBehavior};
use serde::{Deserialize, Serialize};
use time::{Date, macros::date};

use crate::{
    Error,
    card::{
        Card, CardForm, CardTransaction, CardTransactionCategory, CardTransactionFilter,
        CardTransactionForm, CardTransactionType, CardType, DEFAULT_MONTHLY_LIMIT, LedgerTotals,
        apply_transaction, restore_card, restore_card_transaction,
    },
    database_id::DatabaseId,
    member::{
        DEFAULT_MONTHLY_AMOUNT, DEFAULT_YEARLY_AMOUNT, Member, MemberFilter, MemberForm, MemberId,
        PaymentStatus, PaymentType, name_key, next_due_date, restore_member,
    },
    money_needed::{CostSource, money_needed, subscription_cost_from_transactions},
    settings::{AppSettings, save_settings},
    transaction::{
        PaymentMethod, Transaction, TransactionCategory, TransactionFilter, TransactionForm,
        TransactionId, TransactionStatus, TransactionType, restore_transaction, sort_newest_first,
    },
};

/// The ID given to the card when it is first set.
const CARD_ID: DatabaseId = 1;

/// All of the app's data: members, the transaction ledger, the card and its
/// ledger, and the settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataStore {
    members: Vec<Member>,
    transactions: Vec<Transaction>,
    card_detail: Option<Card>,
    card_transactions: Vec<CardTransaction>,
    settings: AppSettings,
}

fn next_id<T>(items: &[T], id: impl Fn(&T) -> DatabaseId) -> DatabaseId {
    items.iter().map(id).max().unwrap_or(0) + 1
}

fn snapshot_error(action: &str, path: &Path, error: impl std::fmt::Display) -> Error {
    tracing::error!("Could not {action} {}: {error}", path.display());
    Error::SnapshotError(format!("could not {action} {}: {error}", path.display()))
}

fn sample_member(
    name: &str,
    payment_status: PaymentStatus,
    last_payment_date: Date,
    next_due_date: Date,
) -> MemberForm {
    MemberForm {
        name: name.to_owned(),
        payment_type: PaymentType::Monthly,
        payment_status,
        last_payment_date,
        next_due_date,
        notes: String::new(),
        is_owner: false,
        monthly_amount: DEFAULT_MONTHLY_AMOUNT,
        yearly_amount: DEFAULT_YEARLY_AMOUNT,
    }
}

fn sample_transaction(
    date: Date,
    amount: f64,
    member_id: Option<MemberId>,
    description: &str,
) -> TransactionForm {
    let (transaction_type, category) = match member_id {
        Some(_) => (TransactionType::Incoming, TransactionCategory::MemberPayment),
        None => (TransactionType::Outgoing, TransactionCategory::General),
    };

    TransactionForm {
        date,
        amount,
        member_id,
        description: description.to_owned(),
        transaction_type,
        category,
        payment_method: PaymentMethod::Other,
        status: TransactionStatus::Completed,
        receipt_number: String::new(),
        notes: String::new(),
    }
}

impl DataStore {
    /// A store with no data and default settings dated `today`.
    pub fn new(today: Date) -> Self {
        Self {
            members: Vec::new(),
            transactions: Vec::new(),
            card_detail: None,
            card_transactions: Vec::new(),
            settings: AppSettings::new(today),
        }
    }

    /// A store with a handful of example members, payments and a funded card.
    ///
    /// # Errors
    /// Returns an error if `today` is too close to the largest supported date.
    pub fn sample(today: Date) -> Result<Self, Error> {
        let mut store = Self::new(today);
        let next_month = next_due_date(PaymentType::Monthly, today)?;

        let members = [
            MemberForm {
                is_owner: true,
                ..sample_member("You (Owner)", PaymentStatus::Paid, today, next_month)
            },
            sample_member(
                "Alice",
                PaymentStatus::Unpaid,
                date!(2025 - 07 - 01),
                date!(2025 - 08 - 01),
            ),
            MemberForm {
                payment_type: PaymentType::Yearly,
                ..sample_member(
                    "Bob",
                    PaymentStatus::Paid,
                    date!(2025 - 01 - 15),
                    date!(2026 - 01 - 15),
                )
            },
            sample_member("Charlie", PaymentStatus::Paid, today, next_month),
            sample_member(
                "Diana",
                PaymentStatus::Unpaid,
                date!(2025 - 07 - 05),
                date!(2025 - 08 - 05),
            ),
        ];
        let notes = [
            "Your own contribution",
            "Friend from college",
            "Brother",
            "Cousin",
            "Sister",
        ];

        let mut member_ids = Vec::with_capacity(members.len());
        for (form, note) in members.into_iter().zip(notes) {
            let member = store.add_member(MemberForm {
                notes: note.to_owned(),
                ..form
            })?;
            member_ids.push(member.id);
        }

        store.add_transaction(TransactionForm {
            category: TransactionCategory::Subscription,
            ..sample_transaction(
                today,
                18.99,
                None,
                "YouTube Premium Monthly Subscription Cost",
            )
        })?;
        store.add_transaction(sample_transaction(
            today,
            DEFAULT_MONTHLY_AMOUNT,
            Some(member_ids[0]),
            "Your contribution",
        ))?;
        store.add_transaction(sample_transaction(
            date!(2025 - 07 - 20),
            DEFAULT_MONTHLY_AMOUNT,
            Some(member_ids[3]),
            "Charlie's monthly payment",
        ))?;
        store.add_transaction(sample_transaction(
            date!(2025 - 01 - 15),
            DEFAULT_YEARLY_AMOUNT,
            Some(member_ids[2]),
            "Bob's yearly payment",
        ))?;

        store.set_card_detail(
            CardForm {
                card_name: "YouTube Card".to_owned(),
                last_four_digits: "1234".parse()?,
                expiry_date: "12/28".parse()?,
                card_type: CardType::Other,
                bank_name: String::new(),
                card_holder_name: String::new(),
                is_active: true,
                notes: "Main card for YouTube Premium".to_owned(),
                monthly_limit: DEFAULT_MONTHLY_LIMIT,
                current_balance: 0.0,
            },
            today,
        )?;

        store.add_card_transaction(CardTransactionForm {
            description: "Initial deposit".to_owned(),
            ..CardTransactionForm::opening_balance(today, 50.0)
        })?;
        store.add_card_transaction(CardTransactionForm {
            date: today,
            amount: 18.99,
            description: "YouTube Premium deduction".to_owned(),
            transaction_type: CardTransactionType::Withdrawal,
            category: CardTransactionCategory::YouTubePremium,
            status: TransactionStatus::Completed,
            reference_number: String::new(),
            notes: String::new(),
        })?;

        Ok(store)
    }

    /// Read the snapshot at `path`.
    ///
    /// If there is no file at `path` the [sample data](DataStore::sample) is returned.
    ///
    /// # Errors
    /// Returns [Error::SnapshotError] if the file cannot be read or is not a valid snapshot.
    pub fn load(path: &Path, today: Date) -> Result<Self, Error> {
        match fs::read_to_string(path) {
            Ok(text) => {
                serde_json::from_str(&text).map_err(|error| snapshot_error("parse", path, error))
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                tracing::info!("No snapshot at {}, using sample data", path.display());
                Self::sample(today)
            }
            Err(error) => Err(snapshot_error("read", path, error)),
        }
    }

    /// Write the whole store to `path`, replacing any existing snapshot.
    ///
    /// The snapshot is written to a temporary file next to `path` and then
    /// renamed over it, so a reader never sees a half written file.
    ///
    /// # Errors
    /// Returns [Error::SnapshotError] if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), Error> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|error| snapshot_error("serialize", path, error))?;
        let temp_path = path.with_extension("tmp");

        fs::write(&temp_path, text).map_err(|error| snapshot_error("write", &temp_path, error))?;
        fs::rename(&temp_path, path).map_err(|error| snapshot_error("replace", path, error))?;
        tracing::debug!("Saved snapshot to {}", path.display());

        Ok(())
    }

    /// The members in the order they were added.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// The transactions, newest first.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// The card paying for the subscription, if one has been set.
    pub fn card_detail(&self) -> Option<&Card> {
        self.card_detail.as_ref()
    }

    /// The card's ledger in the order the transactions were recorded.
    pub fn card_transactions(&self) -> &[CardTransaction] {
        &self.card_transactions
    }

    /// The app settings.
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }

    /// The members that match `filter`, sorted by name ignoring case.
    pub fn find_members(&self, filter: &MemberFilter) -> Vec<&Member> {
        let mut members: Vec<&Member> = self
            .members
            .iter()
            .filter(|member| filter.matches(member))
            .collect();
        members.sort_by_cached_key(|member| (name_key(&member.name), member.id));

        members
    }

    /// The transactions that match `filter`, newest first.
    pub fn find_transactions(&self, filter: &TransactionFilter) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|transaction| filter.matches(transaction))
            .collect()
    }

    /// The card transactions that match `filter`, newest first.
    pub fn find_card_transactions(&self, filter: &CardTransactionFilter) -> Vec<&CardTransaction> {
        let mut transactions: Vec<&CardTransaction> = self
            .card_transactions
            .iter()
            .filter(|transaction| filter.matches(transaction))
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));

        transactions
    }

    fn ensure_unique_name(&self, name: &str, except: Option<MemberId>) -> Result<(), Error> {
        let key = name_key(name);
        let taken = self
            .members
            .iter()
            .any(|member| Some(member.id) != except && name_key(&member.name) == key);

        if taken {
            Err(Error::DuplicateMemberName(name.to_owned()))
        } else {
            Ok(())
        }
    }

    fn member_index(&self, id: MemberId) -> Result<usize, Error> {
        self.members
            .iter()
            .position(|member| member.id == id)
            .ok_or(Error::MemberNotFound)
    }

    /// Add a member from `form`.
    ///
    /// # Errors
    /// Returns [Error::Validation] for an invalid form or
    /// [Error::DuplicateMemberName] if the name is already taken.
    pub fn add_member(&mut self, form: MemberForm) -> Result<Member, Error> {
        let form = form.validate()?;
        self.ensure_unique_name(&form.name, None)?;

        let member = form.into_member(next_id(&self.members, |member| member.id));
        self.members.push(member.clone());

        Ok(member)
    }

    /// Replace member `id` with the contents of `form`.
    ///
    /// # Errors
    /// Returns [Error::MemberNotFound] if there is no member `id`, otherwise
    /// the same errors as [DataStore::add_member].
    pub fn update_member(&mut self, id: MemberId, form: MemberForm) -> Result<Member, Error> {
        let index = self.member_index(id)?;
        let form = form.validate()?;
        self.ensure_unique_name(&form.name, Some(id))?;

        let member = form.into_member(id);
        self.members[index] = member.clone();

        Ok(member)
    }

    /// Remove member `id` together with all of their transactions.
    pub fn delete_member(&mut self, id: MemberId) -> Result<(), Error> {
        let index = self.member_index(id)?;

        self.members.remove(index);
        self.transactions
            .retain(|transaction| transaction.member_id != Some(id));

        Ok(())
    }

    /// Record that member `id` paid on `today`.
    pub fn mark_member_paid(&mut self, id: MemberId, today: Date) -> Result<Member, Error> {
        let index = self.member_index(id)?;
        let mut member = self.members[index].clone();
        member.mark_paid(today)?;
        self.members[index] = member.clone();

        Ok(member)
    }

    fn ensure_member_exists(&self, member_id: Option<MemberId>) -> Result<(), Error> {
        match member_id {
            Some(id) if self.member_index(id).is_err() => Err(Error::UnknownMember(id)),
            _ => Ok(()),
        }
    }

    fn transaction_index(&self, id: TransactionId) -> Result<usize, Error> {
        self.transactions
            .iter()
            .position(|transaction| transaction.id == id)
            .ok_or(Error::TransactionNotFound)
    }

    /// Add a transaction from `form`.
    ///
    /// # Errors
    /// Returns the errors of [TransactionForm::validate], or
    /// [Error::UnknownMember] if the form names a member that does not exist.
    pub fn add_transaction(&mut self, form: TransactionForm) -> Result<Transaction, Error> {
        let form = form.validate()?;
        self.ensure_member_exists(form.member_id)?;

        let transaction =
            form.into_transaction(next_id(&self.transactions, |transaction| transaction.id));
        self.transactions.push(transaction.clone());
        sort_newest_first(&mut self.transactions);

        Ok(transaction)
    }

    /// Replace transaction `id` with the contents of `form`.
    pub fn update_transaction(
        &mut self,
        id: TransactionId,
        form: TransactionForm,
    ) -> Result<Transaction, Error> {
        let index = self.transaction_index(id)?;
        let form = form.validate()?;
        self.ensure_member_exists(form.member_id)?;

        let transaction = form.into_transaction(id);
        self.transactions[index] = transaction.clone();
        sort_newest_first(&mut self.transactions);

        Ok(transaction)
    }

    /// Remove transaction `id`.
    pub fn delete_transaction(&mut self, id: TransactionId) -> Result<(), Error> {
        let index = self.transaction_index(id)?;
        self.transactions.remove(index);

        Ok(())
    }

    /// Set the details of the card.
    ///
    /// The first time a card is set a positive opening balance is recorded as
    /// a deposit dated `today`. Later calls only change the details, the
    /// balance is kept.
    pub fn set_card_detail(&mut self, form: CardForm, today: Date) -> Result<Card, Error> {
        let form = form.validate(today)?;

        match &self.card_detail {
            Some(card) => {
                let card = form.into_card(card.id, card.current_balance);
                self.card_detail = Some(card.clone());

                Ok(card)
            }
            None => {
                let opening_balance = form.current_balance;
                let balance = LedgerTotals::of(&self.card_transactions).balance();
                self.card_detail = Some(form.into_card(CARD_ID, balance));

                if opening_balance > 0.0 {
                    self.add_card_transaction(CardTransactionForm::opening_balance(
                        today,
                        opening_balance,
                    ))?;
                }

                self.card_detail.clone().ok_or(Error::CardNotFound)
            }
        }
    }

    /// Record a deposit or withdrawal on the card.
    ///
    /// # Errors
    /// Returns [Error::CardNotFound] if no card has been set, the errors of
    /// [CardTransactionForm::validate], or [Error::InsufficientBalance] if a
    /// withdrawal is larger than the balance.
    pub fn add_card_transaction(
        &mut self,
        form: CardTransactionForm,
    ) -> Result<CardTransaction, Error> {
        let card = self.card_detail.as_mut().ok_or(Error::CardNotFound)?;
        let form = form.validate()?;

        let balance = LedgerTotals::of(&self.card_transactions).balance();
        let balance_after = apply_transaction(balance, form.transaction_type, form.amount)?;
        let id = next_id(&self.card_transactions, |transaction| transaction.id);
        let transaction = form.into_card_transaction(id, card.id, balance_after);

        card.current_balance = balance_after;
        self.card_transactions.push(transaction.clone());

        Ok(transaction)
    }

    fn card_transaction_index(&self, id: DatabaseId) -> Result<usize, Error> {
        self.card_transactions
            .iter()
            .position(|transaction| transaction.id == id)
            .ok_or(Error::NotFound)
    }

    /// Replace card transaction `id` with the contents of `form` and
    /// recalculate the card's balance.
    ///
    /// The `balance_after` of every card transaction, the edited one included,
    /// is left as it was recorded.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no such transaction, the errors of
    /// [CardTransactionForm::validate], or [Error::InsufficientBalance] if the
    /// edit would leave the card with a negative balance.
    pub fn update_card_transaction(
        &mut self,
        id: DatabaseId,
        form: CardTransactionForm,
    ) -> Result<CardTransaction, Error> {
        let index = self.card_transaction_index(id)?;
        let form = form.validate()?;

        let others = LedgerTotals::of(
            self.card_transactions
                .iter()
                .filter(|transaction| transaction.id != id),
        )
        .balance();
        let balance = match apply_transaction(others, form.transaction_type, form.amount) {
            Ok(balance) if balance >= 0.0 => balance,
            _ => {
                return Err(Error::InsufficientBalance {
                    balance: LedgerTotals::of(&self.card_transactions).balance(),
                    amount: form.amount,
                });
            }
        };

        let existing = &self.card_transactions[index];
        let transaction =
            form.into_card_transaction(id, existing.card_id, existing.balance_after);

        self.card_transactions[index] = transaction.clone();
        if let Some(card) = self.card_detail.as_mut() {
            card.current_balance = balance;
        }

        Ok(transaction)
    }

    /// Remove card transaction `id` and recalculate the card's balance.
    ///
    /// # Errors
    /// Returns [Error::NotFound] if there is no such transaction, or
    /// [Error::InsufficientBalance] if removing a deposit would leave the
    /// card with a negative balance.
    pub fn delete_card_transaction(&mut self, id: DatabaseId) -> Result<(), Error> {
        let index = self.card_transaction_index(id)?;

        let removed = &self.card_transactions[index];
        let remaining = LedgerTotals::of(
            self.card_transactions
                .iter()
                .filter(|transaction| transaction.id != id),
        )
        .balance();

        if remaining < 0.0 {
            return Err(Error::InsufficientBalance {
                balance: LedgerTotals::of(&self.card_transactions).balance(),
                amount: removed.amount,
            });
        }

        self.card_transactions.remove(index);
        if let Some(card) = self.card_detail.as_mut() {
            card.current_balance = remaining;
        }

        Ok(())
    }

    /// Change the subscription cost.
    pub fn update_subscription_cost(&mut self, cost: f64, today: Date) -> Result<(), Error> {
        self.settings.set_subscription_cost(cost, today)
    }

    /// The money needed on the card, taking the subscription cost from `source`.
    pub fn money_needed(&self, source: CostSource) -> f64 {
        let cost = match source {
            CostSource::Settings => self.settings.subscription_cost,
            CostSource::TransactionDescription => {
                subscription_cost_from_transactions(&self.transactions)
            }
        };

        money_needed(cost, &self.card_transactions)
    }

    /// Copy the store into the database behind `connection`.
    ///
    /// IDs are kept. Everything is written in one SQL transaction, so either
    /// the whole snapshot is imported or nothing is.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the database already has members,
    /// transactions or cards, or if the snapshot has card transactions but
    /// no card.
    pub fn import_into(&self, connection: &Connection) -> Result<(), Error> {
        if self.card_detail.is_none() && !self.card_transactions.is_empty() {
            return Err(Error::Validation(
                "Cannot import card transactions without a card".to_owned(),
            ));
        }

        let transaction =
            SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

        let existing_rows: u32 = transaction.query_row(
            "SELECT (SELECT COUNT(id) FROM member)
                + (SELECT COUNT(id) FROM \"transaction\")
                + (SELECT COUNT(id) FROM card)",
            [],
            |row| row.get(0),
        )?;

        if existing_rows > 0 {
            return Err(Error::Validation(
                "Cannot import a snapshot into a database that already has data".to_owned(),
            ));
        }

        for member in &self.members {
            restore_member(member, &transaction)?;
        }

        for money_transaction in &self.transactions {
            restore_transaction(money_transaction, &transaction)?;
        }

        if let Some(card) = &self.card_detail {
            restore_card(card, &transaction)?;

            for card_transaction in &self.card_transactions {
                restore_card_transaction(card_transaction, &transaction)?;
            }
        }

        save_settings(&self.settings, &transaction)?;

        transaction.commit()?;
        tracing::info!(
            "Imported {} members, {} transactions and {} card transactions",
            self.members.len(),
            self.transactions.len(),
            self.card_transactions.len()
        );

        Ok(())
    }
}
