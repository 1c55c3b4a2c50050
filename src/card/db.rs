//! Database operations for cards and their ledger.

use rusqlite::{Connection, Row, Transaction, TransactionBehavior, params};
use time::Date;

use crate::{
    Error,
    card::{
        Card, CardFilter, CardForm, CardId, CardTransaction, CardTransactionFilter,
        CardTransactionForm, LedgerTotals, apply_transaction,
    },
    date_range::DateRange,
    pagination::Page,
};

const CARD_COLUMNS: &str = "id, card_name, last_four_digits, expiry_date, card_type, bank_name, \
    card_holder_name, is_active, notes, monthly_limit, current_balance";

const CARD_TRANSACTION_COLUMNS: &str = "id, card_id, date, amount, description, \
    transaction_type, category, status, reference_number, notes, balance_after";

const CARD_TRANSACTION_FILTER_CLAUSE: &str = "card_id = ?1
    AND (?2 IS NULL OR transaction_type = ?2)
    AND (?3 IS NULL OR category = ?3)
    AND (?4 IS NULL OR date >= ?4)
    AND (?5 IS NULL OR date <= ?5)";

/// Create the card table.
pub fn create_card_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS card (
            id INTEGER PRIMARY KEY,
            card_name TEXT NOT NULL,
            last_four_digits TEXT NOT NULL UNIQUE,
            expiry_date TEXT NOT NULL,
            card_type TEXT NOT NULL,
            bank_name TEXT NOT NULL DEFAULT '',
            card_holder_name TEXT NOT NULL DEFAULT '',
            is_active INTEGER NOT NULL DEFAULT 1,
            notes TEXT NOT NULL DEFAULT '',
            monthly_limit REAL NOT NULL,
            current_balance REAL NOT NULL DEFAULT 0 CHECK (current_balance >= 0)
        );",
    )?;

    Ok(())
}

/// Create the card transaction table.
///
/// A card cannot be deleted while it has transactions.
pub fn create_card_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS card_transaction (
            id INTEGER PRIMARY KEY,
            card_id INTEGER NOT NULL REFERENCES card(id) ON UPDATE CASCADE ON DELETE RESTRICT,
            date TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            description TEXT NOT NULL,
            transaction_type TEXT NOT NULL,
            category TEXT NOT NULL,
            status TEXT NOT NULL,
            reference_number TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT '',
            balance_after REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_card_transaction_card_date
            ON card_transaction(card_id, date);",
    )?;

    Ok(())
}

/// Map a database row to a [Card].
pub fn map_card_row(row: &Row) -> Result<Card, rusqlite::Error> {
    Ok(Card {
        id: row.get(0)?,
        card_name: row.get(1)?,
        last_four_digits: row.get(2)?,
        expiry_date: row.get(3)?,
        card_type: row.get(4)?,
        bank_name: row.get(5)?,
        card_holder_name: row.get(6)?,
        is_active: row.get(7)?,
        notes: row.get(8)?,
        monthly_limit: row.get(9)?,
        current_balance: row.get(10)?,
    })
}

/// Map a database row to a [CardTransaction].
pub fn map_card_transaction_row(row: &Row) -> Result<CardTransaction, rusqlite::Error> {
    Ok(CardTransaction {
        id: row.get(0)?,
        card_id: row.get(1)?,
        date: row.get(2)?,
        amount: row.get(3)?,
        description: row.get(4)?,
        transaction_type: row.get(5)?,
        category: row.get(6)?,
        status: row.get(7)?,
        reference_number: row.get(8)?,
        notes: row.get(9)?,
        balance_after: row.get(10)?,
    })
}

fn map_card_write_error(error: rusqlite::Error, form: &CardForm) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateCardDigits(form.last_four_digits.to_string()),
        rusqlite::Error::QueryReturnedNoRows => Error::CardNotFound,
        error => error.into(),
    }
}

fn map_card_lookup_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::QueryReturnedNoRows => Error::CardNotFound,
        error => error.into(),
    }
}

/// Create a card from a validated `form`.
///
/// A positive opening balance is recorded as a deposit dated `opened_on`, so
/// the card's balance always matches its ledger. The card and the deposit are
/// stored together or not at all.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateCardDigits] if another card has the same last four digits,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_card(
    form: CardForm,
    opened_on: Date,
    connection: &Connection,
) -> Result<Card, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let card = transaction
        .prepare(&format!(
            "INSERT INTO card (card_name, last_four_digits, expiry_date, card_type, bank_name, \
                card_holder_name, is_active, notes, monthly_limit, current_balance)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0)
             RETURNING {CARD_COLUMNS}"
        ))?
        .query_row(
            params![
                form.card_name,
                form.last_four_digits,
                form.expiry_date,
                form.card_type,
                form.bank_name,
                form.card_holder_name,
                form.is_active,
                form.notes,
                form.monthly_limit,
            ],
            map_card_row,
        )
        .map_err(|error| map_card_write_error(error, &form))?;

    let card = if form.current_balance > 0.0 {
        let opening_deposit =
            CardTransactionForm::opening_balance(opened_on, form.current_balance);
        insert_card_transaction(card.id, opening_deposit, &transaction)?;
        get_card(card.id, &transaction)?
    } else {
        card
    };

    transaction.commit()?;

    Ok(card)
}

/// Retrieve a card by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::CardNotFound] if `id` does not refer to a card,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_card(id: CardId, connection: &Connection) -> Result<Card, Error> {
    connection
        .prepare(&format!("SELECT {CARD_COLUMNS} FROM card WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_card_row)
        .map_err(map_card_lookup_error)
}

/// Retrieve the cards matching `filter`, newest first.
pub fn get_cards(filter: &CardFilter, connection: &Connection) -> Result<Vec<Card>, Error> {
    connection
        .prepare(&format!(
            "SELECT {CARD_COLUMNS} FROM card
             WHERE (?1 IS NULL OR is_active = ?1) AND (?2 IS NULL OR card_type = ?2)
             ORDER BY id DESC"
        ))?
        .query_map(params![filter.is_active, filter.card_type], map_card_row)?
        .map(|maybe_card| maybe_card.map_err(Error::from))
        .collect()
}

/// Retrieve the active cards that expire before `days` days from `today`,
/// soonest first.
pub fn get_expiring_cards(
    today: Date,
    days: i64,
    connection: &Connection,
) -> Result<Vec<Card>, Error> {
    let mut cards: Vec<Card> = get_cards(
        &CardFilter {
            is_active: Some(true),
            card_type: None,
        },
        connection,
    )?
    .into_iter()
    .filter(|card| card.expiry_date.expires_within(today, days))
    .collect();

    cards.sort_by_key(|card| card.expiry_date);

    Ok(cards)
}

/// Replace the details of the card `id` with `form`.
///
/// The balance is left as is, it only changes through the card's ledger.
///
/// # Errors
/// This function will return a:
/// - [Error::CardNotFound] if `id` does not refer to a card,
/// - [Error::DuplicateCardDigits] if another card has the same last four digits,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_card(id: CardId, form: CardForm, connection: &Connection) -> Result<Card, Error> {
    connection
        .prepare(&format!(
            "UPDATE card SET card_name = ?1, last_four_digits = ?2, expiry_date = ?3,
                card_type = ?4, bank_name = ?5, card_holder_name = ?6, is_active = ?7,
                notes = ?8, monthly_limit = ?9
             WHERE id = ?10
             RETURNING {CARD_COLUMNS}"
        ))?
        .query_row(
            params![
                form.card_name,
                form.last_four_digits,
                form.expiry_date,
                form.card_type,
                form.bank_name,
                form.card_holder_name,
                form.is_active,
                form.notes,
                form.monthly_limit,
                id,
            ],
            map_card_row,
        )
        .map_err(|error| map_card_write_error(error, &form))
}

/// Delete the card `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::CardNotFound] if `id` does not refer to a card,
/// - [Error::CardHasTransactions] if the card has any transactions,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_card(id: CardId, connection: &Connection) -> Result<(), Error> {
    get_card(id, connection)?;

    let transaction_count =
        count_card_transactions(id, &CardTransactionFilter::default(), connection)?;

    if transaction_count > 0 {
        return Err(Error::CardHasTransactions);
    }

    connection.execute("DELETE FROM card WHERE id = ?1", [id])?;

    Ok(())
}

fn insert_card_transaction(
    card_id: CardId,
    form: CardTransactionForm,
    transaction: &Transaction,
) -> Result<CardTransaction, Error> {
    let balance: f64 = transaction
        .query_row(
            "SELECT current_balance FROM card WHERE id = ?1",
            [card_id],
            |row| row.get(0),
        )
        .map_err(map_card_lookup_error)?;

    let balance_after = apply_transaction(balance, form.transaction_type, form.amount)?;

    let card_transaction = transaction
        .prepare(&format!(
            "INSERT INTO card_transaction (card_id, date, amount, description, transaction_type, \
                category, status, reference_number, notes, balance_after)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {CARD_TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            params![
                card_id,
                form.date,
                form.amount,
                form.description,
                form.transaction_type,
                form.category,
                form.status,
                form.reference_number,
                form.notes,
                balance_after,
            ],
            map_card_transaction_row,
        )?;

    transaction.execute(
        "UPDATE card SET current_balance = ?1 WHERE id = ?2",
        params![balance_after, card_id],
    )?;

    Ok(card_transaction)
}

/// Record a validated card transaction and update the card's balance.
///
/// Reading the balance, inserting the transaction and storing the new balance
/// happen in one exclusive SQL transaction.
///
/// # Errors
/// This function will return a:
/// - [Error::CardNotFound] if `card_id` does not refer to a card,
/// - [Error::InsufficientBalance] if a withdrawal is larger than the balance,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn add_card_transaction(
    card_id: CardId,
    form: CardTransactionForm,
    connection: &Connection,
) -> Result<CardTransaction, Error> {
    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    let card_transaction = insert_card_transaction(card_id, form, &transaction)?;

    transaction.commit()?;

    Ok(card_transaction)
}

/// Retrieve the transactions of card `card_id` matching `filter`, newest first.
///
/// Only the transactions on `page` are returned when it is set.
pub fn get_card_transactions(
    card_id: CardId,
    filter: &CardTransactionFilter,
    page: Option<Page>,
    connection: &Connection,
) -> Result<Vec<CardTransaction>, Error> {
    let (limit, offset) = match page {
        Some(page) => (
            i64::try_from(page.limit).unwrap_or(i64::MAX),
            i64::try_from(page.offset()).unwrap_or(i64::MAX),
        ),
        None => (-1, 0),
    };

    connection
        .prepare(&format!(
            "SELECT {CARD_TRANSACTION_COLUMNS} FROM card_transaction
             WHERE {CARD_TRANSACTION_FILTER_CLAUSE}
             ORDER BY date DESC, id DESC
             LIMIT ?6 OFFSET ?7"
        ))?
        .query_map(
            params![
                card_id,
                filter.transaction_type,
                filter.category,
                filter.date_range.start_date,
                filter.date_range.end_date,
                limit,
                offset,
            ],
            map_card_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Count the transactions of card `card_id` matching `filter`.
pub fn count_card_transactions(
    card_id: CardId,
    filter: &CardTransactionFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    let count: u32 = connection.query_row(
        &format!("SELECT COUNT(id) FROM card_transaction WHERE {CARD_TRANSACTION_FILTER_CLAUSE}"),
        params![
            card_id,
            filter.transaction_type,
            filter.category,
            filter.date_range.start_date,
            filter.date_range.end_date,
        ],
        |row| row.get(0),
    )?;

    Ok(count.into())
}

/// Sum the deposits and withdrawals of card `card_id` within `date_range`.
pub fn get_ledger_totals(
    card_id: CardId,
    date_range: DateRange,
    connection: &Connection,
) -> Result<LedgerTotals, Error> {
    let filter = CardTransactionFilter {
        date_range,
        ..Default::default()
    };
    let transactions = get_card_transactions(card_id, &filter, None, connection)?;

    Ok(LedgerTotals::of(&transactions))
}

/// Insert `card` keeping its ID and balance, used when importing a snapshot.
pub fn restore_card(card: &Card, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        &format!(
            "INSERT INTO card ({CARD_COLUMNS}) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            card.id,
            card.card_name,
            card.last_four_digits,
            card.expiry_date,
            card.card_type,
            card.bank_name,
            card.card_holder_name,
            card.is_active,
            card.notes,
            card.monthly_limit,
            card.current_balance,
        ],
    )?;

    Ok(())
}

/// Insert `transaction` as recorded, used when importing a snapshot.
///
/// The card's balance is not touched.
pub fn restore_card_transaction(
    transaction: &CardTransaction,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        &format!(
            "INSERT INTO card_transaction ({CARD_TRANSACTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            transaction.id,
            transaction.card_id,
            transaction.date,
            transaction.amount,
            transaction.description,
            transaction.transaction_type,
            transaction.category,
            transaction.status,
            transaction.reference_number,
            transaction.notes,
            transaction.balance_after,
        ],
    )?;

    Ok(())
}
