//! Database operations for transactions.

use rusqlite::{Connection, Row, params};

use crate::{
    Error,
    date_range::DateRange,
    pagination::Page,
    transaction::{Transaction, TransactionFilter, TransactionForm, TransactionId},
};

const TRANSACTION_COLUMNS: &str = "id, date, amount, member_id, description, transaction_type, \
    category, payment_method, status, receipt_number, notes";

const FILTER_CLAUSE: &str = "(?1 IS NULL OR transaction_type = ?1)
    AND (?2 IS NULL OR member_id = ?2)
    AND (?3 IS NULL OR category = ?3)
    AND (?4 IS NULL OR status = ?4)
    AND (?5 IS NULL OR date >= ?5)
    AND (?6 IS NULL OR date <= ?6)";

/// Create the transaction table.
///
/// Deleting a member deletes their transactions through the foreign key.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY,
            date TEXT NOT NULL,
            amount REAL NOT NULL CHECK (amount > 0),
            member_id INTEGER REFERENCES member(id) ON UPDATE CASCADE ON DELETE CASCADE,
            description TEXT NOT NULL,
            transaction_type TEXT NOT NULL,
            category TEXT NOT NULL,
            payment_method TEXT NOT NULL,
            status TEXT NOT NULL,
            receipt_number TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT ''
        );

        CREATE INDEX IF NOT EXISTS idx_transaction_date ON \"transaction\"(date);
        CREATE INDEX IF NOT EXISTS idx_transaction_member ON \"transaction\"(member_id);",
    )?;

    Ok(())
}

/// Map a database row to a [Transaction].
pub fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        date: row.get(1)?,
        amount: row.get(2)?,
        member_id: row.get(3)?,
        description: row.get(4)?,
        transaction_type: row.get(5)?,
        category: row.get(6)?,
        payment_method: row.get(7)?,
        status: row.get(8)?,
        receipt_number: row.get(9)?,
        notes: row.get(10)?,
    })
}

fn map_write_error(error: rusqlite::Error, form: &TransactionForm) -> Error {
    match (error, form.member_id) {
        (
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                },
                _,
            ),
            Some(member_id),
        ) => Error::UnknownMember(member_id),
        (rusqlite::Error::QueryReturnedNoRows, _) => Error::TransactionNotFound,
        (error, _) => error.into(),
    }
}

/// Create a transaction from a validated `form`.
///
/// # Errors
/// This function will return a:
/// - [Error::UnknownMember] if the form's member does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_transaction(
    form: TransactionForm,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO \"transaction\" (date, amount, member_id, description, transaction_type, \
                category, payment_method, status, receipt_number, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            params![
                form.date,
                form.amount,
                form.member_id,
                form.description,
                form.transaction_type,
                form.category,
                form.payment_method,
                form.status,
                form.receipt_number,
                form.notes,
            ],
            map_transaction_row,
        )
        .map_err(|error| map_write_error(error, &form))
}

/// Retrieve a transaction by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_transaction(id: TransactionId, connection: &Connection) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = :id"
        ))?
        .query_row(&[(":id", &id)], map_transaction_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::TransactionNotFound,
            error => error.into(),
        })
}

/// Replace every field of the transaction `id` with `form`.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a transaction,
/// - [Error::UnknownMember] if the form's member does not exist,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_transaction(
    id: TransactionId,
    form: TransactionForm,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "UPDATE \"transaction\" SET date = ?1, amount = ?2, member_id = ?3, description = ?4,
                transaction_type = ?5, category = ?6, payment_method = ?7, status = ?8,
                receipt_number = ?9, notes = ?10
             WHERE id = ?11
             RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            params![
                form.date,
                form.amount,
                form.member_id,
                form.description,
                form.transaction_type,
                form.category,
                form.payment_method,
                form.status,
                form.receipt_number,
                form.notes,
                id,
            ],
            map_transaction_row,
        )
        .map_err(|error| map_write_error(error, &form))
}

/// Delete the transaction `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::TransactionNotFound] if `id` does not refer to a transaction,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_transaction(id: TransactionId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute("DELETE FROM \"transaction\" WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::TransactionNotFound);
    }

    Ok(())
}

/// Retrieve the transactions matching `filter`, newest first.
///
/// Only the transactions on `page` are returned when it is set.
pub fn get_transactions(
    filter: &TransactionFilter,
    page: Option<Page>,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    // A negative LIMIT means no limit in SQLite.
    let (limit, offset) = match page {
        Some(page) => (to_sql_int(page.limit), to_sql_int(page.offset())),
        None => (-1, 0),
    };

    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\"
             WHERE {FILTER_CLAUSE}
             ORDER BY date DESC, id DESC
             LIMIT ?7 OFFSET ?8"
        ))?
        .query_map(
            params![
                filter.transaction_type,
                filter.member_id,
                filter.category,
                filter.status,
                filter.date_range.start_date,
                filter.date_range.end_date,
                limit,
                offset,
            ],
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}

/// Count the transactions matching `filter`.
pub fn count_transactions(
    filter: &TransactionFilter,
    connection: &Connection,
) -> Result<u64, Error> {
    let count: u32 = connection.query_row(
        &format!("SELECT COUNT(id) FROM \"transaction\" WHERE {FILTER_CLAUSE}"),
        params![
            filter.transaction_type,
            filter.member_id,
            filter.category,
            filter.status,
            filter.date_range.start_date,
            filter.date_range.end_date,
        ],
        |row| row.get(0),
    )?;

    Ok(count.into())
}

/// Retrieve the transactions within `date_range`, newest first.
pub fn get_transactions_in_range(
    date_range: DateRange,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let filter = TransactionFilter {
        date_range,
        ..Default::default()
    };

    get_transactions(&filter, None, connection)
}

/// Retrieve the `limit` most recent transactions.
pub fn get_recent_transactions(
    limit: u64,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    get_transactions(
        &TransactionFilter::default(),
        Some(Page { page: 1, limit }),
        connection,
    )
}

fn to_sql_int(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Insert `transaction` keeping its ID, used when importing a snapshot.
pub fn restore_transaction(
    transaction: &Transaction,
    connection: &Connection,
) -> Result<(), Error> {
    connection.execute(
        &format!(
            "INSERT INTO \"transaction\" ({TRANSACTION_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            transaction.id,
            transaction.date,
            transaction.amount,
            transaction.member_id,
            transaction.description,
            transaction.transaction_type,
            transaction.category,
            transaction.payment_method,
            transaction.status,
            transaction.receipt_number,
            transaction.notes,
        ],
    )?;

    Ok(())
}
