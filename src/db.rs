//! Database initialization.

use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::{
    Error,
    card::{create_card_table, create_card_transaction_table},
    member::create_member_table,
    settings::create_settings_table,
    transaction::create_transaction_table,
};

/// Create the tables for the domain models if they do not exist.
///
/// Foreign key enforcement is switched on for `connection`, it is needed for
/// deleting a member to also delete their transactions.
///
/// # Errors
/// Returns an error if a table cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = Transaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_member_table(&transaction)?;
    create_transaction_table(&transaction)?;
    create_card_table(&transaction)?;
    create_card_transaction_table(&transaction)?;
    create_settings_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
