//! Database operations for members.

use rusqlite::{Connection, Row, params};
use time::{Date, Duration};

use crate::{
    Error,
    member::{Member, MemberFilter, MemberForm, MemberId, MemberStats, name_key},
};

const MEMBER_COLUMNS: &str = "id, name, payment_type, payment_status, last_payment_date, \
    next_due_date, notes, is_owner, monthly_amount, yearly_amount";

/// Create the member table.
///
/// Names are unique ignoring case. SQLite only folds the case of ASCII
/// letters, so `name_key` stores the [name_key] of the name and carries the
/// unique constraint.
pub fn create_member_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute_batch(
        "CREATE TABLE IF NOT EXISTS member (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            name_key TEXT NOT NULL UNIQUE,
            payment_type TEXT NOT NULL,
            payment_status TEXT NOT NULL,
            last_payment_date TEXT NOT NULL,
            next_due_date TEXT NOT NULL,
            notes TEXT NOT NULL DEFAULT '',
            is_owner INTEGER NOT NULL DEFAULT 0,
            monthly_amount REAL NOT NULL,
            yearly_amount REAL NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_member_status_due ON member(payment_status, next_due_date);",
    )?;

    Ok(())
}

/// Map a database row to a [Member].
pub fn map_member_row(row: &Row) -> Result<Member, rusqlite::Error> {
    Ok(Member {
        id: row.get(0)?,
        name: row.get(1)?,
        payment_type: row.get(2)?,
        payment_status: row.get(3)?,
        last_payment_date: row.get(4)?,
        next_due_date: row.get(5)?,
        notes: row.get(6)?,
        is_owner: row.get(7)?,
        monthly_amount: row.get(8)?,
        yearly_amount: row.get(9)?,
    })
}

fn map_write_error(error: rusqlite::Error, name: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateMemberName(name.to_owned()),
        rusqlite::Error::QueryReturnedNoRows => Error::MemberNotFound,
        error => error.into(),
    }
}

/// Create a member from a validated `form`.
///
/// # Errors
/// This function will return a:
/// - [Error::DuplicateMemberName] if another member has the same name ignoring case,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_member(form: MemberForm, connection: &Connection) -> Result<Member, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO member (name, payment_type, payment_status, last_payment_date, \
                next_due_date, notes, is_owner, monthly_amount, yearly_amount, name_key)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             RETURNING {MEMBER_COLUMNS}"
        ))?
        .query_row(
            params![
                form.name,
                form.payment_type,
                form.payment_status,
                form.last_payment_date,
                form.next_due_date,
                form.notes,
                form.is_owner,
                form.monthly_amount,
                form.yearly_amount,
                name_key(&form.name),
            ],
            map_member_row,
        )
        .map_err(|error| map_write_error(error, &form.name))
}

/// Retrieve a member by its `id`.
///
/// # Errors
/// This function will return a:
/// - [Error::MemberNotFound] if `id` does not refer to a member,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn get_member(id: MemberId, connection: &Connection) -> Result<Member, Error> {
    connection
        .prepare(&format!("SELECT {MEMBER_COLUMNS} FROM member WHERE id = :id"))?
        .query_row(&[(":id", &id)], map_member_row)
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::MemberNotFound,
            error => error.into(),
        })
}

/// Retrieve the members that match `filter`, sorted by name.
pub fn get_members(filter: &MemberFilter, connection: &Connection) -> Result<Vec<Member>, Error> {
    connection
        .prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM member
             WHERE (?1 IS NULL OR payment_status = ?1)
               AND (?2 IS NULL OR payment_type = ?2)
               AND (?3 IS NULL OR instr(name_key, ?3) > 0)
             ORDER BY name_key ASC, id ASC"
        ))?
        .query_map(
            params![
                filter.status,
                filter.payment_type,
                filter.search.as_deref().map(name_key)
            ],
            map_member_row,
        )?
        .map(|maybe_member| maybe_member.map_err(Error::from))
        .collect()
}

/// Replace every field of the member `id` with `form`.
///
/// # Errors
/// This function will return a:
/// - [Error::MemberNotFound] if `id` does not refer to a member,
/// - [Error::DuplicateMemberName] if a different member already has the name,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn update_member(
    id: MemberId,
    form: MemberForm,
    connection: &Connection,
) -> Result<Member, Error> {
    connection
        .prepare(&format!(
            "UPDATE member SET name = ?1, payment_type = ?2, payment_status = ?3,
                last_payment_date = ?4, next_due_date = ?5, notes = ?6, is_owner = ?7,
                monthly_amount = ?8, yearly_amount = ?9, name_key = ?11
             WHERE id = ?10
             RETURNING {MEMBER_COLUMNS}"
        ))?
        .query_row(
            params![
                form.name,
                form.payment_type,
                form.payment_status,
                form.last_payment_date,
                form.next_due_date,
                form.notes,
                form.is_owner,
                form.monthly_amount,
                form.yearly_amount,
                id,
                name_key(&form.name),
            ],
            map_member_row,
        )
        .map_err(|error| map_write_error(error, &form.name))
}

/// Delete the member `id` along with all of their transactions.
///
/// # Errors
/// This function will return a:
/// - [Error::MemberNotFound] if `id` does not refer to a member,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn delete_member(id: MemberId, connection: &Connection) -> Result<(), Error> {
    // Transactions are removed by the ON DELETE CASCADE on "transaction".member_id.
    let rows_affected = connection.execute("DELETE FROM member WHERE id = ?1", [id])?;

    if rows_affected == 0 {
        return Err(Error::MemberNotFound);
    }

    Ok(())
}

/// Mark the member `id` as paid on `today` and move their due date forward.
///
/// # Errors
/// This function will return a:
/// - [Error::MemberNotFound] if `id` does not refer to a member,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn mark_member_paid(
    id: MemberId,
    today: Date,
    connection: &Connection,
) -> Result<Member, Error> {
    let mut member = get_member(id, connection)?;
    member.mark_paid(today)?;

    connection.execute(
        "UPDATE member SET payment_status = ?1, last_payment_date = ?2, next_due_date = ?3
         WHERE id = ?4",
        params![
            member.payment_status,
            member.last_payment_date,
            member.next_due_date,
            member.id
        ],
    )?;

    Ok(member)
}

/// Retrieve unpaid members whose due date is before `today`, earliest first.
pub fn get_overdue_members(today: Date, connection: &Connection) -> Result<Vec<Member>, Error> {
    connection
        .prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM member
             WHERE payment_status = 'Unpaid' AND next_due_date < ?1
             ORDER BY next_due_date ASC, id ASC"
        ))?
        .query_map([today], map_member_row)?
        .map(|maybe_member| maybe_member.map_err(Error::from))
        .collect()
}

/// The last day of a window of `days` days starting `today`.
///
/// # Errors
/// Returns [Error::Validation] if the window extends past the largest supported date.
pub fn window_end(today: Date, days: u32) -> Result<Date, Error> {
    today
        .checked_add(Duration::days(days.into()))
        .ok_or_else(|| Error::Validation(format!("{days} days is too far in the future")))
}

/// Retrieve unpaid members due between `today` and `days` days from now,
/// inclusive, earliest first.
pub fn get_upcoming_members(
    today: Date,
    days: u32,
    connection: &Connection,
) -> Result<Vec<Member>, Error> {
    let end = window_end(today, days)?;

    connection
        .prepare(&format!(
            "SELECT {MEMBER_COLUMNS} FROM member
             WHERE payment_status = 'Unpaid' AND next_due_date >= ?1 AND next_due_date <= ?2
             ORDER BY next_due_date ASC, id ASC"
        ))?
        .query_map([today, end], map_member_row)?
        .map(|maybe_member| maybe_member.map_err(Error::from))
        .collect()
}

/// Count members by status and payment type as of `today`.
///
/// `upcoming` counts unpaid members due within the next 30 days.
pub fn get_member_stats(today: Date, connection: &Connection) -> Result<MemberStats, Error> {
    let upcoming_end = window_end(today, 30)?;

    connection
        .query_row(
            "SELECT
                COUNT(id),
                COALESCE(SUM(payment_status = 'Paid'), 0),
                COALESCE(SUM(payment_status = 'Unpaid'), 0),
                COALESCE(SUM(payment_status = 'Unpaid' AND next_due_date < ?1), 0),
                COALESCE(SUM(payment_status = 'Unpaid' AND next_due_date >= ?1
                    AND next_due_date <= ?2), 0),
                COALESCE(SUM(payment_type = 'Monthly'), 0),
                COALESCE(SUM(payment_type = 'Yearly'), 0)
             FROM member",
            [today, upcoming_end],
            |row| {
                Ok(MemberStats {
                    total: row.get(0)?,
                    paid: row.get(1)?,
                    unpaid: row.get(2)?,
                    overdue: row.get(3)?,
                    upcoming: row.get(4)?,
                    monthly: row.get(5)?,
                    yearly: row.get(6)?,
                })
            },
        )
        .map_err(Error::from)
}

/// Insert `member` keeping its ID, used when importing a snapshot.
pub fn restore_member(member: &Member, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        &format!(
            "INSERT INTO member ({MEMBER_COLUMNS}, name_key) \
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)"
        ),
        params![
            member.id,
            member.name,
            member.payment_type,
            member.payment_status,
            member.last_payment_date,
            member.next_due_date,
            member.notes,
            member.is_owner,
            member.monthly_amount,
            member.yearly_amount,
            name_key(&member.name),
        ],
    )?;

    Ok(())
}
