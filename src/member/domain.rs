//! Core member domain types and the payment cadence rules.

use serde::{Deserialize, Serialize};
use time::{Date, Month};

use crate::{Error, database_id::DatabaseId, text_enum::text_enum};

/// Database identifier for a member.
pub type MemberId = DatabaseId;

/// The amount a monthly member pays when not specified.
pub const DEFAULT_MONTHLY_AMOUNT: f64 = 3.79;
/// The amount a yearly member pays when not specified.
pub const DEFAULT_YEARLY_AMOUNT: f64 = 45.48;

const MAX_NAME_LENGTH: usize = 100;
const MAX_NOTES_LENGTH: usize = 500;

text_enum! {
    /// How often a member pays their share.
    pub enum PaymentType ("payment type") {
        /// Pays [Member::monthly_amount] every month.
        Monthly => "Monthly",
        /// Pays [Member::yearly_amount] once a year.
        Yearly => "Yearly",
    }
}

text_enum! {
    /// Whether a member has paid for the current period.
    pub enum PaymentStatus ("payment status") {
        Paid => "Paid",
        Unpaid => "Unpaid",
    }
}

/// A person sharing the subscription cost.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// The ID of the member.
    pub id: MemberId,
    /// The member's name, unique ignoring case.
    pub name: String,
    /// How often the member pays.
    pub payment_type: PaymentType,
    /// Whether the member has paid for the current period.
    pub payment_status: PaymentStatus,
    /// When the member last paid.
    pub last_payment_date: Date,
    /// When the next payment is due, never before `last_payment_date`.
    pub next_due_date: Date,
    /// Free-form notes.
    pub notes: String,
    /// Whether this member owns the subscription.
    pub is_owner: bool,
    /// The amount due each month for monthly members.
    pub monthly_amount: f64,
    /// The amount due each year for yearly members.
    pub yearly_amount: f64,
}

impl Member {
    /// The amount due for the member's payment type.
    pub fn current_amount(&self) -> f64 {
        match self.payment_type {
            PaymentType::Monthly => self.monthly_amount,
            PaymentType::Yearly => self.yearly_amount,
        }
    }

    /// An unpaid member is overdue once `today` is past their due date.
    pub fn is_overdue(&self, today: Date) -> bool {
        self.payment_status == PaymentStatus::Unpaid && today > self.next_due_date
    }

    /// The number of days from `today` until the due date, negative when the
    /// due date has passed.
    pub fn days_until_due(&self, today: Date) -> i64 {
        (self.next_due_date - today).whole_days()
    }

    /// Record a payment made on `today` and roll the due date forward by one
    /// period of the member's payment type.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the next due date is out of the supported date range.
    pub fn mark_paid(&mut self, today: Date) -> Result<(), Error> {
        self.next_due_date = next_due_date(self.payment_type, today)?;
        self.last_payment_date = today;
        self.payment_status = PaymentStatus::Paid;

        Ok(())
    }
}

/// The due date one period of `payment_type` after `paid_on`.
///
/// Monthly payments are due on the same day of the next month and yearly
/// payments on the same day of the next year. If that day does not exist in
/// the target month (e.g. 31 January plus one month) the last day of the
/// month is used instead.
///
/// # Errors
/// Returns [Error::Validation] if the result is past the largest supported date.
pub fn next_due_date(payment_type: PaymentType, paid_on: Date) -> Result<Date, Error> {
    let (year, month) = match payment_type {
        PaymentType::Monthly if paid_on.month() == Month::December => {
            (paid_on.year() + 1, Month::January)
        }
        PaymentType::Monthly => (paid_on.year(), paid_on.month().next()),
        PaymentType::Yearly => (paid_on.year() + 1, paid_on.month()),
    };

    let day = paid_on.day().min(month.length(year));

    Date::from_calendar_date(year, month, day).map_err(|error| {
        Error::Validation(format!("could not calculate the next due date: {error}"))
    })
}

/// The form of `name` used to compare names ignoring case.
///
/// Two members may not have the same key, and name searches compare keys.
pub fn name_key(name: &str) -> String {
    name.to_lowercase()
}

/// The data needed to create or replace a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberForm {
    /// The member's name.
    pub name: String,
    /// How often the member pays.
    pub payment_type: PaymentType,
    /// Defaults to [PaymentStatus::Unpaid].
    #[serde(default = "default_payment_status")]
    pub payment_status: PaymentStatus,
    /// When the member last paid.
    pub last_payment_date: Date,
    /// When the next payment is due.
    pub next_due_date: Date,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub is_owner: bool,
    /// Defaults to [DEFAULT_MONTHLY_AMOUNT].
    #[serde(default = "default_monthly_amount")]
    pub monthly_amount: f64,
    /// Defaults to [DEFAULT_YEARLY_AMOUNT].
    #[serde(default = "default_yearly_amount")]
    pub yearly_amount: f64,
}

fn default_payment_status() -> PaymentStatus {
    PaymentStatus::Unpaid
}

fn default_monthly_amount() -> f64 {
    DEFAULT_MONTHLY_AMOUNT
}

fn default_yearly_amount() -> f64 {
    DEFAULT_YEARLY_AMOUNT
}

impl MemberForm {
    /// Check the form and normalise the text fields.
    ///
    /// # Errors
    /// Returns [Error::Validation] if:
    /// - the name is empty or longer than 100 characters,
    /// - the notes are longer than 500 characters,
    /// - either amount is negative or not a number,
    /// - or the last payment date is after the next due date.
    pub fn validate(mut self) -> Result<Self, Error> {
        self.name = self.name.trim().to_owned();
        self.notes = self.notes.trim().to_owned();

        if self.name.is_empty() {
            return Err(Error::Validation("Name is required".to_owned()));
        }

        if self.name.chars().count() > MAX_NAME_LENGTH {
            return Err(Error::Validation(format!(
                "Name cannot exceed {MAX_NAME_LENGTH} characters"
            )));
        }

        if self.notes.chars().count() > MAX_NOTES_LENGTH {
            return Err(Error::Validation(format!(
                "Notes cannot exceed {MAX_NOTES_LENGTH} characters"
            )));
        }

        if !(self.monthly_amount >= 0.0) {
            return Err(Error::Validation(
                "Monthly amount cannot be negative".to_owned(),
            ));
        }

        if !(self.yearly_amount >= 0.0) {
            return Err(Error::Validation("Yearly amount cannot be negative".to_owned()));
        }

        if self.last_payment_date > self.next_due_date {
            return Err(Error::Validation(
                "Last payment date cannot be after next due date".to_owned(),
            ));
        }

        Ok(self)
    }

    /// Build the member this form describes with the given `id`.
    pub fn into_member(self, id: MemberId) -> Member {
        Member {
            id,
            name: self.name,
            payment_type: self.payment_type,
            payment_status: self.payment_status,
            last_payment_date: self.last_payment_date,
            next_due_date: self.next_due_date,
            notes: self.notes,
            is_owner: self.is_owner,
            monthly_amount: self.monthly_amount,
            yearly_amount: self.yearly_amount,
        }
    }
}

/// Query parameters for listing members.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberFilter {
    /// Only include members with this payment status.
    pub status: Option<PaymentStatus>,
    /// Only include members with this payment type.
    pub payment_type: Option<PaymentType>,
    /// Only include members whose name contains this text, ignoring case.
    pub search: Option<String>,
}

impl MemberFilter {
    /// Whether `member` passes every set filter.
    pub fn matches(&self, member: &Member) -> bool {
        self.status.is_none_or(|status| member.payment_status == status)
            && self
                .payment_type
                .is_none_or(|payment_type| member.payment_type == payment_type)
            && self
                .search
                .as_ref()
                .is_none_or(|search| name_key(&member.name).contains(&name_key(search)))
    }
}

/// A member together with the values derived from it for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberView {
    #[serde(flatten)]
    pub member: Member,
    /// See [Member::current_amount].
    pub current_amount: f64,
    /// See [Member::is_overdue].
    pub is_overdue: bool,
    /// See [Member::days_until_due].
    pub days_until_due: i64,
}

impl MemberView {
    /// Derive the display values of `member` as of `today`.
    pub fn new(member: Member, today: Date) -> Self {
        Self {
            current_amount: member.current_amount(),
            is_overdue: member.is_overdue(today),
            days_until_due: member.days_until_due(today),
            member,
        }
    }
}

/// Counts of members by status and cadence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberStats {
    pub total: u32,
    pub paid: u32,
    pub unpaid: u32,
    /// Unpaid members whose due date has passed.
    pub overdue: u32,
    /// Unpaid members due within the next 30 days.
    pub upcoming: u32,
    pub monthly: u32,
    pub yearly: u32,
}
