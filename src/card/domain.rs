//! Core card domain types and the card status rules.

use std::{fmt, str::FromStr};

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use time::{Date, Duration, Month};

use crate::{
    Error,
    database_id::DatabaseId,
    text_enum::text_enum,
    transaction::{MAX_NOTES_LENGTH, validate_length},
};

/// Database identifier for a card.
pub type CardId = DatabaseId;

/// The monthly limit of a card when not specified.
pub const DEFAULT_MONTHLY_LIMIT: f64 = 1000.0;

/// How many days before its expiry a card counts as expiring soon.
pub const EXPIRING_SOON_DAYS: i64 = 30;

const MAX_NAME_LENGTH: usize = 100;

text_enum! {
    /// The card network.
    pub enum CardType ("card type") {
        Visa => "Visa",
        Mastercard => "Mastercard",
        AmericanExpress => "American Express",
        Other => "Other",
    }
}

text_enum! {
    /// Whether a card can be used, derived from its active flag and expiry.
    pub enum CardStatus ("card status") {
        Active => "Active",
        /// Expires within [EXPIRING_SOON_DAYS] days.
        ExpiringSoon => "Expiring Soon",
        Expired => "Expired",
        /// Switched off by hand, regardless of expiry.
        Inactive => "Inactive",
    }
}

/// The last four digits of a card number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LastFourDigits(String);

impl LastFourDigits {
    /// The digits as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for LastFourDigits {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();

        if s.len() == 4 && s.bytes().all(|byte| byte.is_ascii_digit()) {
            Ok(Self(s.to_owned()))
        } else {
            Err(Error::Validation(
                "Last four digits must be exactly 4 digits".to_owned(),
            ))
        }
    }
}

impl fmt::Display for LastFourDigits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A card expiry in `MM/YY` form, e.g. "12/28".
///
/// The card is treated as expiring at the start of that month, so "12/28"
/// expires on 1 December 2028.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExpiryDate(Date);

impl ExpiryDate {
    /// A card is expired once its expiry date is before `today`.
    pub fn is_expired(&self, today: Date) -> bool {
        self.0 < today
    }

    /// Whether the card expires before `days` days from `today`.
    pub fn expires_within(&self, today: Date, days: i64) -> bool {
        self.0 < today + Duration::days(days)
    }
}

impl FromStr for ExpiryDate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::Validation("Expiry date must be in MM/YY format".to_owned());

        let (month, year) = s.trim().split_once('/').ok_or_else(invalid)?;

        let is_two_digits =
            |text: &str| text.len() == 2 && text.bytes().all(|b| b.is_ascii_digit());

        if !is_two_digits(month) || !is_two_digits(year) {
            return Err(invalid());
        }

        let month: u8 = month.parse().map_err(|_| invalid())?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month = Month::try_from(month).map_err(|_| invalid())?;

        Date::from_calendar_date(2000 + year, month, 1)
            .map(Self)
            .map_err(|_| invalid())
    }
}

impl fmt::Display for ExpiryDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}/{:02}",
            u8::from(self.0.month()),
            self.0.year() % 100
        )
    }
}

macro_rules! text_newtype_conversions {
    ($name:ident) => {
        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(de::Error::custom)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.to_string()))
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse()
                    .map_err(|error| FromSqlError::Other(Box::new(error)))
            }
        }
    };
}

text_newtype_conversions!(LastFourDigits);
text_newtype_conversions!(ExpiryDate);

/// The status of a card on `today`.
pub fn card_status(is_active: bool, expiry_date: ExpiryDate, today: Date) -> CardStatus {
    if !is_active {
        CardStatus::Inactive
    } else if expiry_date.is_expired(today) {
        CardStatus::Expired
    } else if expiry_date.expires_within(today, EXPIRING_SOON_DAYS) {
        CardStatus::ExpiringSoon
    } else {
        CardStatus::Active
    }
}

/// A payment card whose balance pays for the subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    /// The ID of the card.
    pub id: CardId,
    /// A name to tell cards apart.
    pub card_name: String,
    pub last_four_digits: LastFourDigits,
    pub expiry_date: ExpiryDate,
    pub card_type: CardType,
    pub bank_name: String,
    pub card_holder_name: String,
    /// Cleared when the card is switched off or saved after its expiry.
    pub is_active: bool,
    pub notes: String,
    pub monthly_limit: f64,
    /// Changed only by applying card transactions, never negative.
    pub current_balance: f64,
}

impl Card {
    /// The card number with all but the last four digits hidden.
    pub fn masked_card_number(&self) -> String {
        format!("**** **** **** {}", self.last_four_digits)
    }

    /// The status of the card on `today`.
    pub fn status(&self, today: Date) -> CardStatus {
        card_status(self.is_active, self.expiry_date, today)
    }
}

/// The data needed to create or edit a card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardForm {
    pub card_name: String,
    pub last_four_digits: LastFourDigits,
    pub expiry_date: ExpiryDate,
    #[serde(default = "default_card_type")]
    pub card_type: CardType,
    #[serde(default)]
    pub bank_name: String,
    #[serde(default)]
    pub card_holder_name: String,
    #[serde(default = "default_is_active")]
    pub is_active: bool,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_monthly_limit")]
    pub monthly_limit: f64,
    /// The opening balance, only used when creating a card.
    #[serde(default)]
    pub current_balance: f64,
}

fn default_card_type() -> CardType {
    CardType::Other
}

fn default_is_active() -> bool {
    true
}

fn default_monthly_limit() -> f64 {
    DEFAULT_MONTHLY_LIMIT
}

impl CardForm {
    /// Check the form, normalise the text fields and deactivate the card if
    /// it has expired by `today`.
    ///
    /// # Errors
    /// Returns [Error::Validation] if:
    /// - the card name is empty,
    /// - a text field is too long,
    /// - or the monthly limit or opening balance is negative.
    pub fn validate(mut self, today: Date) -> Result<Self, Error> {
        self.card_name = self.card_name.trim().to_owned();
        self.bank_name = self.bank_name.trim().to_owned();
        self.card_holder_name = self.card_holder_name.trim().to_owned();
        self.notes = self.notes.trim().to_owned();

        if self.card_name.is_empty() {
            return Err(Error::Validation("Card name is required".to_owned()));
        }

        validate_length("Card name", &self.card_name, MAX_NAME_LENGTH)?;
        validate_length("Bank name", &self.bank_name, MAX_NAME_LENGTH)?;
        validate_length("Card holder name", &self.card_holder_name, MAX_NAME_LENGTH)?;
        validate_length("Notes", &self.notes, MAX_NOTES_LENGTH)?;

        if !(self.monthly_limit >= 0.0) {
            return Err(Error::Validation(
                "Monthly limit cannot be negative".to_owned(),
            ));
        }

        if !(self.current_balance >= 0.0) || !self.current_balance.is_finite() {
            return Err(Error::Validation(
                "Current balance cannot be negative".to_owned(),
            ));
        }

        if self.expiry_date.is_expired(today) {
            self.is_active = false;
        }

        Ok(self)
    }

    /// Build the card this form describes with the given `id` and balance.
    ///
    /// The form's opening balance is ignored, see [CardForm::current_balance].
    pub fn into_card(self, id: CardId, current_balance: f64) -> Card {
        Card {
            id,
            card_name: self.card_name,
            last_four_digits: self.last_four_digits,
            expiry_date: self.expiry_date,
            card_type: self.card_type,
            bank_name: self.bank_name,
            card_holder_name: self.card_holder_name,
            is_active: self.is_active,
            notes: self.notes,
            monthly_limit: self.monthly_limit,
            current_balance,
        }
    }
}

/// A card with the values derived from it for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardView {
    #[serde(flatten)]
    pub card: Card,
    pub masked_card_number: String,
    pub status: CardStatus,
}

impl CardView {
    /// Derive the display values of `card` as of `today`.
    pub fn new(card: Card, today: Date) -> Self {
        Self {
            masked_card_number: card.masked_card_number(),
            status: card.status(today),
            card,
        }
    }
}

/// Query parameters for listing cards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardFilter {
    pub is_active: Option<bool>,
    pub card_type: Option<CardType>,
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::Error;

    use super::{
        Card, CardForm, CardStatus, CardType, CardView, ExpiryDate, LastFourDigits, card_status,
    };

    fn expiry(text: &str) -> ExpiryDate {
        text.parse().unwrap()
    }

    fn form() -> CardForm {
        CardForm {
            card_name: " YouTube Card ".to_owned(),
            last_four_digits: "1234".parse().unwrap(),
            expiry_date: expiry("12/28"),
            card_type: CardType::Visa,
            bank_name: "Maybank".to_owned(),
            card_holder_name: String::new(),
            is_active: true,
            notes: String::new(),
            monthly_limit: 1000.0,
            current_balance: 0.0,
        }
    }

    #[test]
    fn parses_expiry_date() {
        let date = expiry("12/28");

        assert!(!date.is_expired(date!(2028 - 12 - 01)));
        assert!(date.is_expired(date!(2028 - 12 - 02)));
        assert_eq!(date.to_string(), "12/28");
        assert_eq!(expiry("01/05").to_string(), "01/05");
    }

    #[test]
    fn rejects_malformed_expiry_dates() {
        for text in ["13/28", "00/28", "1/28", "+1/28", "12/2028", "12-28", "ab/cd", ""] {
            assert_eq!(
                text.parse::<ExpiryDate>(),
                Err(Error::Validation(
                    "Expiry date must be in MM/YY format".to_owned()
                )),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn last_four_digits_must_be_four_digits() {
        assert!("0042".parse::<LastFourDigits>().is_ok());

        for text in ["123", "12345", "12a4", "١٢٣٤"] {
            assert!(
                text.parse::<LastFourDigits>().is_err(),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn status_follows_active_flag_then_expiry() {
        let today = date!(2025 - 08 - 05);

        assert_eq!(card_status(false, expiry("12/28"), today), CardStatus::Inactive);
        assert_eq!(card_status(true, expiry("08/25"), today), CardStatus::Expired);
        assert_eq!(card_status(true, expiry("09/25"), today), CardStatus::ExpiringSoon);
        assert_eq!(card_status(true, expiry("10/25"), today), CardStatus::Active);
    }

    #[test]
    fn validate_deactivates_expired_card() {
        let form = CardForm {
            expiry_date: expiry("01/25"),
            ..form()
        }
        .validate(date!(2025 - 08 - 05))
        .unwrap();

        assert!(!form.is_active);
    }

    #[test]
    fn validate_trims_and_keeps_active_card() {
        let form = form().validate(date!(2025 - 08 - 05)).unwrap();

        assert_eq!(form.card_name, "YouTube Card");
        assert!(form.is_active);
    }

    #[test]
    fn validate_rejects_negative_opening_balance() {
        let result = CardForm {
            current_balance: -1.0,
            ..form()
        }
        .validate(date!(2025 - 08 - 05));

        assert!(matches!(result, Err(Error::Validation(_))));
    }

    #[test]
    fn view_masks_card_number() {
        let card = Card {
            id: 1,
            card_name: "YouTube Card".to_owned(),
            last_four_digits: "1234".parse().unwrap(),
            expiry_date: expiry("12/28"),
            card_type: CardType::Visa,
            bank_name: String::new(),
            card_holder_name: String::new(),
            is_active: true,
            notes: String::new(),
            monthly_limit: 1000.0,
            current_balance: 31.01,
        };

        let json = serde_json::to_value(CardView::new(card, date!(2025 - 08 - 05))).unwrap();

        assert_eq!(json["maskedCardNumber"], "**** **** **** 1234");
        assert_eq!(json["status"], "Active");
        assert_eq!(json["expiryDate"], "12/28");
        assert_eq!(json["lastFourDigits"], "1234");
    }

    #[test]
    fn form_defaults_optional_fields() {
        let form: CardForm = serde_json::from_str(
            r#"{"cardName": "Spare", "lastFourDigits": "9876", "expiryDate": "03/27"}"#,
        )
        .unwrap();

        assert_eq!(form.card_type, CardType::Other);
        assert!(form.is_active);
        assert_eq!(form.monthly_limit, 1000.0);
        assert_eq!(form.current_balance, 0.0);
    }
}
