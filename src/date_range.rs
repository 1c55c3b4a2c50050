//! Optional inclusive date ranges taken from the `startDate` and `endDate`
//! query parameters.

use serde::Deserialize;
use time::Date;

use crate::Error;

/// An inclusive range of dates where either end may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    /// The first date in the range.
    pub start_date: Option<Date>,
    /// The last date in the range.
    pub end_date: Option<Date>,
}

impl DateRange {
    /// Check the range is not reversed.
    ///
    /// # Errors
    /// Returns [Error::Validation] if the start date is after the end date.
    pub fn validate(self) -> Result<Self, Error> {
        match (self.start_date, self.end_date) {
            (Some(start), Some(end)) if start > end => Err(Error::Validation(format!(
                "startDate ({start}) cannot be after endDate ({end})"
            ))),
            _ => Ok(self),
        }
    }

    /// Whether `date` falls within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start_date.is_none_or(|start| date >= start)
            && self.end_date.is_none_or(|end| date <= end)
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::Error;

    use super::DateRange;

    #[test]
    fn open_range_contains_everything() {
        assert!(DateRange::default().contains(date!(1999 - 12 - 31)));
    }

    #[test]
    fn bounds_are_inclusive() {
        let range = DateRange {
            start_date: Some(date!(2025 - 08 - 01)),
            end_date: Some(date!(2025 - 08 - 31)),
        };

        assert!(range.contains(date!(2025 - 08 - 01)));
        assert!(range.contains(date!(2025 - 08 - 31)));
        assert!(!range.contains(date!(2025 - 07 - 31)));
        assert!(!range.contains(date!(2025 - 09 - 01)));
    }

    #[test]
    fn reversed_range_is_invalid() {
        let range = DateRange {
            start_date: Some(date!(2025 - 09 - 01)),
            end_date: Some(date!(2025 - 08 - 01)),
        };

        assert!(matches!(range.validate(), Err(Error::Validation(_))));
    }
}
