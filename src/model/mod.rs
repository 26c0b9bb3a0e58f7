//! Holiday records and the views derived from them.
//!
//! [`PublicHoliday`] mirrors one element of the upstream JSON payload. The
//! other two types are computed per request by the
//! [`service`](crate::service) layer and are never cached.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One public holiday occurrence as reported by the upstream source.
///
/// Records are immutable once decoded. The optional fields are carried through
/// untouched; nothing in this crate inspects them.
///
/// # Examples
///
/// ```
/// use holiday_lens::model::PublicHoliday;
///
/// let raw = r#"{"date":"2024-12-25","localName":"Weihnachten","name":"Christmas Day",
///               "countryCode":"DE","fixed":true,"somethingNew":1}"#;
/// let holiday: PublicHoliday = serde_json::from_str(raw).unwrap();
/// assert_eq!(holiday.local_name, "Weihnachten");
/// assert_eq!(holiday.fixed, Some(true));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicHoliday {
    pub date: NaiveDate,
    pub local_name: String,
    pub name: String,
    pub country_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fixed: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub global: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counties: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub launch_year: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub types: Option<Vec<String>>,
}

impl PublicHoliday {
    /// Builds a record with only the required fields set.
    pub fn new(
        date: NaiveDate,
        local_name: impl Into<String>,
        name: impl Into<String>,
        country_code: impl Into<String>,
    ) -> Self {
        Self {
            date,
            local_name: local_name.into(),
            name: name.into(),
            country_code: country_code.into(),
            fixed: None,
            global: None,
            counties: None,
            launch_year: None,
            types: None,
        }
    }
}

impl fmt::Display for PublicHoliday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {} ({})", self.date, self.name, self.local_name)
    }
}

/// Number of holidays a country observes on weekdays in a given year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryHolidayCount {
    pub country_code: String,
    pub holiday_count: usize,
}

impl CountryHolidayCount {
    pub fn new(country_code: impl Into<String>, holiday_count: usize) -> Self {
        Self {
            country_code: country_code.into(),
            holiday_count,
        }
    }
}

impl fmt::Display for CountryHolidayCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {} holidays", self.country_code, self.holiday_count)
    }
}

/// A date observed as a holiday by more than one country.
///
/// `local_names` maps country code to that country's local name for the day.
/// A `BTreeMap` keeps the JSON output ordered by country code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedHoliday {
    pub date: NaiveDate,
    pub local_names: BTreeMap<String, String>,
}

impl SharedHoliday {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            local_names: BTreeMap::new(),
        }
    }

    /// Records `local_name` for `country_code`, replacing any earlier name.
    pub fn add_local_name(&mut self, country_code: impl Into<String>, local_name: impl Into<String>) {
        self.local_names.insert(country_code.into(), local_name.into());
    }
}

impl fmt::Display for SharedHoliday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.date)?;
        for (i, (country, name)) in self.local_names.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{country} - {name}")?;
        }
        Ok(())
    }
}
