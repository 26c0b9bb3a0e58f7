//! Derived holiday views: last celebrated, weekday counts, shared dates.
//!
//! [`HolidayService`] pulls records through a [`HolidayProvider`] (in
//! production the [`CachedHolidayProvider`](crate::cache::CachedHolidayProvider))
//! and hands them to small pure functions. Upstream failures never abort a
//! view: a failed fetch counts as "no holidays" for that country and is logged.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Local, NaiveDate, Weekday};
use futures::future::join_all;
use tracing::warn;

use crate::model::{CountryHolidayCount, PublicHoliday, SharedHoliday};
use crate::provider::{HolidayProvider, Holidays, ProviderError};

/// How many past holidays [`HolidayService::last_celebrated`] returns.
pub const LAST_CELEBRATED_LIMIT: usize = 3;

/// Computes holiday views on top of a provider it owns.
#[derive(Debug)]
pub struct HolidayService<P> {
    provider: P,
}

impl<P> HolidayService<P>
where
    P: HolidayProvider,
{
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// The last [`LAST_CELEBRATED_LIMIT`] holidays of `country_code` before today
    /// (local clock), newest first.
    pub async fn last_celebrated(&self, country_code: &str) -> Vec<PublicHoliday> {
        self.last_celebrated_as_of(country_code, Local::now().date_naive())
            .await
    }

    /// The last [`LAST_CELEBRATED_LIMIT`] holidays of `country_code` strictly
    /// before `today`, newest first.
    ///
    /// Both `today`'s year and the year before are consulted so that early in
    /// January there are still enough past holidays to pick from.
    pub async fn last_celebrated_as_of(&self, country_code: &str, today: NaiveDate) -> Vec<PublicHoliday> {
        let year = today.year();
        let (current, previous) = tokio::join!(
            self.provider.fetch(year, country_code),
            self.provider.fetch(year - 1, country_code),
        );

        let mut holidays = Vec::new();
        for (year, fetched) in [(year, current), (year - 1, previous)] {
            if let Some(fetched) = usable(fetched, year, country_code) {
                holidays.extend(fetched.iter().cloned());
            }
        }

        latest_before(holidays, today, LAST_CELEBRATED_LIMIT)
    }

    /// Weekday holiday counts per country in `year`, highest count first.
    ///
    /// Countries are fetched concurrently. A country whose fetch fails gets a
    /// count of zero. Equal counts are ordered by country code.
    pub async fn non_weekend_counts(&self, year: i32, country_codes: &[String]) -> Vec<CountryHolidayCount> {
        let fetches = country_codes.iter().map(|code| async move {
            let count = usable(self.provider.fetch(year, code).await, year, code)
                .map_or(0, |holidays| count_non_weekend(&holidays));
            CountryHolidayCount::new(code.clone(), count)
        });

        let mut counts = join_all(fetches).await;
        sort_counts(&mut counts);
        counts
    }

    /// Dates in `year` that are holidays in both countries, oldest first, each
    /// with both local names.
    ///
    /// Returns an empty list if either country's holidays cannot be fetched.
    pub async fn shared_holidays(&self, year: i32, first: &str, second: &str) -> Vec<SharedHoliday> {
        let (a, b) = tokio::join!(self.provider.fetch(year, first), self.provider.fetch(year, second));

        match (usable(a, year, first), usable(b, year, second)) {
            (Some(a), Some(b)) => shared_dates(first, &a, second, &b),
            _ => Vec::new(),
        }
    }
}

// Degrades a failed fetch to `None` after logging it.
fn usable(fetched: Result<Holidays, ProviderError>, year: i32, country_code: &str) -> Option<Holidays> {
    match fetched {
        Ok(holidays) => Some(holidays),
        Err(e) => {
            warn!(year, country = country_code, error = %e, "holidays unavailable, treating as none");
            None
        }
    }
}

/// Keeps holidays strictly before `today`, newest first, at most `limit`.
pub fn latest_before(mut holidays: Vec<PublicHoliday>, today: NaiveDate, limit: usize) -> Vec<PublicHoliday> {
    holidays.retain(|h| h.date < today);
    holidays.sort_by(|a, b| b.date.cmp(&a.date));
    holidays.truncate(limit);
    holidays
}

/// Saturday and Sunday, for every country.
pub fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Number of holidays that fall on Monday through Friday.
pub fn count_non_weekend(holidays: &[PublicHoliday]) -> usize {
    holidays.iter().filter(|h| !is_weekend(h.date)).count()
}

/// Sorts by count descending, then country code ascending.
pub fn sort_counts(counts: &mut [CountryHolidayCount]) {
    counts.sort_by(|a, b| {
        b.holiday_count
            .cmp(&a.holiday_count)
            .then_with(|| a.country_code.cmp(&b.country_code))
    });
}

/// Intersects two holiday lists by date.
///
/// The first occurrence of a date in `first_holidays` supplies that country's
/// name. Repeated dates in `second_holidays` collapse into one entry, with the
/// last name for the second country winning.
pub fn shared_dates(
    first: &str,
    first_holidays: &[PublicHoliday],
    second: &str,
    second_holidays: &[PublicHoliday],
) -> Vec<SharedHoliday> {
    let mut by_date: HashMap<NaiveDate, &PublicHoliday> = HashMap::with_capacity(first_holidays.len());
    for holiday in first_holidays {
        by_date.entry(holiday.date).or_insert(holiday);
    }

    let mut shared: BTreeMap<NaiveDate, SharedHoliday> = BTreeMap::new();
    for holiday in second_holidays {
        let Some(ours) = by_date.get(&holiday.date) else {
            continue;
        };
        let entry = shared
            .entry(holiday.date)
            .or_insert_with(|| SharedHoliday::new(holiday.date));
        entry.add_local_name(first, ours.local_name.as_str());
        entry.add_local_name(second, holiday.local_name.as_str());
    }

    shared.into_values().collect()
}
