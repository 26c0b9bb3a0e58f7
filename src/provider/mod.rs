//! Sources of holiday records.
//!
//! Everything that can answer "which holidays does country X observe in year
//! Y" implements [`HolidayProvider`]. [`NagerProvider`] talks to the public
//! Nager.Date API; [`CachedHolidayProvider`](crate::cache::CachedHolidayProvider)
//! decorates any other provider with a bounded cache.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::model::PublicHoliday;

pub mod nager;

pub use nager::NagerProvider;

/// Shared, immutable list of holidays for one (year, country) pair.
///
/// Cheap to clone: cached entries are handed out to every caller without
/// copying the records.
pub type Holidays = Arc<[PublicHoliday]>;

/// Errors produced while fetching holidays from an upstream source.
///
/// The type is `Clone` so that a single failed fetch can be reported to every
/// caller that was waiting on it. Sources that are not `Clone` themselves are
/// kept behind an [`Arc`].
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: Arc<reqwest::Error>,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed holiday payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: Arc<serde_json::Error>,
    },

    /// The upstream answered successfully but without a payload. This is the
    /// "unknown" outcome, distinct from an empty list of holidays.
    #[error("{url} returned no holiday payload")]
    NoContent { url: String },
}

/// A source of public holiday records.
///
/// Implementations must be shareable across tasks; all calls go through
/// `&self`.
#[async_trait]
pub trait HolidayProvider: Send + Sync {
    /// Fetches all public holidays of `country_code` in `year`.
    ///
    /// `Ok` with an empty list means the country has no holidays that year.
    /// Any failure to obtain an answer is an `Err`.
    async fn fetch(&self, year: i32, country_code: &str) -> Result<Holidays, ProviderError>;
}

#[async_trait]
impl<P> HolidayProvider for Arc<P>
where
    P: HolidayProvider + ?Sized,
{
    async fn fetch(&self, year: i32, country_code: &str) -> Result<Holidays, ProviderError> {
        (**self).fetch(year, country_code).await
    }
}
