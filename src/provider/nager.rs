//! Client for the [Nager.Date](https://date.nager.at) public holiday API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use tracing::{debug, warn};

use super::{HolidayProvider, Holidays, ProviderError};
use crate::model::PublicHoliday;

/// Base URL of the public Nager.Date v3 API.
pub const DEFAULT_BASE_URL: &str = "https://date.nager.at/api/v3";

/// Fetches holidays from `{base_url}/PublicHolidays/{year}/{countryCode}`.
///
/// The provider does no caching of its own; wrap it in a
/// [`CachedHolidayProvider`](crate::cache::CachedHolidayProvider).
#[derive(Debug, Clone)]
pub struct NagerProvider {
    client: reqwest::Client,
    base_url: String,
}

impl NagerProvider {
    /// Creates a provider for `base_url` whose requests give up after `timeout`.
    ///
    /// A trailing `/` on `base_url` is ignored.
    ///
    /// # Errors
    ///
    /// Returns the underlying [`reqwest::Error`] if the HTTP client cannot be
    /// built (e.g. the TLS backend fails to initialise).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self::with_client(client, base_url))
    }

    /// Creates a provider that reuses an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self { client, base_url }
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, year: i32, country_code: &str) -> String {
        format!("{}/PublicHolidays/{year}/{country_code}", self.base_url)
    }
}

#[async_trait]
impl HolidayProvider for NagerProvider {
    async fn fetch(&self, year: i32, country_code: &str) -> Result<Holidays, ProviderError> {
        let url = self.url_for(year, country_code);
        debug!(url = %url, "requesting public holidays");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                url: url.clone(),
                source: Arc::new(e),
            })?;

        let status = response.status();
        if status == StatusCode::NO_CONTENT {
            return Err(ProviderError::NoContent { url });
        }
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "upstream rejected holiday request");
            return Err(ProviderError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| ProviderError::Transport {
            url: url.clone(),
            source: Arc::new(e),
        })?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(ProviderError::NoContent { url });
        }

        match decode_holidays(&body) {
            Ok(Some(holidays)) => Ok(holidays),
            Ok(None) => Err(ProviderError::NoContent { url }),
            Err(e) => Err(ProviderError::Decode {
                url,
                source: Arc::new(e),
            }),
        }
    }
}

// A literal `null` body decodes to `None`, the same "no answer" as a 204.
fn decode_holidays(body: &[u8]) -> Result<Option<Holidays>, serde_json::Error> {
    let holidays: Option<Vec<PublicHoliday>> = serde_json::from_slice(body)?;
    Ok(holidays.map(Holidays::from))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let provider = NagerProvider::with_client(reqwest::Client::new(), "http://localhost:9999/api/v3/");
        assert_eq!(provider.base_url(), "http://localhost:9999/api/v3");
        assert_eq!(
            provider.url_for(2024, "DE"),
            "http://localhost:9999/api/v3/PublicHolidays/2024/DE"
        );
    }

    #[test]
    fn decode_empty_array_is_empty_list() {
        let holidays = decode_holidays(b"[]").unwrap().unwrap();
        assert!(holidays.is_empty());
    }

    #[test]
    fn decode_null_is_no_answer() {
        assert!(decode_holidays(b"null").unwrap().is_none());
    }

    #[test]
    fn decode_rejects_non_array() {
        assert!(decode_holidays(br#"{"title":"Not Found"}"#).is_err());
    }
}
