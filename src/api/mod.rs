//! HTTP endpoints for the holiday views.
//!
//! | Route                                          | Query                         |
//! |------------------------------------------------|-------------------------------|
//! | `GET /api/holidays/last-celebrated/:countryCode` |                             |
//! | `GET /api/holidays/non-weekend-count`          | `year`, `countries`           |
//! | `GET /api/holidays/shared`                     | `year`, `country1`, `country2`|
//! | `GET /api/holidays/health`                     |                               |
//!
//! Input is validated here and nowhere else: years must lie in
//! [`MIN_YEAR`]`..=`[`MAX_YEAR`], country codes must be non-blank and are
//! upper-cased before they reach the [`HolidayService`]. Rejected requests get a
//! `400` with a JSON [`ErrorBody`].

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use serde::Serialize;
use thiserror::Error;

use crate::context::Context;
use crate::provider::HolidayProvider;
use crate::router::Router;
use crate::service::HolidayService;
use crate::{Response, StatusCode};

pub const MIN_YEAR: i32 = 1900;
pub const MAX_YEAR: i32 = 2100;

/// Reasons a request is answered without reaching the service.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("Required parameter '{0}' is missing")]
    MissingParameter(&'static str),

    #[error("Invalid value '{value}' for parameter '{name}'. Expected type: {expected}")]
    TypeMismatch {
        name: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Year must be between {MIN_YEAR} and {MAX_YEAR}, got {0}")]
    YearOutOfRange(i32),

    #[error("Parameter '{0}' must not be blank")]
    Blank(&'static str),

    #[error("No handler found for {0}")]
    NotFound(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NotFound,
            _ => StatusCode::BadRequest,
        }
    }

    pub fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorBody {
            timestamp: Local::now().naive_local(),
            status: status.as_u16(),
            error: status.canonical_reason(),
            message: self.to_string(),
        };
        Response::json(status, &body)
    }
}

/// JSON shape of every error response.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub timestamp: NaiveDateTime,
    pub status: u16,
    pub error: &'static str,
    pub message: String,
}

/// Builds the router serving every holiday endpoint on top of `service`.
pub fn routes<P>(service: Arc<HolidayService<P>>) -> Router
where
    P: HolidayProvider + 'static,
{
    let mut router = Router::new();

    let svc = Arc::clone(&service);
    router.get("/api/holidays/last-celebrated/:countryCode", move |ctx: Context| {
        last_celebrated(Arc::clone(&svc), ctx)
    });

    let svc = Arc::clone(&service);
    router.get("/api/holidays/non-weekend-count", move |ctx: Context| {
        non_weekend_count(Arc::clone(&svc), ctx)
    });

    let svc = service;
    router.get("/api/holidays/shared", move |ctx: Context| {
        shared(Arc::clone(&svc), ctx)
    });

    router.get("/api/holidays/health", |_ctx| async {
        Response::new(StatusCode::Ok).body("Holiday API is running")
    });

    router.fallback(|ctx: Context| async move {
        ApiError::NotFound(ctx.request().path().to_owned()).into_response()
    });

    router
}

async fn last_celebrated<P: HolidayProvider>(service: Arc<HolidayService<P>>, ctx: Context) -> Response {
    let code = match country_code(ctx.params().get("countryCode"), "countryCode") {
        Ok(code) => code,
        Err(e) => return e.into_response(),
    };
    Response::json(StatusCode::Ok, &service.last_celebrated(&code).await)
}

async fn non_weekend_count<P: HolidayProvider>(service: Arc<HolidayService<P>>, ctx: Context) -> Response {
    let (year, countries) = match parse_year(&ctx).and_then(|y| Ok((y, country_list(&ctx, "countries")?))) {
        Ok(parsed) => parsed,
        Err(e) => return e.into_response(),
    };
    Response::json(StatusCode::Ok, &service.non_weekend_counts(year, &countries).await)
}

async fn shared<P: HolidayProvider>(service: Arc<HolidayService<P>>, ctx: Context) -> Response {
    let parsed = parse_year(&ctx).and_then(|y| {
        let first = country_code(ctx.query("country1"), "country1")?;
        let second = country_code(ctx.query("country2"), "country2")?;
        Ok((y, first, second))
    });
    let (year, first, second) = match parsed {
        Ok(parsed) => parsed,
        Err(e) => return e.into_response(),
    };
    Response::json(StatusCode::Ok, &service.shared_holidays(year, &first, &second).await)
}

fn parse_year(ctx: &Context) -> Result<i32, ApiError> {
    let raw = ctx.query("year").ok_or(ApiError::MissingParameter("year"))?;
    let year: i32 = raw.trim().parse().map_err(|_| ApiError::TypeMismatch {
        name: "year",
        value: raw.to_owned(),
        expected: "int",
    })?;
    if !(MIN_YEAR..=MAX_YEAR).contains(&year) {
        return Err(ApiError::YearOutOfRange(year));
    }
    Ok(year)
}

fn country_code(raw: Option<&str>, name: &'static str) -> Result<String, ApiError> {
    let code = raw.ok_or(ApiError::MissingParameter(name))?.trim();
    if code.is_empty() {
        return Err(ApiError::Blank(name));
    }
    Ok(code.to_uppercase())
}

// Accepts `countries=US,GB`, `countries=US&countries=GB`, or a mix of both.
fn country_list(ctx: &Context, name: &'static str) -> Result<Vec<String>, ApiError> {
    let mut values = ctx.query_all(name).peekable();
    if values.peek().is_none() {
        return Err(ApiError::MissingParameter(name));
    }

    let codes: Vec<String> = values
        .flat_map(|v| v.split(','))
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_uppercase)
        .collect();
    if codes.is_empty() {
        return Err(ApiError::Blank(name));
    }
    Ok(codes)
}

#[cfg(test)]
mod tests {
    use super::*;

    use async_trait::async_trait;
    use chrono::NaiveDate;
    use serde_json::Value;

    use crate::Request;
    use crate::model::PublicHoliday;
    use crate::provider::{Holidays, ProviderError};

    /// Every country observes New Year's Day and, except "XX", nothing else.
    struct NewYearOnly;

    #[async_trait]
    impl HolidayProvider for NewYearOnly {
        async fn fetch(&self, year: i32, country_code: &str) -> Result<Holidays, ProviderError> {
            if country_code == "XX" {
                return Err(ProviderError::Status {
                    url: format!("stub://{year}/XX"),
                    status: 404,
                });
            }
            let date = NaiveDate::from_ymd_opt(year, 1, 1).unwrap();
            let name = format!("New Year {country_code}");
            Ok(vec![PublicHoliday::new(date, name.clone(), name, country_code)].into())
        }
    }

    fn router() -> Router {
        routes(Arc::new(HolidayService::new(NewYearOnly)))
    }

    fn get(path: &str) -> Request {
        let raw = format!("GET {path} HTTP/1.1\r\nHost: localhost\r\n\r\n");
        Request::parse(raw.as_bytes()).unwrap().0
    }

    async fn call(path: &str) -> (StatusCode, Value) {
        let res = router().route(get(path)).await;
        let body = serde_json::from_slice(res.body_ref()).unwrap_or(Value::Null);
        (res.status(), body)
    }

    #[tokio::test]
    async fn health_is_plain_text() {
        let res = router().route(get("/api/holidays/health")).await;
        assert_eq!(res.status(), StatusCode::Ok);
        assert_eq!(res.body_ref(), b"Holiday API is running");
    }

    #[tokio::test]
    async fn last_celebrated_uppercases_the_code() {
        let (status, body) = call("/api/holidays/last-celebrated/de").await;
        assert_eq!(status, StatusCode::Ok);
        let list = body.as_array().unwrap();
        assert!(!list.is_empty());
        assert!(list.iter().all(|h| h["countryCode"] == "DE"));
    }

    #[tokio::test]
    async fn last_celebrated_decodes_the_path_code() {
        let (status, body) = call("/api/holidays/last-celebrated/d%45").await;
        assert_eq!(status, StatusCode::Ok);
        assert!(body.as_array().unwrap().iter().all(|h| h["countryCode"] == "DE"));

        let (status, body) = call("/api/holidays/last-celebrated/%20").await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body["message"], "Parameter 'countryCode' must not be blank");
    }

    #[tokio::test]
    async fn non_weekend_count_accepts_comma_and_repeated_lists() {
        let (status, body) =
            call("/api/holidays/non-weekend-count?year=2024&countries=us,%20gb&countries=XX").await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(
            body,
            serde_json::json!([
                {"countryCode": "GB", "holidayCount": 1},
                {"countryCode": "US", "holidayCount": 1},
                {"countryCode": "XX", "holidayCount": 0},
            ])
        );
    }

    #[tokio::test]
    async fn shared_returns_both_local_names() {
        let (status, body) = call("/api/holidays/shared?year=2024&country1=us&country2=de").await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(
            body,
            serde_json::json!([
                {"date": "2024-01-01", "localNames": {"DE": "New Year DE", "US": "New Year US"}}
            ])
        );
    }

    #[tokio::test]
    async fn shared_with_failed_country_is_empty() {
        let (status, body) = call("/api/holidays/shared?year=2024&country1=US&country2=xx").await;
        assert_eq!(status, StatusCode::Ok);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn year_out_of_range_is_rejected() {
        let (status, body) = call("/api/holidays/shared?year=1899&country1=US&country2=DE").await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body["status"], 400);
        assert_eq!(body["error"], "Bad Request");
        assert_eq!(body["message"], "Year must be between 1900 and 2100, got 1899");
        assert!(body["timestamp"].is_string());

        let (status, _) = call("/api/holidays/non-weekend-count?year=2101&countries=US").await;
        assert_eq!(status, StatusCode::BadRequest);
    }

    #[tokio::test]
    async fn non_numeric_year_is_a_type_mismatch() {
        let (status, body) = call("/api/holidays/non-weekend-count?year=soon&countries=US").await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(
            body["message"],
            "Invalid value 'soon' for parameter 'year'. Expected type: int"
        );
    }

    #[tokio::test]
    async fn missing_and_blank_parameters_are_rejected() {
        let (status, body) = call("/api/holidays/shared?year=2024&country1=US").await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body["message"], "Required parameter 'country2' is missing");

        let (status, body) = call("/api/holidays/shared?year=2024&country1=%20&country2=DE").await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body["message"], "Parameter 'country1' must not be blank");

        let (status, _) = call("/api/holidays/non-weekend-count?year=2024").await;
        assert_eq!(status, StatusCode::BadRequest);

        let (status, body) = call("/api/holidays/non-weekend-count?year=2024&countries=,,").await;
        assert_eq!(status, StatusCode::BadRequest);
        assert_eq!(body["message"], "Parameter 'countries' must not be blank");
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let (status, body) = call("/api/holidays/upcoming").await;
        assert_eq!(status, StatusCode::NotFound);
        assert_eq!(body["status"], 404);
        assert_eq!(body["message"], "No handler found for /api/holidays/upcoming");
    }
}
