//! Drives `NagerProvider` against a local stand-in for the Nager.Date API.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use holiday_lens::context::Context;
use holiday_lens::{
    CachedHolidayProvider, HolidayProvider, NagerProvider, ProviderError, Response, Router, Server,
    StatusCode,
};
use tokio::sync::oneshot;

const GERMANY_2024: &str = r#"[
    {"date":"2024-01-01","localName":"Neujahr","name":"New Year's Day","countryCode":"DE",
     "fixed":true,"global":true,"counties":null,"launchYear":1967,"types":["Public"]},
    {"date":"2024-10-03","localName":"Tag der Deutschen Einheit","name":"German Unity Day",
     "countryCode":"DE","fixed":true,"global":true,"counties":null,"launchYear":null,"types":["Public"]}
]"#;

struct Upstream {
    base_url: String,
    hits: Arc<AtomicUsize>,
    _stop: oneshot::Sender<()>,
}

// Countries select the canned answer: DE has data, EM is empty, NC answers 204,
// NU answers `null`, BAD answers garbage, anything else is unknown (404).
async fn spawn_upstream() -> Upstream {
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&hits);

    let mut router = Router::new();
    router.get("/api/v3/PublicHolidays/:year/:country", move |ctx: Context| {
        counter.fetch_add(1, Ordering::SeqCst);
        async move {
            let json = |body: &str| {
                Response::new(StatusCode::Ok)
                    .header("Content-Type", "application/json")
                    .body(body.to_owned())
            };
            match ctx.params().get("country").unwrap_or_default() {
                "DE" => json(GERMANY_2024),
                "EM" => json("[]"),
                "NU" => json("null"),
                "BAD" => json("<html>maintenance</html>"),
                "NC" => Response::new(StatusCode::NoContent),
                _ => Response::new(StatusCode::NotFound),
            }
        }
    });

    let server = Server::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/api/v3/", server.local_addr());
    let (stop, stopped) = oneshot::channel::<()>();
    tokio::spawn(server.serve(router, async {
        let _ = stopped.await;
    }));

    Upstream {
        base_url,
        hits,
        _stop: stop,
    }
}

fn provider(upstream: &Upstream) -> NagerProvider {
    NagerProvider::with_client(reqwest::Client::new(), upstream.base_url.clone())
}

#[tokio::test]
async fn decodes_holiday_list() {
    let upstream = spawn_upstream().await;
    let holidays = provider(&upstream).fetch(2024, "DE").await.unwrap();

    assert_eq!(holidays.len(), 2);
    assert_eq!(holidays[0].local_name, "Neujahr");
    assert_eq!(holidays[0].launch_year, Some(1967));
    assert_eq!(holidays[1].name, "German Unity Day");
    assert_eq!(holidays[1].country_code, "DE");
}

#[tokio::test]
async fn empty_array_is_a_valid_answer() {
    let upstream = spawn_upstream().await;
    let holidays = provider(&upstream).fetch(2024, "EM").await.unwrap();
    assert!(holidays.is_empty());
}

#[tokio::test]
async fn unknown_country_is_a_status_error() {
    let upstream = spawn_upstream().await;
    let err = provider(&upstream).fetch(2024, "ZZ").await.unwrap_err();
    assert!(matches!(err, ProviderError::Status { status: 404, .. }), "{err:?}");
}

#[tokio::test]
async fn no_content_and_null_mean_no_answer() {
    let upstream = spawn_upstream().await;
    let provider = provider(&upstream);

    let err = provider.fetch(2024, "NC").await.unwrap_err();
    assert!(matches!(err, ProviderError::NoContent { .. }), "{err:?}");

    let err = provider.fetch(2024, "NU").await.unwrap_err();
    assert!(matches!(err, ProviderError::NoContent { .. }), "{err:?}");
}

#[tokio::test]
async fn malformed_body_is_a_decode_error() {
    let upstream = spawn_upstream().await;
    let err = provider(&upstream).fetch(2024, "BAD").await.unwrap_err();
    assert!(matches!(err, ProviderError::Decode { .. }), "{err:?}");
    assert!(err.to_string().contains("/PublicHolidays/2024/BAD"));
}

#[tokio::test]
async fn unreachable_upstream_is_a_transport_error() {
    // Bind then drop to get a port nobody is listening on.
    let addr = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .unwrap()
        .local_addr()
        .unwrap();
    let provider = NagerProvider::with_client(reqwest::Client::new(), format!("http://{addr}/api/v3"));

    let err = provider.fetch(2024, "DE").await.unwrap_err();
    assert!(matches!(err, ProviderError::Transport { .. }), "{err:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cache_fetches_each_key_once_over_http() {
    let upstream = spawn_upstream().await;
    let cache = Arc::new(CachedHolidayProvider::new(provider(&upstream)));

    let calls: Vec<_> = (0..16)
        .map(|_| {
            let cache = Arc::clone(&cache);
            tokio::spawn(async move { cache.get(2024, "DE").await })
        })
        .collect();
    for call in calls {
        assert_eq!(call.await.unwrap().unwrap().len(), 2);
    }
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 1);

    // Failures are retried on the next request.
    assert!(cache.get(2024, "ZZ").await.is_err());
    assert!(cache.get(2024, "ZZ").await.is_err());
    assert_eq!(upstream.hits.load(Ordering::SeqCst), 3);
    assert_eq!(cache.len(), 1);
}
