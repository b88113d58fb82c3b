//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a fake sold-listings index and run
//! complete crawls against it over real HTTP.

use chrono::NaiveDate;
use slutpris::config::Config;
use slutpris::crawler::{crawl, list_cached_runs, CrawlRequest, DateRange};
use slutpris::storage::RunStatus;
use slutpris::{City, ListingTable, SlutprisError};
use std::path::PathBuf;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INDEX_PATH: &str = "/slutpriser/linkoping/393";

fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").expect("valid test date")
}

/// Builds one index page holding `listings` as `(id, sold date)` pairs
///
/// `per_page` and `total` end up in the listing count marker.
fn index_page(listings: &[(u32, &str)], per_page: u32, total: u32) -> String {
    let entries: Vec<String> = listings
        .iter()
        .map(|(id, sold)| {
            format!(
                r#""SoldProperty:{id}":{{"soldPrice":{{"formatted":"2 000 000 kr"}},"objectType":"Lägenhet","rooms":{{"formatted":"2 rum"}},"livingArea":{{"formatted":"55 m²"}},"streetAddress":"Storgatan {id}","descriptiveAreaName":"Innerstaden","soldDate":"{sold}","url":"/bostad/{id}"}}"#
            )
        })
        .collect();

    format!(
        r#"<html><body>
        <p>Visar <!-- -->{per_page}<!-- --> av <!-- -->{total}<!-- --> slutpriser</p>
        <script id="__NEXT_DATA__" type="application/json">{{"props":{{"pageProps":{{"__APOLLO_STATE__":{{{}}}}}}}}}</script>
        </body></html>"#,
        entries.join(",")
    )
}

fn test_config(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.site.base_url = server.uri();
    config.crawler.n_crawlers = 2;
    config.crawler.poll_interval = 5;
    config.crawler.idle_sleep = 1;
    config.crawler.request_timeout = 5;
    config
}

fn request(from: &str, to: &str, cache_path: Option<PathBuf>) -> CrawlRequest {
    CrawlRequest {
        city: City::Linkoping,
        range: DateRange::new(date(from), date(to)).expect("valid range"),
        explicit_pages: None,
        use_cache: cache_path.is_some(),
        cache_path: cache_path.unwrap_or_default(),
        concurrency: 2,
    }
}

/// Runs the blocking crawl off the async runtime
async fn run_crawl(config: Config, request: CrawlRequest) -> Result<ListingTable, SlutprisError> {
    tokio::task::spawn_blocking(move || crawl(&config, &request))
        .await
        .expect("crawl thread panicked")
}

async fn mount_page(server: &MockServer, page: u32, body: String) {
    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

fn sold_dates(table: &ListingTable) -> Vec<Option<NaiveDate>> {
    table.rows().map(|row| row.date_sold).collect()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_full_crawl_all_pages() {
    let server = MockServer::start().await;

    mount_page(&server, 1, index_page(&[(1, "2024-01-02"), (2, "2024-01-05")], 2, 5)).await;
    mount_page(&server, 2, index_page(&[(3, "2024-01-09"), (4, "2024-01-12")], 2, 5)).await;
    mount_page(&server, 3, index_page(&[(5, "2024-01-20")], 2, 5)).await;

    let table = run_crawl(test_config(&server), request("2024-01-01", "2024-01-31", None))
        .await
        .expect("crawl failed");

    assert_eq!(table.len(), 5);
    assert_eq!(
        sold_dates(&table),
        vec![
            Some(date("2024-01-20")),
            Some(date("2024-01-12")),
            Some(date("2024-01-09")),
            Some(date("2024-01-05")),
            Some(date("2024-01-02")),
        ]
    );

    let row = table.row(0).expect("first row");
    assert_eq!(row.price_sek, Some(2_000_000));
    assert_eq!(row.rooms, Some(2));
    assert_eq!(row.street.as_deref(), Some("Storgatan 5"));
    assert_eq!(row.url, format!("{}/bostad/5", server.uri()));

    let requests = server.received_requests().await.expect("recording enabled");
    assert!(requests
        .iter()
        .all(|r| r.url.query().unwrap_or_default().contains("minSoldDate=2024-01-01")));
    // page 1 is requested by the probe and again by a worker
    assert_eq!(requests.len(), 4);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_rate_limited_page_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "0"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_page(&server, 1, index_page(&[(10, "2024-03-01"), (11, "2024-03-02")], 2, 2)).await;

    let table = run_crawl(test_config(&server), request("2024-03-01", "2024-03-31", None))
        .await
        .expect("crawl failed");

    assert_eq!(table.len(), 2);
    let requests = server.received_requests().await.expect("recording enabled");
    assert_eq!(requests.len(), 3);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_probe_error_status_fails_crawl() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(INDEX_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("linkoping.sqlite");

    let result = run_crawl(
        test_config(&server),
        request("2024-01-01", "2024-01-31", Some(cache_path.clone())),
    )
    .await;

    assert!(matches!(
        result,
        Err(SlutprisError::HttpStatus { status: 503, .. })
    ));

    let runs = list_cached_runs(&cache_path, City::Linkoping).unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].status, RunStatus::Failed);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_cached_interior_range_needs_no_requests() {
    let server = MockServer::start().await;

    mount_page(
        &server,
        1,
        index_page(
            &[(1, "2024-01-01"), (2, "2024-01-15"), (3, "2024-01-31")],
            3,
            3,
        ),
    )
    .await;

    let dir = TempDir::new().unwrap();
    let cache_path = dir.path().join("nested").join("linkoping.sqlite");

    let first = run_crawl(
        test_config(&server),
        request("2024-01-01", "2024-01-31", Some(cache_path.clone())),
    )
    .await
    .expect("first crawl failed");
    assert_eq!(first.len(), 3);

    let after_first = server.received_requests().await.unwrap().len();

    let second = run_crawl(
        test_config(&server),
        request("2024-01-10", "2024-01-20", Some(cache_path.clone())),
    )
    .await
    .expect("second crawl failed");

    assert_eq!(sold_dates(&second), vec![Some(date("2024-01-15"))]);
    assert_eq!(server.received_requests().await.unwrap().len(), after_first);

    let runs = list_cached_runs(&cache_path, City::Linkoping).unwrap();
    let statuses: Vec<RunStatus> = runs.iter().map(|r| r.status).collect();
    assert_eq!(statuses, vec![RunStatus::CacheHit, RunStatus::Completed]);
}
