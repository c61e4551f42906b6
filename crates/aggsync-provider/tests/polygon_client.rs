//! Polygon 클라이언트 HTTP 통합 테스트 (mockito 서버 사용).

use std::time::Duration;

use aggsync_core::{FetchSpec, FieldSource, FieldValue, SortOrder, Timespan};
use aggsync_provider::{
    AggregateSource, FetchError, PolygonClient, PolygonConfig, ProviderError, RecordFetcher,
    RetryConfig,
};
use mockito::Matcher;

const AGGS_PATH: &str = "/v2/aggs/ticker/XYZ/range/1/minute/2024-01-02/2024-01-03";

fn spec() -> FetchSpec {
    FetchSpec {
        ticker: "XYZ".to_string(),
        multiplier: 1,
        timespan: Timespan::Minute,
        start: "2024-01-02".parse().unwrap(),
        end: "2024-01-03".parse().unwrap(),
        adjusted: true,
        sort: SortOrder::Ascending,
        limit: 2,
        api_key: "test-key".to_string().into(),
    }
}

fn client(server: &mockito::ServerGuard) -> PolygonClient {
    PolygonClient::new(PolygonConfig {
        base_url: server.url(),
        request_timeout: Duration::from_secs(5),
    })
    .unwrap()
}

#[tokio::test]
async fn test_follows_next_url_with_api_key() {
    let mut server = mockito::Server::new_async().await;
    let next_url = format!("{}/v2/aggs/cursor/page2?cursor=abc", server.url());

    let first = server
        .mock("GET", AGGS_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("adjusted".into(), "true".into()),
            Matcher::UrlEncoded("sort".into(), "asc".into()),
            Matcher::UrlEncoded("limit".into(), "2".into()),
            Matcher::UrlEncoded("apiKey".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"status":"OK","results":[
                {{"t":1704205800000,"o":1.0,"h":2.0,"l":0.5,"c":1.5,"v":100}},
                {{"t":1704205860000,"o":1.5,"h":2.5,"l":1.0,"c":2.0}}
            ],"next_url":"{}"}}"#,
            next_url
        ))
        .create_async()
        .await;

    let second = server
        .mock("GET", "/v2/aggs/cursor/page2")
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("cursor".into(), "abc".into()),
            Matcher::UrlEncoded("apiKey".into(), "test-key".into()),
        ]))
        .with_status(200)
        .with_body(r#"{"status":"OK","results":[{"t":1704205920000,"o":2,"h":3,"l":2,"c":3}]}"#)
        .create_async()
        .await;

    let fetcher = RecordFetcher::new(client(&server), RetryConfig::no_retry());
    let records = fetcher.fetch_all(&spec()).await.unwrap();

    first.assert_async().await;
    second.assert_async().await;

    assert_eq!(records.len(), 3);
    assert_eq!(
        records[2].field(&["t", "timestamp"]),
        Some(FieldValue::Int(1_704_205_920_000))
    );
    assert_eq!(records[1].field(&["v", "volume"]), None);
}

#[tokio::test]
async fn test_empty_range_yields_no_records() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", AGGS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"status":"OK","resultsCount":0}"#)
        .create_async()
        .await;

    let page = client(&server).fetch_page(&spec(), None).await.unwrap();
    assert!(page.records.is_empty());
    assert_eq!(page.next_cursor, None);
}

#[tokio::test]
async fn test_status_classification() {
    let mut server = mockito::Server::new_async().await;
    let cases = [
        (429, "rate"),
        (401, "auth"),
        (503, "server"),
        (404, "api"),
    ];

    for (status, kind) in cases {
        let mock = server
            .mock("GET", AGGS_PATH)
            .match_query(Matcher::Any)
            .with_status(status)
            .with_body("nope")
            .create_async()
            .await;

        let err = client(&server).fetch_page(&spec(), None).await.unwrap_err();
        match kind {
            "rate" => assert!(matches!(err, ProviderError::RateLimited)),
            "auth" => assert!(matches!(err, ProviderError::Unauthorized(_))),
            "server" => assert!(matches!(err, ProviderError::Server { status: 503, .. })),
            _ => assert!(matches!(err, ProviderError::Api { status: 404, .. })),
        }
        mock.remove_async().await;
    }
}

#[tokio::test]
async fn test_garbled_body_is_retryable_malformed_page() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", AGGS_PATH)
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let err = client(&server).fetch_page(&spec(), None).await.unwrap_err();
    assert!(matches!(err, ProviderError::MalformedPage(_)));
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_unauthorized_is_not_retried() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", AGGS_PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .with_body(r#"{"status":"ERROR","error":"Unknown API Key"}"#)
        .expect(1)
        .create_async()
        .await;

    let fetcher = RecordFetcher::new(client(&server), RetryConfig::default());
    let err = fetcher.fetch_all(&spec()).await.unwrap_err();

    assert!(matches!(err, FetchError::Fatal(ProviderError::Unauthorized(_))));
    mock.assert_async().await;
}
