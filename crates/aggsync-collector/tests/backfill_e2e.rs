//! 수집 → 변환 → 적재 전체 흐름 테스트 (메모리 저장소).

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use aggsync_collector::modules::run_backfill;
use aggsync_collector::PipelineError;
use aggsync_core::{
    AggregateBar, DateBound, FetchSpec, NaturalKey, RawRecord, SortOrder, Timespan,
};
use aggsync_provider::{
    AggregatePage, AggregateSource, FetchError, ProviderError, RecordFetcher, RetryConfig,
};
use aggsync_store::{BatchLoader, MemoryAggregateStore};
use async_trait::async_trait;
use rust_decimal_macros::dec;
use serde_json::json;
use tokio_util::sync::CancellationToken;

/// 커서별로 정해진 페이지를 돌려주는 공급원.
struct ScriptedSource {
    pages: HashMap<Option<String>, AggregatePage>,
    failures_left: AtomicUsize,
}

impl ScriptedSource {
    fn new(pages: Vec<(Option<&str>, Vec<RawRecord>, Option<&str>)>) -> Self {
        Self {
            pages: pages
                .into_iter()
                .map(|(cursor, records, next)| {
                    (
                        cursor.map(str::to_string),
                        AggregatePage {
                            records,
                            next_cursor: next.map(str::to_string),
                        },
                    )
                })
                .collect(),
            failures_left: AtomicUsize::new(0),
        }
    }

    fn failing_first(self, n: usize) -> Self {
        self.failures_left.store(n, Ordering::SeqCst);
        self
    }
}

#[async_trait]
impl AggregateSource for ScriptedSource {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn fetch_page(
        &self,
        _spec: &FetchSpec,
        cursor: Option<&str>,
    ) -> Result<AggregatePage, ProviderError> {
        if self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(ProviderError::RateLimited);
        }

        self.pages
            .get(&cursor.map(str::to_string))
            .cloned()
            .ok_or_else(|| ProviderError::MalformedPage(format!("unknown cursor {:?}", cursor)))
    }
}

fn spec() -> FetchSpec {
    FetchSpec {
        ticker: "XYZ".to_string(),
        multiplier: 1,
        timespan: Timespan::Minute,
        start: "2024-01-02".parse::<DateBound>().unwrap(),
        end: "2024-01-02".parse::<DateBound>().unwrap(),
        adjusted: true,
        sort: SortOrder::Ascending,
        limit: 1,
        api_key: "test-key".to_string().into(),
    }
}

fn bag(value: serde_json::Value) -> RawRecord {
    RawRecord::from_json(value).unwrap()
}

fn key(ts_ms: i64) -> NaturalKey {
    NaturalKey {
        ticker: "XYZ".to_string(),
        multiplier: 1,
        timespan: Timespan::Minute,
        ts_ms,
    }
}

#[tokio::test]
async fn test_two_runs_with_duplicate_key_keep_latest_close() {
    let store = Arc::new(MemoryAggregateStore::new());
    let cancel = CancellationToken::new();

    // 1회차: 두 페이지, 초 단위 타임스탬프가 섞여 있음
    let first = ScriptedSource::new(vec![
        (
            None,
            vec![bag(json!({"t": 1_704_205_800_000i64, "o": 100, "h": 101, "l": 99, "c": 100.5, "v": 1200}))],
            Some("p2"),
        ),
        (
            Some("p2"),
            vec![bag(json!({"t": 1_704_205_860i64, "o": 100.5, "h": 102, "l": 100, "c": 101.25}))],
            None,
        ),
    ]);
    let fetcher = RecordFetcher::new(first, RetryConfig::no_retry());
    let loader = BatchLoader::new(store.clone(), 1);
    let (stats, result) = run_backfill(&fetcher, &loader, &spec(), &cancel).await;
    result.unwrap();
    assert_eq!(stats.fetched, 2);
    assert_eq!(stats.upserted, 2);
    assert_eq!(stats.batches, 2);

    // 2회차: 같은 분봉이 다른 종가로 다시 들어옴 (타입 봉 형태)
    let second = ScriptedSource::new(vec![(
        None,
        vec![RawRecord::from(AggregateBar {
            timestamp: Some(1_704_205_860_000),
            open: Some(100.5),
            high: Some(102.0),
            low: Some(100.0),
            close: Some(101.75),
            volume: Some(800.0),
            vwap: None,
            transactions: Some(42),
            otc: None,
        })],
        None,
    )]);
    let fetcher = RecordFetcher::new(second, RetryConfig::no_retry());
    let loader = BatchLoader::new(store.clone(), 1000);
    let (stats, result) = run_backfill(&fetcher, &loader, &spec(), &cancel).await;
    result.unwrap();
    assert_eq!(stats.upserted, 1);

    assert_eq!(store.len().await, 2);

    let kept = store.get(&key(1_704_205_800_000)).await.unwrap();
    assert_eq!(kept.close, dec!(100.5));
    assert_eq!(kept.volume, Some(1200));

    let replaced = store.get(&key(1_704_205_860_000)).await.unwrap();
    assert_eq!(replaced.close, dec!(101.75));
    assert_eq!(replaced.volume, Some(800));
    assert_eq!(replaced.transactions, Some(42));
    assert_eq!(replaced.dt_utc.to_rfc3339(), "2024-01-02T14:31:00+00:00");
}

#[tokio::test(start_paused = true)]
async fn test_transient_failures_restart_walk_without_duplicates() {
    let source = ScriptedSource::new(vec![
        (None, vec![bag(json!({"t": 1_704_205_800_000i64, "o": 1, "h": 1, "l": 1, "c": 1}))], Some("p2")),
        (Some("p2"), vec![bag(json!({"t": 1_704_205_860_000i64, "o": 2, "h": 2, "l": 2, "c": 2}))], None),
    ])
    .failing_first(2);
    let fetcher = RecordFetcher::new(source, RetryConfig::default());
    let loader = BatchLoader::new(MemoryAggregateStore::new(), 1000);

    let (stats, result) = run_backfill(&fetcher, &loader, &spec(), &CancellationToken::new()).await;

    result.unwrap();
    assert_eq!(stats.fetched, 2);
    assert_eq!(loader.sink().len().await, 2);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_retries_load_nothing() {
    let source = ScriptedSource::new(vec![(None, vec![], None)]).failing_first(10);
    let fetcher = RecordFetcher::new(source, RetryConfig::new(2, std::time::Duration::from_millis(10)));
    let loader = BatchLoader::new(MemoryAggregateStore::new(), 1000);

    let (stats, result) = run_backfill(&fetcher, &loader, &spec(), &CancellationToken::new()).await;

    match result {
        Err(PipelineError::Fetch(FetchError::Exhausted { attempts, .. })) => assert_eq!(attempts, 3),
        other => panic!("unexpected result: {:?}", other),
    }
    assert_eq!(stats.fetched, 0);
    assert!(loader.sink().is_empty().await);
}
