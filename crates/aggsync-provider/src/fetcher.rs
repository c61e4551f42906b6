//! 페이지네이션 순회 및 재시도.
//!
//! 한 번의 시도는 첫 페이지부터 커서가 끝날 때까지 모든 페이지를 읽어
//! 메모리에 누적합니다. 일시적 오류가 나면 누적분을 버리고 첫 페이지부터
//! 다시 시작합니다.

use std::collections::HashSet;
use std::time::Instant;

use aggsync_core::{FetchSpec, RawRecord};
use tracing::{debug, info, instrument};

use crate::retry::{with_retry, RetryConfig};
use crate::source::AggregateSource;
use crate::{FetchError, ProviderError};

/// 수집 사양 하나에 대한 전체 레코드 수집기.
pub struct RecordFetcher<S> {
    source: S,
    retry: RetryConfig,
}

impl<S: AggregateSource> RecordFetcher<S> {
    pub fn new(source: S, retry: RetryConfig) -> Self {
        Self { source, retry }
    }

    /// 내부 공급원.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// 요청 범위의 모든 레코드를 공급자 정렬 순서대로 반환합니다.
    #[instrument(skip(self, spec), fields(source = self.source.name(), spec = %spec.describe()))]
    pub async fn fetch_all(&self, spec: &FetchSpec) -> Result<Vec<RawRecord>, FetchError> {
        let start = Instant::now();
        let records = with_retry(&self.retry, || self.walk(spec)).await?;

        info!(
            records = records.len(),
            elapsed = format!("{:.1}s", start.elapsed().as_secs_f64()),
            "레코드 수집 완료"
        );
        Ok(records)
    }

    async fn walk(&self, spec: &FetchSpec) -> Result<Vec<RawRecord>, ProviderError> {
        let mut records = Vec::new();
        let mut cursor: Option<String> = None;
        let mut seen: HashSet<String> = HashSet::new();
        let mut pages = 0usize;

        loop {
            let page = self.source.fetch_page(spec, cursor.as_deref()).await?;
            pages += 1;
            records.extend(page.records);

            debug!(page = pages, accumulated = records.len(), "페이지 수신");

            match page.next_cursor {
                // 이미 방문한 커서로 돌아가면 순회가 끝나지 않음
                Some(next) if !seen.insert(next.clone()) => {
                    return Err(ProviderError::MalformedPage(format!(
                        "페이지 커서가 순환합니다: {}",
                        next
                    )));
                }
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        Ok(records)
    }
}
