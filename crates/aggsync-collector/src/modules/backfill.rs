//! 집계 봉 백필.
//!
//! 수집은 전 구간을 메모리로 모은 뒤 변환하고, 그다음 배치 적재합니다.
//! 통계는 실패한 경우에도 진행된 만큼 채워집니다.

use std::time::Instant;

use aggsync_core::{AggregateRow, FetchSpec, RowTransformer};
use aggsync_provider::{AggregateSource, RecordFetcher};
use aggsync_store::{AggregateSink, BatchLoader, LoadError};
use tokio_util::sync::CancellationToken;

use crate::error::PipelineError;
use crate::{IngestStats, Result};

/// 전 구간을 수집한 뒤 모든 레코드를 행으로 변환합니다.
///
/// 레코드 하나라도 변환에 실패하면 아무것도 반환하지 않습니다.
/// 수집 중 `cancel`이 취소되면 진행 중인 요청을 버리고 `Cancelled`를 반환합니다.
pub async fn collect_rows<S: AggregateSource>(
    fetcher: &RecordFetcher<S>,
    spec: &FetchSpec,
    cancel: &CancellationToken,
    stats: &mut IngestStats,
) -> Result<Vec<AggregateRow>> {
    tracing::info!(source = fetcher.source().name(), range = %spec.describe(), "수집 시작");

    let records = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            tracing::warn!("취소 요청 수신, 수집을 중단합니다");
            return Err(PipelineError::Cancelled);
        }
        fetched = fetcher.fetch_all(spec) => fetched?,
    };
    stats.fetched = records.len();
    tracing::info!(records = records.len(), "수집 완료");

    let transformer = RowTransformer::new(spec.ticker.clone(), spec.multiplier, spec.timespan);
    let rows = transformer
        .transform_all(&records)
        .map_err(|(index, source)| {
            tracing::error!(index, error = %source, "레코드 변환 실패");
            PipelineError::Transform { index, source }
        })?;
    stats.transformed = rows.len();

    Ok(rows)
}

/// 변환된 행을 배치 단위로 upsert합니다.
pub async fn load_rows<K: AggregateSink>(
    loader: &BatchLoader<K>,
    rows: &[AggregateRow],
    cancel: &CancellationToken,
    stats: &mut IngestStats,
) -> Result<()> {
    match loader.load(rows, cancel).await {
        Ok(report) => {
            stats.upserted = report.rows;
            stats.batches = report.batches;
            Ok(())
        }
        Err(e) => {
            stats.upserted = e.committed_rows();
            stats.batches = match &e {
                LoadError::Batch { index, .. } => *index,
                LoadError::Cancelled { committed_rows } => committed_rows / loader.batch_size(),
            };
            Err(e.into())
        }
    }
}

/// 수집 → 변환 → 적재를 한 번에 실행합니다.
///
/// 스키마는 이미 준비된 것으로 간주합니다.
pub async fn run_backfill<S: AggregateSource, K: AggregateSink>(
    fetcher: &RecordFetcher<S>,
    loader: &BatchLoader<K>,
    spec: &FetchSpec,
    cancel: &CancellationToken,
) -> (IngestStats, Result<()>) {
    let start = Instant::now();
    let mut stats = IngestStats::new();

    let result = match collect_rows(fetcher, spec, cancel, &mut stats).await {
        Ok(rows) => load_rows(loader, &rows, cancel, &mut stats).await,
        Err(e) => Err(e),
    };

    stats.elapsed = start.elapsed();
    (stats, result)
}
