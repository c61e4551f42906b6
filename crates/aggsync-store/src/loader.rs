//! 고정 크기 배치 적재.
//!
//! 행을 순서대로 `batch_size`씩 잘라 배치마다 하나의 upsert 트랜잭션을
//! 실행합니다. 커밋은 배치 단위이므로 중간 실패 시 앞선 배치는 그대로
//! 남고, 같은 범위를 처음부터 다시 실행해도 자연 키 upsert 덕분에 중복이
//! 생기지 않습니다.

use std::time::Instant;

use aggsync_core::AggregateRow;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use crate::error::LoadError;
use crate::sink::AggregateSink;

/// 기본 배치 크기.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// 적재 결과.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// 커밋된 배치 수
    pub batches: usize,
    /// 커밋된 행 수
    pub rows: usize,
}

/// 배치 적재기.
pub struct BatchLoader<K> {
    sink: K,
    batch_size: usize,
}

impl<K: AggregateSink> BatchLoader<K> {
    /// `batch_size`가 0이면 1로 취급합니다.
    pub fn new(sink: K, batch_size: usize) -> Self {
        Self {
            sink,
            batch_size: batch_size.max(1),
        }
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// 행 수가 `n`일 때 실행될 배치 수.
    pub fn batch_count(&self, n: usize) -> usize {
        n.div_ceil(self.batch_size)
    }

    /// 모든 행을 배치 단위로 upsert합니다.
    ///
    /// 배치 실패는 재시도하지 않고 즉시 반환합니다.
    /// `cancel`은 각 배치 시작 전에 확인합니다.
    #[instrument(skip(self, rows, cancel), fields(rows = rows.len(), batch_size = self.batch_size))]
    pub async fn load(
        &self,
        rows: &[AggregateRow],
        cancel: &CancellationToken,
    ) -> Result<LoadReport, LoadError> {
        let start = Instant::now();
        let total = rows.len();
        let mut report = LoadReport::default();

        for (index, chunk) in rows.chunks(self.batch_size).enumerate() {
            if cancel.is_cancelled() {
                warn!(
                    committed = report.rows,
                    total, "취소 요청 수신, 다음 배치를 시작하지 않습니다"
                );
                return Err(LoadError::Cancelled {
                    committed_rows: report.rows,
                });
            }

            match self.sink.upsert_batch(chunk).await {
                Ok(count) => {
                    report.batches += 1;
                    report.rows += count as usize;
                    info!(
                        batch = index + 1,
                        progress = format!("{}/{}", report.rows, total),
                        "배치 upsert 완료"
                    );
                }
                Err(e) => {
                    error!(
                        batch = index + 1,
                        committed = report.rows,
                        error = %e,
                        "배치 upsert 실패"
                    );
                    return Err(LoadError::Batch {
                        index,
                        committed_rows: report.rows,
                        source: e,
                    });
                }
            }
        }

        info!(
            batches = report.batches,
            rows = report.rows,
            elapsed = format!("{:.1}s", start.elapsed().as_secs_f64()),
            "적재 완료"
        );
        Ok(report)
    }
}
