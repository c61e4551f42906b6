//! 백필 실행 통계.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 한 번의 백필 실행 통계
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IngestStats {
    /// 공급자에서 받은 레코드 수
    pub fetched: usize,
    /// 변환된 행 수
    pub transformed: usize,
    /// upsert된 행 수 (실패 시 커밋된 행까지)
    pub upserted: usize,
    /// 커밋된 배치 수
    pub batches: usize,
    /// 소요 시간
    #[serde(skip)]
    pub elapsed: Duration,
}

impl IngestStats {
    /// 새 통계 객체 생성
    pub fn new() -> Self {
        Self::default()
    }

    /// 사람이 읽는 한 줄 요약
    pub fn summary_line(&self) -> String {
        format!(
            "fetched {} records, upserted {} rows in {} batches ({:.1}s)",
            self.fetched,
            self.upserted,
            self.batches,
            self.elapsed.as_secs_f64()
        )
    }

    /// 통계 요약 로그 출력
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            fetched = self.fetched,
            transformed = self.transformed,
            upserted = self.upserted,
            batches = self.batches,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "백필 종료"
        );
    }
}
