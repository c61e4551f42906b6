//! 메모리 저장소.
//!
//! `PgAggregateStore`와 같은 upsert 규칙을 `BTreeMap`으로 구현합니다.
//! DB 없이 실행하는 dry-run과 테스트에서 사용합니다.

use std::collections::BTreeMap;

use aggsync_core::{AggregateRow, NaturalKey};
use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::error::{StoreError, StoreResult};
use crate::sink::AggregateSink;

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<NaturalKey, AggregateRow>,
    committed_batches: usize,
}

/// 자연 키로 정렬된 메모리 저장소.
#[derive(Debug, Default)]
pub struct MemoryAggregateStore {
    inner: Mutex<Inner>,
    fail_on_batch: Option<usize>,
}

impl MemoryAggregateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// `index`번째(0부터) 배치 호출을 실패시키는 저장소.
    ///
    /// 실패한 배치는 아무것도 반영하지 않습니다.
    pub fn failing_on_batch(index: usize) -> Self {
        Self {
            fail_on_batch: Some(index),
            ..Default::default()
        }
    }

    /// 저장된 행 (자연 키 순).
    pub async fn rows(&self) -> Vec<AggregateRow> {
        self.inner.lock().await.rows.values().cloned().collect()
    }

    /// 자연 키로 행을 조회합니다.
    pub async fn get(&self, key: &NaturalKey) -> Option<AggregateRow> {
        self.inner.lock().await.rows.get(key).cloned()
    }

    /// 저장된 행 수.
    pub async fn len(&self) -> usize {
        self.inner.lock().await.rows.len()
    }

    /// 비어 있는지 여부.
    pub async fn is_empty(&self) -> bool {
        self.inner.lock().await.rows.is_empty()
    }

    /// 커밋된 배치 수.
    pub async fn committed_batches(&self) -> usize {
        self.inner.lock().await.committed_batches
    }
}

#[async_trait]
impl AggregateSink for MemoryAggregateStore {
    async fn upsert_batch(&self, rows: &[AggregateRow]) -> StoreResult<u64> {
        let mut inner = self.inner.lock().await;

        if self.fail_on_batch == Some(inner.committed_batches) {
            return Err(StoreError::Query("injected batch failure".to_string()));
        }

        for row in rows {
            inner.rows.insert(row.key(), row.clone());
        }
        inner.committed_batches += 1;
        Ok(rows.len() as u64)
    }
}
