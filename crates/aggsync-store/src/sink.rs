//! 자연 키 기반 upsert 저장소.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use aggsync_core::{AggregateRow, NaturalKey};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgPool;
use tracing::debug;

use crate::database::Database;
use crate::error::{StoreError, StoreResult};

/// 배치 단위 upsert 대상.
///
/// `upsert_batch` 한 번은 정확히 하나의 트랜잭션이며 전체가 커밋되거나
/// 전체가 롤백됩니다. 반환값은 처리한 행 수입니다.
#[async_trait]
pub trait AggregateSink: Send + Sync {
    async fn upsert_batch(&self, rows: &[AggregateRow]) -> StoreResult<u64>;
}

#[async_trait]
impl<T: AggregateSink + ?Sized> AggregateSink for Arc<T> {
    async fn upsert_batch(&self, rows: &[AggregateRow]) -> StoreResult<u64> {
        (**self).upsert_batch(rows).await
    }
}

const UPSERT_SQL: &str = r#"
INSERT INTO aggregates
    (ticker, multiplier, timespan, ts_ms, dt_utc, open, high, low, close, volume, vwap, transactions)
SELECT * FROM UNNEST(
    $1::text[], $2::int4[], $3::text[], $4::int8[], $5::timestamptz[],
    $6::numeric[], $7::numeric[], $8::numeric[], $9::numeric[],
    $10::int8[], $11::numeric[], $12::int8[]
)
ON CONFLICT (ticker, multiplier, timespan, ts_ms) DO UPDATE SET
    dt_utc = EXCLUDED.dt_utc,
    open = EXCLUDED.open,
    high = EXCLUDED.high,
    low = EXCLUDED.low,
    close = EXCLUDED.close,
    volume = EXCLUDED.volume,
    vwap = EXCLUDED.vwap,
    transactions = EXCLUDED.transactions
"#;

/// PostgreSQL `aggregates` 테이블 저장소.
#[derive(Clone)]
pub struct PgAggregateStore {
    pool: PgPool,
    batch_timeout: Duration,
}

impl PgAggregateStore {
    pub fn new(db: &Database, batch_timeout: Duration) -> Self {
        Self {
            pool: db.pool().clone(),
            batch_timeout,
        }
    }

    async fn upsert_in_transaction(&self, rows: &[&AggregateRow]) -> StoreResult<u64> {
        let tickers: Vec<&str> = rows.iter().map(|r| r.ticker.as_str()).collect();
        let multipliers: Vec<i32> = rows
            .iter()
            .map(|r| {
                i32::try_from(r.multiplier)
                    .map_err(|_| StoreError::InvalidData(format!("multiplier {}", r.multiplier)))
            })
            .collect::<StoreResult<_>>()?;
        let timespans: Vec<&str> = rows.iter().map(|r| r.timespan.as_str()).collect();
        let ts_ms: Vec<i64> = rows.iter().map(|r| r.ts_ms).collect();
        let dts: Vec<DateTime<Utc>> = rows.iter().map(|r| r.dt_utc).collect();
        let opens: Vec<Decimal> = rows.iter().map(|r| r.open).collect();
        let highs: Vec<Decimal> = rows.iter().map(|r| r.high).collect();
        let lows: Vec<Decimal> = rows.iter().map(|r| r.low).collect();
        let closes: Vec<Decimal> = rows.iter().map(|r| r.close).collect();
        let volumes: Vec<Option<i64>> = rows.iter().map(|r| r.volume).collect();
        let vwaps: Vec<Option<Decimal>> = rows.iter().map(|r| r.vwap).collect();
        let transactions: Vec<Option<i64>> = rows.iter().map(|r| r.transactions).collect();

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(UPSERT_SQL)
            .bind(&tickers)
            .bind(&multipliers)
            .bind(&timespans)
            .bind(&ts_ms)
            .bind(&dts)
            .bind(&opens)
            .bind(&highs)
            .bind(&lows)
            .bind(&closes)
            .bind(&volumes)
            .bind(&vwaps)
            .bind(&transactions)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl AggregateSink for PgAggregateStore {
    async fn upsert_batch(&self, rows: &[AggregateRow]) -> StoreResult<u64> {
        if rows.is_empty() {
            return Ok(0);
        }

        // ON CONFLICT DO UPDATE는 한 문장 안에서 같은 키를 두 번 갱신할 수 없음
        let unique = last_per_key(rows);

        // 타임아웃으로 future가 버려지면 트랜잭션은 롤백됨
        let affected = tokio::time::timeout(self.batch_timeout, self.upsert_in_transaction(&unique))
            .await
            .map_err(|_| {
                StoreError::Timeout(format!(
                    "batch of {} rows exceeded {}s",
                    rows.len(),
                    self.batch_timeout.as_secs()
                ))
            })??;

        debug!(rows = rows.len(), unique = unique.len(), affected, "배치 커밋");
        Ok(rows.len() as u64)
    }
}

/// 같은 자연 키가 여러 번 나오면 마지막 행만 남깁니다 (순서 유지).
pub fn last_per_key(rows: &[AggregateRow]) -> Vec<&AggregateRow> {
    let mut last_index: HashMap<NaturalKey, usize> = HashMap::with_capacity(rows.len());
    for (idx, row) in rows.iter().enumerate() {
        last_index.insert(row.key(), idx);
    }

    rows.iter()
        .enumerate()
        .filter(|(idx, row)| last_index.get(&row.key()) == Some(idx))
        .map(|(_, row)| row)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use aggsync_core::Timespan;
    use rust_decimal_macros::dec;

    fn row(ts_ms: i64, close: Decimal) -> AggregateRow {
        AggregateRow {
            ticker: "XYZ".to_string(),
            multiplier: 1,
            timespan: Timespan::Minute,
            ts_ms,
            dt_utc: DateTime::from_timestamp_millis(ts_ms).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: None,
            vwap: None,
            transactions: None,
        }
    }

    #[test]
    fn test_last_per_key_keeps_latest_value() {
        let rows = vec![
            row(1_000_000_000_000, dec!(1)),
            row(1_000_000_060_000, dec!(2)),
            row(1_000_000_000_000, dec!(3)),
        ];
        let unique = last_per_key(&rows);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].ts_ms, 1_000_000_060_000);
        assert_eq!(unique[1].close, dec!(3));
    }
}
