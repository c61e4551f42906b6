//! 원시 레코드 → [`AggregateRow`] 변환.
//!
//! 필드마다 짧은 별칭을 먼저, 긴 별칭을 나중에 시도합니다.
//! - 타임스탬프와 OHLC는 필수이며 해석 실패 시 에러
//! - volume / vwap / transactions는 해석 실패 시 `None` (0으로 채우지 않음)

use crate::domain::{AggregateRow, FieldSource};
use crate::error::{TransformError, TransformResult};
use crate::types::Timespan;
use chrono::DateTime;
use rust_decimal::Decimal;

/// 이 값 미만의 타임스탬프는 초 단위로 간주합니다.
pub const SECONDS_THRESHOLD: i64 = 10_000_000_000;

/// 가격 컬럼 소수 자릿수 (NUMERIC(18,6)).
pub const PRICE_SCALE: u32 = 6;

const TIMESTAMP: [&str; 2] = ["t", "timestamp"];
const OPEN: [&str; 2] = ["o", "open"];
const HIGH: [&str; 2] = ["h", "high"];
const LOW: [&str; 2] = ["l", "low"];
const CLOSE: [&str; 2] = ["c", "close"];
const VOLUME: [&str; 2] = ["v", "volume"];
const VWAP: [&str; 2] = ["vw", "vwap"];
const TRANSACTIONS: [&str; 2] = ["n", "transactions"];

/// 타임스탬프를 밀리초로 정규화합니다.
///
/// `value < 10_000_000_000`이면 초로 보고 1000을 곱합니다.
/// 곱셈이 넘치면 `None`.
pub fn normalize_timestamp_ms(value: i64) -> Option<i64> {
    if value < SECONDS_THRESHOLD {
        value.checked_mul(1000)
    } else {
        Some(value)
    }
}

/// 한 번의 수집 실행(ticker, multiplier, timespan) 문맥의 변환기.
#[derive(Debug, Clone)]
pub struct RowTransformer {
    ticker: String,
    multiplier: u32,
    timespan: Timespan,
}

impl RowTransformer {
    pub fn new(ticker: impl Into<String>, multiplier: u32, timespan: Timespan) -> Self {
        Self {
            ticker: ticker.into(),
            multiplier,
            timespan,
        }
    }

    /// 레코드 하나를 행 하나로 변환합니다.
    pub fn transform(&self, record: &dyn FieldSource) -> TransformResult<AggregateRow> {
        let raw_ts = record
            .field(&TIMESTAMP)
            .ok_or(TransformError::MissingTimestamp)?;
        let raw_ts = raw_ts
            .to_i64()
            .ok_or_else(|| TransformError::InvalidTimestamp(format!("{:?}", raw_ts)))?;
        let ts_ms = normalize_timestamp_ms(raw_ts)
            .ok_or_else(|| TransformError::InvalidTimestamp(raw_ts.to_string()))?;
        let dt_utc = DateTime::from_timestamp_millis(ts_ms)
            .ok_or_else(|| TransformError::InvalidTimestamp(ts_ms.to_string()))?;

        Ok(AggregateRow {
            ticker: self.ticker.clone(),
            multiplier: self.multiplier,
            timespan: self.timespan,
            ts_ms,
            dt_utc,
            open: required_price(record, &OPEN, "open")?,
            high: required_price(record, &HIGH, "high")?,
            low: required_price(record, &LOW, "low")?,
            close: required_price(record, &CLOSE, "close")?,
            volume: record.field(&VOLUME).and_then(|v| v.to_i64()),
            vwap: record
                .field(&VWAP)
                .and_then(|v| v.to_decimal())
                .map(|d| d.round_dp(PRICE_SCALE)),
            transactions: record.field(&TRANSACTIONS).and_then(|v| v.to_i64()),
        })
    }

    /// 레코드 목록을 순서대로 변환합니다.
    ///
    /// 첫 실패에서 멈추고 해당 레코드의 위치를 함께 반환합니다.
    pub fn transform_all<R: FieldSource>(
        &self,
        records: &[R],
    ) -> Result<Vec<AggregateRow>, (usize, TransformError)> {
        records
            .iter()
            .enumerate()
            .map(|(idx, record)| self.transform(record).map_err(|e| (idx, e)))
            .collect()
    }
}

fn required_price(
    record: &dyn FieldSource,
    aliases: &[&str],
    field: &'static str,
) -> TransformResult<Decimal> {
    record
        .field(aliases)
        .and_then(|v| v.to_decimal())
        .map(|d| d.round_dp(PRICE_SCALE))
        .ok_or(TransformError::InvalidPrice { field })
}
