//! 정규화된 집계 행.

use crate::types::Timespan;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 집계 행의 자연 키 (ticker, multiplier, timespan, ts_ms).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NaturalKey {
    pub ticker: String,
    pub multiplier: u32,
    pub timespan: Timespan,
    pub ts_ms: i64,
}

/// `aggregates` 테이블 한 행에 대응하는 정규화된 OHLCV 봉.
///
/// 공급자 레코드 하나당 한 번 생성되고 적재 후 버려집니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregateRow {
    /// 종목 코드
    pub ticker: String,
    /// 봉 배수
    pub multiplier: u32,
    /// 봉 단위
    pub timespan: Timespan,
    /// 봉 시작 시각 (epoch 밀리초)
    pub ts_ms: i64,
    /// 봉 시작 시각 (UTC)
    pub dt_utc: DateTime<Utc>,
    /// 시가
    pub open: Decimal,
    /// 고가
    pub high: Decimal,
    /// 저가
    pub low: Decimal,
    /// 종가
    pub close: Decimal,
    /// 거래량 (공급자가 생략하면 `None`)
    pub volume: Option<i64>,
    /// 거래량 가중 평균가
    pub vwap: Option<Decimal>,
    /// 체결 건수
    pub transactions: Option<i64>,
}

impl AggregateRow {
    /// 자연 키를 반환합니다.
    pub fn key(&self) -> NaturalKey {
        NaturalKey {
            ticker: self.ticker.clone(),
            multiplier: self.multiplier,
            timespan: self.timespan,
            ts_ms: self.ts_ms,
        }
    }
}
