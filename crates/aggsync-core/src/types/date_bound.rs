//! 수집 범위 경계 (날짜 또는 epoch 밀리초).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 수집 범위의 한쪽 경계.
///
/// 공급자는 `YYYY-MM-DD` 날짜와 epoch 밀리초 정수를 모두 받습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DateBound {
    /// 달력 날짜 (UTC 자정 기준)
    Date(NaiveDate),
    /// epoch 밀리초
    EpochMillis(i64),
}

impl DateBound {
    /// epoch 밀리초로 변환합니다 (날짜는 UTC 자정).
    pub fn as_epoch_millis(&self) -> i64 {
        match self {
            DateBound::Date(date) => date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis())
                .unwrap_or_default(),
            DateBound::EpochMillis(ms) => *ms,
        }
    }
}

impl fmt::Display for DateBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateBound::Date(date) => write!(f, "{}", date.format("%Y-%m-%d")),
            DateBound::EpochMillis(ms) => write!(f, "{}", ms),
        }
    }
}

impl FromStr for DateBound {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()) {
            return s
                .parse::<i64>()
                .map(DateBound::EpochMillis)
                .map_err(|e| format!("Invalid epoch millis '{}': {}", s, e));
        }
        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .map(DateBound::Date)
            .map_err(|_| format!("Invalid date '{}' (expected YYYY-MM-DD or epoch ms)", s))
    }
}
