//! 집계 봉 단위(타임스팬)와 정렬 순서.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 집계 봉의 시간 단위.
///
/// 공급자 요청과 `aggregates.timespan` 컬럼에는 소문자 이름이 사용됩니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timespan {
    /// 초봉
    Second,
    /// 분봉
    Minute,
    /// 시간봉
    Hour,
    /// 일봉
    Day,
    /// 주봉
    Week,
    /// 월봉
    Month,
}

impl Timespan {
    /// 허용되는 모든 타임스팬.
    pub const ALL: [Timespan; 6] = [
        Timespan::Second,
        Timespan::Minute,
        Timespan::Hour,
        Timespan::Day,
        Timespan::Week,
        Timespan::Month,
    ];

    /// 소문자 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Timespan::Second => "second",
            Timespan::Minute => "minute",
            Timespan::Hour => "hour",
            Timespan::Day => "day",
            Timespan::Week => "week",
            Timespan::Month => "month",
        }
    }
}

impl fmt::Display for Timespan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timespan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|ts| ts.as_str() == normalized)
            .ok_or_else(|| format!("Invalid timespan: {}", s))
    }
}

/// 공급자 결과 정렬 순서.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortOrder {
    /// 오래된 것부터
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    /// 최신 것부터
    #[serde(rename = "desc")]
    Descending,
}

impl SortOrder {
    /// 공급자 쿼리 파라미터 값 (`asc` / `desc`).
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        }
    }

    /// 정렬 값을 해석합니다. 인식할 수 없는 값은 `None`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "asc" | "ascending" => Some(SortOrder::Ascending),
            "desc" | "descending" => Some(SortOrder::Descending),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
