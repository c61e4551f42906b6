//! 공급자 원시 레코드와 필드 조회 추상화.
//!
//! 공급자는 같은 봉을 여러 형태로 돌려줍니다:
//! - 짧은 키(`t, o, h, l, c, v, vw, n`)를 가진 JSON 객체
//! - 긴 키(`timestamp, open, ...`)를 가진 JSON 객체
//! - 긴 이름의 속성을 가진 타입 객체 ([`AggregateBar`])
//!
//! 변환기는 구체 타입을 모르고 [`FieldSource`]만 사용합니다.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::str::FromStr;

/// 레코드에서 읽은 스칼라 값.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl FieldValue {
    /// 십진수로 해석합니다. 숫자가 아니면 `None`.
    pub fn to_decimal(&self) -> Option<Decimal> {
        match self {
            FieldValue::Int(i) => Some(Decimal::from(*i)),
            FieldValue::Float(f) => Decimal::from_f64(*f),
            FieldValue::Text(s) => {
                let s = s.trim();
                Decimal::from_str(s)
                    .or_else(|_| Decimal::from_scientific(s))
                    .ok()
            }
            FieldValue::Bool(_) => None,
        }
    }

    /// 정수로 해석합니다. 실수는 0 방향으로 버립니다.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(i) => Some(*i),
            FieldValue::Float(f) => truncate_f64(*f),
            FieldValue::Text(s) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().and_then(truncate_f64))
            }
            FieldValue::Bool(_) => None,
        }
    }
}

fn truncate_f64(f: f64) -> Option<i64> {
    let t = f.trunc();
    if t.is_finite() && t >= i64::MIN as f64 && t <= i64::MAX as f64 {
        Some(t as i64)
    } else {
        None
    }
}

/// "후보 이름 목록으로 필드 조회" 기능.
///
/// 값이 `null`인 필드는 없는 것으로 취급하고 다음 후보를 확인합니다.
pub trait FieldSource {
    /// 이름 하나로 필드를 조회합니다.
    fn get(&self, name: &str) -> Option<FieldValue>;

    /// 후보 이름을 순서대로 시도하여 처음 발견된 값을 반환합니다.
    fn field(&self, candidates: &[&str]) -> Option<FieldValue> {
        candidates.iter().find_map(|name| self.get(name))
    }
}

impl FieldSource for Map<String, Value> {
    fn get(&self, name: &str) -> Option<FieldValue> {
        match self.get(name)? {
            Value::Null => None,
            Value::Bool(b) => Some(FieldValue::Bool(*b)),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Some(FieldValue::Int(i)),
                None => n.as_f64().map(FieldValue::Float),
            },
            Value::String(s) => Some(FieldValue::Text(s.clone())),
            other => Some(FieldValue::Text(other.to_string())),
        }
    }
}

/// 긴 이름 속성을 가진 타입 집계 봉.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregateBar {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub open: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub close: Option<f64>,
    #[serde(default)]
    pub volume: Option<f64>,
    #[serde(default)]
    pub vwap: Option<f64>,
    #[serde(default)]
    pub transactions: Option<i64>,
    #[serde(default)]
    pub otc: Option<bool>,
}

impl FieldSource for AggregateBar {
    fn get(&self, name: &str) -> Option<FieldValue> {
        match name {
            "timestamp" => self.timestamp.map(FieldValue::Int),
            "open" => self.open.map(FieldValue::Float),
            "high" => self.high.map(FieldValue::Float),
            "low" => self.low.map(FieldValue::Float),
            "close" => self.close.map(FieldValue::Float),
            "volume" => self.volume.map(FieldValue::Float),
            "vwap" => self.vwap.map(FieldValue::Float),
            "transactions" => self.transactions.map(FieldValue::Int),
            "otc" => self.otc.map(FieldValue::Bool),
            _ => None,
        }
    }
}

/// 공급자가 반환한 원시 레코드.
#[derive(Debug, Clone, PartialEq)]
pub enum RawRecord {
    /// JSON 객체 (짧은 키 또는 긴 키)
    Bag(Map<String, Value>),
    /// 타입 객체
    Bar(AggregateBar),
}

impl RawRecord {
    /// JSON 값에서 레코드를 만듭니다. 객체가 아니면 `None`.
    pub fn from_json(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(RawRecord::Bag(map)),
            _ => None,
        }
    }
}

impl FieldSource for RawRecord {
    fn get(&self, name: &str) -> Option<FieldValue> {
        match self {
            RawRecord::Bag(map) => FieldSource::get(map, name),
            RawRecord::Bar(bar) => bar.get(name),
        }
    }
}

impl From<AggregateBar> for RawRecord {
    fn from(bar: AggregateBar) -> Self {
        RawRecord::Bar(bar)
    }
}
