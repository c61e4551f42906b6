//! 레코드 변환 에러 타입.

use thiserror::Error;

/// 공급자 레코드를 집계 행으로 변환하는 중 발생한 에러.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    /// `t` / `timestamp` 필드를 찾을 수 없음
    #[error("레코드에 타임스탬프 필드(t/timestamp)가 없습니다")]
    MissingTimestamp,

    /// 타임스탬프 값을 해석할 수 없음
    #[error("잘못된 타임스탬프: {0}")]
    InvalidTimestamp(String),

    /// 필수 가격 필드(open/high/low/close)가 없거나 숫자가 아님
    #[error("필수 가격 필드가 없거나 숫자가 아닙니다: {field}")]
    InvalidPrice { field: &'static str },
}

/// 변환 작업을 위한 Result 타입.
pub type TransformResult<T> = Result<T, TransformError>;
