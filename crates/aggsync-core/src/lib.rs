//! # Aggsync Core
//!
//! 집계 봉(OHLCV) 수집 파이프라인의 핵심 도메인 타입을 제공합니다.
//!
//! 이 크레이트는 파이프라인 전반에서 사용되는 기본 타입을 제공합니다:
//! - 수집 사양 (`FetchSpec`) 및 타임스팬/정렬/날짜 범위 타입
//! - 이질적인 공급자 레코드를 읽기 위한 `FieldSource` 추상화
//! - 정규화된 집계 행 (`AggregateRow`)과 자연 키
//! - 레코드 → 행 변환기 (`RowTransformer`)
//! - 로깅 인프라

pub mod domain;
pub mod error;
pub mod logging;
pub mod transform;
pub mod types;

pub use domain::*;
pub use error::*;
pub use logging::*;
pub use transform::*;
pub use types::*;
