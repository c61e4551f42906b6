//! 집계 봉 공급자 연동.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - `AggregateSource` trait: 페이지 단위 레코드 공급원 인터페이스
//! - Polygon 집계 REST 클라이언트
//! - 페이지네이션을 끝까지 순회하는 `RecordFetcher`
//! - 일시적 오류에 대한 지수 백오프 재시도

pub mod error;
pub mod fetcher;
pub mod polygon;
pub mod retry;
pub mod source;

pub use error::*;
pub use fetcher::RecordFetcher;
pub use polygon::{PolygonClient, PolygonConfig};
pub use retry::{with_retry, RetryConfig};
pub use source::{AggregatePage, AggregateSource};
