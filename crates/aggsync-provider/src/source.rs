//! 페이지 단위 레코드 공급원 인터페이스.

use aggsync_core::{FetchSpec, RawRecord};
use async_trait::async_trait;

use crate::ProviderError;

/// 공급자 응답 한 페이지.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatePage {
    /// 페이지에 포함된 레코드 (공급자 정렬 순서)
    pub records: Vec<RawRecord>,
    /// 다음 페이지 커서 (`None`이면 마지막 페이지)
    pub next_cursor: Option<String>,
}

/// (ticker, multiplier, timespan, 날짜 범위)로 키가 지정된 읽기 전용 페이지 공급원.
#[async_trait]
pub trait AggregateSource: Send + Sync {
    /// 공급원 이름 (로그용).
    fn name(&self) -> &str;

    /// 한 페이지를 가져옵니다. `cursor`가 `None`이면 첫 페이지입니다.
    async fn fetch_page(
        &self,
        spec: &FetchSpec,
        cursor: Option<&str>,
    ) -> Result<AggregatePage, ProviderError>;
}
