//! 검증된 수집 사양.

use crate::types::{DateBound, SortOrder, Timespan};
use secrecy::SecretString;

/// 한 번의 백필 실행을 정의하는 수집 사양.
///
/// 설정 해석기가 생성하며 생성 이후에는 읽기 전용입니다.
/// 모든 필수 값은 비어 있지 않고, `multiplier`/`limit`은 양수입니다.
#[derive(Debug)]
pub struct FetchSpec {
    /// 종목 코드 (예: "AAPL")
    pub ticker: String,
    /// 봉 배수 (예: 5 + minute = 5분봉)
    pub multiplier: u32,
    /// 봉 단위
    pub timespan: Timespan,
    /// 시작 경계 (포함)
    pub start: DateBound,
    /// 종료 경계 (포함)
    pub end: DateBound,
    /// 분할/배당 조정 여부
    pub adjusted: bool,
    /// 결과 정렬 순서
    pub sort: SortOrder,
    /// 페이지당 최대 레코드 수
    pub limit: u32,
    /// 공급자 API 키
    pub api_key: SecretString,
}

impl FetchSpec {
    /// 로그용 요약 (`AAPL 1/minute 2024-01-02..2024-01-05`).
    pub fn describe(&self) -> String {
        format!(
            "{} {}/{} {}..{}",
            self.ticker, self.multiplier, self.timespan, self.start, self.end
        )
    }
}
