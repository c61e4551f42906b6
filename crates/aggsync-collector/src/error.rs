//! 에러 타입 정의.

use aggsync_core::TransformError;
use aggsync_provider::FetchError;
use aggsync_store::{LoadError, StoreError};
use thiserror::Error;

/// 설정 에러. 네트워크/DB 호출 전에 보고됩니다.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 설정 파일 로드 실패
    #[error("Configuration load error: {0}")]
    Load(#[from] config::ConfigError),

    /// 누락되었거나 잘못된 필드 (모두 모아서 보고)
    #[error("Invalid configuration: {}", problems.join("; "))]
    Invalid { problems: Vec<String> },
}

/// 파이프라인 실행 에러. 모든 종류가 실행을 중단시킵니다.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// 설정 에러
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// 수집 에러 (재시도 소진 포함)
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// 레코드 변환 에러
    #[error("Transform error at record {index}: {source}")]
    Transform {
        index: usize,
        #[source]
        source: TransformError,
    },

    /// 연결/스키마 준비 에러
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// 적재 시작 전 취소됨 (수집 또는 스키마 준비 중)
    #[error("Cancelled before loading")]
    Cancelled,

    /// 배치 적재 에러 (앞선 배치는 커밋됨)
    #[error(transparent)]
    Load(#[from] LoadError),
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, PipelineError>;
