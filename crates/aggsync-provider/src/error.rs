//! 공급자 에러 타입.

use thiserror::Error;

/// 공급자 호출 한 번의 실패.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// 네트워크/연결 에러
    #[error("Network error: {0}")]
    Network(String),

    /// 요청 타임아웃
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// 요청 한도 초과 (HTTP 429)
    #[error("Rate limit exceeded")]
    RateLimited,

    /// 공급자 서버 에러 (HTTP 5xx)
    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    /// 해석할 수 없는 페이지
    #[error("Malformed page: {0}")]
    MalformedPage(String),

    /// 인증/권한 에러
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 그 밖의 API 에러 응답
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },
}

impl ProviderError {
    /// 재시도 가능한 일시적 에러인지 확인.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Network(_)
                | ProviderError::Timeout(_)
                | ProviderError::RateLimited
                | ProviderError::Server { .. }
                | ProviderError::MalformedPage(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout(err.to_string())
        } else if err.is_decode() {
            ProviderError::MalformedPage(err.to_string())
        } else {
            ProviderError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(err: serde_json::Error) -> Self {
        ProviderError::MalformedPage(err.to_string())
    }
}

/// 전체 수집 실패 (재시도 소진 또는 재시도 불가 에러).
#[derive(Debug, Error)]
pub enum FetchError {
    /// 재시도 예산을 모두 소진함
    #[error("Fetch failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    /// 재시도하지 않는 에러
    #[error("Fetch failed: {0}")]
    Fatal(#[source] ProviderError),
}

impl FetchError {
    /// 실패를 일으킨 마지막 공급자 에러.
    pub fn provider_error(&self) -> &ProviderError {
        match self {
            FetchError::Exhausted { source, .. } => source,
            FetchError::Fatal(source) => source,
        }
    }
}
