//! 공급자 호출 재시도 유틸리티.
//!
//! 네트워크 오류, Rate Limit, 깨진 페이지 등 일시적인 오류에 대해
//! 지수 백오프로 재시도합니다. 대기 시간은 `base_delay * 2^(n-1)`
//! (n = 실패 횟수)이며 `max_delay`로 상한이 걸립니다.
//!
//! # 예시
//!
//! ```rust,ignore
//! let config = RetryConfig::default();
//! let records = with_retry(&config, || async {
//!     source.fetch_page(&spec, None).await
//! }).await?;
//! ```

use std::{future::Future, time::Duration};

use tracing::{debug, warn};

use crate::{FetchError, ProviderError};

/// 재시도 설정.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryConfig {
    /// 최대 재시도 횟수 (초기 시도 제외).
    pub max_retries: u32,
    /// 첫 재시도 전 대기 시간.
    pub base_delay: Duration,
    /// 최대 대기 시간.
    pub max_delay: Duration,
    /// 백오프 배수.
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(750),
            max_delay: Duration::from_secs(60),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// 재시도 횟수와 기본 대기 시간을 지정하여 생성합니다.
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    /// 재시도 없음 (단일 시도).
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// `failures`번째 실패 후 대기 시간 (`failures` >= 1).
    pub fn delay_for(&self, failures: u32) -> Duration {
        let exponent = failures.saturating_sub(1).min(i32::MAX as u32) as i32;
        let secs = self.base_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        if secs.is_finite() && secs < self.max_delay.as_secs_f64() {
            Duration::from_secs_f64(secs)
        } else {
            self.max_delay
        }
    }
}

/// 재시도가 포함된 비동기 작업 실행.
///
/// # Returns
/// * `Ok(T)` - 작업 성공 결과
/// * `Err(FetchError::Fatal)` - 재시도 불가능한 에러 (즉시 반환)
/// * `Err(FetchError::Exhausted)` - 재시도 예산 소진 후 마지막 에러
pub async fn with_retry<T, F, Fut>(config: &RetryConfig, operation: F) -> Result<T, FetchError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, ProviderError>>,
{
    let mut failures: u32 = 0;
    let mut total_delay = Duration::ZERO;

    loop {
        match operation().await {
            Ok(result) => {
                if failures > 0 {
                    debug!(
                        attempts = failures + 1,
                        total_delay_ms = total_delay.as_millis() as u64,
                        "재시도 후 성공"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if !e.is_retryable() {
                    warn!(error = %e, "재시도 불가능한 에러, 즉시 실패 반환");
                    return Err(FetchError::Fatal(e));
                }

                failures += 1;
                if failures > config.max_retries {
                    warn!(
                        error = %e,
                        attempts = failures,
                        max_retries = config.max_retries,
                        "최대 재시도 횟수 초과"
                    );
                    return Err(FetchError::Exhausted {
                        attempts: failures,
                        source: e,
                    });
                }

                let delay = config.delay_for(failures);
                total_delay += delay;

                warn!(
                    error = %e,
                    attempt = failures,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    "재시도 대기 중"
                );

                tokio::time::sleep(delay).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        atomic::{AtomicU32, Ordering},
        Arc,
    };

    use super::*;

    #[test]
    fn test_delay_doubles_from_base() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for(1), Duration::from_millis(750));
        assert_eq!(config.delay_for(2), Duration::from_millis(1500));
        assert_eq!(config.delay_for(3), Duration::from_millis(3000));
        assert_eq!(config.delay_for(40), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_on_network_error() {
        let config = RetryConfig::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                let count = counter.fetch_add(1, Ordering::SeqCst);
                if count < 2 {
                    Err(ProviderError::Network("연결 실패".to_string()))
                } else {
                    Ok(42)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_no_retry_on_unauthorized() {
        let config = RetryConfig::default();
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ProviderError::Unauthorized("bad key".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(FetchError::Fatal(ProviderError::Unauthorized(_)))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_retries_exceeded() {
        let config = RetryConfig::new(2, Duration::from_millis(10));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<i32, _>(ProviderError::RateLimited)
            }
        })
        .await;

        match result {
            Err(FetchError::Exhausted { attempts, source }) => {
                assert_eq!(attempts, 3);
                assert!(matches!(source, ProviderError::RateLimited));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // 초기 1회 + 재시도 2회
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_sleeps_accumulate() {
        let config = RetryConfig::new(3, Duration::from_millis(750));
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let started = tokio::time::Instant::now();

        let result = with_retry(&config, || {
            let counter = counter_clone.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 3 {
                    Err(ProviderError::Timeout("slow".to_string()))
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(result.is_ok());
        // 750 + 1500 + 3000 ms
        assert!(started.elapsed() >= Duration::from_millis(5250));
    }
}
