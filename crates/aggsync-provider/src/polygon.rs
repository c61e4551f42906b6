//! Polygon 집계 REST API 클라이언트.
//!
//! 첫 페이지:
//! `GET {base}/v2/aggs/ticker/{ticker}/range/{multiplier}/{timespan}/{from}/{to}`
//! 이후 페이지는 응답의 `next_url`을 그대로 따라가며, API 키는 매 요청마다
//! `apiKey` 쿼리 파라미터로 붙입니다.

use std::time::Duration;

use aggsync_core::{FetchSpec, RawRecord};
use async_trait::async_trait;
use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde::Deserialize;
use tracing::debug;

use crate::source::{AggregatePage, AggregateSource};
use crate::ProviderError;

/// 기본 API 주소.
pub const DEFAULT_BASE_URL: &str = "https://api.polygon.io";

/// 클라이언트 설정.
#[derive(Debug, Clone, PartialEq)]
pub struct PolygonConfig {
    /// API 주소 (끝의 `/` 제외)
    pub base_url: String,
    /// 요청 타임아웃
    pub request_timeout: Duration,
}

impl Default for PolygonConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// 집계 응답 본문.
#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    results: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    next_url: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// Polygon 집계 API 공급원.
pub struct PolygonClient {
    client: reqwest::Client,
    base_url: String,
}

impl PolygonClient {
    /// 새 클라이언트를 생성합니다.
    pub fn new(config: PolygonConfig) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Network(format!("HTTP 클라이언트 생성 실패: {}", e)))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// 첫 페이지 URL.
    pub fn first_page_url(&self, spec: &FetchSpec) -> String {
        format!(
            "{}/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            self.base_url, spec.ticker, spec.multiplier, spec.timespan, spec.start, spec.end
        )
    }

    async fn get_page(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<AggregatePage, ProviderError> {
        let response = request.header("Accept", "application/json").send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_status(status, body));
        }

        let parsed: AggsResponse = serde_json::from_str(&body)?;

        if parsed.status.as_deref() == Some("ERROR") {
            let message = parsed
                .error
                .or(parsed.message)
                .unwrap_or_else(|| "unknown error".to_string());
            return Err(ProviderError::MalformedPage(message));
        }

        let records = parsed
            .results
            .unwrap_or_default()
            .into_iter()
            .map(|value| {
                RawRecord::from_json(value).ok_or_else(|| {
                    ProviderError::MalformedPage("결과 항목이 객체가 아닙니다".to_string())
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(AggregatePage {
            records,
            next_cursor: parsed.next_url.filter(|url| !url.is_empty()),
        })
    }
}

fn classify_status(status: StatusCode, body: String) -> ProviderError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized(body),
        s if s.is_server_error() => ProviderError::Server {
            status: s.as_u16(),
            message: body,
        },
        s => ProviderError::Api {
            status: s.as_u16(),
            message: body,
        },
    }
}

#[async_trait]
impl AggregateSource for PolygonClient {
    fn name(&self) -> &str {
        "polygon"
    }

    async fn fetch_page(
        &self,
        spec: &FetchSpec,
        cursor: Option<&str>,
    ) -> Result<AggregatePage, ProviderError> {
        let api_key = spec.api_key.expose_secret();

        let request = match cursor {
            None => {
                let url = self.first_page_url(spec);
                debug!(url = %url, "집계 첫 페이지 요청");
                self.client.get(url).query(&[
                    ("adjusted", spec.adjusted.to_string()),
                    ("sort", spec.sort.as_str().to_string()),
                    ("limit", spec.limit.to_string()),
                    ("apiKey", api_key.to_string()),
                ])
            }
            Some(next_url) => {
                debug!(url = %next_url, "집계 다음 페이지 요청");
                self.client.get(next_url).query(&[("apiKey", api_key)])
            }
        };

        self.get_page(request).await
    }
}
