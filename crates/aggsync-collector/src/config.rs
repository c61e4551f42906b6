//! 수집기 설정 해석.
//!
//! 설정 문서(TOML + `AGGSYNC__*` 환경변수)와 오버라이드(CLI, `STOCK_TICKER`)를
//! 검증된 `FetchSpec`/`StoreConfig`로 변환합니다. 해석 자체는 순수 함수이며
//! 환경변수나 파일을 직접 읽지 않습니다.

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use aggsync_core::{DateBound, FetchSpec, SortOrder, Timespan};
use aggsync_provider::polygon::DEFAULT_BASE_URL;
use aggsync_provider::{PolygonConfig, RetryConfig};
use aggsync_store::StoreConfig;
use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;

/// 환경변수 접두사 (`AGGSYNC__PROVIDER__API_KEY` 형태).
pub const ENV_PREFIX: &str = "AGGSYNC";

/// 종목 오버라이드 환경변수.
pub const TICKER_ENV: &str = "STOCK_TICKER";

/// 저장소 `multiplier` 컬럼(INTEGER)의 상한.
const MAX_MULTIPLIER: u32 = i32::MAX as u32;

/// 설정 문서. 모든 값은 문자열로 받아 해석 단계에서 검증합니다.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigDocument {
    #[serde(default, alias = "polygon")]
    pub provider: Option<ProviderSection>,
    #[serde(default)]
    pub store: Option<StoreSection>,
}

/// `[provider]` 섹션.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProviderSection {
    pub api_key: Option<String>,
    pub ticker: Option<String>,
    pub multiplier: Option<String>,
    pub timespan: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub adjusted: Option<String>,
    pub sort: Option<String>,
    pub limit: Option<String>,
    pub base_url: Option<String>,
    pub request_timeout_secs: Option<String>,
    pub max_retries: Option<String>,
    pub backoff_base_ms: Option<String>,
}

/// `[store]` 섹션.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreSection {
    pub host: Option<String>,
    pub port: Option<String>,
    pub database: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub max_connections: Option<String>,
    pub acquire_timeout_secs: Option<String>,
    pub batch_timeout_secs: Option<String>,
}

impl ConfigDocument {
    /// TOML 파일과 `AGGSYNC__` 환경변수에서 문서를 읽습니다.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// TOML 문자열에서 문서를 읽습니다.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}

/// 문서 위에 덮어쓰는 값.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// `--ticker`
    pub ticker: Option<String>,
    /// `STOCK_TICKER`
    pub env_ticker: Option<String>,
    /// `--start`
    pub start: Option<String>,
    /// `--end`
    pub end: Option<String>,
}

impl Overrides {
    /// 환경변수 값을 채워 넣습니다.
    pub fn with_env(self) -> Self {
        Self {
            env_ticker: std::env::var(TICKER_ENV).ok(),
            ..self
        }
    }
}

/// 공급자 섹션 기본값.
#[derive(Debug, Clone, Copy)]
pub struct ProviderDefaults {
    pub multiplier: u32,
    pub timespan: Timespan,
    pub adjusted: bool,
    pub sort: SortOrder,
    pub limit: u32,
    pub base_url: &'static str,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub backoff_base_ms: u64,
}

pub const PROVIDER_DEFAULTS: ProviderDefaults = ProviderDefaults {
    multiplier: 1,
    timespan: Timespan::Minute,
    adjusted: true,
    sort: SortOrder::Ascending,
    limit: 50_000,
    base_url: DEFAULT_BASE_URL,
    request_timeout_secs: 30,
    max_retries: 5,
    backoff_base_ms: 750,
};

/// 해석 결과.
#[derive(Debug)]
pub struct ResolvedConfig {
    pub fetch: FetchSpec,
    pub store: StoreConfig,
    pub polygon: PolygonConfig,
    pub retry: RetryConfig,
}

/// 기본값으로 문서와 오버라이드를 해석합니다.
pub fn resolve(doc: &ConfigDocument, overrides: &Overrides) -> Result<ResolvedConfig, ConfigError> {
    resolve_with(doc, overrides, &PROVIDER_DEFAULTS)
}

/// 지정한 기본값으로 해석합니다. 발견된 모든 문제를 한 번에 보고합니다.
pub fn resolve_with(
    doc: &ConfigDocument,
    overrides: &Overrides,
    defaults: &ProviderDefaults,
) -> Result<ResolvedConfig, ConfigError> {
    let mut problems = Problems::default();

    let provider = match &doc.provider {
        Some(section) => resolve_provider(section, overrides, defaults, &mut problems),
        None => {
            problems.push("missing section [provider]");
            None
        }
    };
    let store = match &doc.store {
        Some(section) => resolve_store(section, &mut problems),
        None => {
            problems.push("missing section [store]");
            None
        }
    };

    match (provider, store) {
        (Some((fetch, polygon, retry)), Some(store)) if problems.is_empty() => Ok(ResolvedConfig {
            fetch,
            store,
            polygon,
            retry,
        }),
        _ => Err(ConfigError::Invalid {
            problems: problems.into_inner(),
        }),
    }
}

#[derive(Default)]
struct Problems(Vec<String>);

impl Problems {
    fn push(&mut self, problem: impl Into<String>) {
        self.0.push(problem.into());
    }

    fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_inner(self) -> Vec<String> {
        self.0
    }

    /// 필수 값. 없거나 공백뿐이면 누락으로 기록합니다.
    fn required<'a>(&mut self, key: &str, value: Option<&'a str>) -> Option<&'a str> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            Some(v) => Some(v),
            None => {
                self.push(format!("missing {}", key));
                None
            }
        }
    }

    /// 기본값이 있는 값. 키가 없으면 기본값, 빈 문자열이면 누락입니다.
    fn defaulted<'a>(&mut self, key: &str, value: Option<&'a str>) -> Option<Option<&'a str>> {
        match value {
            None => Some(None),
            Some(v) => self.required(key, Some(v)).map(Some),
        }
    }

    fn parse<T: FromStr>(&mut self, key: &str, value: &str, what: &str) -> Option<T> {
        match value.parse::<T>() {
            Ok(v) => Some(v),
            Err(_) => {
                self.push(format!("invalid {} '{}': expected {}", key, value, what));
                None
            }
        }
    }

    fn positive<T: FromStr + PartialOrd + Default>(&mut self, key: &str, value: &str) -> Option<T> {
        let parsed = self.parse::<T>(key, value, "a positive integer")?;
        if parsed > T::default() {
            Some(parsed)
        } else {
            self.push(format!("invalid {} '{}': expected a positive integer", key, value));
            None
        }
    }

    fn at_most(&mut self, key: &str, value: u32, max: u32) -> Option<u32> {
        if value <= max {
            Some(value)
        } else {
            self.push(format!(
                "invalid {} '{}': expected a positive integer up to {}",
                key, value, max
            ));
            None
        }
    }

    /// 선택 값. 없거나 비어 있으면 기본값을 씁니다.
    fn optional<T: FromStr>(&mut self, key: &str, value: Option<&str>, default: T) -> Option<T> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Some(default),
            Some(v) => self.parse(key, v, "an integer"),
        }
    }
}

/// `{1,true,t,yes,y}` (대소문자 무시)만 참입니다.
pub fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "1" | "true" | "t" | "yes" | "y"
    )
}

fn resolve_provider(
    section: &ProviderSection,
    overrides: &Overrides,
    defaults: &ProviderDefaults,
    problems: &mut Problems,
) -> Option<(FetchSpec, PolygonConfig, RetryConfig)> {
    let api_key = problems.required("provider.api_key", section.api_key.as_deref());

    // STOCK_TICKER > --ticker > 문서
    let ticker = problems.required(
        "provider.ticker",
        overrides
            .env_ticker
            .as_deref()
            .or(overrides.ticker.as_deref())
            .or(section.ticker.as_deref()),
    );

    let start_raw = problems.required(
        "provider.start_date",
        overrides.start.as_deref().or(section.start_date.as_deref()),
    );
    let end_raw = problems.required(
        "provider.end_date",
        overrides.end.as_deref().or(section.end_date.as_deref()),
    );

    let timespan = problems
        .defaulted("provider.timespan", section.timespan.as_deref())
        .and_then(|raw| match raw {
            None => Some(defaults.timespan),
            Some(v) => problems.parse::<Timespan>(
                "provider.timespan",
                v,
                "one of second, minute, hour, day, week, month",
            ),
        });

    let multiplier = problems
        .defaulted("provider.multiplier", section.multiplier.as_deref())
        .and_then(|raw| match raw {
            None => Some(defaults.multiplier),
            Some(v) => problems
                .positive::<u32>("provider.multiplier", v)
                .and_then(|m| problems.at_most("provider.multiplier", m, MAX_MULTIPLIER)),
        });

    let limit = problems
        .defaulted("provider.limit", section.limit.as_deref())
        .and_then(|raw| match raw {
            None => Some(defaults.limit),
            Some(v) => problems.positive::<u32>("provider.limit", v),
        });

    let adjusted = section
        .adjusted
        .as_deref()
        .map(parse_flag)
        .unwrap_or(defaults.adjusted);

    let sort = match section.sort.as_deref().map(str::trim).filter(|v| !v.is_empty()) {
        None => defaults.sort,
        Some(v) => SortOrder::parse(v).unwrap_or_else(|| {
            warn!(sort = v, fallback = %defaults.sort, "알 수 없는 정렬 값, 기본값 사용");
            defaults.sort
        }),
    };

    const DATE_FORMS: &str = "YYYY-MM-DD or epoch milliseconds";
    let start = start_raw.and_then(|v| problems.parse::<DateBound>("provider.start_date", v, DATE_FORMS));
    let end = end_raw.and_then(|v| problems.parse::<DateBound>("provider.end_date", v, DATE_FORMS));
    if let (Some(s), Some(e)) = (&start, &end) {
        if s.as_epoch_millis() > e.as_epoch_millis() {
            problems.push(format!(
                "provider.start_date {} is after provider.end_date {}",
                s, e
            ));
        }
    }

    let base_url = section
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(defaults.base_url)
        .trim_end_matches('/')
        .to_string();
    let request_timeout_secs = problems.optional(
        "provider.request_timeout_secs",
        section.request_timeout_secs.as_deref(),
        defaults.request_timeout_secs,
    );
    let max_retries = problems.optional(
        "provider.max_retries",
        section.max_retries.as_deref(),
        defaults.max_retries,
    );
    let backoff_base_ms = problems.optional(
        "provider.backoff_base_ms",
        section.backoff_base_ms.as_deref(),
        defaults.backoff_base_ms,
    );

    let fetch = FetchSpec {
        ticker: ticker?.to_string(),
        multiplier: multiplier?,
        timespan: timespan?,
        start: start?,
        end: end?,
        adjusted,
        sort,
        limit: limit?,
        api_key: api_key?.to_string().into(),
    };
    let polygon = PolygonConfig {
        base_url,
        request_timeout: Duration::from_secs(request_timeout_secs?),
    };
    let retry = RetryConfig::new(max_retries?, Duration::from_millis(backoff_base_ms?));

    Some((fetch, polygon, retry))
}

fn resolve_store(section: &StoreSection, problems: &mut Problems) -> Option<StoreConfig> {
    let host = problems.required("store.host", section.host.as_deref());
    let port = problems
        .required("store.port", section.port.as_deref())
        .and_then(|v| problems.positive::<u16>("store.port", v));
    let database = problems.required("store.database", section.database.as_deref());
    let username = problems.required("store.username", section.username.as_deref());
    // 비밀번호는 앞뒤 공백도 값의 일부입니다.
    let password = match section.password.as_deref().filter(|v| !v.is_empty()) {
        Some(v) => Some(v),
        None => {
            problems.push("missing store.password");
            None
        }
    };

    let max_connections = problems.optional(
        "store.max_connections",
        section.max_connections.as_deref(),
        StoreConfig::DEFAULT_MAX_CONNECTIONS,
    );
    let acquire_timeout_secs = problems.optional(
        "store.acquire_timeout_secs",
        section.acquire_timeout_secs.as_deref(),
        StoreConfig::DEFAULT_ACQUIRE_TIMEOUT_SECS,
    );
    let batch_timeout_secs = problems.optional(
        "store.batch_timeout_secs",
        section.batch_timeout_secs.as_deref(),
        StoreConfig::DEFAULT_BATCH_TIMEOUT_SECS,
    );

    Some(StoreConfig {
        host: host?.to_string(),
        port: port?,
        database: database?.to_string(),
        username: username?.to_string(),
        password: password?.to_string().into(),
        max_connections: max_connections?,
        acquire_timeout: Duration::from_secs(acquire_timeout_secs?),
        batch_timeout: Duration::from_secs(batch_timeout_secs?),
    })
}
