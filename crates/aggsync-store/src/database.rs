//! PostgreSQL 연결 설정 및 풀.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tracing::info;

use crate::error::{StoreError, StoreResult};

/// 데이터베이스 생성 여부를 확인할 때 접속하는 관리용 DB.
pub const MAINTENANCE_DATABASE: &str = "postgres";

/// PostgreSQL `invalid_catalog_name` 에러 코드 (없는 DB에 접속).
const INVALID_CATALOG_NAME: &str = "3D000";

/// 저장소 연결 설정.
#[derive(Debug)]
pub struct StoreConfig {
    /// 호스트
    pub host: String,
    /// 포트
    pub port: u16,
    /// 대상 데이터베이스 이름
    pub database: String,
    /// 사용자 이름
    pub username: String,
    /// 비밀번호
    pub password: SecretString,
    /// 풀의 최대 연결 수
    pub max_connections: u32,
    /// 연결 획득 타임아웃
    pub acquire_timeout: Duration,
    /// 배치 트랜잭션 하나의 타임아웃
    pub batch_timeout: Duration,
}

impl StoreConfig {
    /// 기본 풀 크기.
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    /// 기본 연결 획득 타임아웃 (초).
    pub const DEFAULT_ACQUIRE_TIMEOUT_SECS: u64 = 30;
    /// 기본 배치 타임아웃 (초).
    pub const DEFAULT_BATCH_TIMEOUT_SECS: u64 = 120;

    /// 지정한 데이터베이스에 대한 연결 옵션.
    pub fn connect_options(&self, database: &str) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .username(&self.username)
            .password(self.password.expose_secret())
            .database(database)
    }

    /// 로그용 접속 대상 (`user@host:port/db`, 비밀번호 제외).
    pub fn target(&self) -> String {
        format!(
            "{}@{}:{}/{}",
            self.username, self.host, self.port, self.database
        )
    }
}

/// 데이터베이스 연결 풀 래퍼.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// 대상 데이터베이스에 연결합니다.
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        Self::connect_to(config, &config.database).await
    }

    /// 관리용 데이터베이스(`postgres`)에 단일 연결 풀로 접속합니다.
    pub async fn connect_maintenance(config: &StoreConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(1)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options(MAINTENANCE_DATABASE))
            .await
            .map_err(connect_error)?;
        Ok(Self { pool })
    }

    async fn connect_to(config: &StoreConfig, database: &str) -> StoreResult<Self> {
        info!(db = %config.target(), "데이터베이스 연결 중");

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect_with(config.connect_options(database))
            .await
            .map_err(connect_error)?;

        info!("데이터베이스 연결 성공");
        Ok(Self { pool })
    }

    /// 기존 연결 풀에서 생성합니다.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 내부 연결 풀을 반환합니다.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// 풀을 닫습니다.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// 접속 실패를 분류합니다. SQLSTATE는 `UnknownDatabase` 판별에만 씁니다.
fn connect_error(err: sqlx::Error) -> StoreError {
    let code = match &err {
        sqlx::Error::Database(db_err) => db_err.code().map(|c| c.into_owned()),
        _ => None,
    };
    classify_connect_error(code.as_deref(), err.to_string())
}

fn classify_connect_error(code: Option<&str>, message: String) -> StoreError {
    match code {
        Some(INVALID_CATALOG_NAME) => StoreError::UnknownDatabase(message),
        _ => StoreError::Connection(message),
    }
}
