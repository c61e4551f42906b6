//! 데이터베이스 및 `aggregates` 테이블 생성.
//!
//! 생성만 하고 기존 구조를 삭제하거나 변경하지 않으므로 매 실행마다
//! 호출해도 안전합니다. 스키마 변경은 데이터 적재 전에 커밋됩니다.

use sqlx::postgres::PgPool;
use tracing::{debug, info, instrument};

use crate::database::{Database, StoreConfig};
use crate::error::{StoreError, StoreResult};

/// PostgreSQL `duplicate_database` 에러 코드.
const DUPLICATE_DATABASE: &str = "42P04";

/// PostgreSQL 식별자 최대 길이.
const MAX_IDENTIFIER_LEN: usize = 63;

const CREATE_TABLE_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS aggregates (
    ticker        VARCHAR(16)    NOT NULL,
    multiplier    INTEGER        NOT NULL,
    timespan      VARCHAR(16)    NOT NULL,
    ts_ms         BIGINT         NOT NULL,
    dt_utc        TIMESTAMPTZ    NOT NULL,
    open          NUMERIC(18,6)  NOT NULL,
    high          NUMERIC(18,6)  NOT NULL,
    low           NUMERIC(18,6)  NOT NULL,
    close         NUMERIC(18,6)  NOT NULL,
    volume        BIGINT         NULL,
    vwap          NUMERIC(18,6)  NULL,
    transactions  BIGINT         NULL,
    PRIMARY KEY (ticker, multiplier, timespan, ts_ms)
)
"#;

const CREATE_DT_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_aggregates_dt ON aggregates (dt_utc)";

const CREATE_TICKER_DT_INDEX_SQL: &str =
    "CREATE INDEX IF NOT EXISTS idx_aggregates_ticker_dt ON aggregates (ticker, dt_utc)";

/// 스키마 관리자.
pub struct SchemaManager;

impl SchemaManager {
    /// 데이터베이스와 테이블을 준비하고 대상 DB 연결을 반환합니다.
    ///
    /// 대상 DB에 먼저 접속하고, DB가 없을 때만 관리용 DB로 접속해 생성합니다.
    #[instrument(skip(config), fields(database = %config.database))]
    pub async fn provision(config: &StoreConfig) -> StoreResult<Database> {
        let db = match Database::connect(config).await {
            Ok(db) => db,
            Err(StoreError::UnknownDatabase(reason)) => {
                info!(reason = %reason, "대상 데이터베이스가 없어 생성합니다");
                Self::create_database(config).await?;
                Database::connect(config).await?
            }
            Err(e) => return Err(e),
        };

        Self::ensure_schema(db.pool()).await?;
        Ok(db)
    }

    async fn create_database(config: &StoreConfig) -> StoreResult<()> {
        let admin = Database::connect_maintenance(config).await?;
        let created = Self::ensure_database(admin.pool(), &config.database).await;
        admin.close().await;
        created.map(|_| ())
    }

    /// 데이터베이스가 없으면 생성합니다. 새로 만들었으면 `true`.
    pub async fn ensure_database(admin: &PgPool, name: &str) -> StoreResult<bool> {
        let ident = quote_identifier(name)?;

        let exists: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM pg_database WHERE datname = $1")
            .bind(name)
            .fetch_optional(admin)
            .await?;

        if exists.is_some() {
            debug!(database = name, "데이터베이스가 이미 존재합니다");
            return Ok(false);
        }

        // CREATE DATABASE는 바인드 파라미터와 트랜잭션을 지원하지 않음
        let sql = format!("CREATE DATABASE {}", ident);
        match sqlx::query(&sql).execute(admin).await {
            Ok(_) => {
                info!(database = name, "데이터베이스 생성");
                Ok(true)
            }
            Err(sqlx::Error::Database(db_err))
                if db_err.code().as_deref() == Some(DUPLICATE_DATABASE) =>
            {
                debug!(database = name, "동시 실행에서 이미 생성됨");
                Ok(false)
            }
            Err(e) => Err(StoreError::Schema(format!("CREATE DATABASE 실패: {}", e))),
        }
    }

    /// `aggregates` 테이블과 인덱스를 한 트랜잭션으로 생성합니다.
    pub async fn ensure_schema(pool: &PgPool) -> StoreResult<()> {
        let mut tx = pool.begin().await?;

        for sql in [
            CREATE_TABLE_SQL,
            CREATE_DT_INDEX_SQL,
            CREATE_TICKER_DT_INDEX_SQL,
        ] {
            sqlx::query(sql)
                .execute(&mut *tx)
                .await
                .map_err(|e| StoreError::Schema(e.to_string()))?;
        }

        tx.commit().await?;
        info!("aggregates 스키마 준비 완료");
        Ok(())
    }
}

/// 데이터베이스 이름을 검증하고 따옴표로 감쌉니다.
///
/// `[A-Za-z0-9_]`만 허용합니다.
pub fn quote_identifier(name: &str) -> StoreResult<String> {
    let valid = !name.is_empty()
        && name.len() <= MAX_IDENTIFIER_LEN
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');

    if valid {
        Ok(format!("\"{}\"", name))
    } else {
        Err(StoreError::Schema(format!(
            "허용되지 않는 데이터베이스 이름: {:?}",
            name
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_identifier() {
        assert_eq!(quote_identifier("market_data").unwrap(), "\"market_data\"");
        assert_eq!(quote_identifier("Bars2024").unwrap(), "\"Bars2024\"");
        assert!(quote_identifier("").is_err());
        assert!(quote_identifier("x\"; DROP DATABASE y; --").is_err());
        assert!(quote_identifier("market-data").is_err());
        assert!(quote_identifier(&"a".repeat(64)).is_err());
    }

    #[test]
    fn test_schema_is_create_only() {
        for sql in [CREATE_TABLE_SQL, CREATE_DT_INDEX_SQL, CREATE_TICKER_DT_INDEX_SQL] {
            assert!(sql.contains("IF NOT EXISTS"));
            let upper = sql.to_uppercase();
            assert!(!upper.contains("DROP"));
            assert!(!upper.contains("ALTER"));
        }
        assert!(CREATE_TABLE_SQL.contains("PRIMARY KEY (ticker, multiplier, timespan, ts_ms)"));
    }
}
