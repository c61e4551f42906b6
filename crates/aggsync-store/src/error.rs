//! 저장소 오류 타입.

use thiserror::Error;

/// 저장소 관련 오류.
#[derive(Debug, Error)]
pub enum StoreError {
    /// 데이터베이스 연결 오류
    #[error("Database connection error: {0}")]
    Connection(String),

    /// 접속 대상 데이터베이스가 존재하지 않음
    #[error("Database does not exist: {0}")]
    UnknownDatabase(String),

    /// 쿼리 실행 오류
    #[error("Query error: {0}")]
    Query(String),

    /// 스키마 생성 오류
    #[error("Schema error: {0}")]
    Schema(String),

    /// 저장할 수 없는 값
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// 타임아웃 오류
    #[error("Operation timeout: {0}")]
    Timeout(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => StoreError::Timeout("connection pool timed out".to_string()),
            sqlx::Error::Io(e) => StoreError::Connection(e.to_string()),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().unwrap_or_default();
                StoreError::Query(format!("[{}] {}", code, db_err.message()))
            }
            _ => StoreError::Query(err.to_string()),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// 배치 적재 실패.
///
/// 실패 이전 배치들은 이미 커밋되어 있습니다.
#[derive(Debug, Error)]
pub enum LoadError {
    /// 배치 트랜잭션 실패 (재시도하지 않음)
    #[error("Batch {index} failed after {committed_rows} rows committed: {source}")]
    Batch {
        /// 실패한 배치 번호 (0부터)
        index: usize,
        /// 실패 전까지 커밋된 행 수
        committed_rows: usize,
        #[source]
        source: StoreError,
    },

    /// 다음 배치 시작 전 취소됨
    #[error("Load cancelled after {committed_rows} rows committed")]
    Cancelled { committed_rows: usize },
}

impl LoadError {
    /// 실패 전까지 커밋된 행 수.
    pub fn committed_rows(&self) -> usize {
        match self {
            LoadError::Batch { committed_rows, .. } => *committed_rows,
            LoadError::Cancelled { committed_rows } => *committed_rows,
        }
    }
}
