//! 집계 봉 저장소.
//!
//! 이 crate는 다음을 제공합니다:
//! - PostgreSQL 연결 설정 및 풀
//! - 데이터베이스/`aggregates` 테이블 자동 생성 (`SchemaManager`)
//! - 자연 키 기반 upsert 저장소 (`PgAggregateStore`, `MemoryAggregateStore`)
//! - 고정 크기 배치 단위 적재기 (`BatchLoader`)

pub mod database;
pub mod error;
pub mod loader;
pub mod memory;
pub mod schema;
pub mod sink;

pub use database::{Database, StoreConfig};
pub use error::{LoadError, StoreError, StoreResult};
pub use loader::{BatchLoader, LoadReport, DEFAULT_BATCH_SIZE};
pub use memory::MemoryAggregateStore;
pub use schema::SchemaManager;
pub use sink::{AggregateSink, PgAggregateStore};
