//! 집계 봉 백필 수집기.
//!
//! 이 crate는 설정 해석과 파이프라인 구동을 담당하는 바이너리를 제공합니다:
//! - 설정 문서 + CLI/환경변수 오버라이드 해석 (`config`)
//! - 수집 → 변환 → 스키마 준비 → 배치 upsert 실행 (`modules::backfill`)
//! - 실행 통계 요약 (`stats`)

pub mod config;
pub mod error;
pub mod modules;
pub mod stats;

pub use config::{resolve, ConfigDocument, Overrides, ResolvedConfig};
pub use error::{ConfigError, PipelineError, Result};
pub use stats::IngestStats;
