//! 수집 작업 모듈.

pub mod backfill;

pub use backfill::{collect_rows, load_rows, run_backfill};
