//! 수집 파이프라인 도메인 모델.

mod aggregate;
mod fetch_spec;
mod record;

pub use aggregate::*;
pub use fetch_spec::*;
pub use record::*;
