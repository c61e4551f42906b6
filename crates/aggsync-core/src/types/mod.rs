//! 파이프라인 전반에서 사용되는 공통 타입.

mod date_bound;
mod timespan;

pub use date_bound::*;
pub use timespan::*;
