//! # Backtest Data
//!
//! 백테스팅 엔진의 캔들 데이터 계층을 제공합니다.
//!
//! 다운로드한 캔들은 구간(period) 단위로 캐싱되고 디스크에 저장됩니다.
//! 요청 범위가 캐시에 없으면 로더로 다운로드한 뒤 기존 구간과 병합합니다.

pub mod cache;
pub mod error;
pub mod loader;

pub use cache::{CandleCache, MarketCandleCache, Period};
pub use error::{DataError, DataResult};
pub use loader::{generate_series, CandleLoader, StaticCandleLoader};
