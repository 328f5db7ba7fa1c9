//! 구간(period) 기반 캔들 캐시.

mod candles;
mod periods;

pub use candles::{verify_series, CandleCache, MarketCandleCache};
pub use periods::{Period, PeriodSet};
