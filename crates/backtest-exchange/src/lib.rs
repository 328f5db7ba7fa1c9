//! # Backtest Exchange
//!
//! 과거 캔들 데이터 위에서 동작하는 시뮬레이션 거래소를 제공합니다.
//!
//! 구성 요소:
//! - `VirtualClock` - 일시정지 가능한 가상 시계
//! - `SubscriptionScheduler` - 시세/캔들 구독 스케줄링
//! - `MatchingEngine` - 페이퍼 지갑과 주문 체결
//! - `QuoteBoard` - 캔들 캐시 기반 합성 시세
//! - `SimulatedExchange` - 위 구성 요소를 묶는 거래소 파사드

pub mod error;
pub mod simulated;
pub mod traits;

pub use error::{ExchangeError, ExchangeResult};
pub use simulated::{
    MatchingEngine, QuoteBoard, SimulatedExchange, SubscriptionScheduler, TickerSource,
    VirtualClock,
};
pub use traits::{Exchange, MarketEvent, UserEvent};
