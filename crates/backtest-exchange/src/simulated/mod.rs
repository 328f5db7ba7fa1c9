//! 시뮬레이션 거래소 구현.

mod clock;
mod engine;
mod exchange;
mod quotes;
mod scheduler;
mod stream;

pub use clock::{ClockPauseGuard, VirtualClock};
pub use engine::MatchingEngine;
pub use exchange::SimulatedExchange;
pub use quotes::{QuoteBoard, TickerSource};
pub use scheduler::{SampleRequest, SubscriptionScheduler};
pub use stream::EventBroadcaster;
