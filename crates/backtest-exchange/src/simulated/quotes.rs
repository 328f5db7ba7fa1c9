//! 캔들 캐시 기반 합성 시세.
//!
//! 시뮬레이션에는 실시간 호가가 없으므로, 현재 시뮬레이션 시각이 속한
//! 분봉의 저가-고가 범위에서 가격을 표본추출해 시세를 합성합니다.
//! 일중 상태(고가/저가/거래량)는 당일 일봉에서 가져옵니다.

use crate::error::{ExchangeError, ExchangeResult};
use crate::simulated::clock::VirtualClock;
use async_trait::async_trait;
use backtest_core::{Symbol, Ticker, TickerState, Timeframe};
use backtest_data::MarketCandleCache;
use chrono::Duration;
use rand::Rng;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use tracing::trace;

/// 현재 시세를 제공하는 소스.
///
/// 체결 엔진은 이 트레이트를 통해서만 가격을 읽으므로, 테스트에서
/// 고정 가격 소스로 대체할 수 있습니다.
#[async_trait]
pub trait TickerSource: Send + Sync {
    /// 심볼의 현재 시세를 반환합니다.
    async fn ticker(&self, symbol: &Symbol) -> ExchangeResult<Ticker>;
}

/// 캔들 캐시와 가상 시계로 시세를 합성하는 소스.
pub struct QuoteBoard {
    cache: Arc<MarketCandleCache>,
    clock: Arc<VirtualClock>,
}

impl QuoteBoard {
    /// 새 시세 보드를 생성합니다.
    pub fn new(cache: Arc<MarketCandleCache>, clock: Arc<VirtualClock>) -> Self {
        Self { cache, clock }
    }
}

#[async_trait]
impl TickerSource for QuoteBoard {
    async fn ticker(&self, symbol: &Symbol) -> ExchangeResult<Ticker> {
        // 여러 캔들 조회가 같은 시각을 보도록 시계를 세운다
        let _guard = self.clock.pause_guard();
        let now = self.clock.time();

        trace!(symbol = %symbol, time = %now, "sample ticker");

        // 일중 상태는 당일 일봉에서
        let daily = self
            .cache
            .get(now - Duration::days(5), now, symbol, Timeframe::D1, now)
            .await?;
        let day = daily
            .candle_at(Some(now))
            .ok_or_else(|| ExchangeError::NoData(format!("daily candle for {}", symbol)))?;

        let state = TickerState {
            high: day.high,
            low: day.low,
            volume: day.volume,
            bid_size: day.volume / dec!(2),
            ask_size: day.volume / dec!(2),
        };

        // 가격은 현재 분봉의 [저가, 고가]에서 표본추출
        let minute = self
            .cache
            .get(now - Duration::minutes(5), now, symbol, Timeframe::M1, now)
            .await?;
        let bar = minute
            .candle_at(Some(now))
            .ok_or_else(|| ExchangeError::NoData(format!("minute candle for {}", symbol)))?;

        let fraction =
            Decimal::from_f64(rand::thread_rng().gen::<f64>()).unwrap_or_default();
        let price = bar.low + (bar.high - bar.low) * fraction;

        Ok(Ticker {
            symbol: symbol.clone(),
            price,
            bid: price * dec!(0.9999),
            ask: price * dec!(1.0001),
            time: now,
            state,
        })
    }
}
