//! 구독 스케줄러.
//!
//! 가상 시계의 틱마다 어떤 구독이 발화해야 하는지 계산합니다.
//! 시세 구독은 10번째 틱마다, 캔들 구독은 시뮬레이션 시각이 해당
//! 타임프레임 경계에 도달할 때 발화합니다. 스케줄러는 I/O를 하지
//! 않으며 가격도 계산하지 않습니다.

use crate::error::{ExchangeError, ExchangeResult};
use backtest_core::{Subscription, SubscriptionKind, Symbol, Timeframe};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 틱 소비자가 수행해야 할 샘플링 요청.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleRequest {
    /// 시세 샘플링
    Ticker {
        /// 발화 시각
        time: DateTime<Utc>,
        /// 거래 심볼
        symbol: Symbol,
    },
    /// 캔들 마감 샘플링
    Candle {
        /// 발화 시각 (봉 경계)
        time: DateTime<Utc>,
        /// 거래 심볼
        symbol: Symbol,
        /// 타임프레임
        timeframe: Timeframe,
    },
}

/// 구독 스케줄러.
#[derive(Debug, Default)]
pub struct SubscriptionScheduler {
    subs: Vec<Subscription>,
    ticks: u8,
}

/// 시세 구독이 발화하는 틱 주기.
const TICKER_EVERY_N_TICKS: u8 = 10;

impl SubscriptionScheduler {
    /// 빈 스케줄러를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 시세 구독을 등록하고 구독 ID를 반환합니다.
    pub fn subscribe_ticker(&mut self, symbol: Symbol) -> Uuid {
        let sub = Subscription::ticker(symbol);
        let id = sub.id;
        self.subs.push(sub);
        id
    }

    /// 캔들 구독을 등록하고 구독 ID를 반환합니다.
    pub fn subscribe_candles(&mut self, symbol: Symbol, timeframe: Timeframe) -> Uuid {
        let sub = Subscription::candle(symbol, timeframe);
        let id = sub.id;
        self.subs.push(sub);
        id
    }

    /// 구독을 해지합니다.
    pub fn unsubscribe(&mut self, id: Uuid) -> ExchangeResult<()> {
        let before = self.subs.len();
        self.subs.retain(|s| s.id != id);
        if self.subs.len() == before {
            return Err(ExchangeError::SubscriptionNotFound(id));
        }
        Ok(())
    }

    /// 현재 등록된 구독 목록을 반환합니다.
    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subs
    }

    /// 틱 하나를 처리하고 이번 틱에 발화하는 샘플링 요청을 반환합니다.
    pub fn fire(&mut self, t: DateTime<Utc>) -> Vec<SampleRequest> {
        self.ticks += 1;
        let ticker_due = self.ticks == TICKER_EVERY_N_TICKS;

        let mut requests = Vec::new();
        for sub in &self.subs {
            match sub.kind {
                SubscriptionKind::Ticker => {
                    if ticker_due {
                        requests.push(SampleRequest::Ticker {
                            time: t,
                            symbol: sub.symbol.clone(),
                        });
                    }
                }
                SubscriptionKind::Candle => {
                    let Some(timeframe) = sub.timeframe else {
                        continue;
                    };
                    if timeframe.is_boundary(t) {
                        requests.push(SampleRequest::Candle {
                            time: t,
                            symbol: sub.symbol.clone(),
                            timeframe,
                        });
                    }
                }
            }
        }

        if ticker_due {
            self.ticks = 0;
        }

        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn btc() -> Symbol {
        Symbol::new("BTC", "USDT")
    }

    #[test]
    fn test_ticker_fires_every_tenth_tick() {
        let mut scheduler = SubscriptionScheduler::new();
        scheduler.subscribe_ticker(btc());

        let mut fired = 0;
        for i in 0..30 {
            let t = at("2020-11-27T00:00:00Z") + chrono::Duration::minutes(i);
            if !scheduler.fire(t).is_empty() {
                fired += 1;
            }
        }
        assert_eq!(fired, 3);
    }

    #[test]
    fn test_all_ticker_subs_fire_together() {
        let mut scheduler = SubscriptionScheduler::new();
        scheduler.subscribe_ticker(btc());
        scheduler.subscribe_ticker(Symbol::new("ETH", "USDT"));

        let mut last = Vec::new();
        for i in 0..10 {
            let t = at("2020-11-27T00:00:00Z") + chrono::Duration::minutes(i);
            last = scheduler.fire(t);
        }
        assert_eq!(last.len(), 2);
    }

    #[test]
    fn test_candle_fires_on_resolution_boundary() {
        let mut scheduler = SubscriptionScheduler::new();
        scheduler.subscribe_candles(btc(), Timeframe::M15);

        assert!(scheduler.fire(at("2020-11-27T00:07:00Z")).is_empty());

        let fired = scheduler.fire(at("2020-11-27T00:15:00Z"));
        assert_eq!(
            fired,
            vec![SampleRequest::Candle {
                time: at("2020-11-27T00:15:00Z"),
                symbol: btc(),
                timeframe: Timeframe::M15,
            }]
        );
    }

    proptest::proptest! {
        // n틱 동안 시세 구독은 정확히 n/10번 발화해야 한다
        #[test]
        fn prop_ticker_fire_count(n in 0u32..500) {
            let mut scheduler = SubscriptionScheduler::new();
            scheduler.subscribe_ticker(btc());

            let start = at("2020-11-27T00:00:00Z");
            let mut fired = 0u32;
            for i in 0..n {
                let t = start + chrono::Duration::minutes(i as i64);
                fired += scheduler.fire(t).len() as u32;
            }
            proptest::prop_assert_eq!(fired, n / 10);
        }
    }

    #[test]
    fn test_unsubscribe() {
        let mut scheduler = SubscriptionScheduler::new();
        let id = scheduler.subscribe_ticker(btc());
        assert_eq!(scheduler.subscriptions().len(), 1);

        scheduler.unsubscribe(id).unwrap();
        assert!(scheduler.subscriptions().is_empty());

        assert!(matches!(
            scheduler.unsubscribe(id),
            Err(ExchangeError::SubscriptionNotFound(_))
        ));
    }
}
