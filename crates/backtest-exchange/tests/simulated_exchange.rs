//! 시뮬레이션 거래소 종단 테스트.
//!
//! 고정 가격 캔들(시가=고가=저가=종가)을 쓰면 분봉 저가-고가 구간
//! 표본추출이 상수가 되어 가격이 결정적입니다.

use backtest_core::{
    Candle, CandleSeries, OrderRequest, SimulationConfig, Symbol, Timeframe,
};
use backtest_data::{CandleCache, StaticCandleLoader};
use backtest_exchange::{Exchange, ExchangeError, MarketEvent, SimulatedExchange};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

fn btc() -> Symbol {
    Symbol::new("BTC", "USDT")
}

/// 고정 가격 캔들 시리즈를 생성합니다.
fn flat_series(
    symbol: &Symbol,
    timeframe: Timeframe,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
    price: Decimal,
) -> CandleSeries {
    let mut candles = Vec::new();
    let mut open_time = timeframe.floor(from);
    while open_time <= to {
        candles.push(Candle::new(
            symbol.clone(),
            timeframe,
            open_time,
            price,
            price,
            price,
            price,
            dec!(1000),
        ));
        open_time = timeframe.step_forward(open_time);
    }
    CandleSeries::new(candles)
}

const FROM: &str = "2020-11-27T00:00:00Z";

fn test_config(to: DateTime<Utc>, tick_interval_ms: u64) -> SimulationConfig {
    let mut config = SimulationConfig::default();
    config.time.from = at(FROM);
    config.time.to = to;
    config.clock.tick_interval_ms = tick_interval_ms;
    config.account.quote_currency = "USDT".to_string();
    config.account.initial_balances = [("USDT".to_string(), dec!(1000))].into();
    config
}

fn exchange_at_price(config: &SimulationConfig, price: Decimal) -> SimulatedExchange {
    let from = config.time.from - Duration::days(7);
    let to = config.time.to + Duration::days(1);

    let loader = Arc::new(
        StaticCandleLoader::new()
            .with_series(&btc(), Timeframe::M1, flat_series(&btc(), Timeframe::M1, from, to, price))
            .with_series(&btc(), Timeframe::D1, flat_series(&btc(), Timeframe::D1, from, to, price)),
    );

    let path = std::env::temp_dir().join(format!("sim_exchange_{}.json", uuid::Uuid::new_v4()));
    let cache = CandleCache::new(path).unwrap();
    let market = Arc::new(cache.market("simulated", loader));

    SimulatedExchange::new(config, market)
}

#[tokio::test]
async fn test_connect_and_disconnect() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));

    assert!(!exchange.is_ready());
    exchange.connect().await.unwrap();
    assert!(exchange.is_ready());

    // 중복 connect는 무해
    exchange.connect().await.unwrap();

    exchange.disconnect().await.unwrap();
    assert!(!exchange.is_ready());
}

#[tokio::test]
async fn test_ticker_is_sampled_from_candles() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));
    exchange.connect().await.unwrap();

    let ticker = exchange.get_ticker(&btc()).await.unwrap();
    assert_eq!(ticker.price, dec!(100));
    assert_eq!(ticker.bid, dec!(100) * dec!(0.9999));
    assert_eq!(ticker.ask, dec!(100) * dec!(1.0001));
    assert_eq!(ticker.state.high, dec!(100));
    assert_eq!(ticker.state.low, dec!(100));
    assert_eq!(ticker.state.volume, dec!(1000));
    assert_eq!(ticker.state.bid_size, dec!(500));

    exchange.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_get_candles_validates_range() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));
    exchange.connect().await.unwrap();

    let rs = exchange
        .get_candles(&btc(), Timeframe::M1, at("2020-11-26T12:00:00Z"), at("2020-11-26T10:00:00Z"))
        .await;
    assert!(matches!(rs, Err(ExchangeError::InvalidRequest(_))));

    let series = exchange
        .get_candles(&btc(), Timeframe::M1, at("2020-11-26T10:00:00Z"), at("2020-11-26T10:04:00Z"))
        .await
        .unwrap();
    assert_eq!(series.len(), 5);

    exchange.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_get_last_candle_covers_current_bar() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));
    exchange.connect().await.unwrap();

    let candle = exchange.get_last_candle(&btc(), Timeframe::M1).await.unwrap();
    let now = exchange.clock().time();
    assert_eq!(candle.open_time, Timeframe::M1.floor(now));

    exchange.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_limit_order_reserves_then_fills() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));
    exchange.connect().await.unwrap();

    // 현재가보다 낮은 지정가: 미체결로 남고 자금만 예약
    let pending = exchange
        .put_order(&OrderRequest::limit(btc(), dec!(0.01), dec!(50)))
        .await
        .unwrap();
    assert!(!pending.is_filled());

    let wallets = exchange.get_wallets().await.unwrap();
    let usdt = wallets.get("USDT").unwrap();
    assert_eq!(usdt.balance, dec!(1000));
    assert_eq!(usdt.available, dec!(999));

    let orders = exchange.get_orders().await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].id, pending.id);

    // 현재가 이상의 지정가 매수는 다음 틱 정산에서 체결
    exchange
        .put_order(&OrderRequest::limit(btc(), dec!(0.02), dec!(150)))
        .await
        .unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(100)).await;

    let wallets = exchange.get_wallets().await.unwrap();
    assert_eq!(wallets.get("BTC").unwrap().balance, dec!(0.02));
    // 체결가 100, 수량 0.02: 1000 - 2
    assert_eq!(wallets.get("USDT").unwrap().balance, dec!(998));
    assert_eq!(exchange.get_orders().await.unwrap().len(), 1);

    exchange.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_market_order_and_balance() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));
    exchange.connect().await.unwrap();

    let order = exchange
        .put_order(&OrderRequest::market(btc(), dec!(0.5)))
        .await
        .unwrap();
    assert!(order.is_filled());
    assert_eq!(order.price_avg, dec!(100));

    let wallets = exchange.get_wallets().await.unwrap();
    assert_eq!(wallets.get("USDT").unwrap().balance, dec!(950));
    assert_eq!(wallets.get("BTC").unwrap().balance, dec!(0.5));

    // 순자산 = 950 + 0.5 * 100
    let balance = exchange.get_balance().await.unwrap();
    assert_eq!(balance.total, dec!(950));
    assert_eq!(balance.net_worth, dec!(1000));

    exchange.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_insufficient_funds_rejected() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));
    exchange.connect().await.unwrap();

    let rs = exchange
        .put_order(&OrderRequest::market(btc(), dec!(100)))
        .await;
    assert!(matches!(rs, Err(ExchangeError::InsufficientBalance(_))));

    let rs = exchange
        .put_order(&OrderRequest::market(btc(), dec!(-1)))
        .await;
    assert!(matches!(rs, Err(ExchangeError::InsufficientBalance(_))));

    exchange.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_subscriptions_deliver_events() {
    let config = test_config(at(FROM) + Duration::hours(24), 1);
    let exchange = exchange_at_price(&config, dec!(100));
    let mut events = exchange.market_events(64).await;

    exchange.subscribe_ticker(&btc()).await.unwrap();
    let candle_sub = exchange.subscribe_candles(&btc(), Timeframe::M1).await.unwrap();
    exchange.connect().await.unwrap();

    let mut saw_ticker = false;
    let mut saw_candle = false;
    while !(saw_ticker && saw_candle) {
        let event = tokio::time::timeout(std::time::Duration::from_secs(10), events.recv())
            .await
            .expect("event stream timed out")
            .expect("event stream closed");
        match event {
            MarketEvent::Ticker(ticker) => {
                assert_eq!(ticker.price, dec!(100));
                saw_ticker = true;
            }
            MarketEvent::Candle(candle) => {
                assert_eq!(candle.timeframe, Timeframe::M1);
                assert_eq!(candle.close, dec!(100));
                saw_candle = true;
            }
        }
    }

    exchange.unsubscribe(candle_sub).await.unwrap();
    assert!(matches!(
        exchange.unsubscribe(candle_sub).await,
        Err(ExchangeError::SubscriptionNotFound(_))
    ));

    exchange.disconnect().await.unwrap();
}

#[tokio::test]
async fn test_unsupported_operations() {
    let config = test_config(at(FROM) + Duration::hours(24), 2);
    let exchange = exchange_at_price(&config, dec!(100));

    let rs = exchange
        .update_order(uuid::Uuid::new_v4(), dec!(100), None, dec!(1))
        .await;
    assert!(matches!(rs, Err(ref e @ ExchangeError::Unimplemented(_)) if e.is_unimplemented()));

    assert!(matches!(
        exchange.cancel_order(uuid::Uuid::new_v4()).await,
        Err(ExchangeError::Unimplemented(_))
    ));
    assert!(matches!(
        exchange.close_position(uuid::Uuid::new_v4()).await,
        Err(ExchangeError::Unimplemented(_))
    ));

    // 마진 미지원이므로 포지션은 항상 비어 있음
    assert!(exchange.get_positions().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_clock_exhaustion_is_terminal() {
    let config = test_config(at(FROM) + Duration::minutes(3), 1);
    let exchange = exchange_at_price(&config, dec!(100));
    exchange.connect().await.unwrap();

    let clock = exchange.clock();
    clock.done().await;
    assert!(clock.is_finished());
    assert_eq!(clock.time(), at(FROM) + Duration::minutes(3));

    // 소진된 시계는 다시 시작할 수 없음
    assert!(matches!(clock.run(), Err(ExchangeError::ClockFinished)));

    exchange.disconnect().await.unwrap();
}
