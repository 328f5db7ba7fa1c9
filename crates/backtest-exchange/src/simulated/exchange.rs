//! 시뮬레이션 거래소 파사드.
//!
//! 가상 시계, 캔들 캐시, 합성 시세, 체결 엔진을 묶어 [`Exchange`]
//! 트레이트로 노출합니다. `connect`는 시계를 시작하고 틱 드라이버를
//! 띄우며, 드라이버는 틱마다 구독 발화와 주문 정산을 수행합니다.
//!
//! 조회 API는 처리하는 동안 시계를 세워 일관된 스냅샷을 보장합니다.
//! 일시정지 게이트가 카운팅 방식이므로 잔고 평가처럼 내부에서 다시
//! 시세를 읽는 중첩 경로도 교착 없이 동작합니다.

use crate::error::{ExchangeError, ExchangeResult};
use crate::simulated::clock::VirtualClock;
use crate::simulated::engine::MatchingEngine;
use crate::simulated::quotes::{QuoteBoard, TickerSource};
use crate::simulated::scheduler::{SampleRequest, SubscriptionScheduler};
use crate::simulated::stream::EventBroadcaster;
use crate::traits::{Exchange, MarketEvent, UserEvent};
use async_trait::async_trait;
use backtest_core::{
    BalanceUsd, Candle, CandleSeries, Order, OrderRequest, Position, Price, Quantity,
    SimulationConfig, Symbol, Ticker, Timeframe, Wallets,
};
use backtest_data::MarketCandleCache;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// 시뮬레이션 거래소.
pub struct SimulatedExchange {
    clock: Arc<VirtualClock>,
    scheduler: Arc<Mutex<SubscriptionScheduler>>,
    engine: Arc<MatchingEngine>,
    quotes: Arc<QuoteBoard>,
    cache: Arc<MarketCandleCache>,
    market_events: EventBroadcaster<MarketEvent>,
    user_events: EventBroadcaster<UserEvent>,
    ready: AtomicBool,
    driver: StdMutex<Option<JoinHandle<()>>>,
}

impl SimulatedExchange {
    /// 설정과 캔들 캐시로 시뮬레이션 거래소를 생성합니다.
    pub fn new(config: &SimulationConfig, cache: Arc<MarketCandleCache>) -> Self {
        let clock = Arc::new(VirtualClock::new(
            config.time.from,
            config.time.to,
            std::time::Duration::from_millis(config.clock.tick_interval_ms),
        ));
        let quotes = Arc::new(QuoteBoard::new(Arc::clone(&cache), Arc::clone(&clock)));

        let user_events = EventBroadcaster::new();
        let engine = Arc::new(MatchingEngine::new(
            config.account.quote_currency.clone(),
            Wallets::with_balances(config.account.initial_balances.clone()),
            Arc::clone(&quotes) as Arc<dyn TickerSource>,
            user_events.clone(),
            config.time.from,
        ));

        Self {
            clock,
            scheduler: Arc::new(Mutex::new(SubscriptionScheduler::new())),
            engine,
            quotes,
            cache,
            market_events: EventBroadcaster::new(),
            user_events,
            ready: AtomicBool::new(false),
            driver: StdMutex::new(None),
        }
    }

    /// 시장 이벤트 스트림을 구독합니다.
    pub async fn market_events(&self, buffer_size: usize) -> mpsc::Receiver<MarketEvent> {
        self.market_events.subscribe(buffer_size).await
    }

    /// 계좌 이벤트 스트림을 구독합니다.
    pub async fn user_events(&self, buffer_size: usize) -> mpsc::Receiver<UserEvent> {
        self.user_events.subscribe(buffer_size).await
    }

    /// 가상 시계에 대한 핸들을 반환합니다.
    pub fn clock(&self) -> Arc<VirtualClock> {
        Arc::clone(&self.clock)
    }

    /// 틱 드라이버 루프. 틱마다 구독을 발화하고 주문을 정산합니다.
    async fn drive(
        mut ticks: mpsc::Receiver<DateTime<Utc>>,
        clock: Arc<VirtualClock>,
        scheduler: Arc<Mutex<SubscriptionScheduler>>,
        engine: Arc<MatchingEngine>,
        quotes: Arc<QuoteBoard>,
        cache: Arc<MarketCandleCache>,
        market_events: EventBroadcaster<MarketEvent>,
    ) {
        while let Some(t) = ticks.recv().await {
            let requests = scheduler.lock().await.fire(t);

            for request in requests {
                match request {
                    SampleRequest::Ticker { symbol, .. } => {
                        match quotes.ticker(&symbol).await {
                            Ok(ticker) => {
                                market_events.broadcast(MarketEvent::Ticker(ticker)).await;
                            }
                            Err(err) => warn!(%symbol, %err, "ticker sampling failed"),
                        }
                    }
                    SampleRequest::Candle {
                        time,
                        symbol,
                        timeframe,
                    } => {
                        // 방금 마감된 봉: [time - timeframe, time)
                        let from = timeframe.step_back(time);
                        let to = time - Duration::seconds(1);
                        match cache.get(from, to, &symbol, timeframe, clock.time()).await {
                            Ok(series) => {
                                if let Some(candle) = series.last() {
                                    market_events
                                        .broadcast(MarketEvent::Candle(candle.clone()))
                                        .await;
                                }
                            }
                            Err(err) => {
                                warn!(%symbol, %timeframe, %err, "candle sampling failed")
                            }
                        }
                    }
                }
            }

            if let Err(err) = engine.process_tick(t).await {
                warn!(%err, "order settlement failed");
            }
        }
    }
}

#[async_trait]
impl Exchange for SimulatedExchange {
    async fn connect(&self) -> ExchangeResult<()> {
        if self.ready.load(Ordering::SeqCst) {
            return Ok(());
        }

        let ticks = self.clock.take_tick_receiver().ok_or_else(|| {
            ExchangeError::Internal("tick receiver already taken".to_string())
        })?;

        let handle = tokio::spawn(Self::drive(
            ticks,
            Arc::clone(&self.clock),
            Arc::clone(&self.scheduler),
            Arc::clone(&self.engine),
            Arc::clone(&self.quotes),
            Arc::clone(&self.cache),
            self.market_events.clone(),
        ));
        *self.driver.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);

        self.clock.run()?;
        self.ready.store(true, Ordering::SeqCst);
        info!(time = %self.clock.time(), "simulated exchange connected");

        Ok(())
    }

    async fn disconnect(&self) -> ExchangeResult<()> {
        self.ready.store(false, Ordering::SeqCst);
        if let Some(handle) = self
            .driver
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        info!("simulated exchange disconnected");
        Ok(())
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn get_ticker(&self, symbol: &Symbol) -> ExchangeResult<Ticker> {
        self.quotes.ticker(symbol).await
    }

    async fn get_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ExchangeResult<CandleSeries> {
        if from >= to {
            return Err(ExchangeError::InvalidRequest(
                "time 'from' above time 'to'".to_string(),
            ));
        }

        let _guard = self.clock.pause_guard();
        let now = self.clock.time();
        Ok(self.cache.get(from, to, symbol, timeframe, now).await?)
    }

    async fn get_last_candle(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> ExchangeResult<Candle> {
        let _guard = self.clock.pause_guard();
        let now = self.clock.time();

        let series = self
            .cache
            .get(timeframe.step_back(now), now, symbol, timeframe, now)
            .await?;
        series
            .last()
            .cloned()
            .ok_or_else(|| ExchangeError::NoData(format!("last {} candle for {}", timeframe, symbol)))
    }

    async fn subscribe_ticker(&self, symbol: &Symbol) -> ExchangeResult<Uuid> {
        Ok(self.scheduler.lock().await.subscribe_ticker(symbol.clone()))
    }

    async fn subscribe_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> ExchangeResult<Uuid> {
        Ok(self
            .scheduler
            .lock()
            .await
            .subscribe_candles(symbol.clone(), timeframe))
    }

    async fn unsubscribe(&self, id: Uuid) -> ExchangeResult<()> {
        self.scheduler.lock().await.unsubscribe(id)
    }

    async fn get_orders(&self) -> ExchangeResult<Vec<Order>> {
        let _guard = self.clock.pause_guard();
        Ok(self.engine.orders().await)
    }

    async fn get_positions(&self) -> ExchangeResult<Vec<Position>> {
        Ok(self.engine.positions())
    }

    async fn get_wallets(&self) -> ExchangeResult<Wallets> {
        let _guard = self.clock.pause_guard();
        Ok(self.engine.wallets().await)
    }

    async fn get_balance(&self) -> ExchangeResult<BalanceUsd> {
        // 평가 중 시세가 움직이지 않도록 시계를 세운다. 내부의 시세
        // 조회도 시계를 세우지만 게이트가 카운팅이라 중첩이 안전하다.
        let _guard = self.clock.pause_guard();
        self.engine.balance().await
    }

    async fn put_order(&self, request: &OrderRequest) -> ExchangeResult<Order> {
        let _guard = self.clock.pause_guard();
        self.engine.put_order(request).await
    }

    async fn update_order(
        &self,
        _order_id: Uuid,
        _price: Price,
        _stop_price: Option<Price>,
        _amount: Quantity,
    ) -> ExchangeResult<Order> {
        Err(ExchangeError::Unimplemented("update order"))
    }

    async fn cancel_order(&self, _order_id: Uuid) -> ExchangeResult<()> {
        Err(ExchangeError::Unimplemented("cancel order"))
    }

    async fn close_position(&self, _position_id: Uuid) -> ExchangeResult<Position> {
        Err(ExchangeError::Unimplemented("close position"))
    }
}
