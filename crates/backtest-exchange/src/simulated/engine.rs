//! 페이퍼 체결 엔진.
//!
//! 지갑과 미체결 주문을 관리하고, 시뮬레이션 시각이 1분 진행될 때마다
//! 미체결 주문을 현재 합성 시세로 평가해 체결합니다.
//!
//! 자금 규칙:
//! - 지정가/스탑 주문은 접수 시점에 필요한 자금을 `available`에서
//!   예약합니다. `balance`는 체결 시점에만 움직입니다.
//! - 매도는 기준 자산 수량을, 매수는 접수 시점 시세 기준 비용을
//!   예약합니다. 체결 시 예약을 해제하고 체결가 기준으로 정산합니다.

use crate::error::{ExchangeError, ExchangeResult};
use crate::simulated::quotes::TickerSource;
use crate::simulated::stream::EventBroadcaster;
use crate::traits::UserEvent;
use backtest_core::{
    BalanceUsd, Order, OrderRequest, OrderType, Position, Quantity, Symbol, Ticker, Wallets,
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, trace};

/// 예약 정보가 붙은 미체결 주문.
///
/// `reserved`는 매도 주문이면 기준 자산 수량, 매수 주문이면 호가 통화
/// 비용입니다.
#[derive(Debug, Clone)]
struct PendingOrder {
    order: Order,
    reserved: Quantity,
}

struct EngineState {
    wallets: Wallets,
    orders: Vec<PendingOrder>,
    current_time: DateTime<Utc>,
}

/// 페이퍼 체결 엔진.
pub struct MatchingEngine {
    quote_currency: String,
    source: Arc<dyn TickerSource>,
    events: EventBroadcaster<UserEvent>,
    state: RwLock<EngineState>,
}

impl MatchingEngine {
    /// 새 체결 엔진을 생성합니다.
    pub fn new(
        quote_currency: impl Into<String>,
        initial_wallets: Wallets,
        source: Arc<dyn TickerSource>,
        events: EventBroadcaster<UserEvent>,
        start_time: DateTime<Utc>,
    ) -> Self {
        Self {
            quote_currency: quote_currency.into().to_uppercase(),
            source,
            events,
            state: RwLock::new(EngineState {
                wallets: initial_wallets,
                orders: Vec::new(),
                current_time: start_time,
            }),
        }
    }

    /// 주문을 제출합니다.
    ///
    /// 시장가 주문은 즉시 체결되고, 지정가/스탑 주문은 자금을 예약한 뒤
    /// 미체결 목록에 들어갑니다.
    pub async fn put_order(&self, request: &OrderRequest) -> ExchangeResult<Order> {
        if request.amount.is_zero() {
            return Err(ExchangeError::InvalidAmount("amount is zero".to_string()));
        }
        if request.order_type.requires_price() && request.price <= Quantity::ZERO {
            return Err(ExchangeError::InvalidPrice(
                "price required for non-market order".to_string(),
            ));
        }
        if request.margin {
            return Err(ExchangeError::Unimplemented("margin orders"));
        }

        let ticker = self.source.ticker(&request.symbol).await?;

        let mut state = self.state.write().await;
        let mut order = Order::from_request(request, state.current_time);

        let abs_amount = request.amount.abs();
        let cost = ticker.price * abs_amount;
        let sell = request.is_sell();

        let asset = state.wallets.get_or_empty(&request.symbol.base);
        let money = state.wallets.get_or_empty(&self.quote_currency);

        if sell {
            if asset.available < abs_amount {
                return Err(ExchangeError::InsufficientBalance(asset.name));
            }
        } else if money.available < cost {
            return Err(ExchangeError::InsufficientBalance(money.name));
        }

        match order.order_type {
            OrderType::Market => {
                let pending = PendingOrder {
                    order: order.clone(),
                    reserved: Quantity::ZERO,
                };
                let filled = self.fill(&mut state, pending, &ticker).await;
                Ok(filled)
            }
            OrderType::Limit | OrderType::Stop => {
                let mut asset = asset;
                let mut money = money;

                let reserved = if sell {
                    asset.available -= abs_amount;
                    state.wallets.update(asset.clone());
                    self.events
                        .broadcast(UserEvent::WalletUpdate(asset))
                        .await;
                    abs_amount
                } else {
                    money.available -= cost;
                    state.wallets.update(money.clone());
                    self.events
                        .broadcast(UserEvent::WalletUpdate(money))
                        .await;
                    cost
                };

                order.updated_at = state.current_time;
                state.orders.push(PendingOrder {
                    order: order.clone(),
                    reserved,
                });

                debug!(order_id = %order.id, symbol = %order.symbol, "order accepted");
                self.events
                    .broadcast(UserEvent::OrderNew(order.clone()))
                    .await;

                Ok(order)
            }
        }
    }

    /// 틱 하나를 처리합니다. 시뮬레이션 시각을 갱신하고 미체결 주문을
    /// 평가합니다.
    pub async fn process_tick(&self, t: DateTime<Utc>) -> ExchangeResult<()> {
        let mut state = self.state.write().await;
        state.current_time = t;

        if state.orders.is_empty() {
            return Ok(());
        }

        // 틱당 심볼별 시세는 한 번만 샘플링
        let mut tickers: HashMap<String, Ticker> = HashMap::new();
        let pending = std::mem::take(&mut state.orders);

        // 평가에 실패한 주문은 미체결로 유지하고, 첫 에러만 보고한다
        let mut rs = Ok(());

        for po in pending {
            if rs.is_err() {
                state.orders.push(po);
                continue;
            }

            let pair = po.order.symbol.pair();
            let ticker = match tickers.get(&pair) {
                Some(t) => t.clone(),
                None => match self.source.ticker(&po.order.symbol).await {
                    Ok(t) => {
                        tickers.insert(pair, t.clone());
                        t
                    }
                    Err(err) => {
                        rs = Err(err);
                        state.orders.push(po);
                        continue;
                    }
                },
            };

            match Self::should_execute(&po.order, ticker.price) {
                Ok(true) => {
                    self.fill(&mut state, po, &ticker).await;
                }
                Ok(false) => state.orders.push(po),
                Err(err) => {
                    rs = Err(err);
                    state.orders.push(po);
                }
            }
        }

        rs
    }

    /// 주문이 현재 가격에서 체결 조건을 만족하는지 평가합니다.
    fn should_execute(order: &Order, price: Quantity) -> ExchangeResult<bool> {
        let sell = order.is_sell();
        match order.order_type {
            OrderType::Market => Ok(true),
            OrderType::Limit => Ok(if sell {
                price >= order.price
            } else {
                price <= order.price
            }),
            OrderType::Stop => {
                let stop = order
                    .stop_price
                    .ok_or(ExchangeError::MissingStopPrice(order.id))?;
                Ok(if sell { price <= stop } else { price >= stop })
            }
        }
    }

    /// 주문을 체결하고 지갑을 정산합니다.
    async fn fill(
        &self,
        state: &mut EngineState,
        pending: PendingOrder,
        ticker: &Ticker,
    ) -> Order {
        let PendingOrder {
            mut order,
            reserved,
        } = pending;

        order.amount_current = Quantity::ZERO;
        order.price_avg = ticker.price;
        order.updated_at = state.current_time;

        let abs_amount = order.amount_original.abs();
        let cost = abs_amount * ticker.price;

        let mut asset = state.wallets.get_or_empty(&order.symbol.base);
        let mut money = state.wallets.get_or_empty(&self.quote_currency);

        if order.is_sell() {
            asset.balance -= abs_amount;
            asset.available += reserved - abs_amount;
            money.balance += cost;
            money.available += cost;
        } else {
            asset.balance += abs_amount;
            asset.available += abs_amount;
            money.balance -= cost;
            money.available += reserved - cost;
        }

        state.wallets.update(asset.clone());
        state.wallets.update(money.clone());

        debug!(
            order_id = %order.id,
            symbol = %order.symbol,
            price = %ticker.price,
            "order filled"
        );

        self.events.broadcast(UserEvent::WalletUpdate(asset)).await;
        self.events.broadcast(UserEvent::WalletUpdate(money)).await;
        self.events
            .broadcast(UserEvent::OrderFilled(order.clone()))
            .await;

        order
    }

    /// 미체결 주문 목록을 반환합니다.
    pub async fn orders(&self) -> Vec<Order> {
        let state = self.state.read().await;
        state.orders.iter().map(|po| po.order.clone()).collect()
    }

    /// 오픈 포지션 목록을 반환합니다. 마진 미지원으로 항상 비어 있습니다.
    pub fn positions(&self) -> Vec<Position> {
        Vec::new()
    }

    /// 지갑 목록을 반환합니다.
    pub async fn wallets(&self) -> Wallets {
        self.state.read().await.wallets.clone()
    }

    /// 호가 통화 기준 평가 잔고를 계산합니다.
    ///
    /// 호가 통화 외의 보유 자산은 현재 시세로 평가해 순자산에 더합니다.
    pub async fn balance(&self) -> ExchangeResult<BalanceUsd> {
        let state = self.state.read().await;

        let mut rs = BalanceUsd::default();

        for wallet in state.wallets.all() {
            if wallet.name == self.quote_currency {
                rs.total = wallet.balance;
                rs.net_worth += wallet.balance;
                continue;
            }
            if wallet.balance.is_zero() {
                continue;
            }

            let symbol = Symbol::new(&wallet.name, &self.quote_currency);
            let ticker = self.source.ticker(&symbol).await?;
            trace!(asset = %wallet.name, price = %ticker.price, "valuate holding");
            rs.net_worth += wallet.balance * ticker.price;
        }

        Ok(rs)
    }
}
