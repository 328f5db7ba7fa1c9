//! 거래소 파사드 트레이트와 이벤트 타입.
//!
//! `Exchange`는 전략 코드가 거래소와 통신하는 유일한 계약입니다.
//! 시뮬레이션 거래소와 실거래 어댑터가 같은 트레이트를 구현하므로
//! 전략은 수정 없이 백테스트와 실거래를 오갈 수 있습니다.

use crate::error::ExchangeResult;
use async_trait::async_trait;
use backtest_core::{
    BalanceUsd, Candle, CandleSeries, Order, OrderRequest, Position, Price, Quantity, Symbol,
    Ticker, Timeframe, WalletCurrency, Wallets,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// 시장 데이터 이벤트.
#[derive(Debug, Clone)]
pub enum MarketEvent {
    /// 시세 갱신
    Ticker(Ticker),
    /// 캔들 마감
    Candle(Candle),
}

/// 계좌(사용자) 이벤트.
#[derive(Debug, Clone)]
pub enum UserEvent {
    /// 새 주문 접수
    OrderNew(Order),
    /// 주문 체결
    OrderFilled(Order),
    /// 지갑 잔고 변경
    WalletUpdate(WalletCurrency),
}

/// 거래소 파사드.
#[async_trait]
pub trait Exchange: Send + Sync {
    /// 거래소에 연결하고 시뮬레이션을 시작합니다.
    async fn connect(&self) -> ExchangeResult<()>;

    /// 연결을 종료합니다.
    async fn disconnect(&self) -> ExchangeResult<()>;

    /// 연결 준비 상태를 확인합니다.
    fn is_ready(&self) -> bool;

    /// 현재 시세를 조회합니다.
    async fn get_ticker(&self, symbol: &Symbol) -> ExchangeResult<Ticker>;

    /// 주어진 범위의 캔들을 조회합니다.
    async fn get_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ExchangeResult<CandleSeries>;

    /// 가장 최근 캔들을 조회합니다.
    async fn get_last_candle(&self, symbol: &Symbol, timeframe: Timeframe)
        -> ExchangeResult<Candle>;

    /// 시세 구독을 등록합니다.
    async fn subscribe_ticker(&self, symbol: &Symbol) -> ExchangeResult<Uuid>;

    /// 캔들 구독을 등록합니다.
    async fn subscribe_candles(
        &self,
        symbol: &Symbol,
        timeframe: Timeframe,
    ) -> ExchangeResult<Uuid>;

    /// 구독을 해지합니다.
    async fn unsubscribe(&self, id: Uuid) -> ExchangeResult<()>;

    /// 미체결 주문 목록을 조회합니다.
    async fn get_orders(&self) -> ExchangeResult<Vec<Order>>;

    /// 오픈 포지션 목록을 조회합니다.
    async fn get_positions(&self) -> ExchangeResult<Vec<Position>>;

    /// 지갑 목록을 조회합니다.
    async fn get_wallets(&self) -> ExchangeResult<Wallets>;

    /// 호가 통화 기준 평가 잔고를 조회합니다.
    async fn get_balance(&self) -> ExchangeResult<BalanceUsd>;

    /// 주문을 제출합니다.
    async fn put_order(&self, request: &OrderRequest) -> ExchangeResult<Order>;

    /// 주문을 수정합니다.
    async fn update_order(
        &self,
        order_id: Uuid,
        price: Price,
        stop_price: Option<Price>,
        amount: Quantity,
    ) -> ExchangeResult<Order>;

    /// 주문을 취소합니다.
    async fn cancel_order(&self, order_id: Uuid) -> ExchangeResult<()>;

    /// 포지션을 종료합니다.
    async fn close_position(&self, position_id: Uuid) -> ExchangeResult<Position>;
}
